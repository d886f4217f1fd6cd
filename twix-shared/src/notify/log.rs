/// Notifier that only writes to the log
///
/// Used when no push gateway is configured. Reports an empty delivery for
/// every user since nothing reaches a device.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use super::{DeliveryReport, Notifier, PushMessage};

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn deliver(&self, user_id: Uuid, message: &PushMessage) -> DeliveryReport {
        info!(%user_id, title = %message.title, body = %message.body, "Notification (not sent)");
        DeliveryReport::empty(user_id)
    }
}
