/// In-memory notifier
///
/// Records every delivery instead of sending it. Users get a device only when
/// registered with [`RecordingNotifier::with_device`]; deliveries to users
/// listed in [`RecordingNotifier::failing_for`] report a failed device.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::{DeliveryReport, DeliveryStatus, DeviceOutcome, Notifier, PushMessage};

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    devices: HashMap<Uuid, Uuid>,
    failing: HashSet<Uuid>,
    calls: Mutex<Vec<(Uuid, PushMessage)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives `user_id` one device
    pub fn with_device(mut self, user_id: Uuid) -> Self {
        self.devices.insert(user_id, Uuid::new_v4());
        self
    }

    pub fn failing_for(mut self, user_id: Uuid) -> Self {
        self.failing.insert(user_id);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(Uuid, PushMessage)>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every (user, message) delivered so far, in call order
    pub fn calls(&self) -> Vec<(Uuid, PushMessage)> {
        self.lock().clone()
    }

    pub fn recipients(&self) -> Vec<Uuid> {
        self.lock().iter().map(|(user_id, _)| *user_id).collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn deliver(&self, user_id: Uuid, message: &PushMessage) -> DeliveryReport {
        self.lock().push((user_id, message.clone()));

        let Some(&device_id) = self.devices.get(&user_id) else {
            return DeliveryReport::empty(user_id);
        };

        let status = if self.failing.contains(&user_id) {
            DeliveryStatus::Failed("simulated failure".to_string())
        } else {
            DeliveryStatus::Delivered
        };

        DeliveryReport {
            user_id,
            outcomes: vec![DeviceOutcome { device_id, status }],
        }
    }
}
