/// Push notifications
///
/// A [`Notifier`] delivers a [`PushMessage`] to every registered device of
/// one user and reports what happened per device. Delivery never fails into
/// the caller: a user without devices gets an empty report and a gateway
/// error becomes a [`DeliveryStatus::Failed`] entry. [`dispatch`] fans a
/// message out to several users one after another and logs failures.
///
/// # Implementations
///
/// - [`PushNotifier`]: posts to an HTTP push gateway
/// - [`LogNotifier`]: only logs, used when no gateway is configured
/// - [`RecordingNotifier`]: keeps every call in memory, for tests
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use twix_shared::notify::{dispatch, Notifier, PushMessage, RecordingNotifier};
/// use uuid::Uuid;
///
/// # async fn example() {
/// let notifier = Arc::new(RecordingNotifier::new());
/// let recipients = [Uuid::new_v4(), Uuid::new_v4()];
///
/// let report = dispatch(notifier.as_ref(), &recipients, &PushMessage::new("Hi", "there")).await;
/// assert_eq!(report.attempted(), 2);
/// assert_eq!(notifier.calls().len(), 2);
/// # }
/// ```

pub mod log;
pub mod memory;
pub mod push;

pub use self::log::LogNotifier;
pub use memory::RecordingNotifier;
pub use push::{NotifyError, PushConfig, PushNotifier};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::group::Group;
use crate::models::task::Task;

/// Title of the notification sent when a task is assigned to a group
pub const TASK_ASSIGNED_TITLE: &str = "New task assigned";

/// Title of the notification sent when a task's reminder is due
pub const REMINDER_TITLE: &str = "Reminder";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub title: String,
    pub body: String,

    /// Opaque payload for the client, e.g. the id of the task to open
    #[serde(default, skip_serializing_if = "JsonValue::is_null")]
    pub data: JsonValue,
}

impl PushMessage {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: JsonValue::Null,
        }
    }

    pub fn with_data(mut self, data: JsonValue) -> Self {
        self.data = data;
        self
    }

    /// Sent to every member when `task` is assigned to `group`
    pub fn task_assigned(task: &Task, group: &Group, admin_name: &str) -> Self {
        Self::new(
            TASK_ASSIGNED_TITLE,
            format!("{} assigned you \"{}\" in {}", admin_name, task.name, group.name),
        )
        .with_data(serde_json::json!({
            "kind": "task_assigned",
            "task_id": task.id,
            "group_id": group.id,
        }))
    }

    pub fn reminder(task: &Task) -> Self {
        Self::new(REMINDER_TITLE, task.name.clone()).with_data(serde_json::json!({
            "kind": "reminder",
            "task_id": task.id,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum DeliveryStatus {
    Delivered,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceOutcome {
    pub device_id: Uuid,
    pub status: DeliveryStatus,
}

/// Per-device result of delivering one message to one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryReport {
    pub user_id: Uuid,
    pub outcomes: Vec<DeviceOutcome>,
}

impl DeliveryReport {
    pub fn empty(user_id: Uuid) -> Self {
        Self {
            user_id,
            outcomes: Vec::new(),
        }
    }

    pub fn has_devices(&self) -> bool {
        !self.outcomes.is_empty()
    }

    pub fn delivered(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == DeliveryStatus::Delivered)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }
}

/// Delivers messages to a user's devices
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Delivers `message` to every active device of `user_id`
    ///
    /// Must not panic or block indefinitely; problems are reported per device.
    async fn deliver(&self, user_id: Uuid, message: &PushMessage) -> DeliveryReport;
}

/// Combined result of a [`dispatch`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub reports: Vec<DeliveryReport>,
}

impl DispatchReport {
    /// Number of users a delivery was attempted for
    pub fn attempted(&self) -> usize {
        self.reports.len()
    }

    pub fn delivered(&self) -> usize {
        self.reports.iter().map(DeliveryReport::delivered).sum()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().map(DeliveryReport::failed).sum()
    }

    /// Users who have no device registered
    pub fn without_devices(&self) -> impl Iterator<Item = Uuid> + '_ {
        self.reports
            .iter()
            .filter(|r| !r.has_devices())
            .map(|r| r.user_id)
    }
}

/// Delivers `message` to each recipient in turn
///
/// A failure for one recipient is logged and does not affect the others.
pub async fn dispatch(
    notifier: &dyn Notifier,
    recipients: &[Uuid],
    message: &PushMessage,
) -> DispatchReport {
    let mut reports = Vec::with_capacity(recipients.len());

    for &user_id in recipients {
        let report = notifier.deliver(user_id, message).await;

        if !report.has_devices() {
            debug!(%user_id, notifier = notifier.name(), "No device registered");
        }
        for outcome in &report.outcomes {
            if let DeliveryStatus::Failed(reason) = &outcome.status {
                warn!(
                    %user_id,
                    device_id = %outcome.device_id,
                    notifier = notifier.name(),
                    %reason,
                    "Push delivery failed"
                );
            }
        }

        reports.push(report);
    }

    DispatchReport { reports }
}
