/// HTTP push gateway notifier
///
/// Posts one JSON message per active device to the configured gateway:
///
/// ```json
/// { "to": "<device token>", "platform": "android", "title": "...", "body": "...", "data": {} }
/// ```
///
/// A `404` or `410` from the gateway means the token is no longer valid and
/// the device is deactivated. Any other non-success status or transport
/// error is reported as a failed delivery for that device only.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use super::{DeliveryReport, DeliveryStatus, DeviceOutcome, Notifier, PushMessage};
use crate::models::device::Device;

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Failed to build push client: {0}")]
    Client(#[from] reqwest::Error),
}

#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Gateway endpoint receiving the POSTs
    pub url: String,

    /// Sent as a bearer token when set
    pub api_key: Option<String>,

    pub timeout: Duration,
}

impl PushConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: None,
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Serialize)]
struct GatewayMessage<'a> {
    to: &'a str,
    platform: &'a str,
    title: &'a str,
    body: &'a str,
    #[serde(skip_serializing_if = "is_null")]
    data: &'a JsonValue,
}

fn is_null(value: &&JsonValue) -> bool {
    value.is_null()
}

pub struct PushNotifier {
    pool: PgPool,
    client: reqwest::Client,
    config: PushConfig,
}

impl PushNotifier {
    pub fn new(pool: PgPool, config: PushConfig) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            pool,
            client,
            config,
        })
    }

    async fn send(&self, device: &Device, message: &PushMessage) -> DeliveryStatus {
        let payload = GatewayMessage {
            to: &device.token,
            platform: &device.platform,
            title: &message.title,
            body: &message.body,
            data: &message.data,
        };

        let mut request = self.client.post(&self.config.url).json(&payload);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return DeliveryStatus::Failed(e.to_string()),
        };

        match response.status() {
            status if status.is_success() => DeliveryStatus::Delivered,
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                if let Err(e) = Device::deactivate(&self.pool, device.id).await {
                    warn!(device_id = %device.id, error = %e, "Failed to deactivate device");
                }
                DeliveryStatus::Failed("device no longer registered".to_string())
            }
            status => DeliveryStatus::Failed(format!("gateway returned {}", status)),
        }
    }
}

#[async_trait]
impl Notifier for PushNotifier {
    fn name(&self) -> &'static str {
        "push"
    }

    async fn deliver(&self, user_id: Uuid, message: &PushMessage) -> DeliveryReport {
        let devices = match Device::list_active_for_user(&self.pool, user_id).await {
            Ok(devices) => devices,
            Err(e) => {
                warn!(%user_id, error = %e, "Failed to load devices");
                return DeliveryReport::empty(user_id);
            }
        };

        let mut outcomes = Vec::with_capacity(devices.len());
        for device in &devices {
            let status = self.send(device, message).await;
            debug!(%user_id, device_id = %device.id, ?status, "Push sent");
            outcomes.push(DeviceOutcome {
                device_id: device.id,
                status,
            });
        }

        DeliveryReport { user_id, outcomes }
    }
}
