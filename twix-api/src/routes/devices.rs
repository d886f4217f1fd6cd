/// Push notification targets of the caller
///
/// - `GET /v1/devices`
/// - `POST /v1/devices` - register or refresh a push token
/// - `DELETE /v1/devices/:id`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    projections::DeviceView,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
    Extension, Json, Router,
};
use serde::Deserialize;
use twix_shared::{
    auth::principal::Principal,
    models::device::{Device, Platform},
};
use uuid::Uuid;
use validator::Validate;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/devices", get(list_devices).post(register_device))
        .route("/v1/devices/:id", delete(delete_device))
}

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterDeviceRequest {
    #[validate(length(min = 1, max = 512, message = "Token required"))]
    pub token: String,

    pub platform: Platform,
}

pub async fn list_devices(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> ApiResult<Json<Vec<DeviceView>>> {
    let devices = Device::list_for_user(&state.db, principal.user_id).await?;
    Ok(Json(devices.into_iter().map(DeviceView::from).collect()))
}

/// Upserts on the token, so re-registering moves it to the caller
pub async fn register_device(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Json(req): Json<RegisterDeviceRequest>,
) -> ApiResult<(StatusCode, Json<DeviceView>)> {
    req.validate()?;

    let device = Device::register(&state.db, principal.user_id, &req.token, req.platform).await?;

    tracing::info!(
        device_id = %device.id,
        user_id = %principal.user_id,
        platform = %req.platform,
        "Device registered"
    );

    Ok((StatusCode::CREATED, Json(device.into())))
}

pub async fn delete_device(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    if Device::delete_for_user(&state.db, principal.user_id, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Device not found".to_string()))
    }
}
