use axum::{
    extract::State,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;

use crate::{
    dto::notification_dto::CreateNotificationPayload,
    error::{Error, Result},
    middleware::auth::Claims,
    models::notification::NotificationKind,
    utils::validation::{present, require, validate, ApiJson},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/notifications",
    responses(
        (status = 200, description = "Notifications, newest first"),
        (status = 500, description = "Spreadsheet unavailable")
    )
)]
#[axum::debug_handler]
pub async fn list_notifications(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let notifications = state.notification_service.list().await?;
    Ok(Json(json!({ "success": true, "data": notifications })))
}

#[utoipa::path(
    post,
    path = "/api/notifications",
    request_body = CreateNotificationPayload,
    responses(
        (status = 200, description = "Notification appended"),
        (status = 400, description = "Missing title or message"),
        (status = 403, description = "Admin role required"),
        (status = 500, description = "Spreadsheet unavailable")
    )
)]
#[axum::debug_handler]
pub async fn create_notification(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(payload): ApiJson<CreateNotificationPayload>,
) -> Result<impl IntoResponse> {
    if !claims.is_admin() {
        return Err(Error::Forbidden("Only administrators can send notifications".to_string()));
    }
    validate(&payload)?;
    let title = require(&payload.title, "Missing required fields (title, message)")?;
    let message = require(&payload.message, "Missing required fields (title, message)")?;
    let kind = present(&payload.kind)
        .map(NotificationKind::from_cell)
        .unwrap_or_default();

    let notification = state
        .notification_service
        .add(title, message, kind)
        .await?;
    Ok(Json(json!({ "success": true, "data": notification })))
}
