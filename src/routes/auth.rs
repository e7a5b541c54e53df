use axum::{
    extract::State,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;

use crate::{
    dto::auth_dto::{LoginPayload, LoginResponse},
    error::Result,
    middleware::auth::Claims,
    utils::validation::{validate, ApiJson},
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginPayload,
    responses(
        (status = 200, description = "Logged in", body = LoginResponse),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Invalid username or password")
    )
)]
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<LoginPayload>,
) -> Result<impl IntoResponse> {
    validate(&payload)?;
    let (token, user) = state
        .auth_service
        .login(payload.username.trim(), &payload.password)
        .await?;
    Ok(Json(LoginResponse {
        success: true,
        token,
        user,
    }))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user"),
        (status = 401, description = "Missing or invalid token")
    )
)]
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    let user = state.auth_service.current_user(&claims)?;
    Ok(Json(json!({ "success": true, "user": user })))
}
