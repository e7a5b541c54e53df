use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::{
    dto::diagnostics_dto::{ConnectionTestResponse, InitStudentSheetPayload, SheetsStatusResponse},
    error::Result,
    services::diagnostics_service::ConnectionTest,
    utils::validation::{require, ApiJson},
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/check-sheets-status",
    responses(
        (status = 200, description = "Connection status; success is false when unreachable", body = SheetsStatusResponse)
    )
)]
#[axum::debug_handler]
pub async fn check_sheets_status(State(state): State<AppState>) -> impl IntoResponse {
    let body = match state.diagnostics_service.check_status().await {
        Ok(info) => SheetsStatusResponse {
            success: true,
            message: "Connected to Google Sheets".to_string(),
            error: None,
            spreadsheet_info: Some(info),
        },
        Err(err) => SheetsStatusResponse {
            success: false,
            message: "Could not connect to Google Sheets".to_string(),
            error: Some(err.to_string()),
            spreadsheet_info: None,
        },
    };
    Json(body)
}

#[utoipa::path(
    get,
    path = "/api/test-sheets-connection",
    responses(
        (status = 200, description = "Authorized; credentials are masked", body = ConnectionTestResponse),
        (status = 400, description = "A service-account variable is missing"),
        (status = 500, description = "Authorization failed")
    )
)]
#[axum::debug_handler]
pub async fn test_sheets_connection(State(state): State<AppState>) -> impl IntoResponse {
    let (status, body) = match state.diagnostics_service.test_connection().await {
        ConnectionTest::MissingSetting {
            variable,
            message,
            env_status,
        } => (
            StatusCode::BAD_REQUEST,
            ConnectionTestResponse {
                success: false,
                message: message.to_string(),
                error: Some(format!("Environment variable {} is missing or invalid", variable)),
                service_account: None,
                spreadsheet_id: None,
                env_status,
            },
        ),
        ConnectionTest::Connected {
            service_account,
            spreadsheet_id,
            env_status,
        } => (
            StatusCode::OK,
            ConnectionTestResponse {
                success: true,
                message: "Connected to the Google Sheets API".to_string(),
                error: None,
                service_account: Some(service_account),
                spreadsheet_id: Some(spreadsheet_id),
                env_status,
            },
        ),
        ConnectionTest::Failed { error, env_status } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ConnectionTestResponse {
                success: false,
                message: "Could not connect to the Google Sheets API".to_string(),
                error: Some(error),
                service_account: None,
                spreadsheet_id: None,
                env_status,
            },
        ),
    };
    (status, Json(body))
}

#[utoipa::path(
    post,
    path = "/api/init-student-sheet",
    request_body = InitStudentSheetPayload,
    responses(
        (status = 200, description = "Credentials verified"),
        (status = 400, description = "Missing studentId"),
        (status = 404, description = "Unknown student"),
        (status = 500, description = "Initialization failed")
    )
)]
#[axum::debug_handler]
pub async fn init_student_sheet(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<InitStudentSheetPayload>,
) -> Result<impl IntoResponse> {
    let student_id = require(&payload.student_id, "Missing studentId")?;
    if state.diagnostics_service.init_student_sheet(student_id).await? {
        Ok((StatusCode::OK, Json(json!({ "success": true }))))
    } else {
        Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "error": "Failed to initialize the sheet" })),
        ))
    }
}
