pub mod auth;
pub mod catalog;
pub mod diagnostics;
pub mod grades;
pub mod health;
pub mod notifications;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use utoipa::OpenApi;

use crate::middleware::{
    auth::{require_admin, require_bearer_auth},
    rate_limit::{new_rps_state, rps_middleware},
};
use crate::AppState;

const MAX_BODY_BYTES: usize = 64 * 1024;

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        auth::login,
        auth::me,
        catalog::list_subjects,
        catalog::list_quarters,
        catalog::list_students,
        catalog::list_classes,
        grades::get_student_grades,
        grades::get_student_summary,
        grades::get_all_grades,
        grades::manage_grades,
        notifications::list_notifications,
        notifications::create_notification,
        upcoming_tests::list_upcoming_tests,
        diagnostics::check_sheets_status,
        diagnostics::test_sheets_connection,
        diagnostics::init_student_sheet,
    ),
    info(title = "Grades portal API")
)]
pub struct ApiDoc;

async fn openapi_json() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

/// Full HTTP surface: public catalog and diagnostics, bearer-protected
/// reads and admin-only writes, behind one rate limiter.
pub fn app(state: AppState) -> Router {
    let public_api = Router::new()
        .route("/health", get(health::health))
        .route("/api/openapi.json", get(openapi_json))
        .route("/api/auth/login", post(auth::login))
        .route("/api/subjects", get(catalog::list_subjects))
        .route("/api/quarters", get(catalog::list_quarters))
        .route("/api/check-sheets-status", get(diagnostics::check_sheets_status))
        .route("/api/test-sheets-connection", get(diagnostics::test_sheets_connection));

    let user_api = Router::new()
        .route("/api/auth/me", get(auth::me))
        .route("/api/student-grades", get(grades::get_student_grades))
        .route("/api/student-grades/summary", get(grades::get_student_summary))
        .route(
            "/api/notifications",
            get(notifications::list_notifications).post(notifications::create_notification),
        )
        .route("/api/upcoming-tests", get(upcoming_tests::list_upcoming_tests))
        .route_layer(from_fn_with_state(state.clone(), require_bearer_auth));

    let admin_api = Router::new()
        .route("/api/all-grades", get(grades::get_all_grades))
        .route("/api/manage-grades", post(grades::manage_grades))
        .route("/api/students", get(catalog::list_students))
        .route("/api/classes", get(catalog::list_classes))
        .route("/api/init-student-sheet", post(diagnostics::init_student_sheet))
        .route_layer(from_fn_with_state(state.clone(), require_admin));

    let rps = state.config.api_rps;
    public_api
        .merge(user_api)
        .merge(admin_api)
        .with_state(state)
        .layer(from_fn_with_state(new_rps_state(rps), rps_middleware))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
}
