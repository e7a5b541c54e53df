use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};
use serde_json::json;

use crate::{
    dto::grades_dto::StudentsQuery,
    models::{grade::Quarter, subject::SUBJECTS, user::AuthUser},
    utils::validation::present,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/subjects",
    responses(
        (status = 200, description = "Subject catalog in spreadsheet column order")
    )
)]
#[axum::debug_handler]
pub async fn list_subjects() -> impl IntoResponse {
    Json(json!({ "success": true, "data": SUBJECTS }))
}

#[utoipa::path(
    get,
    path = "/api/quarters",
    responses(
        (status = 200, description = "Known quarters, current last")
    )
)]
#[axum::debug_handler]
pub async fn list_quarters() -> impl IntoResponse {
    let quarters: Vec<_> = Quarter::ALL
        .iter()
        .map(|q| json!({ "id": q.id(), "name": q.label() }))
        .collect();
    Json(json!({ "success": true, "data": quarters }))
}

#[utoipa::path(
    get,
    path = "/api/students",
    params(
        ("class" = Option<String>, Query, description = "Only students of this class")
    ),
    responses(
        (status = 200, description = "Students without credentials"),
        (status = 403, description = "Admin role required")
    )
)]
#[axum::debug_handler]
pub async fn list_students(
    State(state): State<AppState>,
    Query(query): Query<StudentsQuery>,
) -> impl IntoResponse {
    let students = match present(&query.class) {
        Some(class) => state.roster.students_by_class(class),
        None => state.roster.all_students(),
    };
    let students: Vec<AuthUser> = students.into_iter().map(AuthUser::from).collect();
    Json(json!({ "success": true, "data": students }))
}

#[utoipa::path(
    get,
    path = "/api/classes",
    responses(
        (status = 200, description = "Sorted class names"),
        (status = 403, description = "Admin role required")
    )
)]
#[axum::debug_handler]
pub async fn list_classes(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({ "success": true, "data": state.roster.all_classes() }))
}
