use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    Extension,
};
use serde_json::json;
use tracing::{error, info, warn};

use crate::{
    dto::grades_dto::{ManageGradeRequest, StudentGradesQuery, StudentGradesResponse},
    error::{Error, Result},
    middleware::auth::Claims,
    models::grade::StudentGrades,
    services::statistics_service::{class_averages, summarize},
    utils::validation::{require, validate, ApiJson},
    AppState,
};

fn readable_student<'a>(claims: &Claims, query: &'a StudentGradesQuery) -> Result<&'a str> {
    let student_id = require(&query.student_id, "Missing studentId")?;
    if !claims.may_read_student(student_id) {
        return Err(Error::Forbidden("Students may only read their own grades".to_string()));
    }
    Ok(student_id)
}

#[utoipa::path(
    get,
    path = "/api/student-grades",
    params(
        ("studentId" = String, Query, description = "Roster id, e.g. student1")
    ),
    responses(
        (status = 200, description = "Grades of one student", body = StudentGradesResponse),
        (status = 400, description = "Missing studentId"),
        (status = 403, description = "Another student's grades"),
        (status = 404, description = "Unknown student"),
        (status = 500, description = "Spreadsheet unavailable; an empty bundle is returned")
    )
)]
#[axum::debug_handler]
pub async fn get_student_grades(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<StudentGradesQuery>,
) -> Result<Response> {
    let student_id = readable_student(&claims, &query)?;

    match state.grade_service.student_grades(student_id).await {
        Ok(Some((data, last_update))) => Ok(Json(StudentGradesResponse {
            success: true,
            data,
            last_update: Some(last_update),
            error: None,
            error_details: None,
        })
        .into_response()),
        Ok(None) => Err(Error::NotFound("Student not found".to_string())),
        Err(err) => {
            error!(student_id, error = %err, "failed to load student grades");
            let body = StudentGradesResponse {
                success: false,
                data: StudentGrades::empty(student_id),
                last_update: None,
                error: Some("Failed to load grades from Google Sheets".to_string()),
                error_details: Some(err.to_string()),
            };
            Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/student-grades/summary",
    params(
        ("studentId" = String, Query, description = "Roster id, e.g. student1")
    ),
    responses(
        (status = 200, description = "Averages, best and worst subjects, class comparison"),
        (status = 400, description = "Missing studentId"),
        (status = 404, description = "Unknown student")
    )
)]
#[axum::debug_handler]
pub async fn get_student_summary(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<StudentGradesQuery>,
) -> Result<impl IntoResponse> {
    let student_id = readable_student(&claims, &query)?;
    if state.roster.student_by_id(student_id).is_none() {
        return Err(Error::NotFound("Student not found".to_string()));
    }

    let book = state.grade_service.load_all().await?;
    let class = class_averages(&book);
    let student = book
        .students
        .get(student_id)
        .cloned()
        .unwrap_or_else(|| StudentGrades::empty(student_id));
    let summary = summarize(&student, &class);
    Ok(Json(json!({ "success": true, "data": summary, "lastUpdate": book.last_update })))
}

#[utoipa::path(
    get,
    path = "/api/all-grades",
    responses(
        (status = 200, description = "Every student's grades"),
        (status = 403, description = "Admin role required")
    )
)]
#[axum::debug_handler]
pub async fn get_all_grades(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let book = state.grade_service.load_all().await?;
    Ok(Json(json!({
        "success": true,
        "data": book.students,
        "lastUpdate": book.last_update,
    })))
}

#[utoipa::path(
    post,
    path = "/api/manage-grades",
    request_body = ManageGradeRequest,
    responses(
        (status = 200, description = "Grade cell written"),
        (status = 400, description = "Missing or invalid parameters"),
        (status = 403, description = "Admin role required"),
        (status = 500, description = "Nothing was written")
    )
)]
#[axum::debug_handler]
pub async fn manage_grades(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(payload): ApiJson<ManageGradeRequest>,
) -> Result<Response> {
    validate(&payload)?;
    let command = payload.into_command()?;

    let outcome = state
        .grade_service
        .apply(
            &command.student_id,
            &command.subject_id,
            command.quarter,
            command.edit,
        )
        .await?;

    if outcome.is_written() {
        info!(admin = %claims.sub, student_id = %command.student_id, subject_id = %command.subject_id, "grades updated");
        return Ok(Json(json!({ "success": true })).into_response());
    }

    warn!(student_id = %command.student_id, subject_id = %command.subject_id, ?outcome, "grade operation not applied");
    Ok((
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "success": false,
            "error": outcome.reason(),
            "outcome": outcome,
        })),
    )
        .into_response())
}
