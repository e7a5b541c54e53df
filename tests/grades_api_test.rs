mod common;

use axum::http::StatusCode;
use serde_json::json;

use common::{seeded_sheets, test_app};

#[tokio::test]
async fn student_reads_own_grades() {
    let t = test_app(seeded_sheets());
    let token = t.token_for("student1");

    let (status, body) = t
        .send("GET", "/api/student-grades?studentId=student1", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["lastUpdate"], "01.04.2025, 10:00:00");
    let bel_lang = &body["data"]["subjects"]["bel_lang"];
    assert_eq!(bel_lang["current"].as_array().unwrap().len(), 2);
    assert_eq!(bel_lang["current"][1]["value"], 9);
    assert_eq!(bel_lang["quarters"]["2025-Q1"][0]["value"], 6);
    assert_eq!(bel_lang["quarters"]["2025-Q3"][0]["value"], 8);
    assert_eq!(body["data"]["subjects"]["dp_mp"]["current"], json!([]));
}

#[tokio::test]
async fn student_grades_request_errors() {
    let t = test_app(seeded_sheets());
    let student = t.token_for("student1");
    let admin = t.token_for("admin1");

    let (status, _) = t.send("GET", "/api/student-grades?studentId=student1", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = t.send("GET", "/api/student-grades", Some(&admin), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = t
        .send("GET", "/api/student-grades?studentId=student10", Some(&student), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = t
        .send("GET", "/api/student-grades?studentId=student99", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unreachable_sheet_returns_empty_bundle_with_500() {
    let t = test_app(seeded_sheets());
    t.sheets.fail_reads(true);
    let admin = t.token_for("admin1");

    let (status, body) = t
        .send("GET", "/api/student-grades?studentId=student10", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert!(body["errorDetails"].is_string());
    assert_eq!(body["data"]["studentId"], "student10");
    assert_eq!(body["data"]["subjects"]["math"]["current"], json!([]));
}

#[tokio::test]
async fn admin_manages_live_grades() {
    let t = test_app(seeded_sheets());
    let admin = t.token_for("admin1");

    let add = json!({
        "action": "add", "studentId": "student1", "subjectId": "bel_lang",
        "value": 7, "date": "2025-04-20T09:00:00Z"
    });
    let (status, body) = t.send("POST", "/api/manage-grades", Some(&admin), Some(add)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(t.sheets.cell("Grades", "D2").as_deref(), Some("8, 9, 7"));

    let update = json!({
        "action": "update", "studentId": "student1", "subjectId": "bel_lang",
        "gradeIndex": 0, "value": 10
    });
    let (status, _) = t.send("POST", "/api/manage-grades", Some(&admin), Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(t.sheets.cell("Grades", "D2").as_deref(), Some("10, 9, 7"));

    let delete = json!({ "action": "delete", "studentId": "student1", "subjectId": "bel_lang", "gradeIndex": 1 });
    let (status, _) = t.send("POST", "/api/manage-grades", Some(&admin), Some(delete)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(t.sheets.cell("Grades", "D2").as_deref(), Some("10, 7"));

    let (_, body) = t
        .send("GET", "/api/student-grades?studentId=student1", Some(&admin), None)
        .await;
    let values: Vec<u64> = body["data"]["subjects"]["bel_lang"]["current"]
        .as_array()
        .unwrap()
        .iter()
        .map(|g| g["value"].as_u64().unwrap())
        .collect();
    assert_eq!(values, vec![10, 7]);
}

#[tokio::test]
async fn admin_edits_archived_quarter_slot() {
    let t = test_app(seeded_sheets());
    let admin = t.token_for("admin1");

    let update = json!({
        "action": "update", "studentId": "student1", "subjectId": "bel_lang",
        "gradeIndex": 0, "value": 9, "quarter": "2025-Q2"
    });
    let (status, _) = t.send("POST", "/api/manage-grades", Some(&admin), Some(update)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(t.sheets.cell("Previous_Grades", "D2").as_deref(), Some("6, 9, 8"));
}

#[tokio::test]
async fn rejected_mutations() {
    let t = test_app(seeded_sheets());
    let admin = t.token_for("admin1");
    let student = t.token_for("student1");

    let add = json!({
        "action": "add", "studentId": "student1", "subjectId": "bel_lang",
        "value": 7, "date": "2025-04-20T09:00:00Z"
    });
    let (status, _) = t
        .send("POST", "/api/manage-grades", Some(&student), Some(add.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let missing = json!({ "action": "add", "subjectId": "bel_lang", "value": 7 });
    let (status, _) = t.send("POST", "/api/manage-grades", Some(&admin), Some(missing)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let out_of_range = json!({ "action": "add", "studentId": "student1", "subjectId": "bel_lang", "value": 11 });
    let (status, _) = t
        .send("POST", "/api/manage-grades", Some(&admin), Some(out_of_range))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bad_quarter = json!({
        "action": "add", "studentId": "student1", "subjectId": "bel_lang",
        "value": 7, "quarter": "2019-Q4"
    });
    let (status, _) = t
        .send("POST", "/api/manage-grades", Some(&admin), Some(bad_quarter))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let bad_index = json!({
        "action": "delete", "studentId": "student1", "subjectId": "bel_lang", "gradeIndex": 5
    });
    let (status, body) = t.send("POST", "/api/manage-grades", Some(&admin), Some(bad_index)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["success"], false);
    assert_eq!(body["outcome"], "grade_index_out_of_range");

    let current_quarter = json!({
        "action": "add", "studentId": "student1", "subjectId": "bel_lang",
        "value": 7, "date": "2025-04-20T09:00:00Z", "quarter": "current"
    });
    let (status, body) = t
        .send("POST", "/api/manage-grades", Some(&admin), Some(current_quarter))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["outcome"], "quarter_not_writable");

    assert_eq!(t.sheets.write_count(), 0);
    assert_eq!(t.sheets.cell("Grades", "D2").as_deref(), Some("8, 9"));
}

#[tokio::test]
async fn malformed_grade_bodies_get_json_400s() {
    let t = test_app(seeded_sheets());
    let admin = t.token_for("admin1");

    let undated = json!({ "action": "add", "studentId": "student1", "subjectId": "bel_lang", "value": 7 });
    let (status, body) = t.send("POST", "/api/manage-grades", Some(&admin), Some(undated)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Missing date for add");

    let string_value = json!({
        "action": "add", "studentId": "student1", "subjectId": "bel_lang",
        "value": "8", "date": "2025-04-20T09:00:00Z"
    });
    let (status, body) = t.send("POST", "/api/manage-grades", Some(&admin), Some(string_value)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("value"));

    assert_eq!(t.sheets.write_count(), 0);
}

#[tokio::test]
async fn all_grades_and_catalog_are_admin_only() {
    let t = test_app(seeded_sheets());
    let admin = t.token_for("admin2");
    let student = t.token_for("student10");

    let (status, _) = t.send("GET", "/api/all-grades", Some(&student), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = t.send("GET", "/api/all-grades", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_object().unwrap().len(), 27);
    assert_eq!(body["data"]["student10"]["subjects"]["bel_lang"]["current"][0]["value"], 7);

    let (status, body) = t.send("GET", "/api/students?class=11", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.to_string().contains("student27"));
    assert!(!body.to_string().contains("password"));

    let (status, _) = t.send("GET", "/api/classes", Some(&student), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn summary_compares_with_class() {
    let t = test_app(seeded_sheets());
    let token = t.token_for("student10");

    let (status, body) = t
        .send("GET", "/api/student-grades/summary?studentId=student10", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["studentId"], "student10");
    assert_eq!(body["data"]["overallAverage"], 7.0);
}

#[tokio::test]
async fn public_catalog_needs_no_token() {
    let t = test_app(seeded_sheets());

    let (status, body) = t.send("GET", "/api/subjects", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.to_string().matches("\"id\"").count(), 17);

    let (status, body) = t.send("GET", "/api/quarters", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.to_string().contains("2025-Q3"));

    let (status, body) = t.send("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}
