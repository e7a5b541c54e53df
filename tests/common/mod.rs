#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::{TimeZone, Utc};
use grades_portal::{
    config::Config,
    services::memory_sheets::MemorySheets,
    utils::time::ManualClock,
    AppState,
};
use serde_json::Value as JsonValue;
use tower::ServiceExt;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    pub sheets: Arc<MemorySheets>,
    pub clock: ManualClock,
}

pub fn test_config() -> Config {
    Config {
        jwt_secret: "test_secret_key".to_string(),
        api_rps: 1000,
        ..Config::default()
    }
}

/// Spreadsheet with the grade sheets and two students filled in.
/// student1 is Бирюк Лёша, student10 is Зык Диана.
pub fn seeded_sheets() -> Arc<MemorySheets> {
    let sheets = MemorySheets::with_grade_sheets();
    let mut biryuk = vec![""; 21];
    biryuk[0] = "Бирюк";
    biryuk[1] = "Лёша";
    biryuk[3] = "8, 9";
    biryuk[20] = "01.04.2025, 10:00:00";
    sheets.set_row("Grades", 2, &biryuk);
    sheets.set_row("Grades", 3, &["Зык", "Диана", "", "7"]);
    sheets.set_row("Previous_Grades", 2, &["Бирюк", "Лёша", "", "6, 7, 8"]);
    sheets.set_row("Tests_dates", 2, &["Математика", "2025-05-20", "Контрольная"]);
    sheets.set_row("Tests_dates", 3, &["Физика", "2025-05-12", "Тест"]);
    Arc::new(sheets)
}

pub fn test_app(sheets: Arc<MemorySheets>) -> TestApp {
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 4, 20, 9, 0, 0).unwrap());
    let state = AppState::with_clock(test_config(), sheets.clone(), Arc::new(clock.clone()));
    TestApp {
        app: grades_portal::routes::app(state.clone()),
        state,
        sheets,
        clock,
    }
}

impl TestApp {
    pub fn token_for(&self, user_id: &str) -> String {
        let user = self.state.roster.user_by_id(user_id).expect("roster user");
        self.state.auth_service.issue_token(user).expect("token")
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<JsonValue>,
    ) -> (StatusCode, JsonValue) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
        let json = if bytes.is_empty() {
            JsonValue::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(JsonValue::Null)
        };
        (status, json)
    }
}
