use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::Result;
use crate::models::subject::subject_by_name;
use crate::models::upcoming_test::UpcomingTest;
use crate::services::sheets_backend::{range, SheetsBackend, TESTS_DATES_RANGE, TESTS_DATES_SHEET};

pub const UNKNOWN_SUBJECT: &str = "unknown";

#[derive(Clone)]
pub struct ScheduleService {
    sheets: Arc<dyn SheetsBackend>,
}

impl ScheduleService {
    pub fn new(sheets: Arc<dyn SheetsBackend>) -> Self {
        Self { sheets }
    }

    /// Tests listed on the test-dates sheet, earliest first. Rows need a
    /// subject name, a date and a description.
    pub async fn upcoming_tests(&self) -> Result<Vec<UpcomingTest>> {
        let rows = self
            .sheets
            .get_values(&range(TESTS_DATES_SHEET, TESTS_DATES_RANGE))
            .await?;

        let mut tests: Vec<UpcomingTest> = rows
            .into_iter()
            .filter_map(|row| {
                let mut cells = row.into_iter();
                let (name, date, description) = (cells.next()?, cells.next()?, cells.next()?);
                if name.trim().is_empty() || date.trim().is_empty() || description.trim().is_empty() {
                    return None;
                }
                let subject_id = subject_by_name(name.trim())
                    .map(|s| s.id)
                    .unwrap_or(UNKNOWN_SUBJECT)
                    .to_string();
                Some(UpcomingTest {
                    subject_id,
                    subject_name: name,
                    date,
                    description,
                })
            })
            .collect();

        // Unparseable dates sort after every dated entry, keeping sheet order.
        tests.sort_by_key(|t| match parse_test_date(&t.date) {
            Some(date) => (0, date),
            None => (1, DateTime::<Utc>::MAX_UTC),
        });
        Ok(tests)
    }
}

/// Accepts RFC 3339, `2025-05-20` and `20.05.2025`.
pub fn parse_test_date(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%d", "%d.%m.%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}
