use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const CURRENT_GRADES_SHEET: &str = "Grades";
pub const PREVIOUS_GRADES_SHEET: &str = "Previous_Grades";
pub const TESTS_DATES_SHEET: &str = "Tests_dates";
pub const NOTIFICATIONS_SHEET: &str = "Notifications";

pub const CURRENT_GRADES_RANGE: &str = "A2:T28";
pub const PREVIOUS_GRADES_RANGE: &str = "A2:T28";
pub const TESTS_DATES_RANGE: &str = "A2:C18";
pub const NOTIFICATIONS_RANGE: &str = "A2:E100";
pub const LAST_UPDATE_CELL: &str = "U2";

pub const NOTIFICATIONS_HEADER: [&str; 5] = ["ID", "Заголовок", "Сообщение", "Тип", "Дата"];

pub fn range(sheet: &str, cells: &str) -> String {
    format!("{}!{}", sheet, cells)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpreadsheetInfo {
    pub title: String,
    pub sheets: Vec<String>,
}

/// The spreadsheet as seen by the services. Values travel as strings in
/// row-major order; trailing empty cells and rows may be omitted, as the
/// Sheets API does.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SheetsBackend: Send + Sync {
    /// Confirms the credentials are usable.
    async fn authorize(&self) -> Result<()>;

    async fn spreadsheet_info(&self) -> Result<SpreadsheetInfo>;

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>>;

    /// Writes one value into a single-cell range.
    async fn update_value(&self, range: &str, value: &str) -> Result<()>;

    async fn append_row(&self, range: &str, row: Vec<String>) -> Result<()>;

    /// Adds a sheet and writes `header` into its first row.
    async fn create_sheet(&self, title: &str, header: Vec<String>) -> Result<()>;
}
