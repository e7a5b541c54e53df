use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::services::sheets_backend::{
    SheetsBackend, SpreadsheetInfo, CURRENT_GRADES_SHEET, PREVIOUS_GRADES_SHEET, TESTS_DATES_SHEET,
};
use crate::utils::a1::{parse_cell_ref, parse_range, A1Range};

#[derive(Debug, Clone)]
struct Sheet {
    title: String,
    rows: Vec<Vec<String>>,
}

/// Spreadsheet kept in process memory. Behaves like the Sheets API for the
/// calls the services make: reads drop trailing empty cells and rows,
/// appends land below the last non-empty row and unknown sheets are
/// rejected.
#[derive(Debug)]
pub struct MemorySheets {
    title: String,
    sheets: Mutex<Vec<Sheet>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl Default for MemorySheets {
    fn default() -> Self {
        Self::new("Grades portal")
    }
}

impl MemorySheets {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            sheets: Mutex::new(Vec::new()),
            fail_reads: AtomicBool::new(false),
            fail_writes: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Spreadsheet with the grades, previous-quarters and test-dates sheets
    /// present and empty.
    pub fn with_grade_sheets() -> Self {
        let sheets = Self::default();
        for title in [CURRENT_GRADES_SHEET, PREVIOUS_GRADES_SHEET, TESTS_DATES_SHEET] {
            sheets.add_sheet(title);
        }
        sheets
    }

    pub fn add_sheet(&self, title: &str) {
        let mut sheets = self.lock();
        if !sheets.iter().any(|s| s.title == title) {
            sheets.push(Sheet {
                title: title.to_string(),
                rows: Vec::new(),
            });
        }
    }

    /// Replaces the 1-based row `row_number` of `sheet`, creating the sheet
    /// when needed.
    pub fn set_row(&self, sheet: &str, row_number: usize, cells: &[&str]) {
        self.add_sheet(sheet);
        let mut sheets = self.lock();
        if let Some(target) = sheets.iter_mut().find(|s| s.title == sheet) {
            let index = row_number.saturating_sub(1);
            if target.rows.len() <= index {
                target.rows.resize(index + 1, Vec::new());
            }
            target.rows[index] = cells.iter().map(|c| c.to_string()).collect();
        }
    }

    /// Raw value of one cell, e.g. `cell("Grades", "D2")`.
    pub fn cell(&self, sheet: &str, address: &str) -> Option<String> {
        let cell = parse_cell_ref(address)?;
        let sheets = self.lock();
        let target = sheets.iter().find(|s| s.title == sheet)?;
        target
            .rows
            .get(cell.row - 1)
            .and_then(|row| row.get(cell.column))
            .cloned()
    }

    pub fn rows(&self, sheet: &str) -> Vec<Vec<String>> {
        self.lock()
            .iter()
            .find(|s| s.title == sheet)
            .map(|s| s.rows.clone())
            .unwrap_or_default()
    }

    pub fn has_sheet(&self, sheet: &str) -> bool {
        self.lock().iter().any(|s| s.title == sheet)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful write calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Sheet>> {
        self.sheets.lock().expect("memory sheets mutex poisoned")
    }

    fn check_reads(&self) -> Result<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::Sheets {
                status: 503,
                message: "The service is currently unavailable.".to_string(),
            });
        }
        Ok(())
    }

    fn check_writes(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::Sheets {
                status: 403,
                message: "The caller does not have permission".to_string(),
            });
        }
        Ok(())
    }

    fn parse(range: &str) -> Result<A1Range> {
        parse_range(range).ok_or_else(|| Error::Sheets {
            status: 400,
            message: format!("Unable to parse range: {}", range),
        })
    }
}

fn unknown_sheet(range: &str) -> Error {
    Error::Sheets {
        status: 400,
        message: format!("Unable to parse range: {}", range),
    }
}

fn trim_row(mut row: Vec<String>) -> Vec<String> {
    while row.last().is_some_and(|c| c.is_empty()) {
        row.pop();
    }
    row
}

#[async_trait]
impl SheetsBackend for MemorySheets {
    async fn authorize(&self) -> Result<()> {
        self.check_reads()
    }

    async fn spreadsheet_info(&self) -> Result<SpreadsheetInfo> {
        self.check_reads()?;
        Ok(SpreadsheetInfo {
            title: self.title.clone(),
            sheets: self.lock().iter().map(|s| s.title.clone()).collect(),
        })
    }

    async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>> {
        self.check_reads()?;
        let parsed = Self::parse(range)?;
        let sheets = self.lock();
        let sheet = sheets
            .iter()
            .find(|s| s.title == parsed.sheet)
            .ok_or_else(|| unknown_sheet(range))?;

        let end = parsed.end.unwrap_or(parsed.start);
        let mut values: Vec<Vec<String>> = (parsed.start.row..=end.row)
            .map(|row_number| {
                let row = sheet.rows.get(row_number - 1).cloned().unwrap_or_default();
                let cells = row
                    .into_iter()
                    .skip(parsed.start.column)
                    .take((end.column + 1).saturating_sub(parsed.start.column))
                    .collect();
                trim_row(cells)
            })
            .collect();
        while values.last().is_some_and(|r| r.is_empty()) {
            values.pop();
        }
        Ok(values)
    }

    async fn update_value(&self, range: &str, value: &str) -> Result<()> {
        self.check_writes()?;
        let parsed = Self::parse(range)?;
        let mut sheets = self.lock();
        let sheet = sheets
            .iter_mut()
            .find(|s| s.title == parsed.sheet)
            .ok_or_else(|| unknown_sheet(range))?;

        let index = parsed.start.row - 1;
        if sheet.rows.len() <= index {
            sheet.rows.resize(index + 1, Vec::new());
        }
        let row = &mut sheet.rows[index];
        if row.len() <= parsed.start.column {
            row.resize(parsed.start.column + 1, String::new());
        }
        row[parsed.start.column] = value.to_string();
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn append_row(&self, range: &str, row: Vec<String>) -> Result<()> {
        self.check_writes()?;
        let parsed = Self::parse(range)?;
        let mut sheets = self.lock();
        let sheet = sheets
            .iter_mut()
            .find(|s| s.title == parsed.sheet)
            .ok_or_else(|| unknown_sheet(range))?;

        let used = sheet
            .rows
            .iter()
            .rposition(|r| r.iter().any(|c| !c.is_empty()))
            .map_or(0, |i| i + 1);
        let index = used.max(parsed.start.row - 1);
        if sheet.rows.len() <= index {
            sheet.rows.resize(index + 1, Vec::new());
        }
        let mut cells = vec![String::new(); parsed.start.column];
        cells.extend(row);
        sheet.rows[index] = cells;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn create_sheet(&self, title: &str, header: Vec<String>) -> Result<()> {
        self.check_writes()?;
        let mut sheets = self.lock();
        if sheets.iter().any(|s| s.title == title) {
            return Err(Error::Sheets {
                status: 400,
                message: format!(
                    "Invalid requests[0].addSheet: A sheet with the name \"{}\" already exists.",
                    title
                ),
            });
        }
        sheets.push(Sheet {
            title: title.to_string(),
            rows: vec![header],
        });
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
