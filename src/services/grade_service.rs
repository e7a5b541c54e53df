use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::grade::{Grade, GradeBook, Quarter, StudentGrades};
use crate::models::subject::{subject_column, subject_index, SUBJECTS};
use crate::models::user::User;
use crate::services::roster_service::Roster;
use crate::services::sheets_backend::{
    range, SheetsBackend, CURRENT_GRADES_RANGE, CURRENT_GRADES_SHEET, LAST_UPDATE_CELL,
    PREVIOUS_GRADES_RANGE, PREVIOUS_GRADES_SHEET,
};
use crate::utils::a1::{cell_address, data_row_number};
use crate::utils::grade_cell::{
    format_grade_values, format_quarter_cell, parse_grade_cell, parse_grade_values,
    parse_quarter_cell,
};
use crate::utils::time::Clock;

/// Result of a grade mutation that reached the repository without an
/// upstream failure. Only `Written` means the sheet was changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    Written,
    StudentNotFound,
    SubjectNotFound,
    RowNotFound,
    GradeIndexOutOfRange,
    QuarterNotWritable,
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        *self == WriteOutcome::Written
    }

    pub fn reason(&self) -> &'static str {
        match self {
            WriteOutcome::Written => "Grade saved",
            WriteOutcome::StudentNotFound => "Student not found",
            WriteOutcome::SubjectNotFound => "Subject not found",
            WriteOutcome::RowNotFound => "Student row not found in the spreadsheet",
            WriteOutcome::GradeIndexOutOfRange => "Grade index out of range",
            WriteOutcome::QuarterNotWritable => "The current quarter is edited through the live grades sheet",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeEdit {
    Add { value: u8 },
    Update { index: usize, value: u8 },
    Delete { index: usize },
}

/// Reads and writes grades in the spreadsheet. Each mutation is a single
/// read-modify-write of one cell; concurrent editors race and the last
/// write wins.
#[derive(Clone)]
pub struct GradeService {
    sheets: Arc<dyn SheetsBackend>,
    roster: Arc<Roster>,
    clock: Arc<dyn Clock>,
}

impl GradeService {
    pub fn new(sheets: Arc<dyn SheetsBackend>, roster: Arc<Roster>, clock: Arc<dyn Clock>) -> Self {
        Self {
            sheets,
            roster,
            clock,
        }
    }

    /// Every roster student's bundle plus the last-update stamp.
    pub async fn load_all(&self) -> Result<GradeBook> {
        let current_rows = self
            .sheets
            .get_values(&range(CURRENT_GRADES_SHEET, CURRENT_GRADES_RANGE))
            .await?;
        let previous_rows = self
            .sheets
            .get_values(&range(PREVIOUS_GRADES_SHEET, PREVIOUS_GRADES_RANGE))
            .await?;
        let last_update = self
            .sheets
            .get_values(&range(CURRENT_GRADES_SHEET, LAST_UPDATE_CELL))
            .await?
            .into_iter()
            .next()
            .and_then(|row| row.into_iter().next())
            .unwrap_or_default();

        let mut students: HashMap<String, StudentGrades> = self
            .roster
            .all_students()
            .into_iter()
            .map(|s| (s.id.clone(), StudentGrades::empty(&s.id)))
            .collect();

        let anchor = self.clock.now();
        for (index, row) in current_rows.iter().enumerate() {
            let Some(bundle) =
                self.bundle_for_row(&mut students, &current_rows, index, CURRENT_GRADES_SHEET)
            else {
                continue;
            };
            for (index, subject) in SUBJECTS.iter().enumerate() {
                let raw = cell(row, subject_column(index));
                bundle.subject_mut(subject.id).current = parse_grade_cell(raw, anchor);
            }
        }

        for (index, row) in previous_rows.iter().enumerate() {
            let Some(bundle) =
                self.bundle_for_row(&mut students, &previous_rows, index, PREVIOUS_GRADES_SHEET)
            else {
                continue;
            };
            for (index, subject) in SUBJECTS.iter().enumerate() {
                let slots = parse_quarter_cell(cell(row, subject_column(index)));
                let grades = bundle.subject_mut(subject.id);
                for quarter in Quarter::ALL {
                    let Some(value) = slots[quarter.cell_position()] else {
                        continue;
                    };
                    let grade = Grade::new(value, quarter.display_date());
                    match quarter {
                        Quarter::Current => {
                            if grades.current.is_empty() {
                                grades.current = vec![grade];
                            }
                        }
                        archived => *grades.list_mut(Some(archived)) = vec![grade],
                    }
                }
            }
        }

        debug!(
            students = students.len(),
            current_rows = current_rows.len(),
            previous_rows = previous_rows.len(),
            "loaded grade book"
        );
        Ok(GradeBook {
            students,
            last_update,
        })
    }

    /// `None` for ids that are not roster students; roster students absent
    /// from the sheets get an empty bundle.
    pub async fn student_grades(&self, student_id: &str) -> Result<Option<(StudentGrades, String)>> {
        if self.roster.student_by_id(student_id).is_none() {
            return Ok(None);
        }
        let mut book = self.load_all().await?;
        let bundle = book
            .students
            .remove(student_id)
            .unwrap_or_else(|| StudentGrades::empty(student_id));
        Ok(Some((bundle, book.last_update)))
    }

    pub async fn add_grade(
        &self,
        student_id: &str,
        subject_id: &str,
        value: u8,
        quarter: Option<Quarter>,
    ) -> Result<WriteOutcome> {
        self.apply(student_id, subject_id, quarter, GradeEdit::Add { value })
            .await
    }

    pub async fn update_grade(
        &self,
        student_id: &str,
        subject_id: &str,
        index: usize,
        value: u8,
        quarter: Option<Quarter>,
    ) -> Result<WriteOutcome> {
        self.apply(student_id, subject_id, quarter, GradeEdit::Update { index, value })
            .await
    }

    pub async fn delete_grade(
        &self,
        student_id: &str,
        subject_id: &str,
        index: usize,
        quarter: Option<Quarter>,
    ) -> Result<WriteOutcome> {
        self.apply(student_id, subject_id, quarter, GradeEdit::Delete { index })
            .await
    }

    /// Resolves the target cell, applies `edit` to its contents and writes
    /// the cell back. A `quarter` addresses the previous-quarters sheet,
    /// where the grade index is ignored and the quarter's slot is set or
    /// cleared.
    pub async fn apply(
        &self,
        student_id: &str,
        subject_id: &str,
        quarter: Option<Quarter>,
        edit: GradeEdit,
    ) -> Result<WriteOutcome> {
        let Some(student) = self.roster.student_by_id(student_id) else {
            return Ok(WriteOutcome::StudentNotFound);
        };
        let Some(subject) = subject_index(subject_id) else {
            return Ok(WriteOutcome::SubjectNotFound);
        };
        let slot = match quarter {
            None => None,
            Some(q) => match q.archive_slot() {
                Some(slot) => Some(slot),
                None => return Ok(WriteOutcome::QuarterNotWritable),
            },
        };

        let (sheet, cells) = match slot {
            None => (CURRENT_GRADES_SHEET, CURRENT_GRADES_RANGE),
            Some(_) => (PREVIOUS_GRADES_SHEET, PREVIOUS_GRADES_RANGE),
        };
        let rows = self.sheets.get_values(&range(sheet, cells)).await?;
        let Some(row_index) = self.roster.find_row(student, &rows) else {
            warn!(student_id, sheet, "student row not found");
            return Ok(WriteOutcome::RowNotFound);
        };

        let column = subject_column(subject);
        let raw = cell(&rows[row_index], column);
        let updated = match slot {
            None => match edit_values(parse_grade_values(raw), edit) {
                Some(values) => format_grade_values(&values),
                None => return Ok(WriteOutcome::GradeIndexOutOfRange),
            },
            Some(slot) => {
                let mut slots = parse_quarter_cell(raw);
                slots[slot] = match edit {
                    GradeEdit::Add { value } | GradeEdit::Update { value, .. } => Some(value),
                    GradeEdit::Delete { .. } => None,
                };
                format_quarter_cell(&slots)
            }
        };

        let address = cell_address(sheet, column, data_row_number(row_index));
        self.sheets.update_value(&address, &updated).await?;
        info!(student_id, subject_id, %address, ?edit, "grade cell written");
        Ok(WriteOutcome::Written)
    }

    /// Bundle of the student owning `rows[index]`. A row is only read when
    /// it is the same row writes for that student would target, so a
    /// wildcard row never shadows the student's exact row.
    fn bundle_for_row<'a>(
        &self,
        students: &'a mut HashMap<String, StudentGrades>,
        rows: &[Vec<String>],
        index: usize,
        sheet: &str,
    ) -> Option<&'a mut StudentGrades> {
        let row = &rows[index];
        let owner: &User = match self.roster.owner_of_row(row) {
            Some(owner) => owner,
            None => {
                if let Some(last) = row.first().filter(|c| !c.trim().is_empty()) {
                    debug!(sheet, row_last_name = %last, "row matches no roster student");
                }
                return None;
            }
        };
        if self.roster.find_row(owner, rows) != Some(index) {
            debug!(sheet, student_id = %owner.id, row = index, "row shadowed by the student's own row");
            return None;
        }
        students.get_mut(&owner.id)
    }
}

fn cell(row: &[String], column: usize) -> &str {
    row.get(column).map(String::as_str).unwrap_or("")
}

/// Applies an edit to a live grade list; `None` when the index is out of
/// range.
fn edit_values(mut values: Vec<u8>, edit: GradeEdit) -> Option<Vec<u8>> {
    match edit {
        GradeEdit::Add { value } => values.push(value),
        GradeEdit::Update { index, value } => *values.get_mut(index)? = value,
        GradeEdit::Delete { index } => {
            if index >= values.len() {
                return None;
            }
            values.remove(index);
        }
    }
    Some(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::services::memory_sheets::MemorySheets;
    use crate::services::sheets_backend::MockSheetsBackend;
    use crate::utils::time::ManualClock;
    use chrono::{Duration, TimeZone, Utc};
    use mockall::predicate::eq;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2025, 4, 20, 9, 0, 0).unwrap()))
    }

    fn service(sheets: Arc<dyn SheetsBackend>) -> GradeService {
        GradeService::new(sheets, Arc::new(Roster::builtin()), clock())
    }

    fn strings(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn seeded() -> Arc<MemorySheets> {
        let sheets = MemorySheets::with_grade_sheets();
        // student1 is Бирюк Лёша, student10 is Зык Диана.
        let mut biryuk = vec![""; 21];
        biryuk[0] = "Бирюк";
        biryuk[1] = "Лёша";
        biryuk[3] = "8, 9";
        biryuk[8] = "10";
        biryuk[20] = "01.04.2025, 10:00:00";
        sheets.set_row("Grades", 1, &["Фамилия", "Имя"]);
        sheets.set_row("Grades", 2, &biryuk);
        sheets.set_row("Grades", 3, &["Зык", "Диана", "", "", "7"]);
        sheets.set_row("Previous_Grades", 2, &["Бирюк", "Лёша", "", "7, 8, , 6"]);
        sheets.set_row("Previous_Grades", 3, &["Зык", "", "", "9, 9, 9, 9"]);
        Arc::new(sheets)
    }

    #[tokio::test]
    async fn adds_to_the_live_cell() {
        let sheets = seeded();
        let svc = service(sheets.clone());
        let outcome = svc.add_grade("student1", "bel_lang", 6, None).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(sheets.cell("Grades", "D2").as_deref(), Some("8, 9, 6"));
    }

    #[tokio::test]
    async fn updates_and_deletes_by_index() {
        let sheets = seeded();
        let svc = service(sheets.clone());
        assert_eq!(
            svc.update_grade("student1", "bel_lang", 0, 4, None).await.unwrap(),
            WriteOutcome::Written
        );
        assert_eq!(sheets.cell("Grades", "D2").as_deref(), Some("4, 9"));
        assert_eq!(
            svc.delete_grade("student1", "bel_lang", 1, None).await.unwrap(),
            WriteOutcome::Written
        );
        assert_eq!(sheets.cell("Grades", "D2").as_deref(), Some("4"));
        assert_eq!(
            svc.delete_grade("student1", "bel_lang", 5, None).await.unwrap(),
            WriteOutcome::GradeIndexOutOfRange
        );
        assert_eq!(sheets.cell("Grades", "D2").as_deref(), Some("4"));
    }

    #[tokio::test]
    async fn writes_to_an_empty_cell_and_past_the_row_end() {
        let sheets = seeded();
        let svc = service(sheets.clone());
        svc.add_grade("student10", "dp_mp", 10, None).await.unwrap();
        assert_eq!(sheets.cell("Grades", "T3").as_deref(), Some("10"));
    }

    #[tokio::test]
    async fn unresolvable_targets_are_outcomes() {
        let sheets = seeded();
        let svc = service(sheets.clone());
        assert_eq!(
            svc.add_grade("student99", "math", 5, None).await.unwrap(),
            WriteOutcome::StudentNotFound
        );
        assert_eq!(
            svc.add_grade("admin1", "math", 5, None).await.unwrap(),
            WriteOutcome::StudentNotFound
        );
        assert_eq!(
            svc.add_grade("student1", "latin", 5, None).await.unwrap(),
            WriteOutcome::SubjectNotFound
        );
        assert_eq!(
            svc.add_grade("student2", "math", 5, None).await.unwrap(),
            WriteOutcome::RowNotFound
        );
        assert_eq!(sheets.write_count(), 0);
    }

    #[tokio::test]
    async fn quarter_edits_touch_only_their_slot() {
        let sheets = seeded();
        let svc = service(sheets.clone());
        svc.update_grade("student1", "bel_lang", 42, 9, Some(Quarter::Q2))
            .await
            .unwrap();
        assert_eq!(sheets.cell("Previous_Grades", "D2").as_deref(), Some("7, 9, , 6"));

        svc.delete_grade("student1", "bel_lang", 0, Some(Quarter::Q1))
            .await
            .unwrap();
        assert_eq!(sheets.cell("Previous_Grades", "D2").as_deref(), Some(", 9, , 6"));

        svc.add_grade("student1", "bel_lit", 5, Some(Quarter::Q3))
            .await
            .unwrap();
        assert_eq!(sheets.cell("Previous_Grades", "E2").as_deref(), Some(", , 5"));
    }

    #[tokio::test]
    async fn current_quarter_is_not_writable_through_the_archive() {
        let sheets = seeded();
        let svc = service(sheets.clone());
        let outcome = svc
            .add_grade("student1", "bel_lang", 5, Some(Quarter::Current))
            .await
            .unwrap();
        assert_eq!(outcome, WriteOutcome::QuarterNotWritable);
        assert_eq!(sheets.write_count(), 0);
    }

    #[tokio::test]
    async fn loader_builds_every_bundle() {
        let svc = service(seeded());
        let book = svc.load_all().await.unwrap();
        assert_eq!(book.students.len(), 27);
        assert_eq!(book.last_update, "01.04.2025, 10:00:00");

        let biryuk = &book.students["student1"];
        let bel_lang = &biryuk.subjects["bel_lang"];
        let values: Vec<u8> = bel_lang.current.iter().map(|g| g.value).collect();
        assert_eq!(values, vec![8, 9]);
        assert_eq!(bel_lang.current[1].date, clock().now());
        assert_eq!(bel_lang.current[0].date, clock().now() - Duration::days(3));
        assert_eq!(bel_lang.quarters[&Quarter::Q1][0].value, 7);
        assert!(bel_lang.quarters[&Quarter::Q3].is_empty());
        assert_eq!(biryuk.subjects["math"].current[0].value, 10);

        let untouched = &book.students["student5"];
        assert!(untouched.subjects.values().all(|s| s.current.is_empty()));
    }

    #[tokio::test]
    async fn live_list_wins_over_fourth_quarter_slot() {
        let svc = service(seeded());
        let book = svc.load_all().await.unwrap();

        // Бирюк has live grades for bel_lang, so slot 4 ("6") is ignored.
        let bel_lang = &book.students["student1"].subjects["bel_lang"];
        assert_eq!(bel_lang.current.len(), 2);

        // Зык has no live bel_lang grades; slot 4 fills current.
        let zyk = &book.students["student10"].subjects["bel_lang"];
        assert_eq!(zyk.current.len(), 1);
        assert_eq!(zyk.current[0].value, 9);
        assert_eq!(zyk.current[0].date, Quarter::Current.display_date());
        assert_eq!(zyk.quarters[&Quarter::Q2][0].value, 9);
    }

    #[tokio::test]
    async fn exact_row_wins_over_later_wildcard_row_on_read() {
        let sheets = Arc::new(MemorySheets::with_grade_sheets());
        sheets.set_row("Grades", 2, &["Бирюк", "Лёша", "", "8"]);
        sheets.set_row("Grades", 3, &["Бирюк", "", "", "5, 5"]);
        sheets.set_row("Previous_Grades", 2, &["Бирюк", "Лёша", "", "7"]);
        sheets.set_row("Previous_Grades", 3, &["Бирюк", "", "", "6"]);
        let svc = service(sheets.clone());

        let outcome = svc.add_grade("student1", "bel_lang", 9, None).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Written);
        assert_eq!(sheets.cell("Grades", "D2").as_deref(), Some("8, 9"));

        let (bundle, _) = svc.student_grades("student1").await.unwrap().unwrap();
        let bel_lang = &bundle.subjects["bel_lang"];
        let values: Vec<u8> = bel_lang.current.iter().map(|g| g.value).collect();
        assert_eq!(values, vec![8, 9]);
        assert_eq!(bel_lang.quarters[&Quarter::Q1], vec![Grade::new(7, Quarter::Q1.display_date())]);
    }

    #[tokio::test]
    async fn added_grade_is_visible_on_next_read() {
        let sheets = seeded();
        let svc = service(sheets.clone());
        svc.add_grade("student10", "bel_lang", 3, None).await.unwrap();
        let (bundle, _) = svc.student_grades("student10").await.unwrap().unwrap();
        let values: Vec<u8> = bundle.subjects["bel_lang"].current.iter().map(|g| g.value).collect();
        assert_eq!(values, vec![3]);
    }

    #[tokio::test]
    async fn single_student_reads() {
        let svc = service(seeded());
        assert!(svc.student_grades("student404").await.unwrap().is_none());
        let (bundle, _) = svc.student_grades("student27").await.unwrap().unwrap();
        assert_eq!(bundle, StudentGrades::empty("student27"));
    }

    #[tokio::test]
    async fn writes_the_exact_cell_address() {
        let mut mock = MockSheetsBackend::new();
        mock.expect_get_values()
            .with(eq("Grades!A2:T28"))
            .times(1)
            .returning(|_| {
                Ok(vec![
                    strings(&["Зык", "Диана"]),
                    strings(&["Бирюк", "Лёша", "", "", "", "", "", "", "", "5"]),
                ])
            });
        mock.expect_update_value()
            .with(eq("Grades!J3"), eq("5, 8"))
            .times(1)
            .returning(|_, _| Ok(()));

        let svc = service(Arc::new(mock));
        let outcome = svc.add_grade("student1", "world_history", 8, None).await.unwrap();
        assert_eq!(outcome, WriteOutcome::Written);
    }

    #[tokio::test]
    async fn upstream_failures_propagate() {
        let mut mock = MockSheetsBackend::new();
        mock.expect_get_values().returning(|_| {
            Err(Error::Sheets {
                status: 500,
                message: "backend error".into(),
            })
        });
        mock.expect_update_value().never();

        let svc = service(Arc::new(mock));
        let err = svc.add_grade("student1", "math", 8, None).await.unwrap_err();
        assert!(matches!(err, Error::Sheets { status: 500, .. }));
        assert!(svc.load_all().await.is_err());
    }

    #[test]
    fn list_edits() {
        assert_eq!(edit_values(vec![], GradeEdit::Add { value: 7 }), Some(vec![7]));
        assert_eq!(edit_values(vec![1, 2], GradeEdit::Update { index: 2, value: 7 }), None);
        assert_eq!(edit_values(vec![1, 2], GradeEdit::Delete { index: 0 }), Some(vec![2]));
    }
}
