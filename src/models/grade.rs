use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::subject::SUBJECTS;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grade {
    pub value: u8,
    pub date: DateTime<Utc>,
}

impl Grade {
    pub fn new(value: u8, date: DateTime<Utc>) -> Self {
        Self { value, date }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    #[serde(rename = "2025-Q1")]
    Q1,
    #[serde(rename = "2025-Q2")]
    Q2,
    #[serde(rename = "2025-Q3")]
    Q3,
    #[serde(rename = "current")]
    Current,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Current];
    pub const ARCHIVED: [Quarter; 3] = [Quarter::Q1, Quarter::Q2, Quarter::Q3];

    pub fn id(&self) -> &'static str {
        match self {
            Quarter::Q1 => "2025-Q1",
            Quarter::Q2 => "2025-Q2",
            Quarter::Q3 => "2025-Q3",
            Quarter::Current => "current",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Quarter::Q1 => "1 четверть 2024-2025",
            Quarter::Q2 => "2 четверть 2024-2025",
            Quarter::Q3 => "3 четверть 2024-2025",
            Quarter::Current => "4 четверть (текущая)",
        }
    }

    /// Position of the quarter inside a previous-quarters cell.
    pub fn cell_position(&self) -> usize {
        match self {
            Quarter::Q1 => 0,
            Quarter::Q2 => 1,
            Quarter::Q3 => 2,
            Quarter::Current => 3,
        }
    }

    /// Slot a quarter-scoped write may touch. The current quarter is only
    /// ever edited through the live grades sheet, so it has none.
    pub fn archive_slot(&self) -> Option<usize> {
        match self {
            Quarter::Current => None,
            other => Some(other.cell_position()),
        }
    }

    /// Fixed display date for values read from the previous-quarters sheet.
    pub fn display_date(&self) -> DateTime<Utc> {
        let (y, m, d) = match self {
            Quarter::Q1 => (2024, 11, 15),
            Quarter::Q2 => (2025, 1, 15),
            Quarter::Q3 => (2025, 3, 15),
            Quarter::Current => (2025, 5, 15),
        };
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0)
            .single()
            .unwrap_or_default()
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Quarter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Quarter::ALL
            .into_iter()
            .find(|q| q.id() == s)
            .ok_or_else(|| format!("Unknown quarter: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectGrades {
    pub current: Vec<Grade>,
    pub quarters: BTreeMap<Quarter, Vec<Grade>>,
}

impl Default for SubjectGrades {
    fn default() -> Self {
        Self {
            current: Vec::new(),
            quarters: Quarter::ARCHIVED.into_iter().map(|q| (q, Vec::new())).collect(),
        }
    }
}

impl SubjectGrades {
    /// List addressed by an optional quarter: `None` is the live list.
    pub fn list_mut(&mut self, quarter: Option<Quarter>) -> &mut Vec<Grade> {
        match quarter {
            None => &mut self.current,
            Some(q) => self.quarters.entry(q).or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentGrades {
    pub student_id: String,
    pub subjects: BTreeMap<String, SubjectGrades>,
}

impl StudentGrades {
    /// Bundle with every catalog subject present and every list empty.
    pub fn empty(student_id: &str) -> Self {
        Self {
            student_id: student_id.to_string(),
            subjects: SUBJECTS
                .iter()
                .map(|s| (s.id.to_string(), SubjectGrades::default()))
                .collect(),
        }
    }

    pub fn subject_mut(&mut self, subject_id: &str) -> &mut SubjectGrades {
        self.subjects.entry(subject_id.to_string()).or_default()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBook {
    pub students: HashMap<String, StudentGrades>,
    pub last_update: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bundle_defines_every_subject_and_archived_quarter() {
        let bundle = StudentGrades::empty("student1");
        assert_eq!(bundle.subjects.len(), SUBJECTS.len());
        for subject in SUBJECTS.iter() {
            let grades = &bundle.subjects[subject.id];
            assert!(grades.current.is_empty());
            for q in Quarter::ARCHIVED {
                assert_eq!(grades.quarters.get(&q), Some(&Vec::new()));
            }
        }
    }

    #[test]
    fn quarter_ids_round_trip_through_serde() {
        let json = serde_json::to_value(SubjectGrades::default()).unwrap();
        let quarters = json["quarters"].as_object().unwrap();
        assert!(quarters.contains_key("2025-Q1"));
        assert!(quarters.contains_key("2025-Q3"));
        assert_eq!("2025-Q2".parse::<Quarter>(), Ok(Quarter::Q2));
        assert!("2024-Q1".parse::<Quarter>().is_err());
    }

    #[test]
    fn current_quarter_has_no_archive_slot() {
        assert_eq!(Quarter::Q1.archive_slot(), Some(0));
        assert_eq!(Quarter::Q3.archive_slot(), Some(2));
        assert_eq!(Quarter::Current.archive_slot(), None);
    }

    #[test]
    fn display_dates_are_fixed() {
        assert_eq!(Quarter::Q2.display_date().to_rfc3339(), "2025-01-15T00:00:00+00:00");
    }
}
