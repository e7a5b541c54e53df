//! Serialization boundary for grade lists stored inside spreadsheet cells.
//!
//! Live grades sheet: `"8, 9, 7"`. Tokens are trimmed, empty tokens are
//! skipped and anything that is not a positive integer is dropped, so
//! `"8,, x, 0, 9,"` reads as `[8, 9]`.
//!
//! Previous-quarters sheet: up to four positional slots (Q1, Q2, Q3,
//! current). `"8, , 7"` is Q1 = 8, Q2 empty, Q3 = 7.

use chrono::{DateTime, Duration, Utc};

use crate::models::grade::Grade;

pub const QUARTER_SLOTS: usize = 4;
pub type QuarterSlots = [Option<u8>; QUARTER_SLOTS];

/// Spacing between synthesized dates of consecutive live grades.
pub const SYNTHETIC_STEP_DAYS: i64 = 3;

fn parse_token(token: &str) -> Option<u8> {
    token.trim().parse::<u8>().ok().filter(|v| *v > 0)
}

pub fn parse_grade_values(raw: &str) -> Vec<u8> {
    raw.split(',').filter_map(parse_token).collect()
}

pub fn format_grade_values(values: &[u8]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Reads a live cell into grades dated backwards from `anchor` in 3-day
/// steps; the last grade carries `anchor` itself.
pub fn parse_grade_cell(raw: &str, anchor: DateTime<Utc>) -> Vec<Grade> {
    let values = parse_grade_values(raw);
    let count = values.len() as i64;
    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let steps_back = count - i as i64 - 1;
            Grade::new(value, anchor - Duration::days(steps_back * SYNTHETIC_STEP_DAYS))
        })
        .collect()
}

pub fn format_grade_cell(grades: &[Grade]) -> String {
    let values: Vec<u8> = grades.iter().map(|g| g.value).collect();
    format_grade_values(&values)
}

pub fn parse_quarter_cell(raw: &str) -> QuarterSlots {
    let mut slots = [None; QUARTER_SLOTS];
    if raw.trim().is_empty() {
        return slots;
    }
    for (slot, token) in slots.iter_mut().zip(raw.split(',')) {
        *slot = parse_token(token);
    }
    slots
}

pub fn format_quarter_cell(slots: &QuarterSlots) -> String {
    let used = slots.iter().rposition(Option::is_some).map_or(0, |i| i + 1);
    slots[..used]
        .iter()
        .map(|slot| slot.map(|v| v.to_string()).unwrap_or_default())
        .collect::<Vec<_>>()
        .join(", ")
}
