//! A1-notation helpers: column letters, cell addresses and range parsing.

/// Letter name of a 1-based column: 1 → `A`, 26 → `Z`, 27 → `AA`.
/// Column 0 has no name and yields an empty string.
pub fn column_letter(column: usize) -> String {
    let mut letters = Vec::new();
    let mut n = column;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - rem - 1) / 26;
    }
    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// 1-based column number of a letter name. Returns `None` for anything that
/// is not a non-empty run of ASCII letters.
pub fn column_number(letters: &str) -> Option<usize> {
    if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(
        letters
            .to_ascii_uppercase()
            .bytes()
            .fold(0usize, |acc, b| acc * 26 + (b - b'A' + 1) as usize),
    )
}

/// Address of a single cell from a 0-based column index and a 1-based row.
pub fn cell_address(sheet: &str, column_index: usize, row_number: usize) -> String {
    format!("{}!{}{}", sheet, column_letter(column_index + 1), row_number)
}

/// Sheet row number of the `index`-th row of a data range starting at row 2.
pub fn data_row_number(index: usize) -> usize {
    index + 2
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    /// 0-based column.
    pub column: usize,
    /// 1-based row.
    pub row: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct A1Range {
    pub sheet: String,
    pub start: CellRef,
    pub end: Option<CellRef>,
}

pub fn parse_cell_ref(raw: &str) -> Option<CellRef> {
    let split = raw.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = raw.split_at(split);
    let column = column_number(letters)?;
    let row: usize = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some(CellRef {
        column: column - 1,
        row,
    })
}

/// Parses `Sheet!A2:T28` or `Sheet!U2`. Quoted sheet names are unquoted.
pub fn parse_range(range: &str) -> Option<A1Range> {
    let (sheet, cells) = range.rsplit_once('!')?;
    let sheet = sheet.trim_matches('\'').to_string();
    let (start, end) = match cells.split_once(':') {
        Some((a, b)) => (parse_cell_ref(a)?, Some(parse_cell_ref(b)?)),
        None => (parse_cell_ref(cells)?, None),
    };
    Some(A1Range { sheet, start, end })
}
