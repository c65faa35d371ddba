//! In-memory workbook model
//!
//! Documents are loaded whole: a `Workbook` is an ordered list of sheets,
//! a `Sheet` is a dense row/column grid of `Cell`s. Indices are 0-based in
//! code; anything user-facing (links, log lines) is 1-based like the
//! spreadsheet UI.

use chrono::NaiveDateTime;

/// A single cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    /// Trimmed string form of the cell. Whole numbers render without a
    /// trailing `.0` so they compare equal to typed-in ids.
    pub fn as_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.trim().to_string(),
            Cell::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    n.to_string()
                }
            }
            Cell::Bool(b) => b.to_string(),
            Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

/// One tab of a document. `gid` is the tab's stable position-derived id,
/// used in row links and for explicit tab targeting.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub name: String,
    pub gid: u32,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, gid: u32) -> Self {
        Self {
            name: name.into(),
            gid,
            rows: Vec::new(),
        }
    }

    pub fn from_rows(name: impl Into<String>, gid: u32, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            gid,
            rows,
        }
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row(&self, row: usize) -> &[Cell] {
        self.rows.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of rows in the used range.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell at (row, col), 0-based. Out-of-range reads are empty, matching
    /// how spreadsheets behave past the used range.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    /// Write a cell, growing the grid as needed.
    pub fn set_cell(&mut self, row: usize, col: usize, value: Cell) {
        if self.rows.len() <= row {
            self.rows.resize(row + 1, Vec::new());
        }
        let r = &mut self.rows[row];
        if r.len() <= col {
            r.resize(col + 1, Cell::Empty);
        }
        r[col] = value;
    }

    /// 0-based index of the first row whose cell in `col` is empty, at or
    /// after `from`. Scans only the used range; `None` means no gap.
    pub fn first_empty_in_column(&self, col: usize, from: usize) -> Option<usize> {
        (from..self.rows.len()).find(|&row| self.cell(row, col).is_empty())
    }

    /// 0-based index of the first row whose cell in `col` equals `value`
    /// exactly (trimmed text compare).
    pub fn find_in_column(&self, col: usize, value: &str) -> Option<usize> {
        let needle = value.trim();
        (0..self.rows.len()).find(|&row| self.cell(row, col).as_text() == needle)
    }
}

/// A whole document.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    pub fn sheet_by_gid(&self, gid: u32) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.gid == gid)
    }
}
