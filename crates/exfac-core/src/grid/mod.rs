//! Immutable worksheet snapshot used by every extraction step.
//!
//! Coordinates are 1-based, row-major, the way spreadsheet users read them.
//! A [`Grid`] owns all of its cells; extractors only ever borrow it.

mod loader;
pub mod package;

pub use loader::{SheetDocument, SUPPORTED_EXTENSIONS};

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};

/// A typed cell value as handed over by the workbook decoder.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Blank cell (or decoder error value).
    #[default]
    Empty,
    /// Boolean cell.
    Bool(bool),
    /// Numeric cell; integers are stored as whole floats.
    Number(f64),
    /// Cell carrying calendar semantics.
    Date(NaiveDateTime),
    /// Free text.
    Text(String),
}

impl CellValue {
    /// True for blank cells and whitespace-only text.
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Raw display string, preserved for output.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Date(dt) => {
                if dt.num_seconds_from_midnight() == 0 {
                    dt.format("%d/%m/%Y").to_string()
                } else {
                    dt.format("%d/%m/%Y %H:%M:%S").to_string()
                }
            }
            CellValue::Text(s) => s.trim().to_string(),
        }
    }

    /// Numeric view of the cell, if it is a number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        if s.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(s)
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::Date(dt)
    }
}

/// Format a float without a trailing `.0` for whole values.
fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A 1-based cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub row: u32,
    pub col: u32,
}

impl Coord {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

/// Rectangular scan region, inclusive on both ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanBounds {
    pub first_row: u32,
    pub last_row: u32,
    pub first_col: u32,
    pub last_col: u32,
}

impl ScanBounds {
    /// Rows `1..=last_row`, every column.
    pub fn rows(last_row: u32) -> Self {
        Self {
            first_row: 1,
            last_row,
            first_col: 1,
            last_col: u32::MAX,
        }
    }

    /// Rows `first_row..=last_row`, every column.
    pub fn row_range(first_row: u32, last_row: u32) -> Self {
        Self {
            first_row: first_row.max(1),
            last_row,
            first_col: 1,
            last_col: u32::MAX,
        }
    }

    /// The whole grid.
    pub fn all() -> Self {
        Self::rows(u32::MAX)
    }

    /// Clip against grid dimensions; `None` when nothing is left to scan.
    pub fn clip(&self, grid: &Grid) -> Option<ScanBounds> {
        let clipped = ScanBounds {
            first_row: self.first_row.max(1),
            last_row: self.last_row.min(grid.max_row()),
            first_col: self.first_col.max(1),
            last_col: self.last_col.min(grid.max_col()),
        };
        (clipped.first_row <= clipped.last_row && clipped.first_col <= clipped.last_col)
            .then_some(clipped)
    }
}

/// Immutable 2-D snapshot of one worksheet.
///
/// Only non-empty cells are stored, so a stray value far from the data
/// costs one entry rather than the whole rectangle up to it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grid {
    cells: BTreeMap<(u32, u32), CellValue>,
    max_row: u32,
    max_col: u32,
}

impl Grid {
    /// Build a grid from row-major values; row 0 of the input becomes row 1.
    pub fn from_rows(rows: Vec<Vec<CellValue>>) -> Self {
        let mut grid = Self {
            max_row: rows.len() as u32,
            max_col: rows.iter().map(|r| r.len()).max().unwrap_or(0) as u32,
            ..Self::default()
        };
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                grid.set(r as u32 + 1, c as u32 + 1, value);
            }
        }
        grid
    }

    /// Convenience constructor from string rows; empty strings are blank cells.
    pub fn from_text_rows(rows: &[&[&str]]) -> Self {
        Self::from_rows(
            rows.iter()
                .map(|row| row.iter().map(|s| CellValue::from(*s)).collect())
                .collect(),
        )
    }

    /// Store a decoded value. Blank values are dropped; dimensions grow to fit.
    pub(crate) fn set(&mut self, row: u32, col: u32, value: CellValue) {
        if row == 0 || col == 0 || value.is_empty() {
            return;
        }
        self.max_row = self.max_row.max(row);
        self.max_col = self.max_col.max(col);
        self.cells.insert((row, col), value);
    }

    pub fn max_row(&self) -> u32 {
        self.max_row
    }

    pub fn max_col(&self) -> u32 {
        self.max_col
    }

    /// Number of non-empty cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell access. Out of range and blank both yield `None`.
    pub fn get(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    /// Non-empty cell value; out-of-range and blank are both absent.
    pub fn value(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.get(row, col).filter(|v| !v.is_empty())
    }

    /// Display text of a non-empty cell.
    pub fn text(&self, row: u32, col: u32) -> Option<String> {
        self.value(row, col).map(CellValue::display)
    }

    /// Non-empty cells grouped by 1-based row, in row order. Blank rows are
    /// skipped.
    pub fn rows(&self) -> impl Iterator<Item = (u32, Vec<(u32, &CellValue)>)> + '_ {
        let mut rows: Vec<(u32, Vec<(u32, &CellValue)>)> = Vec::new();
        for (&(row, col), value) in &self.cells {
            match rows.last_mut() {
                Some((current, cells)) if *current == row => cells.push((col, value)),
                _ => rows.push((row, vec![(col, value)])),
            }
        }
        rows.into_iter()
    }

    /// Row-major iteration over non-empty cells inside `bounds`.
    pub fn cells_in(&self, bounds: ScanBounds) -> impl Iterator<Item = (Coord, &CellValue)> + '_ {
        let clipped = bounds.clip(self);
        clipped.into_iter().flat_map(move |b| {
            self.cells
                .range((b.first_row, b.first_col)..=(b.last_row, b.last_col))
                .filter(move |(key, value)| {
                    key.1 >= b.first_col && key.1 <= b.last_col && !value.is_empty()
                })
                .map(|(&(row, col), value)| (Coord::new(row, col), value))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_number_display_drops_trailing_zero() {
        assert_eq!(CellValue::Number(10.0).display(), "10");
        assert_eq!(CellValue::Number(12.5).display(), "12.5");
    }

    #[test]
    fn test_date_display() {
        let dt = NaiveDate::from_ymd_opt(2024, 3, 5)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(CellValue::Date(dt).display(), "05/03/2024");
    }

    #[test]
    fn test_rows_are_one_based() {
        let grid = Grid::from_text_rows(&[&["A"], &["B", "C"]]);
        let rows: Vec<_> = grid.rows().map(|(i, row)| (i, row.len())).collect();
        assert_eq!(rows, vec![(1, 1), (2, 2)]);

        let sparse = Grid::from_text_rows(&[&["A"], &[""], &["", "B"]]);
        let rows: Vec<_> = sparse.rows().map(|(i, row)| (i, row[0].0)).collect();
        assert_eq!(rows, vec![(1, 1), (3, 2)]);
    }

    #[test]
    fn test_out_of_range_is_absent() {
        let grid = Grid::from_text_rows(&[&["A", ""], &["", "B"]]);
        assert_eq!(grid.max_row(), 2);
        assert_eq!(grid.max_col(), 2);
        assert!(grid.get(0, 1).is_none());
        assert!(grid.get(3, 1).is_none());
        assert!(grid.value(1, 2).is_none());
        assert_eq!(grid.text(2, 2).as_deref(), Some("B"));
    }

    #[test]
    fn test_cells_in_is_row_major_and_clipped() {
        let grid = Grid::from_text_rows(&[&["A", "B"], &["C", "D"], &["E", ""]]);
        let seen: Vec<String> = grid
            .cells_in(ScanBounds::rows(2))
            .map(|(_, v)| v.display())
            .collect();
        assert_eq!(seen, vec!["A", "B", "C", "D"]);

        let bounds = ScanBounds::row_range(10, 20);
        assert!(bounds.clip(&grid).is_none());
    }

    #[test]
    fn test_far_cell_is_stored_sparsely() {
        let mut grid = Grid::default();
        grid.set(1, 1, CellValue::from("CLIENTE"));
        grid.set(1_048_576, 16_384, CellValue::from("stray"));
        grid.set(5, 5, CellValue::Empty);

        assert_eq!(grid.len(), 2);
        assert_eq!(grid.max_row(), 1_048_576);
        assert_eq!(grid.max_col(), 16_384);
        assert_eq!(grid.text(1_048_576, 16_384).as_deref(), Some("stray"));

        let seen: Vec<Coord> = grid.cells_in(ScanBounds::rows(100)).map(|(c, _)| c).collect();
        assert_eq!(seen, vec![Coord::new(1, 1)]);
    }
}
