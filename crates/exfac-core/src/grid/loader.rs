//! Workbook decoding via calamine.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader, Xlsx};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::{debug, trace};

use super::package::{extract_embedded_text, extract_print_text};
use super::{CellValue, Grid};
use crate::error::LoadError;

/// Extensions the decoder accepts.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// One decoded spreadsheet: the first worksheet plus package-level text.
#[derive(Debug, Clone, Default)]
pub struct SheetDocument {
    /// Identifier shown in output (usually the file name).
    pub name: String,
    /// First worksheet as a grid.
    pub grid: Grid,
    /// Text found in drawing shapes (text boxes, callouts).
    pub embedded_text: Vec<String>,
    /// Print header/footer text of the first worksheet.
    pub print_text: Vec<String>,
}

impl SheetDocument {
    /// Wrap an in-memory grid without package text.
    pub fn from_grid(name: impl Into<String>, grid: Grid) -> Self {
        Self {
            name: name.into(),
            grid,
            embedded_text: Vec::new(),
            print_text: Vec::new(),
        }
    }

    /// Read and decode a workbook from disk.
    pub fn open(path: &Path) -> crate::Result<Self> {
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("workbook")
            .to_string();
        Ok(Self::from_bytes(name, data)?)
    }

    /// Decode a workbook held in memory. `name` must carry the file extension.
    pub fn from_bytes(name: impl Into<String>, data: Vec<u8>) -> Result<Self, LoadError> {
        let name = name.into();
        let extension = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
            return Err(LoadError::UnsupportedFormat(if extension.is_empty() {
                name.clone()
            } else {
                extension
            }));
        }

        let grid = match extension.as_str() {
            "xlsx" | "xlsm" => stream_first_xlsx_sheet(&data)?,
            _ => decode_first_sheet(&data)?,
        };
        debug!(
            "Decoded {} as {}x{} grid",
            name,
            grid.max_row(),
            grid.max_col()
        );

        let embedded_text = extract_embedded_text(&data);
        let print_text = extract_print_text(&data);

        Ok(Self {
            name,
            grid,
            embedded_text,
            print_text,
        })
    }
}

fn decode_first_sheet(data: &[u8]) -> Result<Grid, LoadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(data.to_vec()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(LoadError::NoWorksheet)??;

    let Some((start_row, start_col)) = range.start() else {
        return Ok(Grid::default());
    };
    let (end_row, end_col) = range.end().unwrap_or((start_row, start_col));

    trace!(
        "used range ({}, {}) to ({}, {})",
        start_row,
        start_col,
        end_row,
        end_col
    );

    // Keep absolute coordinates: a used range starting at C4 stays at C4.
    let mut grid = Grid::default();
    for (row, col, data) in range.used_cells() {
        grid.set(
            start_row + row as u32 + 1,
            start_col + col as u32 + 1,
            convert_cell(data),
        );
    }

    Ok(grid)
}

/// Read the first xlsx worksheet cell by cell, without materializing the
/// used range as a dense rectangle.
fn stream_first_xlsx_sheet(data: &[u8]) -> Result<Grid, LoadError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(data))?;
    let name = workbook
        .sheet_names()
        .into_iter()
        .next()
        .ok_or(LoadError::NoWorksheet)?;

    let mut cells = workbook.worksheet_cells_reader(&name)?;
    let mut grid = Grid::default();
    while let Some(cell) = cells.next_cell()? {
        let (row, col) = cell.get_position();
        let value = convert_cell(&Data::from(cell.get_value().clone()));
        grid.set(row + 1, col + 1, value);
    }

    Ok(grid)
}

fn convert_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty | Data::Error(_) => CellValue::Empty,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
            .map(CellValue::Date)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::Date)
            .unwrap_or_else(|| CellValue::from(s.as_str())),
        Data::DurationIso(s) => CellValue::from(s.as_str()),
    }
}

/// Convert an Excel serial date (1900 system) to a timestamp.
pub(crate) fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(Duration::milliseconds(millis))
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
