//! Core library for invoice spreadsheet extraction.
//!
//! This crate provides:
//! - Workbook decoding into an immutable cell grid
//! - Drawing shape and print header/footer text from the workbook package
//! - Label-anchored header field extraction (dates, codes, free text)
//! - Product table detection and row streaming
//! - Flat output records with a fixed column order

pub mod error;
pub mod grid;
pub mod invoice;
pub mod models;

pub use error::{ExfacError, LoadError, Result};
pub use grid::{CellValue, Coord, Grid, ScanBounds, SheetDocument};
pub use invoice::{ExtractionResult, InvoiceParser, SheetInvoiceParser};
pub use models::config::{ExfacConfig, OutputFormat};
pub use models::record::{InvoiceHeader, InvoiceRecord, ProductRow, RecordTable};
