//! Invoice field extraction module.

mod parser;
pub mod rules;
pub mod table;

pub use parser::{ExtractionResult, InvoiceParser, SheetInvoiceParser};
pub use table::{ColumnMap, ColumnRole, StopReason, TableExtraction, TableExtractor};
