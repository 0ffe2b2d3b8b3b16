//! Data models for extracted invoices and configuration.

pub mod config;
pub mod record;

pub use config::{ExfacConfig, ExtractionConfig, OutputConfig, OutputFormat, StopRule, TableConfig};
pub use record::{assemble_records, InvoiceHeader, InvoiceRecord, ProductRow, RecordTable, PREFERRED_COLUMNS};
