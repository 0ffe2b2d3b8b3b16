//! Record table serialization: JSON, CSV and XLSX.

use std::fs;
use std::path::Path;

use console::style;
use rust_xlsxwriter::Workbook;

use exfac_core::models::config::{OutputConfig, OutputFormat};
use exfac_core::{CellValue, RecordTable};

/// Explicit format, else the output file extension, else the configured default.
pub fn resolve_format(
    explicit: Option<OutputFormat>,
    output: Option<&Path>,
    config: &OutputConfig,
) -> OutputFormat {
    explicit
        .or_else(|| {
            output
                .and_then(|p| p.extension())
                .and_then(|e| e.to_str())
                .and_then(|e| e.parse().ok())
        })
        .unwrap_or(config.format)
}

/// Serialize `table` in `format`.
pub fn render(
    table: &RecordTable,
    format: OutputFormat,
    config: &OutputConfig,
) -> anyhow::Result<Vec<u8>> {
    match format {
        OutputFormat::Json => {
            let json = table.to_json();
            let text = if config.pretty {
                serde_json::to_string_pretty(&json)?
            } else {
                serde_json::to_string(&json)?
            };
            Ok(text.into_bytes())
        }
        OutputFormat::Csv => format_csv(table),
        OutputFormat::Xlsx => format_xlsx(table, &config.sheet_name),
    }
}

/// Write to `output`, or to stdout for text formats.
pub fn write(
    table: &RecordTable,
    format: OutputFormat,
    output: Option<&Path>,
    config: &OutputConfig,
) -> anyhow::Result<()> {
    let data = render(table, format, config)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, &data)?;
            println!(
                "{} {} records written to {}",
                style("✓").green(),
                table.rows.len(),
                path.display()
            );
        }
        None if format == OutputFormat::Xlsx => {
            anyhow::bail!("XLSX output needs a file, pass --output <path>");
        }
        None => {
            println!("{}", String::from_utf8(data)?.trim_end());
        }
    }
    Ok(())
}

fn format_csv(table: &RecordTable) -> anyhow::Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(&table.columns)?;
    for row in &table.rows {
        wtr.write_record(row.iter().map(CellValue::display))?;
    }

    Ok(wtr.into_inner()?)
}

fn format_xlsx(table: &RecordTable, sheet_name: &str) -> anyhow::Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name)?;

    for (col, header) in table.columns.iter().enumerate() {
        sheet.write_string(0, col as u16, header)?;
    }

    for (row_idx, row) in table.rows.iter().enumerate() {
        let excel_row = (row_idx + 1) as u32;
        for (col, value) in row.iter().enumerate() {
            let col = col as u16;
            match value {
                CellValue::Empty => {}
                CellValue::Number(n) => {
                    sheet.write_number(excel_row, col, *n)?;
                }
                CellValue::Bool(b) => {
                    sheet.write_boolean(excel_row, col, *b)?;
                }
                other => {
                    sheet.write_string(excel_row, col, other.display())?;
                }
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}
