//! Process command - extract records from a single invoice workbook.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use exfac_core::models::config::OutputFormat;
use exfac_core::{InvoiceParser, RecordTable, SheetDocument, SheetInvoiceParser};

use super::load_config;
use crate::output;

/// Arguments for the process command.
#[derive(Args)]
pub struct ProcessArgs {
    /// Input workbook (xlsx, xlsm, xlsb, xls or ods)
    #[arg(required = true)]
    input: PathBuf,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: json, csv or xlsx (default: from output extension, then config)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Print extraction warnings to stderr
    #[arg(long)]
    show_warnings: bool,
}

pub async fn run(args: ProcessArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    if !args.input.exists() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    info!("Processing file: {}", args.input.display());

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.enable_steady_tick(Duration::from_millis(100));

    pb.set_message("Loading workbook...");
    let document = SheetDocument::open(&args.input)?;
    debug!(
        "Decoded {} rows, {} drawing texts",
        document.grid.max_row(),
        document.embedded_text.len()
    );

    pb.set_message("Extracting invoice data...");
    let parser = SheetInvoiceParser::new(&config);
    let result = parser.parse(&document);

    pb.finish_and_clear();

    if args.show_warnings && !result.warnings.is_empty() {
        eprintln!("{}", style("Extraction warnings:").yellow());
        for warning in &result.warnings {
            eprintln!("  - {}", warning);
        }
    }

    let table = RecordTable::from_records(&result.records);
    let format = output::resolve_format(args.format, args.output.as_deref(), &config.output);
    output::write(&table, format, args.output.as_deref(), &config.output)?;

    debug!(
        "Extraction took {}ms, total {:?}",
        result.processing_time_ms,
        start.elapsed()
    );

    Ok(())
}
