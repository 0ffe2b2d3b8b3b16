//! Batch processing command for multiple invoice workbooks.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use exfac_core::grid::SUPPORTED_EXTENSIONS;
use exfac_core::models::config::OutputFormat;
use exfac_core::{ExtractionResult, InvoiceParser, RecordTable, SheetDocument, SheetInvoiceParser};

use super::load_config;
use crate::output;

/// Arguments for the batch command.
#[derive(Args)]
pub struct BatchArgs {
    /// Glob pattern matching input workbooks
    #[arg(required = true)]
    input: String,

    /// Output file for the combined table (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format: json, csv or xlsx (default: from output extension, then config)
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Also generate a per-file summary CSV
    #[arg(long)]
    summary: bool,

    /// Number of parallel workers
    #[arg(short = 'j', long, default_value = "4")]
    jobs: usize,
}

/// Result of processing a single file.
struct ProcessResult {
    path: PathBuf,
    extraction: Option<ExtractionResult>,
    error: Option<String>,
}

pub async fn run(args: BatchArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();
    let config = load_config(config_path)?;

    let files = collect_inputs(&args.input)?;
    if files.is_empty() {
        anyhow::bail!("No matching files found for pattern: {}", args.input);
    }

    eprintln!(
        "{} Found {} files to process",
        style("ℹ").blue(),
        files.len()
    );

    let overall_pb = ProgressBar::new(files.len() as u64);
    overall_pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} files")?
            .progress_chars("=>-"),
    );

    let parser = Arc::new(SheetInvoiceParser::new(&config));
    let semaphore = Arc::new(Semaphore::new(args.jobs.max(1)));

    let handles: Vec<_> = files
        .iter()
        .cloned()
        .map(|path| {
            let parser = Arc::clone(&parser);
            let semaphore = Arc::clone(&semaphore);
            let pb = overall_pb.clone();
            tokio::spawn(async move {
                let _permit = semaphore.acquire().await;
                let worker_path = path.clone();
                let outcome =
                    tokio::task::spawn_blocking(move || process_single_file(&worker_path, &parser))
                        .await;
                pb.inc(1);
                match outcome {
                    Ok(result) => result,
                    Err(e) => Err(anyhow::anyhow!("worker failed: {}", e)),
                }
            })
        })
        .collect();

    // Await in input order so the combined table is deterministic.
    let mut results = Vec::with_capacity(files.len());
    for (path, handle) in files.into_iter().zip(handles) {
        let outcome = match handle.await {
            Ok(result) => result,
            Err(e) => Err(anyhow::anyhow!("worker failed: {}", e)),
        };
        match outcome {
            Ok(extraction) => results.push(ProcessResult {
                path,
                extraction: Some(extraction),
                error: None,
            }),
            Err(e) => {
                warn!("Failed to process {}: {}", path.display(), e);
                results.push(ProcessResult {
                    path,
                    extraction: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    overall_pb.finish_and_clear();

    let table = RecordTable::from_records(
        results
            .iter()
            .filter_map(|r| r.extraction.as_ref())
            .flat_map(|e| e.records.iter()),
    );
    let format = output::resolve_format(args.format, args.output.as_deref(), &config.output);
    output::write(&table, format, args.output.as_deref(), &config.output)?;

    if args.summary {
        let summary_path = args
            .output
            .as_deref()
            .and_then(Path::parent)
            .map(|d| d.join("summary.csv"))
            .unwrap_or_else(|| PathBuf::from("summary.csv"));

        write_summary(&summary_path, &results)?;
        eprintln!(
            "{} Summary written to {}",
            style("✓").green(),
            summary_path.display()
        );
    }

    let failed: Vec<_> = results.iter().filter(|r| r.error.is_some()).collect();

    eprintln!();
    eprintln!(
        "{} Processed {} files in {:?}",
        style("✓").green(),
        results.len(),
        start.elapsed()
    );
    eprintln!(
        "   {} successful, {} failed",
        style(results.len() - failed.len()).green(),
        style(failed.len()).red()
    );

    if !failed.is_empty() {
        eprintln!();
        eprintln!("{}", style("Failed files:").red());
        for result in &failed {
            eprintln!(
                "  - {}: {}",
                result.path.display(),
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }

    Ok(())
}

/// Expand `pattern`, keeping supported workbooks and skipping office lock files.
fn collect_inputs(pattern: &str) -> anyhow::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = glob(pattern)?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .filter(|p| {
            let ext = p
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("")
                .to_lowercase();
            SUPPORTED_EXTENSIONS.contains(&ext.as_str())
        })
        .filter(|p| {
            !p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("~$"))
        })
        .collect();
    files.sort();
    Ok(files)
}

fn process_single_file(path: &Path, parser: &SheetInvoiceParser) -> anyhow::Result<ExtractionResult> {
    let document = SheetDocument::open(path)?;
    let result = parser.parse(&document);
    debug!(
        "{}: {} records, {} warnings",
        path.display(),
        result.records.len(),
        result.warnings.len()
    );
    Ok(result)
}

fn write_summary(path: &Path, results: &[ProcessResult]) -> anyhow::Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;

    wtr.write_record([
        "filename",
        "status",
        "records",
        "products",
        "missing_fields",
        "processing_time_ms",
        "error",
    ])?;

    for result in results {
        let filename = result
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("");

        if let Some(extraction) = &result.extraction {
            wtr.write_record([
                filename,
                "success",
                &extraction.records.len().to_string(),
                &extraction.products.len().to_string(),
                &extraction.header.missing_fields().join(" "),
                &extraction.processing_time_ms.to_string(),
                "",
            ])?;
        } else {
            wtr.write_record([
                filename,
                "error",
                "",
                "",
                "",
                "",
                result.error.as_deref().unwrap_or(""),
            ])?;
        }
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collect_inputs_filters_extensions_and_lock_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.xlsx", "a.XLS", "~$b.xlsx", "notes.txt"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let pattern = format!("{}/*", dir.path().display());
        let files = collect_inputs(&pattern).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.XLS", "b.xlsx"]);
    }
}
