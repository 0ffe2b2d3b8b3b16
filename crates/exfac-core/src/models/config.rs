//! Configuration structures for the extraction pipeline.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ExfacError, Result};
use crate::invoice::rules::rescue::DEFAULT_RESCUE_PHRASES;
use crate::invoice::rules::Direction;

/// Main configuration for the exfac pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExfacConfig {
    /// Header field extraction configuration.
    pub extraction: ExtractionConfig,

    /// Product table configuration.
    pub table: TableConfig,

    /// Output configuration.
    pub output: OutputConfig,
}

/// Header field extraction configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Rows searched for header labels.
    pub metadata_rows: u32,

    /// Rows scanned cell by cell for currency and incoterm codes.
    pub code_scan_rows: u32,

    /// Search order from a label to its value.
    pub label_directions: Vec<Direction>,

    /// Steps searched per direction for header labels.
    pub label_steps: u32,

    /// Read `LABEL: value` from the label cell itself.
    pub inline_values: bool,

    /// Steps searched to the right of the observations label.
    pub observation_beside_steps: u32,

    /// Blank rows tolerated below the observations label.
    pub observation_steps: u32,

    /// Minimum length of free text taken from the footer or drawings.
    pub observation_min_length: usize,

    /// Rows at the bottom of the sheet treated as footer.
    pub footer_rows: u32,

    /// Use drawing shape text as a fallback source.
    pub use_embedded_text: bool,

    /// Phrases that override the sale condition label.
    pub rescue_phrases: Vec<String>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            metadata_rows: 150,
            code_scan_rows: 150,
            label_directions: vec![Direction::Below, Direction::Right],
            label_steps: 5,
            inline_values: true,
            observation_beside_steps: 5,
            observation_steps: 25,
            observation_min_length: 20,
            footer_rows: 30,
            use_embedded_text: true,
            rescue_phrases: DEFAULT_RESCUE_PHRASES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// How a description is compared against the stop markers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopRule {
    /// The description starts with a marker ("TOTAL GENERAL").
    #[default]
    StartsWith,
    /// The description contains a marker anywhere.
    Contains,
}

/// Product table configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Rows searched for the column header row.
    pub header_rows: u32,

    /// Consecutive blank descriptions tolerated before the table ends.
    pub blank_patience: u32,

    /// Stop marker comparison.
    pub stop_rule: StopRule,

    /// Descriptions that end the table.
    pub stop_markers: Vec<String>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            header_rows: 100,
            blank_patience: 10,
            stop_rule: StopRule::StartsWith,
            stop_markers: ["TOTAL", "SUBTOTAL", "OBSERVACIONES", "OBSERVATIONS"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Output file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Csv,
    Xlsx,
}

impl std::str::FromStr for OutputFormat {
    type Err = ExfacError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            "xlsx" => Ok(OutputFormat::Xlsx),
            other => Err(ExfacError::Config(format!("unknown output format: {}", other))),
        }
    }
}

/// Output configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format.
    pub format: OutputFormat,

    /// Worksheet name for XLSX output.
    pub sheet_name: String,

    /// Pretty-print JSON output.
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Json,
            sheet_name: "Facturas".to_string(),
            pretty: true,
        }
    }
}

impl ExfacConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| ExfacError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content =
            serde_json::to_string_pretty(self).map_err(|e| ExfacError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings that would make every search empty.
    pub fn validate(&self) -> Result<()> {
        if self.extraction.label_directions.is_empty() {
            return Err(ExfacError::Config(
                "extraction.label_directions must not be empty".to_string(),
            ));
        }
        if self.extraction.label_steps == 0 {
            return Err(ExfacError::Config(
                "extraction.label_steps must be at least 1".to_string(),
            ));
        }
        if self.table.header_rows == 0 {
            return Err(ExfacError::Config(
                "table.header_rows must be at least 1".to_string(),
            ));
        }
        if self.output.sheet_name.trim().is_empty() || self.output.sheet_name.chars().count() > 31
        {
            return Err(ExfacError::Config(
                "output.sheet_name must be 1 to 31 characters".to_string(),
            ));
        }
        Ok(())
    }
}
