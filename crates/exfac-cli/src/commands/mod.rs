//! Subcommand implementations.

pub mod batch;
pub mod config;
pub mod process;

use std::path::{Path, PathBuf};

use tracing::debug;

use exfac_core::models::config::ExfacConfig;

/// Default configuration file location.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("exfac")
        .join("config.json")
}

/// Explicit `--config` path, else the default path when it exists, else defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ExfacConfig> {
    if let Some(path) = config_path {
        return Ok(ExfacConfig::from_file(Path::new(path))?);
    }

    let default_path = default_config_path();
    if default_path.exists() {
        debug!("Loading configuration from {}", default_path.display());
        return Ok(ExfacConfig::from_file(&default_path)?);
    }
    Ok(ExfacConfig::default())
}
