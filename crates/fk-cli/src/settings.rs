//! File locations and the TOML config file.
//!
//! ```toml
//! exemption_amount = 5
//! exemption_unit = "minutes"   # or "seconds"
//! tick_period_ms = 1000
//! urgent_threshold_secs = 15
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use fk_core::{FokusConfig, FokusError};

const APP_DIR: &str = "fokus";

/// `<data dir>/fokus/state.json`
pub fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
        .join("state.json")
}

/// `<config dir>/fokus/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join("config.toml"))
}

/// Load configuration. An explicit path must exist; the default path is
/// optional and falls back to built-in defaults.
pub fn load_config(explicit: Option<&Path>) -> Result<FokusConfig, String> {
    match explicit {
        Some(path) => read_config(path),
        None => match default_config_path() {
            Some(path) if path.exists() => read_config(&path),
            _ => Ok(FokusConfig::default()),
        },
    }
}

fn read_config(path: &Path) -> Result<FokusConfig, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read '{}': {}", path.display(), e))?;
    parse_config(&content).map_err(|e| format!("{}: {}", path.display(), e))
}

pub fn parse_config(text: &str) -> Result<FokusConfig, FokusError> {
    let config: FokusConfig = toml::from_str(text).map_err(|e| FokusError::Config(e.to_string()))?;
    config.validate()?;
    Ok(config)
}
