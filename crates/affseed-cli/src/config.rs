use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use affseed_core::MemoryConfig;

use crate::CliError;

pub const DEFAULT_SETTINGS_FILE: &str = "affseed.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Fixed seed for reproducible runs.
    pub seed: Option<u64>,
    pub log_dir: PathBuf,
    /// Event log files older than this many days are purged on every run.
    pub log_retention_days: i64,
    /// Sandbox host state, loaded before and saved after each run.
    pub state: Option<PathBuf>,
    pub host: MemoryConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            seed: None,
            log_dir: PathBuf::from("affseed-logs"),
            log_retention_days: 30,
            state: None,
            host: MemoryConfig::default(),
        }
    }
}

/// Load settings from `path`, or from `affseed.toml` when it exists.
///
/// An explicit path must exist; the default file is optional.
pub fn load_settings(path: Option<&Path>) -> Result<Settings, CliError> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let fallback = PathBuf::from(DEFAULT_SETTINGS_FILE);
            if !fallback.exists() {
                return Ok(Settings::default());
            }
            fallback
        }
    };

    let content = std::fs::read_to_string(&path)?;
    let settings: Settings = toml::from_str(&content)?;
    Ok(settings)
}
