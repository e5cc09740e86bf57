//! Optional CLI-wide defaults, loaded from `--config <path>` if given.
//! Distinct from a network file's own `[settings]` table: this is about the
//! CLI's own behavior (log level, default thread counts), not a specific
//! training run.

use std::path::Path;
use serde::{Deserialize, Serialize};

use crate::error::{CliError, CliResult};

/// CLI-wide configuration, independent of any particular network file.
#[derive(Debug, Serialize, Deserialize)]
pub struct CliConfig {
    /// `env_logger` filter string used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Default solve/processing thread counts for commands that don't
    /// specify `[settings]` in their network file
    #[serde(default)]
    pub default_threads: Option<usize>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            default_threads: None,
        }
    }
}

impl CliConfig {
    /// Load configuration from `path`, falling back to defaults if the file
    /// does not exist.
    pub fn load_from_file(path: &Path) -> CliResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| CliError::config(format!("invalid config file: {e}")))
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_has_info_log_level() {
        let config = CliConfig::default();
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_missing_file_falls_back_to_default() {
        let config = CliConfig::load_from_file(Path::new("/nonexistent/rafko.toml")).unwrap();
        assert_eq!(config.log_level, "info");
    }
}
