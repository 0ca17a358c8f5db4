//! Run configuration.
//!
//! Everything the pipeline needs is carried in an explicit `EtlConfig`
//! passed to the warehouse and the driver; there are no module-level
//! connection globals. Values resolve CLI flag > config file > default.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_DB_PATH: &str = "playvault.db";
pub const DEFAULT_SONG_DATA_DIR: &str = "data/song_data";
pub const DEFAULT_LOG_DATA_DIR: &str = "data/log_data";

/// Optional TOML overlay; every field may be omitted.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    pub db_path: Option<String>,
    pub song_data_dir: Option<String>,
    pub log_data_dir: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

/// Resolved configuration for one pipeline run.
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub db_path: PathBuf,
    pub song_data_dir: PathBuf,
    pub log_data_dir: PathBuf,
}

impl EtlConfig {
    pub fn resolve(
        db_path: Option<PathBuf>,
        song_data_dir: Option<PathBuf>,
        log_data_dir: Option<PathBuf>,
        file_config: FileConfig,
    ) -> EtlConfig {
        EtlConfig {
            db_path: db_path
                .or(file_config.db_path.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            song_data_dir: song_data_dir
                .or(file_config.song_data_dir.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SONG_DATA_DIR)),
            log_data_dir: log_data_dir
                .or(file_config.log_data_dir.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DATA_DIR)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_nothing_is_given() {
        let config = EtlConfig::resolve(None, None, None, FileConfig::default());
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.song_data_dir, PathBuf::from(DEFAULT_SONG_DATA_DIR));
        assert_eq!(config.log_data_dir, PathBuf::from(DEFAULT_LOG_DATA_DIR));
    }

    #[test]
    fn cli_overrides_file_config_overrides_defaults() {
        let file_config = FileConfig {
            db_path: Some("/var/lib/warehouse.db".to_string()),
            song_data_dir: Some("/srv/songs".to_string()),
            log_data_dir: None,
        };
        let config = EtlConfig::resolve(
            Some(PathBuf::from("/tmp/cli.db")),
            None,
            None,
            file_config,
        );
        assert_eq!(config.db_path, PathBuf::from("/tmp/cli.db"));
        assert_eq!(config.song_data_dir, PathBuf::from("/srv/songs"));
        assert_eq!(config.log_data_dir, PathBuf::from(DEFAULT_LOG_DATA_DIR));
    }

    #[test]
    fn file_config_parses_partial_toml() {
        let parsed: FileConfig = toml::from_str("song_data_dir = \"/data/songs\"").unwrap();
        assert_eq!(parsed.song_data_dir.as_deref(), Some("/data/songs"));
        assert_eq!(parsed.db_path, None);
    }
}
