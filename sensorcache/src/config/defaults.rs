//! Default values and constants for all configuration settings.

use std::collections::BTreeSet;
use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::cache::DEFAULT_REFRESH_INTERVAL_SECS;
use crate::logging::default_log_file;

/// Default worker threads (0 = one per CPU).
pub const DEFAULT_THREADS: usize = 0;

/// Default snapshot file name inside the config directory.
pub const DEFAULT_SNAPSHOT_FILE: &str = "snapshot.json";

/// Default log directory inside the config directory.
pub fn default_log_directory() -> PathBuf {
    config_directory().join("logs")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            threads: DEFAULT_THREADS,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            deadline_secs: None,
            snapshot_file: Some(config_directory().join(DEFAULT_SNAPSHOT_FILE)),
            extra_srids: BTreeSet::new(),
            default_language: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: default_log_directory(),
            file: default_log_file().to_string(),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            cache: CacheConfig::default(),
            store: StoreConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
