//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::time::Duration;

use crate::model::Locale;
use crate::update::CacheSettings;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    pub cache: CacheConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

/// `[cache]`: rebuild and refresh behaviour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Worker threads per batch (0 = one per CPU)
    pub threads: usize,
    /// Seconds between scheduled rebuilds
    pub refresh_interval_secs: u64,
    /// Deadline for a whole rebuild in seconds; unset means no deadline
    pub deadline_secs: Option<u64>,
    /// Where the last published snapshot is persisted
    pub snapshot_file: Option<PathBuf>,
    /// Spatial reference codes advertised in addition to the store's
    pub extra_srids: BTreeSet<i32>,
    /// Language always advertised
    pub default_language: Option<Locale>,
}

/// `[store]`: backing store location.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    /// JSON dataset served by the in-memory store
    pub dataset: Option<PathBuf>,
}

/// `[logging]`: log file location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file: String,
}

impl ConfigFile {
    /// Engine settings derived from the `[cache]` section.
    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            threads: self.cache.threads,
            deadline: self.cache.deadline_secs.map(Duration::from_secs),
            extra_srids: self.cache.extra_srids.clone(),
            default_language: self.cache.default_language.clone(),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.cache.refresh_interval_secs)
    }
}
