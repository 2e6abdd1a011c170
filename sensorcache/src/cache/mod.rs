//! Published content cache and its lifecycle.
//!
//! Provides the immutable [`ContentCache`] snapshot, the concurrent
//! [`CacheBuilder`] filled during a rebuild, the [`CacheController`] that
//! publishes snapshots atomically, the scheduled [`CacheRefreshDaemon`] and
//! JSON snapshot persistence.

mod builder;
mod content;
mod controller;
mod daemon;
mod persist;

pub use builder::CacheBuilder;
pub use content::{
    CacheCounts, ContentCache, FeatureOfInterestEntry, ObservablePropertyEntry, OfferingEntry,
    ProcedureEntry, ResultTemplateEntry,
};
pub use controller::CacheController;
pub use daemon::{CacheRefreshDaemon, DEFAULT_REFRESH_INTERVAL_SECS};
pub use persist::{load_snapshot, save_snapshot, PersistError};
