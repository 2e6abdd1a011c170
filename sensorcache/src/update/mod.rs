//! Cache construction engine.
//!
//! [`CacheRebuild`] drives the update units in barrier-separated stages and
//! returns the finished [`ContentCache`](crate::cache::ContentCache)
//! together with every error that occurred.

pub mod constellation;
pub mod envelope;
pub mod error;
pub mod hierarchy;
pub mod orchestrator;
pub mod runner;
pub mod settings;
pub mod units;

pub use constellation::ConstellationIndex;
pub use error::{Anomaly, CacheUpdateError};
pub use orchestrator::{CacheRebuild, RebuildOutcome, RebuildReport, RebuildScope};
pub use runner::{CacheTask, TaskRunner};
pub use settings::CacheSettings;
