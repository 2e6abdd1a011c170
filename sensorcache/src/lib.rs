//! SensorCache - capabilities metadata cache for sensor observation services
//!
//! This library rebuilds, from a backing store, a complete in-memory
//! snapshot of service metadata (offerings, procedures, observable
//! properties, features of interest, hierarchies, envelopes, time extrema,
//! localized names) and publishes it atomically so requests are answered
//! without touching the store.
//!
//! # High-Level API
//!
//! ```
//! use std::sync::Arc;
//! use sensorcache::cache::CacheController;
//! use sensorcache::model::{OfferingRecord, ProcedureRecord};
//! use sensorcache::store::{Dataset, MemoryStore};
//! use sensorcache::update::CacheSettings;
//!
//! let store = MemoryStore::new(
//!     Dataset::new()
//!         .with_offering(OfferingRecord::new("http://example.org/offering/air"))
//!         .with_procedure(ProcedureRecord::new("P1")),
//! );
//! let controller = CacheController::new(Arc::new(store), CacheSettings::default());
//!
//! let errors = controller.trigger_full_rebuild(2);
//! assert!(errors.is_empty());
//!
//! let cache = controller.snapshot();
//! assert_eq!(
//!     cache.human_readable_name("http://example.org/offering/air"),
//!     Some("air")
//! );
//! ```

pub mod cache;
pub mod config;
pub mod logging;
pub mod model;
pub mod store;
pub mod update;

/// Version of the SensorCache library and CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
