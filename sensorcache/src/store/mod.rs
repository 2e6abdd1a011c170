//! Backing-store facade and the in-memory dataset store.
//!
//! The engine reads exclusively through [`CacheStore`] and [`StoreSession`].
//! [`MemoryStore`] answers every query from a [`Dataset`] and is used by the
//! CLI and the tests.

mod dataset;
mod error;
mod memory;
mod r#trait;

pub use dataset::{Dataset, DatasetError, DatasetFeature, ObservationRecord};
pub use error::{StoreError, StoreResult};
pub use memory::{MemoryStore, StoreCapabilities, StoreOperation};
pub use r#trait::{CacheStore, StoreSession};
