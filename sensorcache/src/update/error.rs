//! Errors collected while rebuilding the cache.
//!
//! A rebuild never aborts on the first failure. Every unit and task returns
//! the errors it hit and the orchestrator hands the full list back to the
//! caller together with the completed snapshot.

use thiserror::Error;

use crate::store::StoreError;

/// Inconsistency found in the store's data.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Anomaly {
    /// A hierarchy contains a cycle reachable from the entity.
    #[error("hierarchy cycle")]
    Cycle,
    /// A geometry or envelope has non-finite coordinates.
    #[error("malformed geometry")]
    MalformedGeometry,
    /// The entity references an id that has no top-level entry.
    #[error("unknown {kind} '{id}'")]
    UnknownReference { kind: &'static str, id: String },
    /// The store returned time extrema with `min > max`.
    #[error("time extrema with min after max")]
    InvertedTimeExtrema,
    /// The store returned a record without a required value.
    #[error("missing {0}")]
    MissingValue(String),
}

/// An error recorded during a rebuild.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheUpdateError {
    /// A store query failed.
    #[error("{unit}{}: {source}", entity_suffix(.entity))]
    Query {
        unit: String,
        entity: Option<String>,
        #[source]
        source: StoreError,
    },

    /// The store's data is inconsistent.
    #[error("{unit} '{entity}': {anomaly}")]
    DataAnomaly {
        unit: String,
        entity: String,
        anomaly: Anomaly,
    },

    /// A task panicked; its siblings were unaffected.
    #[error("task {task} panicked: {message}")]
    TaskPanicked { task: String, message: String },

    /// A task was not started before the rebuild deadline.
    #[error("task {task} skipped: rebuild deadline exceeded")]
    DeadlineExceeded { task: String },
}

fn entity_suffix(entity: &Option<String>) -> String {
    match entity {
        Some(id) => format!(" '{}'", id),
        None => String::new(),
    }
}

impl CacheUpdateError {
    /// Store query failure for a whole unit.
    pub fn query(unit: impl Into<String>, source: StoreError) -> Self {
        Self::Query {
            unit: unit.into(),
            entity: None,
            source,
        }
    }

    /// Store query failure while working on one entity.
    pub fn entity_query(unit: impl Into<String>, entity: impl Into<String>, source: StoreError) -> Self {
        Self::Query {
            unit: unit.into(),
            entity: Some(entity.into()),
            source,
        }
    }

    pub fn anomaly(unit: impl Into<String>, entity: impl Into<String>, anomaly: Anomaly) -> Self {
        Self::DataAnomaly {
            unit: unit.into(),
            entity: entity.into(),
            anomaly,
        }
    }

    pub fn is_query_failure(&self) -> bool {
        matches!(self, Self::Query { .. })
    }

    pub fn is_anomaly(&self) -> bool {
        matches!(self, Self::DataAnomaly { .. })
    }

    /// Entity the error concerns, if any.
    pub fn entity(&self) -> Option<&str> {
        match self {
            Self::Query { entity, .. } => entity.as_deref(),
            Self::DataAnomaly { entity, .. } => Some(entity),
            Self::TaskPanicked { .. } | Self::DeadlineExceeded { .. } => None,
        }
    }
}
