//! Backing-store query facade.
//!
//! The cache engine only reads from the store, and it does so through a
//! per-unit or per-task [`StoreSession`]. A session is acquired from
//! [`CacheStore::open_session`] and released when it is dropped, so every
//! exit path of a task (success, error, panic unwinding) gives its session
//! back.

use std::collections::{BTreeSet, HashMap};

use super::error::StoreResult;
use crate::model::{
    Constellation, Envelope, FeatureRecord, Locale, ObservablePropertyRecord, ObservationType,
    OfferingRecord, OfferingTimeExtrema, ProcedureRecord, RelatedFeatureRecord,
    ResultTemplateRecord, TimeExtrema,
};

/// Source of store sessions.
///
/// Implementations must be shareable across the worker threads of a
/// rebuild; each worker opens its own session.
pub trait CacheStore: Send + Sync {
    /// Short name used in log output.
    fn name(&self) -> &str;

    /// Open a new read session.
    fn open_session(&self) -> StoreResult<Box<dyn StoreSession + '_>>;
}

/// A read-only session against the backing store.
///
/// Operations documented as "may be unsupported" return
/// [`StoreError::Unsupported`](super::StoreError::Unsupported) when the
/// store cannot answer them at all; callers fall back to another source.
pub trait StoreSession: Send {
    // =========================================================================
    // Entity listings
    // =========================================================================

    fn list_offerings(&mut self) -> StoreResult<Vec<OfferingRecord>>;

    fn list_procedures(&mut self) -> StoreResult<Vec<ProcedureRecord>>;

    fn list_observable_properties(&mut self) -> StoreResult<Vec<ObservablePropertyRecord>>;

    fn list_features_of_interest(&mut self) -> StoreResult<Vec<FeatureRecord>>;

    fn list_related_features(&mut self) -> StoreResult<Vec<RelatedFeatureRecord>>;

    fn list_result_templates(&mut self) -> StoreResult<Vec<ResultTemplateRecord>>;

    /// All known constellations. May be unsupported.
    fn list_constellations(&mut self) -> StoreResult<Vec<Constellation>>;

    // =========================================================================
    // Hierarchies
    // =========================================================================

    /// Child procedure → declared parent procedures.
    fn procedure_hierarchy(&mut self) -> StoreResult<HashMap<String, BTreeSet<String>>>;

    /// Composite observable property → direct child properties.
    fn observable_property_hierarchy(&mut self) -> StoreResult<HashMap<String, BTreeSet<String>>>;

    // =========================================================================
    // Temporal and spatial aggregates
    // =========================================================================

    /// Time extrema for the given offerings in one aggregate query.
    ///
    /// Offerings without observations are absent from the result.
    fn offering_time_extrema(
        &mut self,
        offerings: &[String],
    ) -> StoreResult<HashMap<String, OfferingTimeExtrema>>;

    /// Precomputed phenomenon-time extrema for every procedure. May be unsupported.
    fn procedure_time_extrema(&mut self) -> StoreResult<HashMap<String, TimeExtrema>>;

    /// Phenomenon-time extrema computed from the procedure's series. May be unsupported.
    fn series_time_extrema(&mut self, procedure: &str) -> StoreResult<TimeExtrema>;

    /// Phenomenon-time extrema from a direct min/max scan over observations.
    fn scan_time_extrema(&mut self, procedure: &str) -> StoreResult<TimeExtrema>;

    /// Envelope of the given features' geometries; `None` if none has a geometry.
    fn envelope_for_features(&mut self, features: &[String]) -> StoreResult<Option<Envelope>>;

    // =========================================================================
    // Service-wide settings
    // =========================================================================

    fn supported_spatial_reference_code(&mut self) -> StoreResult<i32>;

    fn available_locales(&mut self) -> StoreResult<BTreeSet<Locale>>;

    // =========================================================================
    // Direct relationship queries (used when constellations are unavailable)
    // =========================================================================

    fn offerings_for_procedure(&mut self, procedure: &str) -> StoreResult<BTreeSet<String>>;

    fn observable_properties_for_procedure(&mut self, procedure: &str)
        -> StoreResult<BTreeSet<String>>;

    fn procedures_for_offering(&mut self, offering: &str) -> StoreResult<BTreeSet<String>>;

    fn observable_properties_for_offering(&mut self, offering: &str)
        -> StoreResult<BTreeSet<String>>;

    fn offerings_for_observable_property(&mut self, property: &str)
        -> StoreResult<BTreeSet<String>>;

    fn procedures_for_observable_property(&mut self, property: &str)
        -> StoreResult<BTreeSet<String>>;

    fn features_for_offering(&mut self, offering: &str) -> StoreResult<BTreeSet<String>>;

    /// Whether the offering holds at least one observation of the given type.
    fn has_observations_of_type(
        &mut self,
        offering: &str,
        observation_type: ObservationType,
    ) -> StoreResult<bool>;
}
