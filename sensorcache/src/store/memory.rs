//! In-memory store implementation.
//!
//! [`MemoryStore`] answers every facade query from a [`Dataset`]. It can
//! emulate degraded stores (no constellation records, no precomputed
//! extrema, no series) and inject failures per operation and entity, which
//! makes it the workhorse of the engine's tests. Operations can be slowed
//! down to emulate a sluggish backend. It also counts open sessions so
//! callers can verify that every session was released.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use geo::BoundingRect;
use parking_lot::{Mutex, RwLock};

use super::dataset::Dataset;
use super::error::{StoreError, StoreResult};
use super::r#trait::{CacheStore, StoreSession};
use crate::model::{
    Constellation, Envelope, FeatureRecord, Locale, ObservablePropertyRecord, ObservationType,
    OfferingRecord, OfferingTimeExtrema, ProcedureRecord, RelatedFeatureRecord,
    ResultTemplateRecord, TimeExtrema, DEFAULT_SRID,
};

/// Store operations, used to target injected failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    OpenSession,
    ListOfferings,
    ListProcedures,
    ListObservableProperties,
    ListFeaturesOfInterest,
    ListRelatedFeatures,
    ListResultTemplates,
    ListConstellations,
    ProcedureHierarchy,
    ObservablePropertyHierarchy,
    OfferingTimeExtrema,
    ProcedureTimeExtrema,
    SeriesTimeExtrema,
    ScanTimeExtrema,
    EnvelopeForFeatures,
    SupportedSpatialReferenceCode,
    AvailableLocales,
    OfferingsForProcedure,
    ObservablePropertiesForProcedure,
    ProceduresForOffering,
    ObservablePropertiesForOffering,
    OfferingsForObservableProperty,
    ProceduresForObservableProperty,
    FeaturesForOffering,
    HasObservationsOfType,
}

impl StoreOperation {
    fn name(&self) -> &'static str {
        match self {
            Self::OpenSession => "open_session",
            Self::ListOfferings => "list_offerings",
            Self::ListProcedures => "list_procedures",
            Self::ListObservableProperties => "list_observable_properties",
            Self::ListFeaturesOfInterest => "list_features_of_interest",
            Self::ListRelatedFeatures => "list_related_features",
            Self::ListResultTemplates => "list_result_templates",
            Self::ListConstellations => "list_constellations",
            Self::ProcedureHierarchy => "procedure_hierarchy",
            Self::ObservablePropertyHierarchy => "observable_property_hierarchy",
            Self::OfferingTimeExtrema => "offering_time_extrema",
            Self::ProcedureTimeExtrema => "procedure_time_extrema",
            Self::SeriesTimeExtrema => "series_time_extrema",
            Self::ScanTimeExtrema => "scan_time_extrema",
            Self::EnvelopeForFeatures => "envelope_for_features",
            Self::SupportedSpatialReferenceCode => "supported_spatial_reference_code",
            Self::AvailableLocales => "available_locales",
            Self::OfferingsForProcedure => "offerings_for_procedure",
            Self::ObservablePropertiesForProcedure => "observable_properties_for_procedure",
            Self::ProceduresForOffering => "procedures_for_offering",
            Self::ObservablePropertiesForOffering => "observable_properties_for_offering",
            Self::OfferingsForObservableProperty => "offerings_for_observable_property",
            Self::ProceduresForObservableProperty => "procedures_for_observable_property",
            Self::FeaturesForOffering => "features_for_offering",
            Self::HasObservationsOfType => "has_observations_of_type",
        }
    }
}

/// Optional query families a store may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreCapabilities {
    /// `list_constellations` is answered.
    pub constellations: bool,
    /// `procedure_time_extrema` (bulk table) is answered.
    pub procedure_extrema_table: bool,
    /// `series_time_extrema` is answered.
    pub series: bool,
}

impl Default for StoreCapabilities {
    fn default() -> Self {
        Self {
            constellations: true,
            procedure_extrema_table: true,
            series: true,
        }
    }
}

impl StoreCapabilities {
    /// A store that answers only the mandatory queries.
    pub fn minimal() -> Self {
        Self {
            constellations: false,
            procedure_extrema_table: false,
            series: false,
        }
    }
}

#[derive(Debug, Clone)]
struct InjectedFailure {
    operation: StoreOperation,
    entity: Option<String>,
}

/// Store backed by an in-memory [`Dataset`].
pub struct MemoryStore {
    name: String,
    dataset: RwLock<Dataset>,
    capabilities: StoreCapabilities,
    failures: Mutex<Vec<InjectedFailure>>,
    delays: Mutex<HashMap<StoreOperation, Duration>>,
    open_sessions: AtomicUsize,
    sessions_opened: AtomicUsize,
    empty_envelope_queries: AtomicUsize,
    type_probes: AtomicUsize,
}

impl MemoryStore {
    pub fn new(dataset: Dataset) -> Self {
        Self {
            name: "memory".to_string(),
            dataset: RwLock::new(dataset),
            capabilities: StoreCapabilities::default(),
            failures: Mutex::new(Vec::new()),
            delays: Mutex::new(HashMap::new()),
            open_sessions: AtomicUsize::new(0),
            sessions_opened: AtomicUsize::new(0),
            empty_envelope_queries: AtomicUsize::new(0),
            type_probes: AtomicUsize::new(0),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_capabilities(mut self, capabilities: StoreCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Make `operation` fail, for one entity or (with `None`) for all calls.
    pub fn fail(&self, operation: StoreOperation, entity: Option<&str>) {
        self.failures.lock().push(InjectedFailure {
            operation,
            entity: entity.map(str::to_string),
        });
    }

    /// Sleep for `by` before answering every call of `operation`.
    pub fn delay(&self, operation: StoreOperation, by: Duration) {
        self.delays.lock().insert(operation, by);
    }

    /// Remove all injected failures.
    pub fn clear_failures(&self) {
        self.failures.lock().clear();
    }

    /// Modify the dataset in place (simulates writes between rebuilds).
    pub fn update_dataset(&self, f: impl FnOnce(&mut Dataset)) {
        f(&mut self.dataset.write());
    }

    /// Sessions currently open.
    pub fn open_sessions(&self) -> usize {
        self.open_sessions.load(Ordering::SeqCst)
    }

    /// Sessions opened since creation.
    pub fn sessions_opened(&self) -> usize {
        self.sessions_opened.load(Ordering::SeqCst)
    }

    /// Number of envelope queries issued with an empty feature list.
    pub fn empty_envelope_queries(&self) -> usize {
        self.empty_envelope_queries.load(Ordering::SeqCst)
    }

    /// Number of per-type observation probes answered.
    pub fn type_probes(&self) -> usize {
        self.type_probes.load(Ordering::SeqCst)
    }

    fn check(&self, operation: StoreOperation, entity: Option<&str>) -> StoreResult<()> {
        let delay = self.delays.lock().get(&operation).copied();
        if let Some(delay) = delay {
            thread::sleep(delay);
        }

        let failures = self.failures.lock();
        let hit = failures.iter().any(|f| {
            f.operation == operation
                && match (&f.entity, entity) {
                    (None, _) => true,
                    (Some(target), Some(actual)) => target == actual,
                    (Some(_), None) => false,
                }
        });
        if hit {
            Err(StoreError::query(operation.name(), "injected failure"))
        } else {
            Ok(())
        }
    }
}

impl CacheStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn open_session(&self) -> StoreResult<Box<dyn StoreSession + '_>> {
        if self.check(StoreOperation::OpenSession, None).is_err() {
            return Err(StoreError::Connection("injected connection failure".into()));
        }
        self.open_sessions.fetch_add(1, Ordering::SeqCst);
        self.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession { store: self }))
    }
}

/// Session handed out by [`MemoryStore`]; releases its slot on drop.
struct MemorySession<'a> {
    store: &'a MemoryStore,
}

impl Drop for MemorySession<'_> {
    fn drop(&mut self) {
        self.store.open_sessions.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MemorySession<'_> {
    fn guarded<T>(
        &self,
        operation: StoreOperation,
        entity: Option<&str>,
        f: impl FnOnce(&Dataset) -> T,
    ) -> StoreResult<T> {
        self.store.check(operation, entity)?;
        let dataset = self.store.dataset.read();
        Ok(f(&dataset))
    }

    fn constellation_query(
        &self,
        operation: StoreOperation,
        entity: &str,
        select: impl Fn(&Constellation) -> Option<String>,
    ) -> StoreResult<BTreeSet<String>> {
        self.guarded(operation, Some(entity), |d| {
            d.all_constellations().iter().filter_map(&select).collect()
        })
    }

    fn extrema_for(dataset: &Dataset, procedure: &str) -> TimeExtrema {
        dataset
            .observations
            .iter()
            .filter(|o| o.procedure == procedure)
            .fold(TimeExtrema::default(), |acc, o| {
                acc.merge(&TimeExtrema::new(o.phenomenon_time_start, o.phenomenon_end()))
            })
    }
}

impl StoreSession for MemorySession<'_> {
    fn list_offerings(&mut self) -> StoreResult<Vec<OfferingRecord>> {
        self.guarded(StoreOperation::ListOfferings, None, |d| d.offerings.clone())
    }

    fn list_procedures(&mut self) -> StoreResult<Vec<ProcedureRecord>> {
        self.guarded(StoreOperation::ListProcedures, None, |d| d.procedures.clone())
    }

    fn list_observable_properties(&mut self) -> StoreResult<Vec<ObservablePropertyRecord>> {
        self.guarded(StoreOperation::ListObservableProperties, None, |d| {
            d.observable_properties.clone()
        })
    }

    fn list_features_of_interest(&mut self) -> StoreResult<Vec<FeatureRecord>> {
        self.guarded(StoreOperation::ListFeaturesOfInterest, None, |d| {
            d.features.iter().map(|f| f.record.clone()).collect()
        })
    }

    fn list_related_features(&mut self) -> StoreResult<Vec<RelatedFeatureRecord>> {
        self.guarded(StoreOperation::ListRelatedFeatures, None, |d| {
            d.related_features.clone()
        })
    }

    fn list_result_templates(&mut self) -> StoreResult<Vec<ResultTemplateRecord>> {
        self.guarded(StoreOperation::ListResultTemplates, None, |d| {
            d.result_templates.clone()
        })
    }

    fn list_constellations(&mut self) -> StoreResult<Vec<Constellation>> {
        if !self.store.capabilities.constellations {
            return Err(StoreError::Unsupported("list_constellations"));
        }
        self.guarded(StoreOperation::ListConstellations, None, |d| {
            d.all_constellations().into_iter().collect()
        })
    }

    fn procedure_hierarchy(&mut self) -> StoreResult<HashMap<String, BTreeSet<String>>> {
        self.guarded(StoreOperation::ProcedureHierarchy, None, |d| {
            d.procedure_parents
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
    }

    fn observable_property_hierarchy(&mut self) -> StoreResult<HashMap<String, BTreeSet<String>>> {
        self.guarded(StoreOperation::ObservablePropertyHierarchy, None, |d| {
            d.property_children
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
    }

    fn offering_time_extrema(
        &mut self,
        offerings: &[String],
    ) -> StoreResult<HashMap<String, OfferingTimeExtrema>> {
        self.guarded(StoreOperation::OfferingTimeExtrema, None, |d| {
            let wanted: BTreeSet<&str> = offerings.iter().map(String::as_str).collect();
            let mut result: HashMap<String, OfferingTimeExtrema> = HashMap::new();
            for o in d.observations.iter().filter(|o| wanted.contains(o.offering.as_str())) {
                let entry = result.entry(o.offering.clone()).or_default();
                entry.phenomenon_time = entry
                    .phenomenon_time
                    .merge(&TimeExtrema::new(o.phenomenon_time_start, o.phenomenon_end()));
                entry.result_time.include(o.result_time());
            }
            result
        })
    }

    fn procedure_time_extrema(&mut self) -> StoreResult<HashMap<String, TimeExtrema>> {
        if !self.store.capabilities.procedure_extrema_table {
            return Err(StoreError::Unsupported("procedure_time_extrema"));
        }
        self.guarded(StoreOperation::ProcedureTimeExtrema, None, |d| {
            let procedures: BTreeSet<&str> =
                d.observations.iter().map(|o| o.procedure.as_str()).collect();
            procedures
                .into_iter()
                .map(|p| (p.to_string(), Self::extrema_for(d, p)))
                .collect()
        })
    }

    fn series_time_extrema(&mut self, procedure: &str) -> StoreResult<TimeExtrema> {
        if !self.store.capabilities.series {
            return Err(StoreError::Unsupported("series_time_extrema"));
        }
        self.guarded(StoreOperation::SeriesTimeExtrema, Some(procedure), |d| {
            Self::extrema_for(d, procedure)
        })
    }

    fn scan_time_extrema(&mut self, procedure: &str) -> StoreResult<TimeExtrema> {
        self.guarded(StoreOperation::ScanTimeExtrema, Some(procedure), |d| {
            Self::extrema_for(d, procedure)
        })
    }

    fn envelope_for_features(&mut self, features: &[String]) -> StoreResult<Option<Envelope>> {
        if features.is_empty() {
            self.store.empty_envelope_queries.fetch_add(1, Ordering::SeqCst);
        }
        self.store.check(StoreOperation::EnvelopeForFeatures, None)?;
        for feature in features {
            self.store
                .check(StoreOperation::EnvelopeForFeatures, Some(feature))?;
        }
        let dataset = self.store.dataset.read();
        let srid = dataset.srid.unwrap_or(DEFAULT_SRID);
        let wanted: BTreeSet<&str> = features.iter().map(String::as_str).collect();
        let envelopes: Vec<Envelope> = dataset
            .features
            .iter()
            .filter(|f| wanted.contains(f.record.id.as_str()))
            .filter_map(|f| f.geometry.as_ref())
            .filter_map(|g| g.bounding_rect())
            .map(|rect| Envelope::from_rect(srid, rect))
            .collect();
        Ok(Envelope::union_all(&envelopes))
    }

    fn supported_spatial_reference_code(&mut self) -> StoreResult<i32> {
        self.guarded(StoreOperation::SupportedSpatialReferenceCode, None, |d| {
            d.srid.unwrap_or(DEFAULT_SRID)
        })
    }

    fn available_locales(&mut self) -> StoreResult<BTreeSet<Locale>> {
        self.guarded(StoreOperation::AvailableLocales, None, |d| d.locales.clone())
    }

    fn offerings_for_procedure(&mut self, procedure: &str) -> StoreResult<BTreeSet<String>> {
        self.constellation_query(StoreOperation::OfferingsForProcedure, procedure, |c| {
            (c.procedure == procedure).then(|| c.offering.clone())
        })
    }

    fn observable_properties_for_procedure(
        &mut self,
        procedure: &str,
    ) -> StoreResult<BTreeSet<String>> {
        self.constellation_query(
            StoreOperation::ObservablePropertiesForProcedure,
            procedure,
            |c| (c.procedure == procedure).then(|| c.observable_property.clone()),
        )
    }

    fn procedures_for_offering(&mut self, offering: &str) -> StoreResult<BTreeSet<String>> {
        self.constellation_query(StoreOperation::ProceduresForOffering, offering, |c| {
            (c.offering == offering).then(|| c.procedure.clone())
        })
    }

    fn observable_properties_for_offering(
        &mut self,
        offering: &str,
    ) -> StoreResult<BTreeSet<String>> {
        self.constellation_query(
            StoreOperation::ObservablePropertiesForOffering,
            offering,
            |c| (c.offering == offering).then(|| c.observable_property.clone()),
        )
    }

    fn offerings_for_observable_property(
        &mut self,
        property: &str,
    ) -> StoreResult<BTreeSet<String>> {
        self.constellation_query(
            StoreOperation::OfferingsForObservableProperty,
            property,
            |c| (c.observable_property == property).then(|| c.offering.clone()),
        )
    }

    fn procedures_for_observable_property(
        &mut self,
        property: &str,
    ) -> StoreResult<BTreeSet<String>> {
        self.constellation_query(
            StoreOperation::ProceduresForObservableProperty,
            property,
            |c| (c.observable_property == property).then(|| c.procedure.clone()),
        )
    }

    fn features_for_offering(&mut self, offering: &str) -> StoreResult<BTreeSet<String>> {
        self.guarded(StoreOperation::FeaturesForOffering, Some(offering), |d| {
            d.observations
                .iter()
                .filter(|o| o.offering == offering)
                .map(|o| o.feature_of_interest.clone())
                .collect()
        })
    }

    fn has_observations_of_type(
        &mut self,
        offering: &str,
        observation_type: ObservationType,
    ) -> StoreResult<bool> {
        self.store.type_probes.fetch_add(1, Ordering::SeqCst);
        self.guarded(StoreOperation::HasObservationsOfType, Some(offering), |d| {
            d.observations
                .iter()
                .any(|o| o.offering == offering && o.observation_type == observation_type)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use geo_types::{point, Geometry};

    fn sample() -> Dataset {
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        Dataset::new()
            .with_offering(OfferingRecord::new("O1"))
            .with_procedure(ProcedureRecord::new("P1"))
            .with_feature(
                FeatureRecord::new("F1"),
                Some(Geometry::Point(point! { x: 7.0, y: 52.0 })),
            )
            .with_feature(
                FeatureRecord::new("F2"),
                Some(Geometry::Point(point! { x: 8.0, y: 51.0 })),
            )
            .observe("P1", "temp", "O1", "F1", ObservationType::Numeric, t1)
            .observe("P1", "temp", "O1", "F2", ObservationType::Count, t2)
    }

    #[test]
    fn test_sessions_are_counted_and_released() {
        let store = MemoryStore::new(sample());
        {
            let _a = store.open_session().unwrap();
            let _b = store.open_session().unwrap();
            assert_eq!(store.open_sessions(), 2);
        }
        assert_eq!(store.open_sessions(), 0);
        assert_eq!(store.sessions_opened(), 2);
    }

    #[test]
    fn test_constellations_unsupported() {
        let store =
            MemoryStore::new(sample()).with_capabilities(StoreCapabilities::minimal());
        let mut session = store.open_session().unwrap();

        let err = session.list_constellations().unwrap_err();
        assert!(err.is_unsupported());
        assert!(session.procedure_time_extrema().unwrap_err().is_unsupported());
        assert!(session.series_time_extrema("P1").unwrap_err().is_unsupported());
        assert!(session.scan_time_extrema("P1").is_ok());
    }

    #[test]
    fn test_injected_failure_targets_entity() {
        let store = MemoryStore::new(sample());
        store.fail(StoreOperation::ScanTimeExtrema, Some("P2"));
        let mut session = store.open_session().unwrap();

        assert!(session.scan_time_extrema("P1").is_ok());
        assert!(session.scan_time_extrema("P2").is_err());
    }

    #[test]
    fn test_delayed_operation_still_answers() {
        let store = MemoryStore::new(sample());
        store.delay(StoreOperation::ListOfferings, Duration::from_millis(20));
        let mut session = store.open_session().unwrap();

        let started = std::time::Instant::now();
        assert_eq!(session.list_offerings().unwrap().len(), 1);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_open_session_failure() {
        let store = MemoryStore::new(sample());
        store.fail(StoreOperation::OpenSession, None);

        assert!(matches!(
            store.open_session().err(),
            Some(StoreError::Connection(_))
        ));
        assert_eq!(store.open_sessions(), 0);
    }

    #[test]
    fn test_envelope_union_of_feature_points() {
        let store = MemoryStore::new(sample());
        let mut session = store.open_session().unwrap();

        let env = session
            .envelope_for_features(&["F1".to_string(), "F2".to_string()])
            .unwrap()
            .unwrap();
        assert_eq!(env, Envelope::new(DEFAULT_SRID, 7.0, 51.0, 8.0, 52.0));
        assert_eq!(store.empty_envelope_queries(), 0);
    }

    #[test]
    fn test_offering_time_extrema() {
        let store = MemoryStore::new(sample());
        let mut session = store.open_session().unwrap();

        let extrema = session.offering_time_extrema(&["O1".to_string()]).unwrap();
        let o1 = extrema.get("O1").unwrap();
        assert_eq!(
            o1.phenomenon_time.min,
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(
            o1.phenomenon_time.max,
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(o1.result_time, o1.phenomenon_time);
    }

    #[test]
    fn test_type_probe() {
        let store = MemoryStore::new(sample());
        let mut session = store.open_session().unwrap();

        assert!(session
            .has_observations_of_type("O1", ObservationType::Count)
            .unwrap());
        assert!(!session
            .has_observations_of_type("O1", ObservationType::Text)
            .unwrap());
        assert_eq!(store.type_probes(), 2);
    }
}
