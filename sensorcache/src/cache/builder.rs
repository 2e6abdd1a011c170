//! In-progress cache build target.
//!
//! A [`CacheBuilder`] is created fresh for every rebuild (or seeded from
//! the previous snapshot for a partial rebuild) and shared by reference
//! between all units and tasks of that rebuild. Each task writes only the
//! keys of its own entity, so the maps only need synchronized top-level
//! operations.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;
use dashmap::DashMap;
use parking_lot::Mutex;

use super::content::{
    ContentCache, FeatureOfInterestEntry, ObservablePropertyEntry, OfferingEntry,
    ProcedureEntry, ResultTemplateEntry,
};
use crate::model::{Envelope, Locale};

#[derive(Debug, Default)]
pub struct CacheBuilder {
    offerings: DashMap<String, OfferingEntry>,
    procedures: DashMap<String, ProcedureEntry>,
    observable_properties: DashMap<String, ObservablePropertyEntry>,
    features_of_interest: DashMap<String, FeatureOfInterestEntry>,
    result_templates: DashMap<String, ResultTemplateEntry>,
    related_feature_roles: DashMap<String, BTreeSet<String>>,
    supported_languages: Mutex<BTreeSet<Locale>>,
    supported_spatial_reference_codes: Mutex<BTreeSet<i32>>,
    default_spatial_reference_code: Mutex<Option<i32>>,
    published_procedures: Mutex<BTreeSet<String>>,
    global_envelope: Mutex<Option<Envelope>>,
    // Offering → related features, read by offering tasks; not published.
    offering_related_features: DashMap<String, BTreeSet<String>>,
}

fn to_dashmap<V: Clone>(map: &BTreeMap<String, V>) -> DashMap<String, V> {
    map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

fn to_btreemap<V>(map: DashMap<String, V>) -> BTreeMap<String, V> {
    map.into_iter().collect()
}

impl CacheBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pre-populated with the content of an existing snapshot.
    pub fn from_snapshot(cache: &ContentCache) -> Self {
        Self {
            offerings: to_dashmap(&cache.offerings),
            procedures: to_dashmap(&cache.procedures),
            observable_properties: to_dashmap(&cache.observable_properties),
            features_of_interest: to_dashmap(&cache.features_of_interest),
            result_templates: to_dashmap(&cache.result_templates),
            related_feature_roles: to_dashmap(&cache.related_feature_roles),
            supported_languages: Mutex::new(cache.supported_languages.clone()),
            supported_spatial_reference_codes: Mutex::new(
                cache.supported_spatial_reference_codes.clone(),
            ),
            default_spatial_reference_code: Mutex::new(cache.default_spatial_reference_code),
            published_procedures: Mutex::new(cache.published_procedures.clone()),
            global_envelope: Mutex::new(cache.global_envelope),
            offering_related_features: DashMap::new(),
        }
    }

    // =========================================================================
    // Entity maps
    // =========================================================================

    pub fn insert_offering(&self, entry: OfferingEntry) {
        self.offerings.insert(entry.id.clone(), entry);
    }

    pub fn insert_procedure(&self, entry: ProcedureEntry) {
        self.procedures.insert(entry.id.clone(), entry);
    }

    pub fn insert_observable_property(&self, entry: ObservablePropertyEntry) {
        self.observable_properties.insert(entry.id.clone(), entry);
    }

    pub fn insert_feature_of_interest(&self, entry: FeatureOfInterestEntry) {
        self.features_of_interest.insert(entry.id.clone(), entry);
    }

    pub fn insert_result_template(&self, entry: ResultTemplateEntry) {
        self.result_templates.insert(entry.id.clone(), entry);
    }

    pub fn set_related_feature_roles(&self, feature: &str, roles: BTreeSet<String>) {
        self.related_feature_roles.insert(feature.to_string(), roles);
    }

    pub fn add_offering_related_feature(&self, offering: &str, feature: &str) {
        self.offering_related_features
            .entry(offering.to_string())
            .or_default()
            .insert(feature.to_string());
    }

    pub fn related_features_for_offering(&self, offering: &str) -> BTreeSet<String> {
        self.offering_related_features
            .get(offering)
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    pub fn offering(&self, id: &str) -> Option<OfferingEntry> {
        self.offerings.get(id).map(|e| e.clone())
    }

    pub fn procedure(&self, id: &str) -> Option<ProcedureEntry> {
        self.procedures.get(id).map(|e| e.clone())
    }

    pub fn has_procedure(&self, id: &str) -> bool {
        self.procedures.contains_key(id)
    }

    pub fn has_observable_property(&self, id: &str) -> bool {
        self.observable_properties.contains_key(id)
    }

    pub fn has_feature_of_interest(&self, id: &str) -> bool {
        self.features_of_interest.contains_key(id)
    }

    /// Feature type of a cached feature of interest.
    pub fn feature_type(&self, id: &str) -> Option<String> {
        self.features_of_interest
            .get(id)
            .and_then(|f| f.feature_type.clone())
    }

    pub fn offering_ids(&self) -> BTreeSet<String> {
        self.offerings.iter().map(|e| e.key().clone()).collect()
    }

    pub fn procedure_ids(&self) -> BTreeSet<String> {
        self.procedures.iter().map(|e| e.key().clone()).collect()
    }

    /// Union of the features of interest of every offering.
    pub fn offering_features(&self) -> BTreeSet<String> {
        self.offerings
            .iter()
            .flat_map(|e| e.features_of_interest.clone())
            .collect()
    }

    /// Drop entries whose ids are not in `keep`.
    pub fn retain_offerings(&self, keep: &BTreeSet<String>) {
        self.offerings.retain(|id, _| keep.contains(id));
    }

    pub fn retain_procedures(&self, keep: &BTreeSet<String>) {
        self.procedures.retain(|id, _| keep.contains(id));
    }

    /// Drop offering ids from procedure entries when the offering itself
    /// is no longer held.
    pub fn prune_procedure_offerings(&self) {
        for mut procedure in self.procedures.iter_mut() {
            procedure
                .offerings
                .retain(|offering| self.offerings.contains_key(offering));
        }
    }

    /// Clear the maps that single-threaded units rebuild from scratch.
    pub fn clear_indexed_facets(&self) {
        self.observable_properties.clear();
        self.features_of_interest.clear();
        self.result_templates.clear();
        self.related_feature_roles.clear();
        self.offering_related_features.clear();
        self.supported_languages.lock().clear();
        self.supported_spatial_reference_codes.lock().clear();
        *self.default_spatial_reference_code.lock() = None;
        self.published_procedures.lock().clear();
        *self.global_envelope.lock() = None;
    }

    // =========================================================================
    // Scalars
    // =========================================================================

    pub fn add_supported_languages(&self, locales: impl IntoIterator<Item = Locale>) {
        self.supported_languages.lock().extend(locales);
    }

    pub fn add_spatial_reference_codes(&self, codes: impl IntoIterator<Item = i32>) {
        self.supported_spatial_reference_codes.lock().extend(codes);
    }

    pub fn set_default_spatial_reference_code(&self, code: i32) {
        *self.default_spatial_reference_code.lock() = Some(code);
    }

    pub fn add_published_procedures(&self, ids: impl IntoIterator<Item = String>) {
        self.published_procedures.lock().extend(ids);
    }

    pub fn set_global_envelope(&self, envelope: Option<Envelope>) {
        *self.global_envelope.lock() = envelope;
    }

    /// Freeze the builder into a published snapshot.
    pub fn finish(self) -> ContentCache {
        ContentCache {
            offerings: to_btreemap(self.offerings),
            procedures: to_btreemap(self.procedures),
            observable_properties: to_btreemap(self.observable_properties),
            features_of_interest: to_btreemap(self.features_of_interest),
            result_templates: to_btreemap(self.result_templates),
            related_feature_roles: to_btreemap(self.related_feature_roles),
            supported_languages: self.supported_languages.into_inner(),
            supported_spatial_reference_codes: self.supported_spatial_reference_codes.into_inner(),
            default_spatial_reference_code: self.default_spatial_reference_code.into_inner(),
            published_procedures: self.published_procedures.into_inner(),
            global_envelope: self.global_envelope.into_inner(),
            built_at: Some(Utc::now()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_concurrent_inserts_from_many_threads() {
        let builder = Arc::new(CacheBuilder::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let builder = Arc::clone(&builder);
                thread::spawn(move || {
                    for i in 0..50 {
                        let id = format!("P{}-{}", t, i);
                        builder.insert_procedure(ProcedureEntry {
                            id: id.clone(),
                            name: id,
                            ..Default::default()
                        });
                    }
                    builder.add_published_procedures([format!("P{}-0", t)]);
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let builder = Arc::try_unwrap(builder).unwrap();
        let cache = builder.finish();
        assert_eq!(cache.counts().procedures, 400);
        assert_eq!(cache.published_procedures().len(), 8);
        assert!(cache.built_at().is_some());
    }

    #[test]
    fn test_from_snapshot_round_trip() {
        let builder = CacheBuilder::new();
        builder.insert_offering(OfferingEntry {
            id: "O1".into(),
            name: "O1".into(),
            features_of_interest: BTreeSet::from(["F1".to_string()]),
            ..Default::default()
        });
        builder.add_spatial_reference_codes([4326, 3857]);
        builder.set_default_spatial_reference_code(4326);
        let cache = builder.finish();

        let reseeded = CacheBuilder::from_snapshot(&cache);
        assert_eq!(reseeded.offering_features(), BTreeSet::from(["F1".to_string()]));
        assert_eq!(reseeded.finish(), cache);
    }

    #[test]
    fn test_retain_and_clear() {
        let builder = CacheBuilder::new();
        for id in ["O1", "O2"] {
            builder.insert_offering(OfferingEntry {
                id: id.into(),
                ..Default::default()
            });
        }
        builder.add_published_procedures(["P1".to_string()]);

        builder.retain_offerings(&BTreeSet::from(["O2".to_string()]));
        builder.clear_indexed_facets();

        assert_eq!(builder.offering_ids(), BTreeSet::from(["O2".to_string()]));
        assert!(builder.finish().published_procedures().is_empty());
    }

    #[test]
    fn test_prune_procedure_offerings() {
        let builder = CacheBuilder::new();
        builder.insert_offering(OfferingEntry {
            id: "O1".into(),
            ..Default::default()
        });
        builder.insert_procedure(ProcedureEntry {
            id: "P1".into(),
            offerings: BTreeSet::from(["O1".to_string(), "O2".to_string()]),
            ..Default::default()
        });

        builder.prune_procedure_offerings();

        assert_eq!(
            builder.procedure("P1").unwrap().offerings,
            BTreeSet::from(["O1".to_string()])
        );
    }
}
