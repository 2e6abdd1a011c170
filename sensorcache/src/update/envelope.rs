//! Spatial envelope aggregation.

use std::collections::BTreeSet;

use crate::model::Envelope;
use crate::store::StoreSession;

use super::error::{Anomaly, CacheUpdateError};

/// Envelope of a set of features, as reported by the store.
///
/// An empty id set yields `Ok(None)` without touching the store. A store
/// envelope with non-finite coordinates is rejected as malformed.
pub fn envelope_for(
    session: &mut dyn StoreSession,
    unit: &str,
    entity: &str,
    features: &BTreeSet<String>,
) -> Result<Option<Envelope>, CacheUpdateError> {
    if features.is_empty() {
        return Ok(None);
    }

    let ids: Vec<String> = features.iter().cloned().collect();
    let envelope = session
        .envelope_for_features(&ids)
        .map_err(|e| CacheUpdateError::entity_query(unit, entity, e))?;

    match envelope {
        Some(env) if !env.is_finite() => Err(CacheUpdateError::anomaly(
            unit,
            entity,
            Anomaly::MalformedGeometry,
        )),
        other => Ok(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FeatureRecord, DEFAULT_SRID};
    use crate::store::{CacheStore, Dataset, MemoryStore, StoreOperation};
    use geo_types::{point, Geometry};

    fn store() -> MemoryStore {
        MemoryStore::new(
            Dataset::new()
                .with_feature(
                    FeatureRecord::new("F1"),
                    Some(Geometry::Point(point! { x: 1.0, y: 2.0 })),
                )
                .with_feature(
                    FeatureRecord::new("F2"),
                    Some(Geometry::Point(point! { x: 3.0, y: -1.0 })),
                )
                .with_feature(FeatureRecord::new("F3"), None),
        )
    }

    fn ids(ids: &[&str]) -> BTreeSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_set_does_not_query() {
        let store = store();
        let mut session = store.open_session().unwrap();

        let env = envelope_for(session.as_mut(), "offering", "O1", &BTreeSet::new()).unwrap();
        assert_eq!(env, None);
        assert_eq!(store.empty_envelope_queries(), 0);
    }

    #[test]
    fn test_union_of_features() {
        let store = store();
        let mut session = store.open_session().unwrap();

        let env = envelope_for(session.as_mut(), "offering", "O1", &ids(&["F1", "F2", "F3"]))
            .unwrap()
            .unwrap();
        assert_eq!(env, Envelope::new(DEFAULT_SRID, 1.0, -1.0, 3.0, 2.0));
    }

    #[test]
    fn test_features_without_geometry() {
        let store = store();
        let mut session = store.open_session().unwrap();

        let env = envelope_for(session.as_mut(), "offering", "O1", &ids(&["F3"])).unwrap();
        assert_eq!(env, None);
    }

    #[test]
    fn test_malformed_geometry() {
        let store = store();
        store.update_dataset(|d| {
            d.features[0].geometry = Some(Geometry::Point(point! { x: f64::NAN, y: 0.0 }));
        });
        let mut session = store.open_session().unwrap();

        let err = envelope_for(session.as_mut(), "offering", "O1", &ids(&["F1"])).unwrap_err();
        assert!(err.is_anomaly());
    }

    #[test]
    fn test_query_failure() {
        let store = store();
        store.fail(StoreOperation::EnvelopeForFeatures, Some("F2"));
        let mut session = store.open_session().unwrap();

        let err = envelope_for(session.as_mut(), "offering", "O1", &ids(&["F1", "F2"])).unwrap_err();
        assert!(err.is_query_failure());
        assert_eq!(err.entity(), Some("O1"));
    }
}
