//! Cache update units.
//!
//! One unit per metadata facet. Single-threaded units read their facet in
//! one session and write it into the builder; the observable-property,
//! procedure and offering units fan out into one task per entity through
//! the [`TaskRunner`].

mod features;
mod i18n;
mod observable_properties;
mod offerings;
mod procedures;
mod related_features;
mod result_templates;
mod srid;

use std::collections::BTreeSet;

pub use features::FeatureOfInterestUpdate;
pub use i18n::I18nUpdate;
pub use observable_properties::ObservablePropertiesUpdate;
pub use offerings::{derive_offering_name, OfferingsUpdate};
pub use procedures::ProceduresUpdate;
pub use related_features::RelatedFeaturesUpdate;
pub use result_templates::ResultTemplateUpdate;
pub use srid::SridUpdate;

use super::error::{Anomaly, CacheUpdateError};
use super::runner::TaskRunner;
use super::settings::CacheSettings;
use crate::cache::CacheBuilder;
use crate::store::{CacheStore, StoreSession};

/// Shared state handed to every unit of a rebuild.
pub struct UpdateContext<'a> {
    pub store: &'a dyn CacheStore,
    pub builder: &'a CacheBuilder,
    pub settings: &'a CacheSettings,
    pub runner: &'a TaskRunner,
}

impl UpdateContext<'_> {
    /// Open a session for `unit`, converting failures into an update error.
    pub fn session(&self, unit: &str) -> Result<Box<dyn StoreSession + '_>, CacheUpdateError> {
        open_session(self.store, unit, None)
    }
}

/// A unit of the rebuild, run by the orchestrator.
pub trait CacheUpdate {
    fn name(&self) -> &'static str;

    /// Write this unit's facet into the builder and return every error.
    fn execute(&self, ctx: &UpdateContext<'_>) -> Vec<CacheUpdateError>;
}

/// Restriction of a fan-out unit to a subset of entity ids.
#[derive(Debug, Clone, Default)]
pub enum EntityFilter {
    #[default]
    All,
    Only(BTreeSet<String>),
}

impl EntityFilter {
    pub fn includes(&self, id: &str) -> bool {
        match self {
            EntityFilter::All => true,
            EntityFilter::Only(ids) => ids.contains(id),
        }
    }
}

pub(crate) fn open_session<'s>(
    store: &'s dyn CacheStore,
    unit: &str,
    entity: Option<&str>,
) -> Result<Box<dyn StoreSession + 's>, CacheUpdateError> {
    store.open_session().map_err(|source| CacheUpdateError::Query {
        unit: unit.to_string(),
        entity: entity.map(str::to_string),
        source,
    })
}

/// Drop records listed without an identifier, reporting each by its
/// position in the listing.
pub(crate) fn drop_unidentified<R>(
    unit: &str,
    records: Vec<R>,
    id: impl Fn(&R) -> &str,
    errors: &mut Vec<CacheUpdateError>,
) -> Vec<R> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(position, record)| {
            if id(&record).trim().is_empty() {
                errors.push(CacheUpdateError::anomaly(
                    unit,
                    format!("#{}", position),
                    Anomaly::MissingValue("identifier".to_string()),
                ));
                None
            } else {
                Some(record)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drop_unidentified_reports_position() {
        let mut errors = Vec::new();
        let kept = drop_unidentified(
            "offerings",
            vec!["O1".to_string(), " ".to_string(), "O2".to_string()],
            |id| id.as_str(),
            &mut errors,
        );

        assert_eq!(kept, vec!["O1".to_string(), "O2".to_string()]);
        assert_eq!(
            errors,
            vec![CacheUpdateError::anomaly(
                "offerings",
                "#1",
                Anomaly::MissingValue("identifier".into())
            )]
        );
    }

    #[test]
    fn test_entity_filter() {
        let only = EntityFilter::Only(BTreeSet::from(["O1".to_string()]));
        assert!(only.includes("O1"));
        assert!(!only.includes("O2"));
        assert!(EntityFilter::All.includes("anything"));
    }
}
