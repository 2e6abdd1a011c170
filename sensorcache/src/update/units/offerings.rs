//! Offerings: bulk pre-pass and per-offering tasks.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::{drop_unidentified, open_session, CacheUpdate, EntityFilter, UpdateContext};
use crate::cache::{CacheBuilder, OfferingEntry};
use crate::model::{
    ObservationType, OfferingRecord, OfferingTimeExtrema, TimeExtrema, UNKNOWN_FEATURE_TYPE,
};
use crate::store::{CacheStore, StoreError, StoreResult, StoreSession};
use crate::update::constellation::ConstellationIndex;
use crate::update::envelope::envelope_for;
use crate::update::error::{Anomaly, CacheUpdateError};
use crate::update::runner::CacheTask;

const UNIT: &str = "offering";

/// Human-readable name derived from an offering identifier.
///
/// URLs keep the part after the last `/`, URNs the part after the last `:`,
/// and a remaining fragment keeps the part after the last `#`.
///
/// ```
/// use sensorcache::update::units::derive_offering_name;
///
/// assert_eq!(derive_offering_name("http://example.org/offerings/air"), "air");
/// assert_eq!(derive_offering_name("urn:ogc:offering:water#level"), "level");
/// assert_eq!(derive_offering_name("plain"), "plain");
/// ```
pub fn derive_offering_name(id: &str) -> String {
    let mut name = if id.starts_with("http://") || id.starts_with("https://") {
        after_last(id, '/')
    } else if id.starts_with("urn:") {
        after_last(id, ':')
    } else {
        id
    };
    if name.contains('#') {
        name = after_last(name, '#');
    }
    name.to_string()
}

fn after_last(s: &str, separator: char) -> &str {
    s.rsplit_once(separator).map_or(s, |(_, tail)| tail)
}

pub struct OfferingsUpdate<'i> {
    index: &'i ConstellationIndex,
    filter: EntityFilter,
}

impl<'i> OfferingsUpdate<'i> {
    pub fn new(index: &'i ConstellationIndex) -> Self {
        Self {
            index,
            filter: EntityFilter::All,
        }
    }

    pub fn with_filter(mut self, filter: EntityFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Single-threaded pass: list offerings, drop entries the store no
    /// longer lists and read time extrema in one aggregate query.
    ///
    /// Seeded offerings outside the filter are recomputed too when one of
    /// their references no longer resolves against the rebuilt facets.
    fn pre_pass(
        &self,
        ctx: &UpdateContext<'_>,
        errors: &mut Vec<CacheUpdateError>,
    ) -> Result<(Vec<OfferingRecord>, HashMap<String, OfferingTimeExtrema>), CacheUpdateError> {
        let unit = self.name();
        let mut session = ctx.session(unit)?;
        let listed = session
            .list_offerings()
            .map_err(|e| CacheUpdateError::query(unit, e))?;
        let listed = drop_unidentified(unit, listed, |o| o.id.as_str(), errors);
        ctx.builder
            .retain_offerings(&listed.iter().map(|o| o.id.clone()).collect());
        let offerings: Vec<OfferingRecord> = listed
            .into_iter()
            .filter(|o| {
                self.filter.includes(&o.id) || has_stale_references(ctx.builder, &o.id)
            })
            .collect();

        if offerings.is_empty() {
            return Ok((offerings, HashMap::new()));
        }

        let ids: Vec<String> = offerings.iter().map(|o| o.id.clone()).collect();
        let extrema = match session.offering_time_extrema(&ids) {
            Ok(extrema) => extrema,
            Err(e) => {
                errors.push(CacheUpdateError::query(unit, e));
                HashMap::new()
            }
        };
        Ok((offerings, extrema))
    }
}

/// Whether the builder's entry for `id` names a procedure, observable
/// property or feature the builder no longer holds.
fn has_stale_references(builder: &CacheBuilder, id: &str) -> bool {
    let Some(entry) = builder.offering(id) else {
        return false;
    };
    let stale = entry
        .procedures
        .iter()
        .chain(&entry.hidden_child_procedures)
        .any(|p| !builder.has_procedure(p))
        || entry
            .observable_properties
            .iter()
            .any(|p| !builder.has_observable_property(p))
        || entry
            .features_of_interest
            .iter()
            .any(|f| !builder.has_feature_of_interest(f));
    if stale {
        debug!(offering = id, "Recomputing offering with stale references");
    }
    stale
}

impl CacheUpdate for OfferingsUpdate<'_> {
    fn name(&self) -> &'static str {
        "offerings"
    }

    fn execute(&self, ctx: &UpdateContext<'_>) -> Vec<CacheUpdateError> {
        let mut errors = Vec::new();
        let (offerings, mut extrema) = match self.pre_pass(ctx, &mut errors) {
            Ok(read) => read,
            Err(e) => {
                errors.push(e);
                return errors;
            }
        };

        let tasks: Vec<Box<dyn CacheTask + '_>> = offerings
            .into_iter()
            .map(|record| {
                let mut related_features = ctx.builder.related_features_for_offering(&record.id);
                related_features.extend(record.related_features.iter().cloned());
                Box::new(OfferingTask {
                    store: ctx.store,
                    builder: ctx.builder,
                    index: self.index,
                    time: extrema.remove(&record.id).unwrap_or_default(),
                    related_features,
                    record,
                }) as Box<dyn CacheTask + '_>
            })
            .collect();

        debug!(tasks = tasks.len(), "Running offering tasks");
        errors.extend(ctx.runner.run_all(tasks));
        errors
    }
}

struct OfferingTask<'a> {
    store: &'a dyn CacheStore,
    builder: &'a CacheBuilder,
    index: &'a ConstellationIndex,
    record: OfferingRecord,
    time: OfferingTimeExtrema,
    related_features: BTreeSet<String>,
}

impl OfferingTask<'_> {
    fn id(&self) -> &str {
        &self.record.id
    }

    fn query_error(&self, source: StoreError) -> CacheUpdateError {
        CacheUpdateError::entity_query(UNIT, self.id(), source)
    }

    /// Keep ids `exists` accepts; report the others as unknown references.
    fn known_only(
        &self,
        ids: BTreeSet<String>,
        kind: &'static str,
        exists: impl Fn(&str) -> bool,
        errors: &mut Vec<CacheUpdateError>,
    ) -> BTreeSet<String> {
        let (known, unknown): (BTreeSet<String>, BTreeSet<String>) =
            ids.into_iter().partition(|id| exists(id.as_str()));
        for id in unknown {
            errors.push(CacheUpdateError::anomaly(
                UNIT,
                self.id(),
                Anomaly::UnknownReference { kind, id },
            ));
        }
        known
    }

    fn linked_procedures(&self, session: &mut dyn StoreSession) -> StoreResult<BTreeSet<String>> {
        if self.index.is_supported() {
            Ok(self.index.procedures_for_offering(self.id()))
        } else {
            session.procedures_for_offering(self.id())
        }
    }

    fn linked_properties(&self, session: &mut dyn StoreSession) -> StoreResult<BTreeSet<String>> {
        if self.index.is_supported() {
            Ok(self.index.observable_properties_for_offering(self.id()))
        } else {
            session.observable_properties_for_offering(self.id())
        }
    }

    /// Split linked procedures into top-level and hidden children.
    ///
    /// A root has no ancestor among the linked procedures. A procedure is
    /// hidden when one of its ancestors is a root; procedures that are
    /// neither (members of a pure cycle) stay visible.
    fn split_procedures(&self, linked: BTreeSet<String>) -> (BTreeSet<String>, BTreeSet<String>) {
        let ancestors: HashMap<&str, BTreeSet<String>> = linked
            .iter()
            .map(|p| {
                let ancestors = self
                    .builder
                    .procedure(p)
                    .map(|e| e.ancestors)
                    .unwrap_or_default();
                (p.as_str(), ancestors)
            })
            .collect();

        let roots: BTreeSet<&str> = linked
            .iter()
            .filter(|p| ancestors[p.as_str()].is_disjoint(&linked))
            .map(String::as_str)
            .collect();

        let (hidden, visible): (BTreeSet<String>, BTreeSet<String>) =
            linked.iter().cloned().partition(|p| {
                !roots.contains(p.as_str())
                    && ancestors[p.as_str()]
                        .iter()
                        .any(|a| roots.contains(a.as_str()))
            });
        (visible, hidden)
    }

    /// Constellation types if known, else the first type the store confirms.
    fn observation_types(
        &self,
        session: &mut dyn StoreSession,
    ) -> StoreResult<BTreeSet<ObservationType>> {
        let from_index = self.index.observation_types_for_offering(self.id());
        if !from_index.is_empty() {
            return Ok(from_index);
        }
        for candidate in ObservationType::PROBE_ORDER {
            if session.has_observations_of_type(self.id(), candidate)? {
                return Ok(BTreeSet::from([candidate]));
            }
        }
        Ok(BTreeSet::new())
    }

    fn check_time(&self, extrema: TimeExtrema, errors: &mut Vec<CacheUpdateError>) -> TimeExtrema {
        if extrema.is_ordered() {
            extrema
        } else {
            errors.push(CacheUpdateError::anomaly(
                UNIT,
                self.id(),
                Anomaly::InvertedTimeExtrema,
            ));
            TimeExtrema::default()
        }
    }
}

impl CacheTask for OfferingTask<'_> {
    fn name(&self) -> String {
        format!("{}:{}", UNIT, self.id())
    }

    fn run(&self) -> Vec<CacheUpdateError> {
        let mut session = match open_session(self.store, UNIT, Some(self.id())) {
            Ok(session) => session,
            Err(e) => return vec![e],
        };
        let session = session.as_mut();
        let mut errors = Vec::new();

        let mut entry = OfferingEntry {
            id: self.record.id.clone(),
            name: self
                .record
                .name
                .clone()
                .unwrap_or_else(|| derive_offering_name(self.id())),
            localized_names: self.record.names.clone(),
            localized_descriptions: self.record.descriptions.clone(),
            allowed_observation_types: self.record.observation_types.clone(),
            allowed_feature_types: self.record.feature_types.clone(),
            related_features: self.related_features.clone(),
            ..Default::default()
        };

        match self.linked_procedures(session) {
            Ok(linked) => {
                let linked =
                    self.known_only(linked, "procedure", |p| self.builder.has_procedure(p), &mut errors);
                (entry.procedures, entry.hidden_child_procedures) = self.split_procedures(linked);
            }
            Err(e) => errors.push(self.query_error(e)),
        }

        match self.linked_properties(session) {
            Ok(properties) => {
                entry.observable_properties = self.known_only(
                    properties,
                    "observable property",
                    |p| self.builder.has_observable_property(p),
                    &mut errors,
                );
            }
            Err(e) => errors.push(self.query_error(e)),
        }

        match self.observation_types(session) {
            Ok(types) => entry.observation_types = types,
            Err(e) => errors.push(self.query_error(e)),
        }

        match session.features_for_offering(self.id()) {
            Ok(features) => {
                entry.features_of_interest = self.known_only(
                    features,
                    "feature of interest",
                    |f| self.builder.has_feature_of_interest(f),
                    &mut errors,
                );
            }
            Err(e) => errors.push(self.query_error(e)),
        }

        entry.feature_types = entry
            .features_of_interest
            .iter()
            .filter_map(|f| self.builder.feature_type(f))
            .filter(|t| t != UNKNOWN_FEATURE_TYPE)
            .collect();

        match envelope_for(session, UNIT, self.id(), &entry.features_of_interest) {
            Ok(envelope) => entry.envelope = envelope,
            Err(e) => errors.push(e),
        }

        entry.phenomenon_time = self.check_time(self.time.phenomenon_time, &mut errors);
        entry.result_time = self.check_time(self.time.result_time, &mut errors);

        self.builder.insert_offering(entry);
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_derive_name_http() {
        assert_eq!(derive_offering_name("https://sensors.example/off/temp"), "temp");
        assert_eq!(derive_offering_name("http://x.org/a/b#frag"), "frag");
    }

    #[test]
    fn test_derive_name_urn() {
        assert_eq!(derive_offering_name("urn:ogc:def:offering:wind"), "wind");
    }

    #[test]
    fn test_derive_name_plain_with_fragment() {
        assert_eq!(derive_offering_name("offering#one"), "one");
        assert_eq!(derive_offering_name("offering/one"), "offering/one");
    }

    #[test]
    fn test_derive_name_trailing_separator() {
        assert_eq!(derive_offering_name("http://x.org/a/"), "");
    }

    proptest! {
        #[test]
        fn prop_derived_name_is_a_suffix(id in "[a-z:/#.]{0,24}") {
            let name = derive_offering_name(&id);
            prop_assert!(id.ends_with(&name));
            prop_assert!(!name.contains('#'));
        }

        #[test]
        fn prop_urn_names_have_no_colon(tail in "[a-z:#]{0,16}") {
            let name = derive_offering_name(&format!("urn:{}", tail));
            prop_assert!(!name.contains(':'));
        }
    }
}
