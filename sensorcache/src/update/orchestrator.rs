//! Cache rebuild orchestration.
//!
//! A rebuild runs in fixed stages, each a barrier for the next:
//!
//! 1. Single-threaded units: spatial reference codes, languages, related
//!    features, result templates, features of interest.
//! 2. The constellation index, read once.
//! 3. Observable properties (one task per property).
//! 4. Procedures (one task per procedure).
//! 5. Offerings (bulk pre-pass, then one task per offering).
//! 6. The global envelope over every offering's features.
//!
//! Errors from every stage are collected and returned with the snapshot;
//! nothing panics past [`CacheRebuild::run`].

use std::collections::BTreeSet;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::constellation::ConstellationIndex;
use super::envelope::envelope_for;
use super::error::CacheUpdateError;
use super::runner::{panic_message, TaskRunner};
use super::settings::CacheSettings;
use super::units::{
    open_session, CacheUpdate, EntityFilter, FeatureOfInterestUpdate, I18nUpdate,
    ObservablePropertiesUpdate, OfferingsUpdate, ProceduresUpdate, RelatedFeaturesUpdate,
    ResultTemplateUpdate, SridUpdate, UpdateContext,
};
use crate::cache::{CacheBuilder, CacheCounts, ContentCache};
use crate::store::CacheStore;

/// Which entities a rebuild recomputes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RebuildScope {
    /// Recompute everything into an empty cache.
    #[default]
    Full,
    /// Recompute the given entities and everything connected to them,
    /// keeping the rest of the previous snapshot.
    Partial {
        offerings: BTreeSet<String>,
        procedures: BTreeSet<String>,
    },
}

/// Summary of a finished rebuild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RebuildReport {
    /// Scope that actually ran: `"full"` or `"partial"`.
    pub scope: &'static str,
    pub threads: usize,
    pub counts: CacheCounts,
    pub errors: usize,
    pub elapsed: Duration,
}

/// Result of [`CacheRebuild::run`].
#[derive(Debug)]
pub struct RebuildOutcome {
    pub cache: ContentCache,
    pub errors: Vec<CacheUpdateError>,
    pub report: RebuildReport,
}

/// One rebuild of the content cache from a store.
pub struct CacheRebuild<'a> {
    store: &'a dyn CacheStore,
    settings: &'a CacheSettings,
    previous: Option<&'a ContentCache>,
}

impl<'a> CacheRebuild<'a> {
    pub fn new(store: &'a dyn CacheStore, settings: &'a CacheSettings) -> Self {
        Self {
            store,
            settings,
            previous: None,
        }
    }

    /// Snapshot a partial rebuild starts from.
    pub fn with_previous(mut self, previous: &'a ContentCache) -> Self {
        self.previous = Some(previous);
        self
    }

    /// Run every stage and return the finished snapshot with all errors.
    pub fn run(&self, scope: &RebuildScope, threads: usize) -> RebuildOutcome {
        let started = Instant::now();
        let runner = TaskRunner::new(threads).with_deadline(self.settings.deadline, started);

        let (builder, requested) = match (scope, self.previous) {
            (RebuildScope::Partial { offerings, procedures }, Some(previous)) => {
                let builder = CacheBuilder::from_snapshot(previous);
                builder.clear_indexed_facets();
                (builder, Some((offerings, procedures)))
            }
            (RebuildScope::Partial { .. }, None) => {
                info!("No previous snapshot, running partial rebuild as full rebuild");
                (CacheBuilder::new(), None)
            }
            (RebuildScope::Full, _) => (CacheBuilder::new(), None),
        };
        let label = if requested.is_some() { "partial" } else { "full" };

        info!(
            store = self.store.name(),
            scope = label,
            threads = runner.threads(),
            "Cache rebuild starting"
        );

        let ctx = UpdateContext {
            store: self.store,
            builder: &builder,
            settings: self.settings,
            runner: &runner,
        };
        let mut errors = Vec::new();

        let single_threaded: [&dyn CacheUpdate; 5] = [
            &SridUpdate,
            &I18nUpdate,
            &RelatedFeaturesUpdate,
            &ResultTemplateUpdate,
            &FeatureOfInterestUpdate,
        ];
        for unit in single_threaded {
            errors.extend(run_unit(unit, &ctx));
        }

        let index = self.build_index(&mut errors);

        let (offering_filter, procedure_filter) = match requested {
            Some((offerings, procedures)) => {
                let (offerings, procedures) = index.connected(offerings, procedures);
                debug!(
                    offerings = offerings.len(),
                    procedures = procedures.len(),
                    "Partial rebuild scope"
                );
                (EntityFilter::Only(offerings), EntityFilter::Only(procedures))
            }
            None => (EntityFilter::All, EntityFilter::All),
        };

        errors.extend(run_unit(&ObservablePropertiesUpdate::new(&index), &ctx));
        errors.extend(run_unit(
            &ProceduresUpdate::new(&index).with_filter(procedure_filter),
            &ctx,
        ));
        errors.extend(run_unit(
            &OfferingsUpdate::new(&index).with_filter(offering_filter),
            &ctx,
        ));
        if requested.is_some() {
            builder.prune_procedure_offerings();
        }

        self.update_global_envelope(&builder, &mut errors);

        let cache = builder.finish();
        let report = RebuildReport {
            scope: label,
            threads: runner.threads(),
            counts: cache.counts(),
            errors: errors.len(),
            elapsed: started.elapsed(),
        };

        for error in &errors {
            warn!(error = %error, "Cache update error");
        }
        info!(
            scope = report.scope,
            offerings = report.counts.offerings,
            procedures = report.counts.procedures,
            observable_properties = report.counts.observable_properties,
            features_of_interest = report.counts.features_of_interest,
            errors = report.errors,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Cache rebuild finished"
        );

        RebuildOutcome {
            cache,
            errors,
            report,
        }
    }

    fn build_index(&self, errors: &mut Vec<CacheUpdateError>) -> ConstellationIndex {
        let mut session = match open_session(self.store, "constellation_index", None) {
            Ok(session) => session,
            Err(e) => {
                errors.push(e);
                return ConstellationIndex::unsupported();
            }
        };
        let (index, error) = ConstellationIndex::build(session.as_mut());
        errors.extend(error);
        index
    }

    /// Computed once over all offering features, never per offering.
    fn update_global_envelope(&self, builder: &CacheBuilder, errors: &mut Vec<CacheUpdateError>) {
        const UNIT: &str = "global_envelope";
        let features = builder.offering_features();
        if features.is_empty() {
            builder.set_global_envelope(None);
            return;
        }

        let result = open_session(self.store, UNIT, None)
            .and_then(|mut session| envelope_for(session.as_mut(), UNIT, "offerings", &features));
        match result {
            Ok(envelope) => builder.set_global_envelope(envelope),
            Err(e) => errors.push(e),
        }
    }
}

fn run_unit(unit: &dyn CacheUpdate, ctx: &UpdateContext<'_>) -> Vec<CacheUpdateError> {
    let started = Instant::now();
    let errors = match panic::catch_unwind(AssertUnwindSafe(|| unit.execute(ctx))) {
        Ok(errors) => errors,
        Err(payload) => vec![CacheUpdateError::TaskPanicked {
            task: unit.name().to_string(),
            message: panic_message(payload.as_ref()),
        }],
    };
    debug!(
        unit = unit.name(),
        errors = errors.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Cache update unit finished"
    );
    errors
}
