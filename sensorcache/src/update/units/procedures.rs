//! Procedures: hierarchy, publication and per-procedure tasks.
//!
//! The unit reads the full procedure list, the declared hierarchy and (if
//! the store keeps one) the precomputed phenomenon-time table in a single
//! session. Each procedure task then resolves its associations and time
//! extrema with its own session.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, info};

use super::{drop_unidentified, open_session, CacheUpdate, EntityFilter, UpdateContext};
use crate::cache::{CacheBuilder, ProcedureEntry};
use crate::model::{ProcedureRecord, TimeExtrema};
use crate::store::{CacheStore, StoreError, StoreSession};
use crate::update::constellation::ConstellationIndex;
use crate::update::error::{Anomaly, CacheUpdateError};
use crate::update::hierarchy::{closure_in, invert, Closure};
use crate::update::runner::CacheTask;

const UNIT: &str = "procedure";

pub struct ProceduresUpdate<'i> {
    index: &'i ConstellationIndex,
    filter: EntityFilter,
}

impl<'i> ProceduresUpdate<'i> {
    pub fn new(index: &'i ConstellationIndex) -> Self {
        Self {
            index,
            filter: EntityFilter::All,
        }
    }

    /// Only run tasks for the given procedures.
    pub fn with_filter(mut self, filter: EntityFilter) -> Self {
        self.filter = filter;
        self
    }
}

struct ProcedureInputs {
    procedures: Vec<ProcedureRecord>,
    parents: HashMap<String, BTreeSet<String>>,
    bulk_extrema: Option<HashMap<String, TimeExtrema>>,
}

impl ProceduresUpdate<'_> {
    fn read_inputs(
        &self,
        ctx: &UpdateContext<'_>,
        errors: &mut Vec<CacheUpdateError>,
    ) -> Result<ProcedureInputs, CacheUpdateError> {
        let unit = self.name();
        let mut session = ctx.session(unit)?;
        let procedures = session
            .list_procedures()
            .map_err(|e| CacheUpdateError::query(unit, e))?;
        let parents = session
            .procedure_hierarchy()
            .map_err(|e| CacheUpdateError::query(unit, e))?;

        let bulk_extrema = match session.procedure_time_extrema() {
            Ok(table) => Some(table),
            Err(StoreError::Unsupported(_)) => {
                info!("Store has no procedure time table, computing extrema per procedure");
                None
            }
            Err(e) => {
                errors.push(CacheUpdateError::query(unit, e));
                None
            }
        };

        Ok(ProcedureInputs {
            procedures,
            parents,
            bulk_extrema,
        })
    }
}

impl CacheUpdate for ProceduresUpdate<'_> {
    fn name(&self) -> &'static str {
        "procedures"
    }

    fn execute(&self, ctx: &UpdateContext<'_>) -> Vec<CacheUpdateError> {
        let mut errors = Vec::new();
        let inputs = match self.read_inputs(ctx, &mut errors) {
            Ok(inputs) => inputs,
            Err(e) => {
                errors.push(e);
                return errors;
            }
        };

        let procedures =
            drop_unidentified(self.name(), inputs.procedures, |p| p.id.as_str(), &mut errors);
        let known: Arc<BTreeSet<String>> =
            Arc::new(procedures.iter().map(|p| p.id.clone()).collect());
        // Entries seeded from a previous snapshot may no longer exist.
        ctx.builder.retain_procedures(&known);
        let children = invert(&inputs.parents);
        let bulk_extrema = inputs.bulk_extrema.map(Arc::new);

        let mut tasks: Vec<Box<dyn CacheTask + '_>> = Vec::new();
        for record in procedures {
            let ancestors = closure_in(&inputs.parents, &record.id);
            // Publishing a procedure publishes all of its ancestors.
            if record.published {
                let mut published = ancestors.members.clone();
                published.insert(record.id.clone());
                ctx.builder.add_published_procedures(published);
            }

            if !self.filter.includes(&record.id) {
                continue;
            }
            tasks.push(Box::new(ProcedureTask {
                store: ctx.store,
                builder: ctx.builder,
                index: self.index,
                known: Arc::clone(&known),
                bulk_extrema: bulk_extrema.clone(),
                parents: inputs.parents.get(&record.id).cloned().unwrap_or_default(),
                children: children.get(&record.id).cloned().unwrap_or_default(),
                ancestors,
                record,
            }));
        }

        debug!(tasks = tasks.len(), "Running procedure tasks");
        errors.extend(ctx.runner.run_all(tasks));
        errors
    }
}

struct ProcedureTask<'a> {
    store: &'a dyn CacheStore,
    builder: &'a CacheBuilder,
    index: &'a ConstellationIndex,
    known: Arc<BTreeSet<String>>,
    bulk_extrema: Option<Arc<HashMap<String, TimeExtrema>>>,
    record: ProcedureRecord,
    parents: BTreeSet<String>,
    ancestors: Closure<String>,
    children: BTreeSet<String>,
}

impl ProcedureTask<'_> {
    fn id(&self) -> &str {
        &self.record.id
    }

    fn query_error(&self, source: StoreError) -> CacheUpdateError {
        CacheUpdateError::entity_query(UNIT, self.id(), source)
    }

    fn associations(
        &self,
        session: &mut dyn StoreSession,
        entry: &mut ProcedureEntry,
        errors: &mut Vec<CacheUpdateError>,
    ) {
        if self.index.is_supported() {
            entry.offerings = self.index.offerings_for_procedure(self.id());
            entry.observable_properties = self.index.observable_properties_for_procedure(self.id());
            return;
        }
        match session.offerings_for_procedure(self.id()) {
            Ok(offerings) => entry.offerings = offerings,
            Err(e) => errors.push(self.query_error(e)),
        }
        match session.observable_properties_for_procedure(self.id()) {
            Ok(properties) => entry.observable_properties = properties,
            Err(e) => errors.push(self.query_error(e)),
        }
    }

    /// First source that answers wins: bulk table, series, direct scan.
    fn phenomenon_time(
        &self,
        session: &mut dyn StoreSession,
    ) -> Result<TimeExtrema, CacheUpdateError> {
        if let Some(table) = &self.bulk_extrema {
            return Ok(table.get(self.id()).copied().unwrap_or_default());
        }
        match session.series_time_extrema(self.id()) {
            Ok(extrema) => return Ok(extrema),
            Err(StoreError::Unsupported(_)) => {}
            Err(e) => return Err(self.query_error(e)),
        }
        session
            .scan_time_extrema(self.id())
            .map_err(|e| self.query_error(e))
    }
}

impl CacheTask for ProcedureTask<'_> {
    fn name(&self) -> String {
        format!("{}:{}", UNIT, self.id())
    }

    fn run(&self) -> Vec<CacheUpdateError> {
        let mut session = match open_session(self.store, UNIT, Some(self.id())) {
            Ok(session) => session,
            Err(e) => return vec![e],
        };

        let mut errors = Vec::new();
        if self.ancestors.cyclic {
            errors.push(CacheUpdateError::anomaly(UNIT, self.id(), Anomaly::Cycle));
        }

        let type_of = match &self.record.type_of {
            Some(t) if !self.known.contains(t) => {
                errors.push(CacheUpdateError::anomaly(
                    UNIT,
                    self.id(),
                    Anomaly::UnknownReference {
                        kind: "procedure",
                        id: t.clone(),
                    },
                ));
                None
            }
            other => other.clone(),
        };

        let mut entry = ProcedureEntry {
            id: self.record.id.clone(),
            name: self.record.name.clone().unwrap_or_else(|| self.record.id.clone()),
            is_type: self.record.is_type,
            is_aggregation: self.record.is_aggregation || !self.children.is_empty(),
            type_of,
            parents: self.parents.clone(),
            ancestors: self.ancestors.members.clone(),
            children: self.children.clone(),
            published_ancestors: if self.record.published {
                self.ancestors.members.clone()
            } else {
                BTreeSet::new()
            },
            description_formats: self.record.description_formats.clone(),
            ..Default::default()
        };

        self.associations(session.as_mut(), &mut entry, &mut errors);

        match self.phenomenon_time(session.as_mut()) {
            Ok(extrema) if extrema.is_ordered() => entry.phenomenon_time = extrema,
            Ok(_) => errors.push(CacheUpdateError::anomaly(
                UNIT,
                self.id(),
                Anomaly::InvertedTimeExtrema,
            )),
            Err(e) => errors.push(e),
        }

        self.builder.insert_procedure(entry);
        errors
    }
}
