//! Observable properties and the composite-phenomenon hierarchy.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::{drop_unidentified, open_session, CacheUpdate, UpdateContext};
use crate::cache::ObservablePropertyEntry;
use crate::model::ObservablePropertyRecord;
use crate::store::{CacheStore, StoreResult, StoreSession};
use crate::update::constellation::ConstellationIndex;
use crate::update::error::{Anomaly, CacheUpdateError};
use crate::update::hierarchy::{closure_in, invert};
use crate::update::runner::CacheTask;
use crate::cache::CacheBuilder;

const UNIT: &str = "observable_property";

/// Resolves composite closures once, then runs one task per property for
/// its offering and procedure associations.
pub struct ObservablePropertiesUpdate<'i> {
    index: &'i ConstellationIndex,
}

impl<'i> ObservablePropertiesUpdate<'i> {
    pub fn new(index: &'i ConstellationIndex) -> Self {
        Self { index }
    }
}

impl CacheUpdate for ObservablePropertiesUpdate<'_> {
    fn name(&self) -> &'static str {
        "observable_properties"
    }

    fn execute(&self, ctx: &UpdateContext<'_>) -> Vec<CacheUpdateError> {
        let (properties, composites) = match read_properties(ctx) {
            Ok(read) => read,
            Err(e) => return vec![e],
        };
        let containers = invert(&composites);

        let mut errors = Vec::new();
        let properties =
            drop_unidentified(self.name(), properties, |p| p.id.as_str(), &mut errors);
        let mut tasks: Vec<Box<dyn CacheTask + '_>> = Vec::with_capacity(properties.len());

        for record in properties {
            let descendants = closure_in(&composites, &record.id);
            let ancestors = closure_in(&containers, &record.id);
            if descendants.cyclic || ancestors.cyclic {
                errors.push(CacheUpdateError::anomaly(UNIT, &record.id, Anomaly::Cycle));
            }

            tasks.push(Box::new(ObservablePropertyTask {
                store: ctx.store,
                builder: ctx.builder,
                index: self.index,
                entry: ObservablePropertyEntry {
                    name: record.name.clone().unwrap_or_else(|| record.id.clone()),
                    is_composite: composites.get(&record.id).is_some_and(|c| !c.is_empty()),
                    children: descendants.members,
                    parents: ancestors.members,
                    id: record.id,
                    ..Default::default()
                },
            }));
        }

        debug!(tasks = tasks.len(), "Running observable property tasks");
        errors.extend(ctx.runner.run_all(tasks));
        errors
    }
}

fn read_properties(
    ctx: &UpdateContext<'_>,
) -> Result<(Vec<ObservablePropertyRecord>, HashMap<String, BTreeSet<String>>), CacheUpdateError> {
    let mut session = ctx.session("observable_properties")?;
    let properties = session
        .list_observable_properties()
        .map_err(|e| CacheUpdateError::query("observable_properties", e))?;
    let composites = session
        .observable_property_hierarchy()
        .map_err(|e| CacheUpdateError::query("observable_properties", e))?;
    Ok((properties, composites))
}

struct ObservablePropertyTask<'a> {
    store: &'a dyn CacheStore,
    builder: &'a CacheBuilder,
    index: &'a ConstellationIndex,
    entry: ObservablePropertyEntry,
}

impl ObservablePropertyTask<'_> {
    fn associations(
        &self,
        session: &mut dyn StoreSession,
    ) -> StoreResult<(BTreeSet<String>, BTreeSet<String>)> {
        let id = &self.entry.id;
        if self.index.is_supported() {
            return Ok((
                self.index.offerings_for_observable_property(id),
                self.index.procedures_for_observable_property(id),
            ));
        }
        Ok((
            session.offerings_for_observable_property(id)?,
            session.procedures_for_observable_property(id)?,
        ))
    }
}

impl CacheTask for ObservablePropertyTask<'_> {
    fn name(&self) -> String {
        format!("{}:{}", UNIT, self.entry.id)
    }

    fn run(&self) -> Vec<CacheUpdateError> {
        let mut errors = Vec::new();
        let mut entry = self.entry.clone();

        match open_session(self.store, UNIT, Some(&entry.id)) {
            Ok(mut session) => match self.associations(session.as_mut()) {
                Ok((offerings, procedures)) => {
                    entry.offerings = offerings;
                    entry.procedures = procedures;
                }
                Err(e) => errors.push(CacheUpdateError::entity_query(UNIT, &entry.id, e)),
            },
            Err(e) => errors.push(e),
        }

        self.builder.insert_observable_property(entry);
        errors
    }
}
