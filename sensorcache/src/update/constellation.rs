//! Observation-constellation index.
//!
//! The store is asked once per rebuild for every known
//! (procedure, observable property, offering, observation type) combination.
//! Per-entity tasks then look their relationships up here instead of issuing
//! one query each. Stores that cannot list constellations yield a degraded
//! index and tasks query the store directly.

use std::collections::{BTreeSet, HashMap};

use tracing::{debug, info};

use crate::model::{Constellation, ObservationType};
use crate::store::{StoreError, StoreSession};

use super::error::CacheUpdateError;

const UNIT: &str = "constellation_index";

/// Constellations partitioned by offering, procedure and observable property.
#[derive(Debug, Default)]
pub struct ConstellationIndex {
    supported: bool,
    by_offering: HashMap<String, Vec<Constellation>>,
    by_procedure: HashMap<String, Vec<Constellation>>,
    by_observable_property: HashMap<String, Vec<Constellation>>,
}

impl ConstellationIndex {
    /// Index for a store without constellation support.
    pub fn unsupported() -> Self {
        Self::default()
    }

    /// Partition a list of constellations.
    pub fn from_constellations(constellations: Vec<Constellation>) -> Self {
        let mut index = Self {
            supported: true,
            ..Default::default()
        };
        for c in constellations {
            index
                .by_offering
                .entry(c.offering.clone())
                .or_default()
                .push(c.clone());
            index
                .by_procedure
                .entry(c.procedure.clone())
                .or_default()
                .push(c.clone());
            index
                .by_observable_property
                .entry(c.observable_property.clone())
                .or_default()
                .push(c);
        }
        index
    }

    /// Read all constellations from the store and index them.
    ///
    /// On [`StoreError::Unsupported`] a degraded index is returned without
    /// error. On any other failure the degraded index is returned together
    /// with the error, so the rebuild can continue on the direct-query path.
    pub fn build(session: &mut dyn StoreSession) -> (Self, Option<CacheUpdateError>) {
        match session.list_constellations() {
            Ok(constellations) => {
                let count = constellations.len();
                let index = Self::from_constellations(constellations);
                debug!(
                    constellations = count,
                    offerings = index.by_offering.len(),
                    procedures = index.by_procedure.len(),
                    "Constellation index built"
                );
                (index, None)
            }
            Err(StoreError::Unsupported(_)) => {
                info!("Store does not list constellations, using direct queries");
                (Self::unsupported(), None)
            }
            Err(e) => (Self::unsupported(), Some(CacheUpdateError::query(UNIT, e))),
        }
    }

    /// Whether lookups are backed by store data.
    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn for_offering(&self, offering: &str) -> &[Constellation] {
        self.by_offering.get(offering).map_or(&[], Vec::as_slice)
    }

    pub fn for_procedure(&self, procedure: &str) -> &[Constellation] {
        self.by_procedure.get(procedure).map_or(&[], Vec::as_slice)
    }

    pub fn for_observable_property(&self, property: &str) -> &[Constellation] {
        self.by_observable_property
            .get(property)
            .map_or(&[], Vec::as_slice)
    }

    pub fn procedures_for_offering(&self, offering: &str) -> BTreeSet<String> {
        collect(self.for_offering(offering), |c| &c.procedure)
    }

    pub fn observable_properties_for_offering(&self, offering: &str) -> BTreeSet<String> {
        collect(self.for_offering(offering), |c| &c.observable_property)
    }

    pub fn observation_types_for_offering(&self, offering: &str) -> BTreeSet<ObservationType> {
        self.for_offering(offering)
            .iter()
            .filter_map(|c| c.observation_type)
            .collect()
    }

    pub fn offerings_for_procedure(&self, procedure: &str) -> BTreeSet<String> {
        collect(self.for_procedure(procedure), |c| &c.offering)
    }

    pub fn observable_properties_for_procedure(&self, procedure: &str) -> BTreeSet<String> {
        collect(self.for_procedure(procedure), |c| &c.observable_property)
    }

    pub fn offerings_for_observable_property(&self, property: &str) -> BTreeSet<String> {
        collect(self.for_observable_property(property), |c| &c.offering)
    }

    pub fn procedures_for_observable_property(&self, property: &str) -> BTreeSet<String> {
        collect(self.for_observable_property(property), |c| &c.procedure)
    }

    /// Offerings and procedures connected to the given ones through any
    /// constellation (including the given ids themselves).
    pub fn connected(
        &self,
        offerings: &BTreeSet<String>,
        procedures: &BTreeSet<String>,
    ) -> (BTreeSet<String>, BTreeSet<String>) {
        let mut out_offerings = offerings.clone();
        let mut out_procedures = procedures.clone();
        for offering in offerings {
            out_procedures.extend(self.procedures_for_offering(offering));
        }
        for procedure in procedures {
            out_offerings.extend(self.offerings_for_procedure(procedure));
        }
        (out_offerings, out_procedures)
    }
}

fn collect(constellations: &[Constellation], field: impl Fn(&Constellation) -> &String) -> BTreeSet<String> {
    constellations.iter().map(|c| field(c).clone()).collect()
}
