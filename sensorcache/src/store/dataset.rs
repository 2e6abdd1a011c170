//! Serializable dataset backing the in-memory store.
//!
//! A [`Dataset`] is a complete, self-contained description of a store's
//! content: entity records, hierarchies and raw observations. Relationship
//! queries, constellations and aggregates are derived from the observations
//! by [`MemoryStore`](super::MemoryStore).

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use chrono::{DateTime, Utc};
use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{
    Constellation, FeatureRecord, Locale, ObservablePropertyRecord, ObservationType,
    OfferingRecord, ProcedureRecord, RelatedFeatureRecord, ResultTemplateRecord,
};

/// Errors loading a dataset file.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse dataset {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A feature of interest together with its geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetFeature {
    #[serde(flatten)]
    pub record: FeatureRecord,
    #[serde(default)]
    pub geometry: Option<Geometry<f64>>,
}

/// A single stored observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationRecord {
    pub procedure: String,
    pub observable_property: String,
    pub offering: String,
    pub feature_of_interest: String,
    pub observation_type: ObservationType,
    pub phenomenon_time_start: DateTime<Utc>,
    /// End of the phenomenon period; `None` for instants.
    #[serde(default)]
    pub phenomenon_time_end: Option<DateTime<Utc>>,
    /// Defaults to the end of the phenomenon time.
    #[serde(default)]
    pub result_time: Option<DateTime<Utc>>,
}

impl ObservationRecord {
    pub fn phenomenon_end(&self) -> DateTime<Utc> {
        self.phenomenon_time_end.unwrap_or(self.phenomenon_time_start)
    }

    pub fn result_time(&self) -> DateTime<Utc> {
        self.result_time.unwrap_or_else(|| self.phenomenon_end())
    }
}

/// Full content of an in-memory store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Spatial reference code of all geometries.
    #[serde(default)]
    pub srid: Option<i32>,
    #[serde(default)]
    pub locales: BTreeSet<Locale>,
    #[serde(default)]
    pub offerings: Vec<OfferingRecord>,
    #[serde(default)]
    pub procedures: Vec<ProcedureRecord>,
    #[serde(default)]
    pub observable_properties: Vec<ObservablePropertyRecord>,
    #[serde(default)]
    pub features: Vec<DatasetFeature>,
    #[serde(default)]
    pub related_features: Vec<RelatedFeatureRecord>,
    #[serde(default)]
    pub result_templates: Vec<ResultTemplateRecord>,
    /// Child procedure → declared parents.
    #[serde(default)]
    pub procedure_parents: BTreeMap<String, BTreeSet<String>>,
    /// Composite property → direct children.
    #[serde(default)]
    pub property_children: BTreeMap<String, BTreeSet<String>>,
    /// Constellations declared without (or in addition to) observations.
    #[serde(default)]
    pub constellations: Vec<Constellation>,
    #[serde(default)]
    pub observations: Vec<ObservationRecord>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a dataset from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, DatasetError> {
        let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| DatasetError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn with_offering(mut self, offering: OfferingRecord) -> Self {
        self.offerings.push(offering);
        self
    }

    pub fn with_procedure(mut self, procedure: ProcedureRecord) -> Self {
        self.procedures.push(procedure);
        self
    }

    pub fn with_observable_property(mut self, property: ObservablePropertyRecord) -> Self {
        self.observable_properties.push(property);
        self
    }

    pub fn with_feature(mut self, record: FeatureRecord, geometry: Option<Geometry<f64>>) -> Self {
        self.features.push(DatasetFeature { record, geometry });
        self
    }

    pub fn with_locale(mut self, locale: impl Into<Locale>) -> Self {
        self.locales.insert(locale.into());
        self
    }

    pub fn with_procedure_parent(
        mut self,
        child: impl Into<String>,
        parent: impl Into<String>,
    ) -> Self {
        self.procedure_parents
            .entry(child.into())
            .or_default()
            .insert(parent.into());
        self
    }

    pub fn with_property_child(
        mut self,
        composite: impl Into<String>,
        child: impl Into<String>,
    ) -> Self {
        self.property_children
            .entry(composite.into())
            .or_default()
            .insert(child.into());
        self
    }

    pub fn with_related_feature(mut self, related: RelatedFeatureRecord) -> Self {
        self.related_features.push(related);
        self
    }

    pub fn with_result_template(mut self, template: ResultTemplateRecord) -> Self {
        self.result_templates.push(template);
        self
    }

    pub fn with_constellation(mut self, constellation: Constellation) -> Self {
        self.constellations.push(constellation);
        self
    }

    pub fn with_observation(mut self, observation: ObservationRecord) -> Self {
        self.observations.push(observation);
        self
    }

    /// Record an instantaneous observation.
    pub fn observe(
        self,
        procedure: &str,
        observable_property: &str,
        offering: &str,
        feature: &str,
        observation_type: ObservationType,
        at: DateTime<Utc>,
    ) -> Self {
        self.with_observation(ObservationRecord {
            procedure: procedure.to_string(),
            observable_property: observable_property.to_string(),
            offering: offering.to_string(),
            feature_of_interest: feature.to_string(),
            observation_type,
            phenomenon_time_start: at,
            phenomenon_time_end: None,
            result_time: None,
        })
    }

    /// Every constellation, declared or implied by an observation.
    pub fn all_constellations(&self) -> BTreeSet<Constellation> {
        let mut all: BTreeSet<Constellation> = self.constellations.iter().cloned().collect();
        all.extend(self.observations.iter().map(|o| {
            Constellation::new(
                o.procedure.clone(),
                o.observable_property.clone(),
                o.offering.clone(),
                Some(o.observation_type),
            )
        }));
        all
    }
}
