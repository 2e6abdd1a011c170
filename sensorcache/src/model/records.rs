//! Records read from the backing store.
//!
//! These are the raw rows the cache update units consume. They carry only
//! what the store knows about an entity itself; derived relationships are
//! computed by the engine.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{Locale, ObservationType};

/// An offering as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferingRecord {
    pub id: String,
    /// Explicit human-readable name, if one is stored.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub names: BTreeMap<Locale, String>,
    #[serde(default)]
    pub descriptions: BTreeMap<Locale, String>,
    /// Related features the entity already carries.
    #[serde(default)]
    pub related_features: BTreeSet<String>,
    /// Observation types the entity declares as allowed.
    #[serde(default)]
    pub observation_types: BTreeSet<ObservationType>,
    /// Feature types the entity declares as allowed.
    #[serde(default)]
    pub feature_types: BTreeSet<String>,
}

impl OfferingRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_localized_name(mut self, locale: impl Into<Locale>, name: impl Into<String>) -> Self {
        self.names.insert(locale.into(), name.into());
        self
    }
}

/// A procedure (sensor or process) as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Whether this is a type definition rather than a concrete instance.
    #[serde(default)]
    pub is_type: bool,
    /// Whether this procedure aggregates child procedures.
    #[serde(default)]
    pub is_aggregation: bool,
    /// Type definition this instance belongs to.
    #[serde(default)]
    pub type_of: Option<String>,
    #[serde(default = "default_published")]
    pub published: bool,
    #[serde(default)]
    pub description_formats: BTreeSet<String>,
}

fn default_published() -> bool {
    true
}

impl ProcedureRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            is_type: false,
            is_aggregation: false,
            type_of: None,
            published: true,
            description_formats: BTreeSet::new(),
        }
    }

    pub fn with_type_of(mut self, type_of: impl Into<String>) -> Self {
        self.type_of = Some(type_of.into());
        self
    }

    pub fn unpublished(mut self) -> Self {
        self.published = false;
        self
    }
}

/// An observable property (phenomenon) as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservablePropertyRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl ObservablePropertyRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }
}

/// A feature of interest as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub feature_type: Option<String>,
    #[serde(default)]
    pub parents: BTreeSet<String>,
}

impl FeatureRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, feature_type: impl Into<String>) -> Self {
        self.feature_type = Some(feature_type.into());
        self
    }
}

/// A related feature with the roles it plays and the offerings it belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedFeatureRecord {
    pub id: String,
    #[serde(default)]
    pub roles: BTreeSet<String>,
    #[serde(default)]
    pub offerings: BTreeSet<String>,
}

/// A stored result template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTemplateRecord {
    pub id: String,
    pub offering: String,
    pub observable_property: String,
    pub feature_of_interest: String,
}

/// A known (procedure, observable property, offering, observation type) combination.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Constellation {
    pub procedure: String,
    pub observable_property: String,
    pub offering: String,
    #[serde(default)]
    pub observation_type: Option<ObservationType>,
}

impl Constellation {
    pub fn new(
        procedure: impl Into<String>,
        observable_property: impl Into<String>,
        offering: impl Into<String>,
        observation_type: Option<ObservationType>,
    ) -> Self {
        Self {
            procedure: procedure.into(),
            observable_property: observable_property.into(),
            offering: offering.into(),
            observation_type,
        }
    }
}
