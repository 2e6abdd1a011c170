//! Observation types and their probe priority.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const OM_PREFIX: &str = "http://www.opengis.net/def/observationType/OGC-OM/2.0/";

/// Kind of result carried by an observation.
///
/// The declaration order is the probe priority used when types have to be
/// discovered by asking the store per type: the first type the store
/// confirms wins. See [`ObservationType::PROBE_ORDER`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationType {
    Numeric,
    Category,
    Count,
    Text,
    Boolean,
    Opaque,
    Geometry,
    Array,
    Complex,
    Profile,
    Reference,
}

impl ObservationType {
    /// Fixed probe order for the per-type store predicates.
    pub const PROBE_ORDER: [ObservationType; 11] = [
        ObservationType::Numeric,
        ObservationType::Category,
        ObservationType::Count,
        ObservationType::Text,
        ObservationType::Boolean,
        ObservationType::Opaque,
        ObservationType::Geometry,
        ObservationType::Array,
        ObservationType::Complex,
        ObservationType::Profile,
        ObservationType::Reference,
    ];

    /// Identifier URI advertised for this type.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Numeric => "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_Measurement",
            Self::Category => {
                "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_CategoryObservation"
            }
            Self::Count => "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_CountObservation",
            Self::Text => "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_TextObservation",
            Self::Boolean => "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_TruthObservation",
            Self::Opaque => "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_Observation",
            Self::Geometry => {
                "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_GeometryObservation"
            }
            Self::Array => "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_SWEArrayObservation",
            Self::Complex => {
                "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_ComplexObservation"
            }
            Self::Profile => "http://www.opengis.net/def/observationType/profile",
            Self::Reference => {
                "http://www.opengis.net/def/observationType/OGC-OM/2.0/OM_ReferenceObservation"
            }
        }
    }
}

impl fmt::Display for ObservationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.uri())
    }
}

/// Error returned when a string is not a known observation type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown observation type: {0}")]
pub struct UnknownObservationType(pub String);

impl FromStr for ObservationType {
    type Err = UnknownObservationType;

    /// Accepts the full URI, the bare `OM_*` suffix, or the short snake-case name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(found) = Self::PROBE_ORDER.iter().find(|t| t.uri() == trimmed) {
            return Ok(*found);
        }
        let short = trimmed.strip_prefix(OM_PREFIX).unwrap_or(trimmed);
        match short.to_ascii_lowercase().as_str() {
            "numeric" | "om_measurement" => Ok(Self::Numeric),
            "category" | "om_categoryobservation" => Ok(Self::Category),
            "count" | "om_countobservation" => Ok(Self::Count),
            "text" | "om_textobservation" => Ok(Self::Text),
            "boolean" | "om_truthobservation" => Ok(Self::Boolean),
            "opaque" | "om_observation" => Ok(Self::Opaque),
            "geometry" | "om_geometryobservation" => Ok(Self::Geometry),
            "array" | "om_swearrayobservation" => Ok(Self::Array),
            "complex" | "om_complexobservation" => Ok(Self::Complex),
            "profile" => Ok(Self::Profile),
            "reference" | "om_referenceobservation" => Ok(Self::Reference),
            _ => Err(UnknownObservationType(s.to_string())),
        }
    }
}
