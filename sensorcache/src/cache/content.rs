//! The published cache snapshot.
//!
//! [`ContentCache`] is immutable once built. Request handlers read from it
//! through the lookup methods below; none of them touches the store.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Envelope, Locale, ObservationType, TimeExtrema};

/// Cached metadata of one offering.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferingEntry {
    pub id: String,
    /// Human-readable name (explicit or derived from the id).
    pub name: String,
    pub localized_names: BTreeMap<Locale, String>,
    pub localized_descriptions: BTreeMap<Locale, String>,
    /// Top-level procedures of the offering.
    pub procedures: BTreeSet<String>,
    /// Linked procedures that descend from one of `procedures`.
    pub hidden_child_procedures: BTreeSet<String>,
    pub observable_properties: BTreeSet<String>,
    /// Observation types found in the offering's observations.
    pub observation_types: BTreeSet<ObservationType>,
    /// Observation types the offering declares as allowed.
    pub allowed_observation_types: BTreeSet<ObservationType>,
    /// Feature types of the offering's features of interest.
    pub feature_types: BTreeSet<String>,
    /// Feature types the offering declares as allowed.
    pub allowed_feature_types: BTreeSet<String>,
    pub related_features: BTreeSet<String>,
    pub features_of_interest: BTreeSet<String>,
    pub envelope: Option<Envelope>,
    pub phenomenon_time: TimeExtrema,
    pub result_time: TimeExtrema,
}

/// Cached metadata of one procedure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcedureEntry {
    pub id: String,
    pub name: String,
    pub is_type: bool,
    pub is_aggregation: bool,
    pub type_of: Option<String>,
    /// Declared parents.
    pub parents: BTreeSet<String>,
    /// Transitive closure of `parents`.
    pub ancestors: BTreeSet<String>,
    /// Procedures that declare this one as a parent.
    pub children: BTreeSet<String>,
    /// Ancestors marked published because this procedure is published.
    pub published_ancestors: BTreeSet<String>,
    pub description_formats: BTreeSet<String>,
    pub offerings: BTreeSet<String>,
    pub observable_properties: BTreeSet<String>,
    pub phenomenon_time: TimeExtrema,
}

/// Cached metadata of one observable property.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservablePropertyEntry {
    pub id: String,
    pub name: String,
    pub is_composite: bool,
    /// All descendants, if composite.
    pub children: BTreeSet<String>,
    /// All composites containing this property.
    pub parents: BTreeSet<String>,
    pub offerings: BTreeSet<String>,
    pub procedures: BTreeSet<String>,
}

/// Cached metadata of one feature of interest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureOfInterestEntry {
    pub id: String,
    pub name: String,
    pub feature_type: Option<String>,
    pub parents: BTreeSet<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultTemplateEntry {
    pub id: String,
    pub offering: String,
    pub observable_property: String,
    pub feature_of_interest: String,
}

/// Number of entries per map.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheCounts {
    pub offerings: usize,
    pub procedures: usize,
    pub observable_properties: usize,
    pub features_of_interest: usize,
    pub result_templates: usize,
}

/// Immutable snapshot of all service metadata.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentCache {
    pub(crate) offerings: BTreeMap<String, OfferingEntry>,
    pub(crate) procedures: BTreeMap<String, ProcedureEntry>,
    pub(crate) observable_properties: BTreeMap<String, ObservablePropertyEntry>,
    pub(crate) features_of_interest: BTreeMap<String, FeatureOfInterestEntry>,
    pub(crate) result_templates: BTreeMap<String, ResultTemplateEntry>,
    pub(crate) related_feature_roles: BTreeMap<String, BTreeSet<String>>,
    pub(crate) supported_languages: BTreeSet<Locale>,
    pub(crate) supported_spatial_reference_codes: BTreeSet<i32>,
    pub(crate) default_spatial_reference_code: Option<i32>,
    pub(crate) published_procedures: BTreeSet<String>,
    pub(crate) global_envelope: Option<Envelope>,
    pub(crate) built_at: Option<DateTime<Utc>>,
}

/// Snapshots compare by content; the build time is ignored.
impl PartialEq for ContentCache {
    fn eq(&self, other: &Self) -> bool {
        self.offerings == other.offerings
            && self.procedures == other.procedures
            && self.observable_properties == other.observable_properties
            && self.features_of_interest == other.features_of_interest
            && self.result_templates == other.result_templates
            && self.related_feature_roles == other.related_feature_roles
            && self.supported_languages == other.supported_languages
            && self.supported_spatial_reference_codes == other.supported_spatial_reference_codes
            && self.default_spatial_reference_code == other.default_spatial_reference_code
            && self.published_procedures == other.published_procedures
            && self.global_envelope == other.global_envelope
    }
}

fn set_or_empty<'a>(set: Option<&'a BTreeSet<String>>) -> &'a BTreeSet<String> {
    static EMPTY: BTreeSet<String> = BTreeSet::new();
    set.unwrap_or(&EMPTY)
}

impl ContentCache {
    /// An empty snapshot, served before the first rebuild completes.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.offerings.is_empty()
            && self.procedures.is_empty()
            && self.observable_properties.is_empty()
            && self.features_of_interest.is_empty()
    }

    /// When the snapshot was built.
    pub fn built_at(&self) -> Option<DateTime<Utc>> {
        self.built_at
    }

    // =========================================================================
    // Entity lookups
    // =========================================================================

    pub fn offering(&self, id: &str) -> Option<&OfferingEntry> {
        self.offerings.get(id)
    }

    pub fn procedure(&self, id: &str) -> Option<&ProcedureEntry> {
        self.procedures.get(id)
    }

    pub fn observable_property(&self, id: &str) -> Option<&ObservablePropertyEntry> {
        self.observable_properties.get(id)
    }

    pub fn feature_of_interest(&self, id: &str) -> Option<&FeatureOfInterestEntry> {
        self.features_of_interest.get(id)
    }

    pub fn offerings(&self) -> impl Iterator<Item = &OfferingEntry> {
        self.offerings.values()
    }

    pub fn procedures(&self) -> impl Iterator<Item = &ProcedureEntry> {
        self.procedures.values()
    }

    pub fn observable_properties(&self) -> impl Iterator<Item = &ObservablePropertyEntry> {
        self.observable_properties.values()
    }

    pub fn features_of_interest(&self) -> impl Iterator<Item = &FeatureOfInterestEntry> {
        self.features_of_interest.values()
    }

    // =========================================================================
    // Offering queries
    // =========================================================================

    pub fn procedures_for_offering(&self, offering: &str) -> &BTreeSet<String> {
        set_or_empty(self.offerings.get(offering).map(|o| &o.procedures))
    }

    pub fn hidden_child_procedures_for_offering(&self, offering: &str) -> &BTreeSet<String> {
        set_or_empty(self.offerings.get(offering).map(|o| &o.hidden_child_procedures))
    }

    pub fn observable_properties_for_offering(&self, offering: &str) -> &BTreeSet<String> {
        set_or_empty(self.offerings.get(offering).map(|o| &o.observable_properties))
    }

    pub fn features_for_offering(&self, offering: &str) -> &BTreeSet<String> {
        set_or_empty(self.offerings.get(offering).map(|o| &o.features_of_interest))
    }

    pub fn envelope_for_offering(&self, offering: &str) -> Option<&Envelope> {
        self.offerings.get(offering).and_then(|o| o.envelope.as_ref())
    }

    /// Human-readable name of any cached entity.
    ///
    /// Offerings are looked up first, then procedures, observable properties
    /// and features of interest.
    pub fn human_readable_name(&self, id: &str) -> Option<&str> {
        if let Some(o) = self.offerings.get(id) {
            return Some(&o.name);
        }
        if let Some(p) = self.procedures.get(id) {
            return Some(&p.name);
        }
        if let Some(p) = self.observable_properties.get(id) {
            return Some(&p.name);
        }
        self.features_of_interest.get(id).map(|f| f.name.as_str())
    }

    /// Result templates registered for an offering.
    pub fn result_templates_for_offering<'a>(
        &'a self,
        offering: &'a str,
    ) -> impl Iterator<Item = &'a ResultTemplateEntry> + 'a {
        self.result_templates
            .values()
            .filter(move |t| t.offering == offering)
    }

    // =========================================================================
    // Procedure and property queries
    // =========================================================================

    pub fn offerings_for_procedure(&self, procedure: &str) -> &BTreeSet<String> {
        set_or_empty(self.procedures.get(procedure).map(|p| &p.offerings))
    }

    pub fn ancestors_of_procedure(&self, procedure: &str) -> &BTreeSet<String> {
        set_or_empty(self.procedures.get(procedure).map(|p| &p.ancestors))
    }

    /// Whether the procedure is published, directly or through a published
    /// descendant.
    pub fn is_published_procedure(&self, procedure: &str) -> bool {
        self.published_procedures.contains(procedure)
    }

    pub fn published_procedures(&self) -> &BTreeSet<String> {
        &self.published_procedures
    }

    pub fn children_of_composite(&self, property: &str) -> &BTreeSet<String> {
        set_or_empty(self.observable_properties.get(property).map(|p| &p.children))
    }

    pub fn roles_for_related_feature(&self, feature: &str) -> &BTreeSet<String> {
        set_or_empty(self.related_feature_roles.get(feature))
    }

    // =========================================================================
    // Service-wide values
    // =========================================================================

    pub fn global_envelope(&self) -> Option<&Envelope> {
        self.global_envelope.as_ref()
    }

    pub fn supported_languages(&self) -> &BTreeSet<Locale> {
        &self.supported_languages
    }

    pub fn supported_spatial_reference_codes(&self) -> &BTreeSet<i32> {
        &self.supported_spatial_reference_codes
    }

    pub fn default_spatial_reference_code(&self) -> Option<i32> {
        self.default_spatial_reference_code
    }

    pub fn counts(&self) -> CacheCounts {
        CacheCounts {
            offerings: self.offerings.len(),
            procedures: self.procedures.len(),
            observable_properties: self.observable_properties.len(),
            features_of_interest: self.features_of_interest.len(),
            result_templates: self.result_templates.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache() -> ContentCache {
        let mut cache = ContentCache::empty();
        cache.offerings.insert(
            "O1".into(),
            OfferingEntry {
                id: "O1".into(),
                name: "Offering one".into(),
                procedures: BTreeSet::from(["P1".to_string()]),
                ..Default::default()
            },
        );
        cache.procedures.insert(
            "P1".into(),
            ProcedureEntry {
                id: "P1".into(),
                name: "P1".into(),
                ..Default::default()
            },
        );
        cache.result_templates.insert(
            "T1".into(),
            ResultTemplateEntry {
                id: "T1".into(),
                offering: "O1".into(),
                observable_property: "temp".into(),
                feature_of_interest: "F1".into(),
            },
        );
        cache
    }

    #[test]
    fn test_lookups() {
        let cache = cache();
        assert_eq!(
            cache.procedures_for_offering("O1"),
            &BTreeSet::from(["P1".to_string()])
        );
        assert!(cache.procedures_for_offering("missing").is_empty());
        assert_eq!(cache.human_readable_name("O1"), Some("Offering one"));
        assert_eq!(cache.human_readable_name("P1"), Some("P1"));
        assert_eq!(cache.human_readable_name("nothing"), None);
        assert_eq!(cache.result_templates_for_offering("O1").count(), 1);
        assert_eq!(cache.result_templates_for_offering("O2").count(), 0);
    }

    #[test]
    fn test_equality_ignores_build_time() {
        let a = cache();
        let mut b = cache();
        b.built_at = Some(Utc::now());
        assert_eq!(a, b);

        b.supported_spatial_reference_codes.insert(4326);
        assert_ne!(a, b);
    }

    #[test]
    fn test_counts() {
        let counts = cache().counts();
        assert_eq!(counts.offerings, 1);
        assert_eq!(counts.procedures, 1);
        assert_eq!(counts.result_templates, 1);
        assert_eq!(counts.features_of_interest, 0);
    }
}
