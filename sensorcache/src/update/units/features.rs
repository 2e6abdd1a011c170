//! Feature-of-interest indexing.
//!
//! Runs before the offering batch so that offerings can resolve the feature
//! types of their features from the builder.

use std::collections::BTreeSet;

use super::{drop_unidentified, CacheUpdate, UpdateContext};
use crate::cache::FeatureOfInterestEntry;
use crate::update::error::{Anomaly, CacheUpdateError};

pub struct FeatureOfInterestUpdate;

impl CacheUpdate for FeatureOfInterestUpdate {
    fn name(&self) -> &'static str {
        "features_of_interest"
    }

    fn execute(&self, ctx: &UpdateContext<'_>) -> Vec<CacheUpdateError> {
        let mut session = match ctx.session(self.name()) {
            Ok(session) => session,
            Err(e) => return vec![e],
        };

        let features = match session.list_features_of_interest() {
            Ok(features) => features,
            Err(e) => return vec![CacheUpdateError::query(self.name(), e)],
        };

        let mut errors = Vec::new();
        let features = drop_unidentified(self.name(), features, |f| f.id.as_str(), &mut errors);
        let known: BTreeSet<&str> = features.iter().map(|f| f.id.as_str()).collect();
        let mut entries = Vec::with_capacity(features.len());

        for feature in &features {
            let mut parents = BTreeSet::new();
            for parent in &feature.parents {
                if known.contains(parent.as_str()) {
                    parents.insert(parent.clone());
                } else {
                    errors.push(CacheUpdateError::anomaly(
                        self.name(),
                        &feature.id,
                        Anomaly::UnknownReference {
                            kind: "feature of interest",
                            id: parent.clone(),
                        },
                    ));
                }
            }
            entries.push(FeatureOfInterestEntry {
                id: feature.id.clone(),
                name: feature.name.clone().unwrap_or_else(|| feature.id.clone()),
                feature_type: feature.feature_type.clone(),
                parents,
            });
        }

        for entry in entries {
            ctx.builder.insert_feature_of_interest(entry);
        }
        errors
    }
}
