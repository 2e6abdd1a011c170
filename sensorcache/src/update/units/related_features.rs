//! Related-feature role mapping.

use super::{CacheUpdate, UpdateContext};
use crate::update::error::CacheUpdateError;

/// Records the roles of every related feature and remembers which
/// offerings each one belongs to for the offering batch.
pub struct RelatedFeaturesUpdate;

impl CacheUpdate for RelatedFeaturesUpdate {
    fn name(&self) -> &'static str {
        "related_features"
    }

    fn execute(&self, ctx: &UpdateContext<'_>) -> Vec<CacheUpdateError> {
        let mut session = match ctx.session(self.name()) {
            Ok(session) => session,
            Err(e) => return vec![e],
        };

        let related = match session.list_related_features() {
            Ok(related) => related,
            Err(e) => return vec![CacheUpdateError::query(self.name(), e)],
        };

        for feature in related {
            for offering in &feature.offerings {
                ctx.builder.add_offering_related_feature(offering, &feature.id);
            }
            ctx.builder.set_related_feature_roles(&feature.id, feature.roles);
        }
        Vec::new()
    }
}
