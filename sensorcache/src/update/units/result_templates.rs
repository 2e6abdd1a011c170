//! Result-template indexing.

use super::{CacheUpdate, UpdateContext};
use crate::cache::ResultTemplateEntry;
use crate::update::error::CacheUpdateError;

pub struct ResultTemplateUpdate;

impl CacheUpdate for ResultTemplateUpdate {
    fn name(&self) -> &'static str {
        "result_templates"
    }

    fn execute(&self, ctx: &UpdateContext<'_>) -> Vec<CacheUpdateError> {
        let mut session = match ctx.session(self.name()) {
            Ok(session) => session,
            Err(e) => return vec![e],
        };

        match session.list_result_templates() {
            Ok(templates) => {
                for t in templates {
                    ctx.builder.insert_result_template(ResultTemplateEntry {
                        id: t.id,
                        offering: t.offering,
                        observable_property: t.observable_property,
                        feature_of_interest: t.feature_of_interest,
                    });
                }
                Vec::new()
            }
            Err(e) => vec![CacheUpdateError::query(self.name(), e)],
        }
    }
}
