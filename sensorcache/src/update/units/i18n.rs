//! Supported-language enumeration.

use super::{CacheUpdate, UpdateContext};
use crate::update::error::CacheUpdateError;

pub struct I18nUpdate;

impl CacheUpdate for I18nUpdate {
    fn name(&self) -> &'static str {
        "i18n"
    }

    fn execute(&self, ctx: &UpdateContext<'_>) -> Vec<CacheUpdateError> {
        if let Some(default) = &ctx.settings.default_language {
            ctx.builder.add_supported_languages([default.clone()]);
        }

        let mut session = match ctx.session(self.name()) {
            Ok(session) => session,
            Err(e) => return vec![e],
        };

        match session.available_locales() {
            Ok(locales) => {
                ctx.builder.add_supported_languages(locales);
                Vec::new()
            }
            Err(e) => vec![CacheUpdateError::query(self.name(), e)],
        }
    }
}
