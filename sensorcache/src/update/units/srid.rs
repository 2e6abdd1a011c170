//! Spatial reference code discovery.

use tracing::debug;

use super::{CacheUpdate, UpdateContext};
use crate::update::error::CacheUpdateError;

/// Reads the store's native spatial reference code and advertises it
/// together with the configured extra codes.
pub struct SridUpdate;

impl CacheUpdate for SridUpdate {
    fn name(&self) -> &'static str {
        "srid"
    }

    fn execute(&self, ctx: &UpdateContext<'_>) -> Vec<CacheUpdateError> {
        // Configured codes are advertised even when the store is unreachable.
        ctx.builder
            .add_spatial_reference_codes(ctx.settings.extra_srids.iter().copied());

        let mut session = match ctx.session(self.name()) {
            Ok(session) => session,
            Err(e) => return vec![e],
        };

        match session.supported_spatial_reference_code() {
            Ok(code) => {
                debug!(srid = code, "Store spatial reference code");
                ctx.builder.set_default_spatial_reference_code(code);
                ctx.builder.add_spatial_reference_codes([code]);
                Vec::new()
            }
            Err(e) => vec![CacheUpdateError::query(self.name(), e)],
        }
    }
}
