//! Domain types shared by the store facade, the update engine and the
//! published cache.

mod envelope;
mod locale;
mod observation_type;
mod records;
mod time;

pub use envelope::{Envelope, DEFAULT_SRID};
pub use locale::Locale;
pub use observation_type::{ObservationType, UnknownObservationType};
pub use records::{
    Constellation, FeatureRecord, ObservablePropertyRecord, OfferingRecord, ProcedureRecord,
    RelatedFeatureRecord, ResultTemplateRecord,
};
pub use time::{OfferingTimeExtrema, TimeExtrema};

/// Feature type reported for features whose type is not known.
///
/// It is never advertised as an allowed feature type.
pub const UNKNOWN_FEATURE_TYPE: &str = "http://www.opengis.net/def/nil/OGC/0/unknown";
