//! Engine settings.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::model::Locale;

/// Settings that shape a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSettings {
    /// Worker threads per batch; `0` means one per CPU.
    pub threads: usize,
    /// Skip tasks not yet started this long after the rebuild began.
    pub deadline: Option<Duration>,
    /// Spatial reference codes advertised in addition to the store's.
    pub extra_srids: BTreeSet<i32>,
    /// Language always advertised, even if the store has no localized text.
    pub default_language: Option<Locale>,
}

impl CacheSettings {
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}
