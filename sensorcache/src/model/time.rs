//! Temporal extents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Minimum and maximum timestamp observed for an entity.
///
/// Both bounds are `None` when the entity has no observations; a zero
/// timestamp is never used as a placeholder.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeExtrema {
    pub min: Option<DateTime<Utc>>,
    pub max: Option<DateTime<Utc>>,
}

impl TimeExtrema {
    /// Extrema with both bounds set.
    pub fn new(min: DateTime<Utc>, max: DateTime<Utc>) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    /// Extrema of a single instant.
    pub fn instant(at: DateTime<Utc>) -> Self {
        Self::new(at, at)
    }

    /// Whether neither bound is set.
    pub fn is_empty(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// Whether `min <= max` (trivially true when either bound is unset).
    pub fn is_ordered(&self) -> bool {
        match (self.min, self.max) {
            (Some(min), Some(max)) => min <= max,
            _ => true,
        }
    }

    /// Widen these extrema to include `other`.
    pub fn merge(&self, other: &TimeExtrema) -> TimeExtrema {
        TimeExtrema {
            min: earliest(self.min, other.min),
            max: latest(self.max, other.max),
        }
    }

    /// Widen these extrema to include a single instant.
    pub fn include(&mut self, at: DateTime<Utc>) {
        *self = self.merge(&TimeExtrema::instant(at));
    }
}

fn earliest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}

fn latest(a: Option<DateTime<Utc>>, b: Option<DateTime<Utc>>) -> Option<DateTime<Utc>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

/// Phenomenon- and result-time extrema of one offering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferingTimeExtrema {
    pub phenomenon_time: TimeExtrema,
    pub result_time: TimeExtrema,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_default_is_empty() {
        let extrema = TimeExtrema::default();
        assert!(extrema.is_empty());
        assert!(extrema.is_ordered());
    }

    #[test]
    fn test_merge_widens() {
        let a = TimeExtrema::new(at(3), at(5));
        let b = TimeExtrema::new(at(1), at(4));
        assert_eq!(a.merge(&b), TimeExtrema::new(at(1), at(5)));
    }

    #[test]
    fn test_merge_with_empty_keeps_bounds() {
        let a = TimeExtrema::new(at(3), at(5));
        assert_eq!(a.merge(&TimeExtrema::default()), a);
        assert_eq!(TimeExtrema::default().merge(&a), a);
    }

    #[test]
    fn test_include_instant() {
        let mut extrema = TimeExtrema::default();
        extrema.include(at(7));
        extrema.include(at(2));
        assert_eq!(extrema, TimeExtrema::new(at(2), at(7)));
    }

    #[test]
    fn test_inverted_is_not_ordered() {
        let extrema = TimeExtrema::new(at(9), at(1));
        assert!(!extrema.is_ordered());
    }
}
