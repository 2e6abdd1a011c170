//! Spatial envelopes.
//!
//! An [`Envelope`] is an axis-aligned bounding rectangle tagged with the
//! spatial reference code its coordinates are expressed in. Envelopes are
//! combined with [`Envelope::union`]; there is no "empty" envelope, an absent
//! extent is modelled as `Option<Envelope>`.

use std::fmt;

use geo_types::{coord, Rect};
use serde::{Deserialize, Serialize};

/// Spatial reference code used when none is given (WGS 84).
pub const DEFAULT_SRID: i32 = 4326;

/// Axis-aligned bounding rectangle with its spatial reference code.
///
/// # Example
///
/// ```
/// use sensorcache::model::Envelope;
///
/// let a = Envelope::new(4326, 0.0, 0.0, 1.0, 1.0);
/// let b = Envelope::new(4326, 2.0, -1.0, 3.0, 0.5);
/// let union = a.union(&b);
///
/// assert_eq!(union.min_x(), 0.0);
/// assert_eq!(union.min_y(), -1.0);
/// assert_eq!(union.max_x(), 3.0);
/// assert_eq!(union.max_y(), 1.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Spatial reference code (EPSG).
    pub srid: i32,
    /// Bounding rectangle.
    pub rect: Rect<f64>,
}

impl Envelope {
    /// Create an envelope from corner coordinates.
    ///
    /// Corners may be given in any order; `Rect` normalizes them.
    pub fn new(srid: i32, min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            srid,
            rect: Rect::new(coord! { x: min_x, y: min_y }, coord! { x: max_x, y: max_y }),
        }
    }

    /// Wrap an existing rectangle.
    pub fn from_rect(srid: i32, rect: Rect<f64>) -> Self {
        Self { srid, rect }
    }

    pub fn min_x(&self) -> f64 {
        self.rect.min().x
    }

    pub fn min_y(&self) -> f64 {
        self.rect.min().y
    }

    pub fn max_x(&self) -> f64 {
        self.rect.max().x
    }

    pub fn max_y(&self) -> f64 {
        self.rect.max().y
    }

    /// Whether every corner coordinate is a finite number.
    ///
    /// Stores occasionally hand back NaN or infinite extents for broken
    /// geometries; such envelopes must not enter the cache.
    pub fn is_finite(&self) -> bool {
        [self.min_x(), self.min_y(), self.max_x(), self.max_y()]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Smallest envelope covering both `self` and `other`.
    ///
    /// The result keeps `self`'s spatial reference code.
    pub fn union(&self, other: &Envelope) -> Envelope {
        Envelope::new(
            self.srid,
            self.min_x().min(other.min_x()),
            self.min_y().min(other.min_y()),
            self.max_x().max(other.max_x()),
            self.max_y().max(other.max_y()),
        )
    }

    /// Fold an iterator of envelopes into their union.
    ///
    /// Returns `None` for an empty iterator.
    pub fn union_all<'a>(envelopes: impl IntoIterator<Item = &'a Envelope>) -> Option<Envelope> {
        envelopes
            .into_iter()
            .fold(None, |acc: Option<Envelope>, env| match acc {
                Some(current) => Some(current.union(env)),
                None => Some(*env),
            })
    }

    /// Check if this envelope fully contains another.
    pub fn contains(&self, other: &Envelope) -> bool {
        self.min_x() <= other.min_x()
            && self.min_y() <= other.min_y()
            && self.max_x() >= other.max_x()
            && self.max_y() >= other.max_y()
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EPSG:{} [{}, {}, {}, {}]",
            self.srid,
            self.min_x(),
            self.min_y(),
            self.max_x(),
            self.max_y()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_corners() {
        let env = Envelope::new(4326, 5.0, 6.0, 1.0, 2.0);
        assert_eq!(env.min_x(), 1.0);
        assert_eq!(env.min_y(), 2.0);
        assert_eq!(env.max_x(), 5.0);
        assert_eq!(env.max_y(), 6.0);
    }

    #[test]
    fn test_union_covers_both() {
        let a = Envelope::new(4326, 0.0, 0.0, 1.0, 1.0);
        let b = Envelope::new(4326, 0.5, 0.5, 2.0, 3.0);
        let union = a.union(&b);

        assert!(union.contains(&a));
        assert!(union.contains(&b));
        assert_eq!(union, Envelope::new(4326, 0.0, 0.0, 2.0, 3.0));
    }

    #[test]
    fn test_union_all_empty_is_none() {
        let none: Vec<Envelope> = Vec::new();
        assert!(Envelope::union_all(&none).is_none());
    }

    #[test]
    fn test_union_all_is_order_independent() {
        let envs = vec![
            Envelope::new(4326, 0.0, 0.0, 1.0, 1.0),
            Envelope::new(4326, -3.0, 2.0, -2.0, 4.0),
            Envelope::new(4326, 7.0, -1.0, 8.0, 0.0),
        ];
        let mut reversed = envs.clone();
        reversed.reverse();

        assert_eq!(Envelope::union_all(&envs), Envelope::union_all(&reversed));
    }

    #[test]
    fn test_is_finite_rejects_nan() {
        let env = Envelope::new(4326, f64::NAN, 0.0, 1.0, 1.0);
        assert!(!env.is_finite());
        assert!(Envelope::new(4326, 0.0, 0.0, 1.0, 1.0).is_finite());
    }

    #[test]
    fn test_display() {
        let env = Envelope::new(31467, 1.0, 2.0, 3.0, 4.0);
        assert_eq!(env.to_string(), "EPSG:31467 [1, 2, 3, 4]");
    }
}
