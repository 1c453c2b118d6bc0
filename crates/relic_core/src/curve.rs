//! Piecewise-linear keyframe curves.
//!
//! Weapons describe accuracy falloff and high-ground advantage with
//! curves authored as `[x, y]` pairs. Evaluation interpolates linearly
//! between neighbouring keys and clamps to the end keys outside the
//! authored range.

use serde::{Deserialize, Serialize};

use crate::math::{decimal_serde, Fixed};

/// A single `(x, y)` key on a [`Curve`].
///
/// Serialized as a two-element sequence so content files can write
/// `[0.5, 0.8]` (JSON) or `(0.5, 0.8)` (RON).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CurveKey(
    #[serde(with = "decimal_serde")] pub Fixed,
    #[serde(with = "decimal_serde")] pub Fixed,
);

impl CurveKey {
    /// Create a key from fixed-point coordinates.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self(x, y)
    }

    /// Input coordinate.
    #[must_use]
    pub const fn x(self) -> Fixed {
        self.0
    }

    /// Output coordinate.
    #[must_use]
    pub const fn y(self) -> Fixed {
        self.1
    }
}

/// Piecewise-linear curve over fixed-point keys, sorted by `x`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "Vec<CurveKey>", into = "Vec<CurveKey>")]
pub struct Curve {
    keys: Vec<CurveKey>,
}

impl From<Vec<CurveKey>> for Curve {
    fn from(keys: Vec<CurveKey>) -> Self {
        Self::new(keys)
    }
}

impl From<Curve> for Vec<CurveKey> {
    fn from(curve: Curve) -> Self {
        curve.keys
    }
}

impl Curve {
    /// Build a curve, sorting keys by `x`.
    #[must_use]
    pub fn new(mut keys: Vec<CurveKey>) -> Self {
        keys.sort_by_key(|k| k.x());
        Self { keys }
    }

    /// Build a curve from decimal pairs. Intended for defaults and tests.
    #[must_use]
    pub fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        Self::new(
            pairs
                .iter()
                .map(|&(x, y)| CurveKey::new(Fixed::from_num(x), Fixed::from_num(y)))
                .collect(),
        )
    }

    /// A curve that always returns `value`.
    #[must_use]
    pub fn constant(value: Fixed) -> Self {
        Self {
            keys: vec![CurveKey::new(Fixed::ZERO, value)],
        }
    }

    /// Default range falloff: full accuracy at point blank, half at the
    /// effective range, nearly nothing at twice the effective range.
    #[must_use]
    pub fn default_range_falloff() -> Self {
        Self::from_pairs(&[(0.0, 1.0), (1.0, 0.5), (2.0, 0.1)])
    }

    /// Default elevation curve: neutral on level ground, +/-30% at a
    /// height difference of 10 units.
    #[must_use]
    pub fn default_elevation_bonus() -> Self {
        Self::from_pairs(&[(-10.0, -0.3), (0.0, 0.0), (10.0, 0.3)])
    }

    /// Keys in ascending `x` order.
    #[must_use]
    pub fn keys(&self) -> &[CurveKey] {
        &self.keys
    }

    /// Whether the curve has no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Evaluate the curve at `x`, returning `empty_value` for a curve
    /// with no keys.
    #[must_use]
    pub fn evaluate_or(&self, x: Fixed, empty_value: Fixed) -> Fixed {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return empty_value;
        };

        if x <= first.x() {
            return first.y();
        }
        if x >= last.x() {
            return last.y();
        }

        // First key strictly to the right of x; the previous key is <= x.
        let upper = self.keys.partition_point(|k| k.x() <= x);
        let a = self.keys[upper - 1];
        let b = self.keys[upper];

        let span = b.x() - a.x();
        if span == Fixed::ZERO {
            return b.y();
        }
        let t = (x - a.x()) / span;
        a.y() + (b.y() - a.y()) * t
    }

    /// Structural problems that make the curve ambiguous.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        self.keys
            .windows(2)
            .filter(|pair| pair[0].x() == pair[1].x())
            .map(|pair| format!("duplicate key at x = {}", pair[0].x()))
            .collect()
    }

    /// Whether each key's `y` is no greater than the one before it.
    #[must_use]
    pub fn is_non_increasing(&self) -> bool {
        self.keys.windows(2).all(|pair| pair[1].y() <= pair[0].y())
    }

    /// Whether each key's `y` is no less than the one before it.
    #[must_use]
    pub fn is_non_decreasing(&self) -> bool {
        self.keys.windows(2).all(|pair| pair[1].y() >= pair[0].y())
    }
}
