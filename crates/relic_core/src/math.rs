//! Fixed-point math utilities for deterministic simulation.
//!
//! All combat simulation uses fixed-point arithmetic so that a burst
//! resolved with the same seed produces bit-identical results on every
//! platform. Floating-point values only appear at the data boundary,
//! where authored decimals are converted once at load time.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
/// Range: approximately -2,147,483,648 to 2,147,483,647
/// Precision: approximately 0.00000000023
pub type Fixed = I32F32;

/// Fixed-point 3D vector.
///
/// `y` is the vertical axis: a unit's elevation above the table plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec3Fixed {
    /// X coordinate (table plane).
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate (elevation).
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
    /// Z coordinate (table plane).
    #[serde(with = "fixed_serde")]
    pub z: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for human-authored decimal numbers.
///
/// Content files are written by designers, so numbers appear as plain
/// decimals (`0.7`, `20`) rather than raw bits. The conversion happens
/// once at load; the simulation only ever sees the resulting [`Fixed`].
pub mod decimal_serde {
    use super::Fixed;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_num::<f64>().serialize(serializer)
    }

    /// Deserialize a fixed-point number from a decimal.
    ///
    /// Values outside the representable range are rejected instead of
    /// wrapping.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| D::Error::custom(format!("number {value} is out of range")))
    }
}

impl Vec3Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed, z: Fixed) -> Self {
        Self { x, y, z }
    }

    /// Create a vector from integer coordinates.
    #[must_use]
    pub fn from_ints(x: i32, y: i32, z: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y), Fixed::from_num(z))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
        z: Fixed::ZERO,
    };

    /// Elevation of this point (its `y` component).
    #[must_use]
    pub const fn elevation(self) -> Fixed {
        self.y
    }

    /// Squared distance in the table plane, ignoring elevation.
    #[must_use]
    pub fn horizontal_distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dz = self.z - other.z;
        dx.saturating_mul(dx).saturating_add(dz.saturating_mul(dz))
    }

    /// Distance in the table plane, ignoring elevation.
    #[must_use]
    pub fn horizontal_distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.horizontal_distance_squared(other))
    }

    /// Full 3D squared distance.
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dy = self.y - other.y;
        self.horizontal_distance_squared(other)
            .saturating_add(dy.saturating_mul(dy))
    }

    /// Full 3D distance.
    #[must_use]
    pub fn distance(self, other: Self) -> Fixed {
        fixed_sqrt(self.distance_squared(other))
    }

    /// Scale every component by `factor`.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor, self.z * factor)
    }

    /// Linearly interpolate between two vectors.
    #[must_use]
    pub fn lerp(self, other: Self, t: Fixed) -> Self {
        self + (other - self).scale(t)
    }

    /// Step from `self` toward `target` by at most `max_step`.
    ///
    /// Returns the target exactly once it is within reach, so callers can
    /// detect arrival with `==`.
    #[must_use]
    pub fn move_towards(self, target: Self, max_step: Fixed) -> Self {
        let remaining = self.distance(target);
        if remaining <= max_step || remaining == Fixed::ZERO {
            return target;
        }
        self + (target - self).scale(max_step / remaining)
    }
}

/// Computes the square root of a fixed-point number.
///
/// Takes the integer square root of the raw bits shifted by the fraction
/// width, so the result is the exact floor at full `I32F32` precision and
/// perfect squares come back exact.
#[must_use]
pub fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let widened = u128::from(value.to_bits().unsigned_abs()) << Fixed::FRAC_NBITS;
    let root = isqrt(widened);
    // sqrt(2^95) < 2^48, always representable.
    Fixed::from_bits(i64::try_from(root).unwrap_or(i64::MAX))
}

/// Floor square root by the digit-by-digit method.
fn isqrt(n: u128) -> u128 {
    let mut remainder = n;
    let mut root = 0u128;
    let mut bit = 1u128 << 126;
    while bit > remainder {
        bit >>= 2;
    }
    while bit != 0 {
        if remainder >= root + bit {
            remainder -= root + bit;
            root = (root >> 1) + bit;
        } else {
            root >>= 1;
        }
        bit >>= 2;
    }
    root
}

impl std::ops::Add for Vec3Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
            z: self.z + rhs.z,
        }
    }
}

impl std::ops::Sub for Vec3Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horizontal_distance_ignores_elevation() {
        let a = Vec3Fixed::from_ints(3, 50, 0);
        let b = Vec3Fixed::from_ints(0, 0, 4);
        // 3² + 4² = 25
        assert_eq!(a.horizontal_distance_squared(b), Fixed::from_num(25));
        let dist = a.horizontal_distance(b);
        let epsilon = Fixed::ONE / Fixed::from_num(10000);
        assert!((dist - Fixed::from_num(5)).abs() < epsilon);
    }

    #[test]
    fn test_distance_squared_includes_elevation() {
        let a = Vec3Fixed::from_ints(1, 2, 2);
        assert_eq!(a.distance_squared(Vec3Fixed::ZERO), Fixed::from_num(9));
    }

    #[test]
    fn test_fixed_determinism() {
        // Same operations must produce identical results
        let a = Fixed::from_num(1) / Fixed::from_num(3);
        let b = Fixed::from_num(1) / Fixed::from_num(3);
        assert_eq!(a, b);

        let result1 = a * Fixed::from_num(7);
        let result2 = b * Fixed::from_num(7);
        assert_eq!(result1, result2);
    }

    #[test]
    fn test_sqrt_of_zero_and_negative() {
        assert_eq!(fixed_sqrt(Fixed::ZERO), Fixed::ZERO);
        assert_eq!(fixed_sqrt(Fixed::from_num(-4)), Fixed::ZERO);
    }

    #[test]
    fn test_sqrt_of_perfect_squares_is_exact() {
        for n in [1, 4, 9, 400, 10_000] {
            let root = fixed_sqrt(Fixed::from_num(n));
            assert_eq!(root * root, Fixed::from_num(n), "sqrt({n}) = {root}");
        }
        assert_eq!(fixed_sqrt(Fixed::from_num(0.25)), Fixed::from_num(0.5));
    }

    #[test]
    fn test_sqrt_is_floor_of_irrational_roots() {
        let two = Fixed::from_num(2);
        let root = fixed_sqrt(two);
        assert!(root * root <= two);
        assert!(two - root * root < Fixed::from_num(0.000_001));
    }

    #[test]
    fn test_vec3_lerp() {
        let a = Vec3Fixed::ZERO;
        let b = Vec3Fixed::from_ints(10, 20, 30);
        let mid = a.lerp(b, Fixed::from_num(0.5));
        assert_eq!(mid, Vec3Fixed::from_ints(5, 10, 15));
    }

    #[test]
    fn test_move_towards_snaps_on_arrival() {
        let start = Vec3Fixed::ZERO;
        let target = Vec3Fixed::from_ints(3, 0, 0);

        let step = start.move_towards(target, Fixed::from_num(2));
        assert!(step.x > Fixed::from_num(1.99) && step.x <= Fixed::from_num(2));
        assert_eq!(step.move_towards(target, Fixed::from_num(2)), target);
    }

    #[test]
    fn test_decimal_serde_round_trips_authored_values() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper(#[serde(with = "decimal_serde")] Fixed);

        let parsed: Wrapper = serde_json::from_str("0.25").unwrap();
        assert_eq!(parsed.0, Fixed::from_num(0.25));

        let parsed: Wrapper = serde_json::from_str("20").unwrap();
        assert_eq!(parsed.0, Fixed::from_num(20));

        assert!(serde_json::from_str::<Wrapper>("1e300").is_err());
    }
}
