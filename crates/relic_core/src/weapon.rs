//! Weapon profiles: immutable ballistic and accuracy parameters.
//!
//! A profile is loaded once and shared by `Arc` across every unit of an
//! archetype. It carries two curves: hit chance by normalized range and
//! accuracy bonus by height difference.
//!
//! # Example RON
//!
//! ```ron
//! (
//!     name: "longbow",
//!     shots_per_burst: 2,
//!     fire_rate: 0.5,
//!     base_hit_chance: 0.6,
//!     base_damage: 12,
//!     effective_range: 25,
//!     range_curve: [(0, 1), (1, 0.6), (2, 0.2)],
//!     elevation_curve: [(-8, -0.2), (0, 0), (8, 0.35)],
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::curve::Curve;
use crate::error::{GameError, Result};
use crate::math::{decimal_serde, Fixed};

/// Immutable per-weapon parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename = "WeaponStats")]
pub struct WeaponProfile {
    /// Unique weapon name, referenced by archetypes.
    name: String,

    /// Free-form description for tooling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,

    /// Shots fired per burst.
    shots_per_burst: u32,

    /// Shots per second.
    #[serde(with = "decimal_serde")]
    fire_rate: Fixed,

    /// Hit chance before range, elevation and squad modifiers.
    #[serde(with = "decimal_serde")]
    base_hit_chance: Fixed,

    /// Damage per hit before squad and armor modifiers.
    #[serde(with = "decimal_serde")]
    base_damage: Fixed,

    /// Distance at which the range curve is sampled at `1.0`.
    #[serde(with = "decimal_serde", default = "default_effective_range")]
    effective_range: Fixed,

    /// Hit multiplier by `distance / effective_range`.
    #[serde(rename = "range_curve", default = "Curve::default_range_falloff")]
    range_hit_curve: Curve,

    /// Additive accuracy bonus by attacker-minus-target height.
    #[serde(rename = "elevation_curve", default = "Curve::default_elevation_bonus")]
    elevation_bonus_curve: Curve,
}

/// Effective range used when a weapon file omits it.
fn default_effective_range() -> Fixed {
    Fixed::from_num(10)
}

impl WeaponProfile {
    /// Create a profile with default curves.
    ///
    /// Construction never fails; call [`validate`](Self::validate) before
    /// handing the profile to the simulation.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        shots_per_burst: u32,
        fire_rate: Fixed,
        base_hit_chance: Fixed,
        base_damage: Fixed,
        effective_range: Fixed,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            shots_per_burst,
            fire_rate,
            base_hit_chance,
            base_damage,
            effective_range,
            range_hit_curve: Curve::default_range_falloff(),
            elevation_bonus_curve: Curve::default_elevation_bonus(),
        }
    }

    /// Builder method to replace the range curve.
    #[must_use]
    pub fn with_range_curve(mut self, curve: Curve) -> Self {
        self.range_hit_curve = curve;
        self
    }

    /// Builder method to replace the elevation curve.
    #[must_use]
    pub fn with_elevation_curve(mut self, curve: Curve) -> Self {
        self.elevation_bonus_curve = curve;
        self
    }

    /// Builder method to set the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Weapon name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Weapon description, if authored.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// Shots fired per burst.
    #[must_use]
    pub const fn shots_per_burst(&self) -> u32 {
        self.shots_per_burst
    }

    /// Shots per second.
    #[must_use]
    pub const fn fire_rate(&self) -> Fixed {
        self.fire_rate
    }

    /// Unmodified hit chance.
    #[must_use]
    pub const fn base_hit_chance(&self) -> Fixed {
        self.base_hit_chance
    }

    /// Unmodified damage per hit.
    #[must_use]
    pub const fn base_damage(&self) -> Fixed {
        self.base_damage
    }

    /// Range at which the range curve is sampled at `1.0`.
    #[must_use]
    pub const fn effective_range(&self) -> Fixed {
        self.effective_range
    }

    /// Range falloff curve.
    #[must_use]
    pub fn range_hit_curve(&self) -> &Curve {
        &self.range_hit_curve
    }

    /// Elevation bonus curve.
    #[must_use]
    pub fn elevation_bonus_curve(&self) -> &Curve {
        &self.elevation_bonus_curve
    }

    /// Seconds between consecutive shots.
    ///
    /// A non-positive fire rate never fires again, so this returns
    /// [`Fixed::MAX`] instead of dividing by zero.
    #[must_use]
    pub fn time_between_shots(&self) -> Fixed {
        if self.fire_rate <= Fixed::ZERO {
            return Fixed::MAX;
        }
        Fixed::ONE / self.fire_rate
    }

    /// Seconds from the first to the last shot of a burst.
    #[must_use]
    pub fn burst_duration(&self) -> Fixed {
        let gaps = Fixed::from_num(self.shots_per_burst.saturating_sub(1));
        gaps.saturating_mul(self.time_between_shots())
    }

    /// Range-scaled hit chance. Negative distances count as point blank.
    ///
    /// Not clamped: the resolver clamps only the final combined chance.
    #[must_use]
    pub fn hit_chance_at_range(&self, distance: Fixed) -> Fixed {
        self.base_hit_chance * self.range_factor(distance)
    }

    /// Range curve output for a distance, before the base chance.
    #[must_use]
    pub fn range_factor(&self, distance: Fixed) -> Fixed {
        let distance = distance.max(Fixed::ZERO);
        let normalized = if self.effective_range > Fixed::ZERO {
            distance.saturating_div(self.effective_range)
        } else {
            Fixed::ZERO
        };
        self.range_hit_curve.evaluate_or(normalized, Fixed::ONE)
    }

    /// Elevation curve output for an attacker-minus-target height.
    #[must_use]
    pub fn elevation_bonus(&self, height_delta: Fixed) -> Fixed {
        self.elevation_bonus_curve
            .evaluate_or(height_delta, Fixed::ZERO)
    }

    /// Damage per hit for a multiplier; non-positive multipliers deal none.
    #[must_use]
    pub fn damage_at(&self, multiplier: Fixed) -> Fixed {
        if multiplier <= Fixed::ZERO {
            return Fixed::ZERO;
        }
        self.base_damage.saturating_mul(multiplier)
    }

    /// Collect every rule this profile violates.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("weapon name must not be empty".to_string());
        }
        if self.shots_per_burst < 1 {
            errors.push(format!(
                "shots_per_burst must be at least 1, got {}",
                self.shots_per_burst
            ));
        }
        if self.fire_rate <= Fixed::ZERO {
            errors.push(format!("fire_rate must be positive, got {}", self.fire_rate));
        }
        if self.base_hit_chance < Fixed::ZERO || self.base_hit_chance > Fixed::ONE {
            errors.push(format!(
                "base_hit_chance must be within [0, 1], got {}",
                self.base_hit_chance
            ));
        }
        if self.base_damage <= Fixed::ZERO {
            errors.push(format!(
                "base_damage must be positive, got {}",
                self.base_damage
            ));
        }
        if self.effective_range <= Fixed::ZERO {
            errors.push(format!(
                "effective_range must be positive, got {}",
                self.effective_range
            ));
        }
        for problem in self.range_hit_curve.validate() {
            errors.push(format!("range_curve: {problem}"));
        }
        for problem in self.elevation_bonus_curve.validate() {
            errors.push(format!("elevation_curve: {problem}"));
        }

        errors
    }

    /// Whether [`validate`](Self::validate) reports nothing.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_empty()
    }

    /// Reject a profile that [`validate`](Self::validate) flags.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::InvalidConfig`] listing every violation.
    pub fn ensure_valid(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(GameError::InvalidConfig {
                kind: "weapon",
                name: self.name.clone(),
                errors,
            })
        }
    }

    /// Conventions that are not enforced but usually indicate a typo.
    #[must_use]
    pub fn convention_warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !self.range_hit_curve.is_non_increasing() {
            warnings.push("range_curve increases with distance".to_string());
        }
        if self.elevation_bonus(Fixed::ZERO) != Fixed::ZERO {
            warnings.push(format!(
                "elevation_curve is not neutral on level ground ({} at 0)",
                self.elevation_bonus(Fixed::ZERO)
            ));
        }
        warnings
    }
}
