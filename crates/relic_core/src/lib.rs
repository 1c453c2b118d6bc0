//! # Relic Core
//!
//! Deterministic combat simulation core for the Relic AR strategy game.
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO
//! - No system randomness (combat rolls come from a seeded RNG)
//! - No floating-point math in the simulation (uses fixed-point)
//!
//! This separation enables:
//! - Identical outcomes across devices for the same seed
//! - Headless balance tooling
//! - Determinism testing
//!
//! ## Crate Structure
//!
//! - [`weapon`] - Weapon profiles and their range/elevation curves
//! - [`upgrade`] - Squad upgrades and eras
//! - [`squad`] - Squads and modifier aggregation
//! - [`combat`] - Burst resolution
//! - [`ai`] - Per-unit AI state machine
//! - [`battlefield`] - Unit storage and the tick loop
//! - [`data`] - Content documents, validation and the content registry
//! - [`math`] - Fixed-point math utilities

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod ai;
pub mod battlefield;
pub mod combat;
pub mod curve;
pub mod data;
pub mod error;
pub mod math;
pub mod squad;
pub mod unit;
pub mod upgrade;
pub mod weapon;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::ai::{AiEvent, AiHost, AiState, Pathfinder, SpatialQuery, UnitAi, UnitInfo};
    pub use crate::battlefield::{ArenaBounds, Battlefield, TickEvents};
    pub use crate::combat::{CombatResolver, CombatResult, SquadModifiers};
    pub use crate::curve::{Curve, CurveKey};
    pub use crate::data::{Archetype, ContentRegistry, DataLoadError};
    pub use crate::error::{GameError, Result};
    pub use crate::math::{Fixed, Vec3Fixed};
    pub use crate::squad::{Squad, SquadEvent, SquadId, SquadRegistry};
    pub use crate::unit::{Health, TeamId, Unit, UnitEvent, UnitId, UnitSpawnParams};
    pub use crate::upgrade::{Era, EraFilter, UpgradeEffect};
    pub use crate::weapon::WeaponProfile;
}
