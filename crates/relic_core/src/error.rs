//! Error types for the combat simulation.

use thiserror::Error;

/// Result type alias using [`GameError`].
pub type Result<T> = std::result::Result<T, GameError>;

/// Top-level error type for all combat simulation errors.
///
/// Gameplay rejections (an upgrade over its stack limit, a target on the
/// same team) are reported as `false` returns, not errors. These variants
/// cover the host asking about things that do not exist or handing the
/// simulation invalid content.
#[derive(Debug, Error)]
pub enum GameError {
    /// Invalid unit reference.
    #[error("Unit not found: {0}")]
    UnitNotFound(u64),

    /// Invalid squad reference.
    #[error("Squad not found: {0}")]
    SquadNotFound(u32),

    /// Unknown archetype id.
    #[error("Archetype not found: {0}")]
    ArchetypeNotFound(String),

    /// Content failed validation.
    #[error("Invalid {kind} '{name}': {}", errors.join("; "))]
    InvalidConfig {
        /// Kind of content (weapon, upgrade, archetype).
        kind: &'static str,
        /// Name or id of the offending item.
        name: String,
        /// Every rule the item violates.
        errors: Vec<String>,
    },

    /// Invalid simulation state.
    #[error("Invalid simulation state: {0}")]
    InvalidState(String),
}
