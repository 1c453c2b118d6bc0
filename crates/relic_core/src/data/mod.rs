//! Data-driven content: eras, archetypes, weapons and upgrades.
//!
//! This module defines the content document types, their schemas, the
//! validator that checks authored files, and the registry that holds
//! resolved content for the battlefield.
//!
//! **Note:** This module contains no IO - it works on text and values.
//! File loading is handled by `relic_tools`.

mod archetype_data;
mod era_data;
mod registry;
mod schema;
mod validation;

use thiserror::Error;

pub use archetype_data::{ArchetypeData, MAX_ARMOR, MAX_BASE_HEALTH};
pub use era_data::EraData;
pub use registry::{Archetype, ContentRegistry, EraInfo};
pub use schema::{ConfigKind, FieldSpec, FieldType, TYPE_FIELD};
pub use validation::{
    detect_kind, parse_document, validate_document, validate_object, ContentDocument,
    ContentFormat, Issue, ValidationReport,
};

/// Errors that can occur while parsing or registering content.
#[derive(Debug, Error)]
pub enum DataLoadError {
    /// Text could not be parsed.
    #[error("Failed to parse {format}: {message}")]
    ParseError {
        /// Format the text was parsed as.
        format: ContentFormat,
        /// Parser message.
        message: String,
    },

    /// Content failed validation.
    #[error("Validation failed for {kind} '{id}': {}", .errors.join("; "))]
    ValidationError {
        /// Kind of content.
        kind: String,
        /// Name or id of the content.
        id: String,
        /// List of validation errors.
        errors: Vec<String>,
    },

    /// An id is already registered.
    #[error("Duplicate {kind} id '{id}'")]
    DuplicateId {
        /// Kind of content.
        kind: String,
        /// Conflicting id.
        id: String,
    },

    /// An archetype references a weapon that is not registered.
    #[error("Archetype '{archetype}' references unknown weapon '{weapon}'")]
    MissingWeapon {
        /// Archetype id.
        archetype: String,
        /// Missing weapon name.
        weapon: String,
    },
}

/// Result type for content operations.
pub type DataLoadResult<T> = Result<T, DataLoadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = DataLoadError::ValidationError {
            kind: "weapon".to_string(),
            id: "bow".to_string(),
            errors: vec!["a".to_string(), "b".to_string()],
        };
        assert_eq!(error.to_string(), "Validation failed for weapon 'bow': a; b");

        let error = DataLoadError::MissingWeapon {
            archetype: "archer".to_string(),
            weapon: "bow".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Archetype 'archer' references unknown weapon 'bow'"
        );
    }
}
