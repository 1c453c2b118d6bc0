//! Content document parsing and validation.
//!
//! Validation runs in three passes, each only if the previous one found
//! no errors:
//!
//! 1. Parse the text into a generic value and detect its [`ConfigKind`].
//! 2. Check the value against the kind's schema: required fields, value
//!    types, numeric bounds and curve shape. Unknown fields are warnings.
//! 3. Deserialize into the typed definition and run its `validate()`.
//!
//! Convention checks from the typed definitions become warnings.

use std::fmt;

use ron::extensions::Extensions;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::archetype_data::ArchetypeData;
use super::era_data::EraData;
use super::schema::{ConfigKind, FieldType, TYPE_FIELD};
use super::DataLoadError;
use crate::upgrade::{Era, UpgradeEffect};
use crate::weapon::WeaponProfile;

/// Text format of a content document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentFormat {
    /// Rusty Object Notation.
    Ron,
    /// JSON.
    Json,
}

impl ContentFormat {
    /// Format for a file extension (without the dot), case-insensitively.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        if extension.eq_ignore_ascii_case("ron") {
            Some(Self::Ron)
        } else if extension.eq_ignore_ascii_case("json") {
            Some(Self::Json)
        } else {
            None
        }
    }

    /// Parse text into a generic value.
    ///
    /// RON goes through [`ron::Value`] first: struct fields become string
    /// keys and enum variants arrive as `null`, without their name. Typed
    /// deserialization still sees the variants.
    ///
    /// # Errors
    ///
    /// Returns [`DataLoadError::ParseError`] if the text is malformed.
    pub fn parse_value(self, text: &str) -> Result<Value, DataLoadError> {
        match self {
            Self::Ron => {
                let value: ron::Value = ron_options()
                    .from_str(text)
                    .map_err(|e| self.parse_error(e))?;
                serde_json::to_value(value).map_err(|e| self.parse_error(e))
            }
            Self::Json => serde_json::from_str(text).map_err(|e| self.parse_error(e)),
        }
    }

    /// Deserialize text straight into a typed definition.
    ///
    /// Optional RON fields may be written bare (`weapon: "bow"`) or wrapped
    /// (`weapon: Some("bow")`).
    ///
    /// # Errors
    ///
    /// Returns [`DataLoadError::ParseError`] if the text is malformed or does
    /// not match `T`.
    pub fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T, DataLoadError> {
        match self {
            Self::Ron => ron_options().from_str(text).map_err(|e| self.parse_error(e)),
            Self::Json => serde_json::from_str(text).map_err(|e| self.parse_error(e)),
        }
    }

    fn parse_error(self, error: impl fmt::Display) -> DataLoadError {
        DataLoadError::ParseError {
            format: self,
            message: error.to_string(),
        }
    }
}

/// RON options used for every content document.
fn ron_options() -> ron::Options {
    ron::Options::default().with_default_extension(Extensions::IMPLICIT_SOME)
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ron => f.write_str("RON"),
            Self::Json => f.write_str("JSON"),
        }
    }
}

/// A single problem found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    /// Field path, or `root` for whole-document problems.
    pub path: String,
    /// What is wrong.
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Everything found while validating one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    /// Detected kind, if detection succeeded.
    pub kind: Option<ConfigKind>,
    /// Problems that make the document unusable.
    pub errors: Vec<Issue>,
    /// Problems worth fixing that do not block loading.
    pub warnings: Vec<Issue>,
}

impl ValidationReport {
    /// Whether no errors were found.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record an error.
    pub fn add_error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(Issue {
            path: path.into(),
            message: message.into(),
        });
    }

    /// Record a warning.
    pub fn add_warning(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(Issue {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// A typed, validated content document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentDocument {
    /// A whole era.
    Era(EraData),
    /// One archetype.
    Archetype(ArchetypeData),
    /// One weapon.
    Weapon(WeaponProfile),
    /// One upgrade.
    Upgrade(UpgradeEffect),
}

impl ContentDocument {
    /// Kind of this document.
    #[must_use]
    pub const fn kind(&self) -> ConfigKind {
        match self {
            Self::Era(_) => ConfigKind::EraConfig,
            Self::Archetype(_) => ConfigKind::UnitArchetype,
            Self::Weapon(_) => ConfigKind::WeaponStats,
            Self::Upgrade(_) => ConfigKind::UpgradeDefinition,
        }
    }

    /// Name or id of the document's subject.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Self::Era(era) => &era.name,
            Self::Archetype(archetype) => &archetype.id,
            Self::Weapon(weapon) => weapon.name(),
            Self::Upgrade(upgrade) => upgrade.id(),
        }
    }

    fn validate(&self) -> Vec<String> {
        match self {
            Self::Era(era) => era.validate(),
            Self::Archetype(archetype) => archetype.validate(),
            Self::Weapon(weapon) => weapon.validate(),
            Self::Upgrade(upgrade) => upgrade.validate(),
        }
    }

    fn convention_warnings(&self) -> Vec<String> {
        match self {
            Self::Era(era) => {
                let mut warnings = era.convention_warnings();
                for name in era.external_weapon_refs() {
                    warnings.push(format!(
                        "weapon '{name}' is not defined in this era and must be registered separately"
                    ));
                }
                warnings
            }
            Self::Archetype(archetype) => archetype.convention_warnings(),
            Self::Weapon(weapon) => weapon.convention_warnings(),
            Self::Upgrade(upgrade) => upgrade.convention_warnings(),
        }
    }
}

/// Detect a document's kind from its `type` field or, failing that, from
/// the fields it carries.
#[must_use]
pub fn detect_kind(value: &Value) -> Option<ConfigKind> {
    let object = value.as_object()?;

    if let Some(kind) = object
        .get(TYPE_FIELD)
        .and_then(Value::as_str)
        .and_then(ConfigKind::parse)
    {
        return Some(kind);
    }

    let has = |field: &str| object.contains_key(field);
    if has("archetypes") {
        Some(ConfigKind::EraConfig)
    } else if has("shots_per_burst") || has("fire_rate") {
        Some(ConfigKind::WeaponStats)
    } else if has("hit_chance_multiplier") || has("damage_multiplier") {
        Some(ConfigKind::UpgradeDefinition)
    } else if has("base_health") || has("base_move_speed") {
        Some(ConfigKind::UnitArchetype)
    } else {
        None
    }
}

/// Validate document text in every pass.
#[must_use]
pub fn validate_document(text: &str, format: ContentFormat) -> ValidationReport {
    check_document(text, format).0
}

/// Validate document text and, if it has no errors, return it typed.
///
/// # Errors
///
/// Returns [`DataLoadError::ParseError`] for malformed text and
/// [`DataLoadError::ValidationError`] when any pass reports errors.
pub fn parse_document(
    text: &str,
    format: ContentFormat,
) -> Result<(ContentDocument, ValidationReport), DataLoadError> {
    let value = format.parse_value(text)?;
    let (report, document) = check_document(text, format);
    match document {
        Some(document) if report.is_valid() => Ok((document, report)),
        _ => Err(DataLoadError::ValidationError {
            kind: report.kind.map_or("document", ConfigKind::name).to_string(),
            id: document_label(&value),
            errors: report.errors.iter().map(ToString::to_string).collect(),
        }),
    }
}

fn document_label(value: &Value) -> String {
    ["id", "name"]
        .iter()
        .find_map(|field| value.get(field).and_then(Value::as_str))
        .unwrap_or("<unnamed>")
        .to_string()
}

fn check_document(text: &str, format: ContentFormat) -> (ValidationReport, Option<ContentDocument>) {
    let mut report = ValidationReport::default();

    let value = match format.parse_value(text) {
        Ok(value) => value,
        Err(error) => {
            report.add_error("file", error.to_string());
            return (report, None);
        }
    };

    let Some(object) = value.as_object() else {
        report.add_error("root", format!("Expected map, got {}", type_name(&value)));
        return (report, None);
    };

    let Some(kind) = detect_kind(&value) else {
        report.add_error(
            "root",
            "Unable to detect config type. Add a 'type' field or use recognizable field names.",
        );
        return (report, None);
    };
    report.kind = Some(kind);

    validate_object(object, kind, "", &mut report);
    if !report.is_valid() {
        return (report, None);
    }

    let document = match kind {
        ConfigKind::EraConfig => typed::<EraData>(text, &value, format).map(ContentDocument::Era),
        ConfigKind::UnitArchetype => {
            typed::<ArchetypeData>(text, &value, format).map(ContentDocument::Archetype)
        }
        ConfigKind::WeaponStats => {
            typed::<WeaponProfile>(text, &value, format).map(ContentDocument::Weapon)
        }
        ConfigKind::UpgradeDefinition => {
            typed::<UpgradeEffect>(text, &value, format).map(ContentDocument::Upgrade)
        }
    };

    let document = match document {
        Ok(document) => document,
        Err(error) => {
            report.add_error("root", error.to_string());
            return (report, None);
        }
    };

    for problem in document.validate() {
        report.add_error("root", problem);
    }
    for warning in document.convention_warnings() {
        report.add_warning("root", warning);
    }
    (report, Some(document))
}

/// JSON deserializes from the already parsed value; RON re-reads the text
/// because its generic value drops enum variant names.
fn typed<T: DeserializeOwned>(
    text: &str,
    value: &Value,
    format: ContentFormat,
) -> Result<T, DataLoadError> {
    match format {
        ContentFormat::Ron => format.parse(text),
        ContentFormat::Json => {
            serde_json::from_value(value.clone()).map_err(|e| DataLoadError::ParseError {
                format,
                message: e.to_string(),
            })
        }
    }
}

/// Check one object against a kind's schema, recursing into nested
/// documents.
pub fn validate_object(
    object: &Map<String, Value>,
    kind: ConfigKind,
    prefix: &str,
    report: &mut ValidationReport,
) {
    let path_of = |field: &str| {
        if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        }
    };

    for spec in kind.fields() {
        let path = path_of(spec.name);
        match object.get(spec.name) {
            None => {
                if spec.required {
                    report.add_error(path, format!("Required field '{}' is missing", spec.name));
                }
            }
            Some(Value::Null) if !spec.required => {}
            Some(value) => {
                if check_type(value, spec.ty, &path, report) {
                    if let (Some((min, max)), Some(number)) = (spec.range, value.as_f64()) {
                        check_range(number, min, max, &path, report);
                    }
                }
            }
        }
    }

    for field in object.keys() {
        if field != TYPE_FIELD && kind.field(field).is_none() {
            report.add_warning(path_of(field), format!("Unknown field '{field}'"));
        }
    }
}

fn check_type(value: &Value, ty: FieldType, path: &str, report: &mut ValidationReport) -> bool {
    let matches = match ty {
        FieldType::String => value.is_string(),
        FieldType::Integer => value.is_i64() || value.is_u64(),
        FieldType::Number => value.is_number(),
        FieldType::StringList => value
            .as_array()
            .is_some_and(|items| items.iter().all(Value::is_string)),
        FieldType::Curve => return check_curve(value, path, report),
        FieldType::Era => match value {
            // RON enum variants arrive without their name.
            Value::Null => true,
            Value::String(name) => {
                if Era::parse(name).is_none() {
                    report.add_error(path, format!("Unknown era '{name}'"));
                    return false;
                }
                true
            }
            _ => false,
        },
        FieldType::Nested(kind) => match value.as_object() {
            Some(object) => {
                validate_object(object, kind, path, report);
                return true;
            }
            None => false,
        },
        FieldType::NestedList(kind) => match value.as_array() {
            Some(items) => {
                for (index, item) in items.iter().enumerate() {
                    let item_path = format!("{path}[{index}]");
                    match item.as_object() {
                        Some(object) => validate_object(object, kind, &item_path, report),
                        None => report.add_error(
                            item_path,
                            format!("Expected {kind}, got {}", type_name(item)),
                        ),
                    }
                }
                return true;
            }
            None => false,
        },
    };

    if !matches {
        report.add_error(path, format!("Expected {ty}, got {}", type_name(value)));
    }
    matches
}

fn check_range(number: f64, min: f64, max: f64, path: &str, report: &mut ValidationReport) {
    if number < min {
        report.add_error(path, format!("Value {number} is below minimum {min}"));
    }
    if number > max {
        report.add_error(path, format!("Value {number} exceeds maximum {max}"));
    }
}

fn check_curve(value: &Value, path: &str, report: &mut ValidationReport) -> bool {
    let Some(points) = value.as_array() else {
        report.add_error(path, "Curve must be a list of [x, y] pairs");
        return false;
    };

    let mut ok = true;
    for (index, point) in points.iter().enumerate() {
        let point_path = format!("{path}[{index}]");
        let pair = point
            .as_array()
            .and_then(|p| <&[Value; 2]>::try_from(p.as_slice()).ok());
        let Some([x, y]) = pair else {
            report.add_error(point_path, "Each curve point must be [x, y]");
            ok = false;
            continue;
        };
        for (axis, coordinate) in [("0", x), ("1", y)] {
            if !coordinate.is_number() {
                report.add_error(
                    format!("{point_path}[{axis}]"),
                    format!("Curve value must be numeric, got {}", type_name(coordinate)),
                );
                ok = false;
            }
        }
    }
    ok
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}
