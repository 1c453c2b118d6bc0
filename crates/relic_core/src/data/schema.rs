//! Declarative schemas for content documents.
//!
//! Schemas are checked against the generic parsed value before typed
//! deserialization, so authors get every field-level problem at once
//! with a path (`archetypes[2].base_health`) instead of the first serde
//! error.

use std::fmt;

/// Kinds of content document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigKind {
    /// A whole era: archetypes, weapons and upgrades.
    EraConfig,
    /// One unit type.
    UnitArchetype,
    /// One weapon.
    WeaponStats,
    /// One squad upgrade.
    UpgradeDefinition,
}

impl ConfigKind {
    /// Every kind.
    pub const ALL: [Self; 4] = [
        Self::EraConfig,
        Self::UnitArchetype,
        Self::WeaponStats,
        Self::UpgradeDefinition,
    ];

    /// Canonical name, as written in a document's `type` field.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::EraConfig => "EraConfig",
            Self::UnitArchetype => "UnitArchetype",
            Self::WeaponStats => "WeaponStats",
            Self::UpgradeDefinition => "UpgradeDefinition",
        }
    }

    /// Parse a kind name case-insensitively.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name.trim()))
    }

    /// Field specifications for this kind.
    #[must_use]
    pub const fn fields(self) -> &'static [FieldSpec] {
        match self {
            Self::EraConfig => ERA_FIELDS,
            Self::UnitArchetype => ARCHETYPE_FIELDS,
            Self::WeaponStats => WEAPON_FIELDS,
            Self::UpgradeDefinition => UPGRADE_FIELDS,
        }
    }

    /// Look up one field.
    #[must_use]
    pub fn field(self, name: &str) -> Option<&'static FieldSpec> {
        self.fields().iter().find(|spec| spec.name == name)
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Expected shape of a field's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Text.
    String,
    /// Whole number.
    Integer,
    /// Whole or decimal number.
    Number,
    /// List of strings.
    StringList,
    /// List of `[x, y]` numeric pairs.
    Curve,
    /// An era name.
    Era,
    /// A nested document of the given kind.
    Nested(ConfigKind),
    /// A list of nested documents of the given kind.
    NestedList(ConfigKind),
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Integer => f.write_str("integer"),
            Self::Number => f.write_str("number"),
            Self::StringList => f.write_str("list of strings"),
            Self::Curve => f.write_str("list of [x, y] pairs"),
            Self::Era => f.write_str("era"),
            Self::Nested(kind) => write!(f, "{kind}"),
            Self::NestedList(kind) => write!(f, "list of {kind}"),
        }
    }
}

/// One field of a schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Field name.
    pub name: &'static str,
    /// Expected type.
    pub ty: FieldType,
    /// Whether the field must be present.
    pub required: bool,
    /// Inclusive numeric bounds.
    pub range: Option<(f64, f64)>,
}

impl FieldSpec {
    const fn required(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: true,
            range: None,
        }
    }

    const fn optional(name: &'static str, ty: FieldType) -> Self {
        Self {
            name,
            ty,
            required: false,
            range: None,
        }
    }

    const fn within(mut self, min: f64, max: f64) -> Self {
        self.range = Some((min, max));
        self
    }
}

/// Field every document may carry to name its kind.
pub const TYPE_FIELD: &str = "type";

const ERA_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", FieldType::String),
    FieldSpec::required("archetypes", FieldType::NestedList(ConfigKind::UnitArchetype)),
    FieldSpec::optional("era", FieldType::Era),
    FieldSpec::optional("description", FieldType::String),
    FieldSpec::optional("visual_style", FieldType::String),
    FieldSpec::optional("upgrades", FieldType::NestedList(ConfigKind::UpgradeDefinition)),
    FieldSpec::optional("weapons", FieldType::NestedList(ConfigKind::WeaponStats)),
];

const ARCHETYPE_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("id", FieldType::String),
    FieldSpec::required("base_health", FieldType::Integer).within(0.0, 10_000.0),
    FieldSpec::required("base_move_speed", FieldType::Number).within(0.0, 100.0),
    FieldSpec::optional("name", FieldType::String),
    FieldSpec::optional("description", FieldType::String),
    FieldSpec::optional("weapon", FieldType::String),
    FieldSpec::optional("weapon_stats", FieldType::Nested(ConfigKind::WeaponStats)),
    FieldSpec::optional("prefab", FieldType::String),
    FieldSpec::optional("armor", FieldType::Integer).within(0.0, 99.0),
    FieldSpec::optional("detection_radius", FieldType::Number).within(0.0, 1000.0),
];

const WEAPON_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", FieldType::String),
    FieldSpec::required("shots_per_burst", FieldType::Integer).within(1.0, 100.0),
    FieldSpec::required("fire_rate", FieldType::Number).within(0.1, 100.0),
    FieldSpec::required("base_hit_chance", FieldType::Number).within(0.0, 1.0),
    FieldSpec::required("base_damage", FieldType::Number).within(0.0, 10_000.0),
    FieldSpec::optional("effective_range", FieldType::Number).within(0.0, 1000.0),
    FieldSpec::optional("range_curve", FieldType::Curve),
    FieldSpec::optional("elevation_curve", FieldType::Curve),
    FieldSpec::optional("description", FieldType::String),
];

const UPGRADE_FIELDS: &[FieldSpec] = &[
    FieldSpec::required("name", FieldType::String),
    FieldSpec::optional("id", FieldType::String),
    FieldSpec::optional("description", FieldType::String),
    FieldSpec::optional("hit_chance_multiplier", FieldType::Number).within(0.0, 10.0),
    FieldSpec::optional("damage_multiplier", FieldType::Number).within(0.0, 10.0),
    FieldSpec::optional("elevation_bonus", FieldType::Number).within(-1.0, 1.0),
    FieldSpec::optional("cost", FieldType::Integer).within(0.0, 100_000.0),
    FieldSpec::optional("era", FieldType::Era),
    FieldSpec::optional("max_stacks", FieldType::Integer).within(1.0, 100.0),
    FieldSpec::optional("exclusive_with", FieldType::StringList),
];
