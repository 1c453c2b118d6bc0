//! Content file validation.
//!
//! Validation never stops at the first bad file: every file gets a
//! [`FileReport`] and IO or parse failures are recorded as errors on it.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use relic_core::data::{validate_document, ConfigKind, ContentFormat, FieldSpec, ValidationReport};

use crate::error::{ToolsError, ToolsResult};

/// Directory names skipped when scanning for content.
pub const SKIPPED_DIRECTORIES: [&str; 2] = ["test", "tests"];

/// Validation result for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    /// File that was validated.
    pub path: PathBuf,
    /// What was found.
    pub report: ValidationReport,
}

impl FileReport {
    /// Whether the file has no errors.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.report.is_valid()
    }
}

/// Totals over a set of file reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    /// Files validated.
    pub files: usize,
    /// Errors across all files.
    pub errors: usize,
    /// Warnings across all files.
    pub warnings: usize,
    /// Files with at least one error.
    pub failed: Vec<PathBuf>,
}

impl Summary {
    /// Tally a set of reports.
    #[must_use]
    pub fn from_reports(reports: &[FileReport]) -> Self {
        let mut summary = Self {
            files: reports.len(),
            ..Self::default()
        };
        for file in reports {
            summary.errors += file.report.errors.len();
            summary.warnings += file.report.warnings.len();
            if !file.is_valid() {
                summary.failed.push(file.path.clone());
            }
        }
        summary
    }

    /// Whether every file passed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Content format for a path, from its extension.
#[must_use]
pub fn format_of(path: &Path) -> Option<ContentFormat> {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(ContentFormat::from_extension)
}

/// Validate one content file.
#[must_use]
pub fn validate_file(path: &Path) -> FileReport {
    let report = match read_content(path) {
        Ok((text, format)) => validate_document(&text, format),
        Err(error) => {
            let mut report = ValidationReport::default();
            report.add_error("file", error.to_string());
            report
        }
    };
    tracing::debug!(
        path = %path.display(),
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        "Validated file"
    );
    FileReport {
        path: path.to_path_buf(),
        report,
    }
}

/// Validate every content file under `dir`.
///
/// # Errors
///
/// Returns an error if the directory tree cannot be read.
pub fn validate_directory(dir: &Path) -> ToolsResult<Vec<FileReport>> {
    Ok(find_content_files(dir)?
        .iter()
        .map(|path| validate_file(path))
        .collect())
}

/// Read a content file and work out its format.
pub(crate) fn read_content(path: &Path) -> ToolsResult<(String, ContentFormat)> {
    let format = format_of(path).ok_or_else(|| ToolsError::UnsupportedFormat(path.to_path_buf()))?;
    let text = std::fs::read_to_string(path).map_err(ToolsError::io(path))?;
    Ok((text, format))
}

/// Every `.ron` and `.json` file under `dir`, sorted, skipping
/// [`SKIPPED_DIRECTORIES`].
///
/// # Errors
///
/// Returns an error if any directory cannot be read.
pub fn find_content_files(dir: &Path) -> ToolsResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(current) = pending.pop() {
        let entries = std::fs::read_dir(&current).map_err(ToolsError::io(&current))?;
        for entry in entries {
            let path = entry.map_err(ToolsError::io(&current))?.path();
            if path.is_dir() {
                let skipped = path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .is_some_and(|name| SKIPPED_DIRECTORIES.contains(&name));
                if !skipped {
                    pending.push(path);
                }
            } else if format_of(&path).is_some() {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Human-readable report for one file.
#[must_use]
pub fn render_report(file: &FileReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Validating: {}", file.path.display());
    let _ = writeln!(
        out,
        "Detected type: {}",
        file.report.kind.map_or("Unknown", ConfigKind::name)
    );

    if !file.report.errors.is_empty() {
        let _ = writeln!(out, "\nErrors:");
        for error in &file.report.errors {
            let _ = writeln!(out, "  {error}");
        }
    }
    if !file.report.warnings.is_empty() {
        let _ = writeln!(out, "\nWarnings:");
        for warning in &file.report.warnings {
            let _ = writeln!(out, "  {warning}");
        }
    }

    if file.is_valid() {
        let _ = write!(out, "\nValidation passed");
        if !file.report.warnings.is_empty() {
            let _ = write!(out, " ({} warnings)", file.report.warnings.len());
        }
        out.push('\n');
    } else {
        let _ = writeln!(
            out,
            "\nValidation failed ({} errors)",
            file.report.errors.len()
        );
    }
    out
}

/// Human-readable results for a directory run.
#[must_use]
pub fn render_directory(reports: &[FileReport]) -> String {
    let mut out = String::new();
    for file in reports {
        let _ = write!(out, "{}: ", file.path.display());
        if file.is_valid() {
            let _ = write!(out, "OK");
            if !file.report.warnings.is_empty() {
                let _ = write!(out, " ({} warnings)", file.report.warnings.len());
            }
            out.push('\n');
        } else {
            let _ = writeln!(out, "FAILED ({} errors)", file.report.errors.len());
            for error in &file.report.errors {
                let _ = writeln!(out, "    {error}");
            }
        }
    }

    let summary = Summary::from_reports(reports);
    let _ = writeln!(out, "\n{}", "=".repeat(40));
    let _ = writeln!(
        out,
        "Total: {} files, {} errors, {} warnings",
        summary.files, summary.errors, summary.warnings
    );
    if !summary.is_success() {
        let _ = writeln!(out, "\nFailed files:");
        for path in &summary.failed {
            let _ = writeln!(out, "  - {}", path.display());
        }
    }
    out
}

/// Schema reference for one kind, with an example document.
#[must_use]
pub fn render_schema(kind: ConfigKind) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{kind} Schema");
    let _ = writeln!(out, "{}", "=".repeat(40));

    let (required, optional): (Vec<&FieldSpec>, Vec<&FieldSpec>) =
        kind.fields().iter().partition(|spec| spec.required);

    let _ = writeln!(out, "\nRequired Fields:");
    for spec in required {
        write_field(&mut out, spec);
    }
    if !optional.is_empty() {
        let _ = writeln!(out, "\nOptional Fields:");
        for spec in optional {
            write_field(&mut out, spec);
        }
    }

    let _ = writeln!(out, "\nExample (RON):");
    out.push_str(example(kind));
    out
}

fn write_field(out: &mut String, spec: &FieldSpec) {
    let _ = write!(out, "  - {}: {}", spec.name, spec.ty);
    if let Some((min, max)) = spec.range {
        let _ = write!(out, " (range: {min} to {max})");
    }
    out.push('\n');
}

fn example(kind: ConfigKind) -> &'static str {
    match kind {
        ConfigKind::EraConfig => {
            r#"(
    type: "EraConfig",
    name: "Ancient",
    description: "Bronze age warriors",
    weapons: [
        (name: "bronze_spear", shots_per_burst: 1, fire_rate: 1.0,
         base_hit_chance: 0.8, base_damage: 25, effective_range: 2.0),
    ],
    archetypes: [
        (id: "spearman", base_health: 100, base_move_speed: 5, weapon: "bronze_spear"),
    ],
    upgrades: [
        (name: "Veterans", hit_chance_multiplier: 1.2),
    ],
)
"#
        }
        ConfigKind::UnitArchetype => {
            r#"(
    type: "UnitArchetype",
    id: "spearman",
    name: "Spearman",
    base_health: 100,
    base_move_speed: 5.0,
    armor: 20,
    weapon: "bronze_spear",
    prefab: "Units/Ancient/Spearman",
)
"#
        }
        ConfigKind::WeaponStats => {
            r#"(
    type: "WeaponStats",
    name: "bronze_spear",
    shots_per_burst: 1,
    fire_rate: 1.0,
    base_hit_chance: 0.8,
    base_damage: 25,
    effective_range: 2.0,
    range_curve: [(0, 1.0), (1, 1.0), (1.5, 0.5)],
)
"#
        }
        ConfigKind::UpgradeDefinition => {
            r#"(
    type: "UpgradeDefinition",
    name: "Veterans",
    description: "Experienced soldiers with better accuracy",
    hit_chance_multiplier: 1.2,
    damage_multiplier: 1.1,
    cost: 100,
    max_stacks: 1,
)
"#
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relic_core::data::{parse_document, ContentFormat};
    use std::fs;

    #[test]
    fn test_schema_examples_are_valid() {
        for kind in ConfigKind::ALL {
            let report = validate_document(example(kind), ContentFormat::Ron);
            assert_eq!(report.kind, Some(kind));
            assert!(report.is_valid(), "{kind}: {:?}", report.errors);
            assert!(parse_document(example(kind), ContentFormat::Ron).is_ok());
        }
    }

    #[test]
    fn test_render_schema_lists_ranges() {
        let text = render_schema(ConfigKind::WeaponStats);
        assert!(text.starts_with("WeaponStats Schema"));
        assert!(text.contains("  - fire_rate: number (range: 0.1 to 100)"));
        assert!(text.contains("Optional Fields:"));
    }

    #[test]
    fn test_unsupported_extension_is_a_file_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "hello").unwrap();

        let file = validate_file(&path);
        assert!(!file.is_valid());
        assert_eq!(file.report.errors[0].path, "file");
    }

    #[test]
    fn test_missing_file_is_a_file_error() {
        let file = validate_file(Path::new("does/not/exist.ron"));
        assert!(!file.is_valid());
        assert!(file.report.errors[0].message.starts_with("Failed to read"));
    }

    #[test]
    fn test_find_skips_test_directories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("eras/tests")).unwrap();
        fs::write(dir.path().join("eras/ancient.ron"), "()").unwrap();
        fs::write(dir.path().join("eras/tests/broken.ron"), "(").unwrap();
        fs::write(dir.path().join("weapon.json"), "{}").unwrap();
        fs::write(dir.path().join("README.md"), "#").unwrap();

        let files = find_content_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["ancient.ron", "weapon.json"]);
    }

    #[test]
    fn test_summary_counts() {
        let mut bad = ValidationReport::default();
        bad.add_error("root", "broken");
        bad.add_warning("x", "odd");
        let reports = vec![
            FileReport {
                path: PathBuf::from("a.ron"),
                report: ValidationReport::default(),
            },
            FileReport {
                path: PathBuf::from("b.ron"),
                report: bad,
            },
        ];

        let summary = Summary::from_reports(&reports);
        assert_eq!(summary.files, 2);
        assert_eq!(summary.errors, 1);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.failed, vec![PathBuf::from("b.ron")]);
        assert!(render_directory(&reports).contains("Total: 2 files, 1 errors, 1 warnings"));
    }
}
