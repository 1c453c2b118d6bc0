//! Content loading from disk into a [`ContentRegistry`].

use std::path::{Path, PathBuf};

use relic_core::data::{parse_document, ConfigKind, ContentDocument, ContentRegistry};

use crate::error::{ToolsError, ToolsResult};
use crate::validate::{find_content_files, read_content};

/// Read, validate and type one content file.
///
/// Validation warnings are logged, not returned.
///
/// # Errors
///
/// Returns an error if the file cannot be read, has an unsupported
/// extension, or fails to parse or validate.
pub fn load_document(path: &Path) -> ToolsResult<ContentDocument> {
    let (text, format) = read_content(path)?;
    let (document, report) = parse_document(&text, format).map_err(ToolsError::content(path))?;
    for warning in &report.warnings {
        tracing::warn!(path = %path.display(), "{warning}");
    }
    Ok(document)
}

/// Load one content file into `registry`.
///
/// # Errors
///
/// Returns an error if the file fails to load or to register.
pub fn load_file_into(path: &Path, registry: &mut ContentRegistry) -> ToolsResult<()> {
    let document = load_document(path)?;
    registry
        .register(document)
        .map_err(ToolsError::content(path))
}

/// Load every content file under `dir` into a new registry.
///
/// Standalone weapons and upgrades register before eras, and eras before
/// standalone archetypes, so references resolve regardless of file names.
/// A missing directory yields an empty registry.
///
/// # Errors
///
/// Returns the first file that fails to load or register.
pub fn load_directory(dir: &Path) -> ToolsResult<ContentRegistry> {
    let mut registry = ContentRegistry::new();

    if !dir.exists() {
        tracing::warn!("Content directory does not exist: {}", dir.display());
        return Ok(registry);
    }

    let mut documents: Vec<(PathBuf, ContentDocument)> = Vec::new();
    for path in find_content_files(dir)? {
        let document = load_document(&path)?;
        documents.push((path, document));
    }
    documents.sort_by_key(|(path, document)| (registration_order(document.kind()), path.clone()));

    for (path, document) in documents {
        tracing::debug!(path = %path.display(), kind = %document.kind(), id = document.id(), "Registering");
        registry
            .register(document)
            .map_err(ToolsError::content(&path))?;
    }

    tracing::info!(
        "Loaded {} eras, {} archetypes, {} weapons, {} upgrades from {}",
        registry.era_count(),
        registry.archetype_count(),
        registry.weapon_count(),
        registry.upgrade_count(),
        dir.display()
    );

    Ok(registry)
}

fn registration_order(kind: ConfigKind) -> u8 {
    match kind {
        ConfigKind::WeaponStats => 0,
        ConfigKind::UpgradeDefinition => 1,
        ConfigKind::EraConfig => 2,
        ConfigKind::UnitArchetype => 3,
    }
}
