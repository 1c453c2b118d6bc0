//! Directory-level validation and loading.

use std::fs;
use std::path::Path;

use relic_core::data::ConfigKind;
use relic_core::upgrade::Era;
use relic_test_utils::fixtures::SAMPLE_ERA_RON;
use relic_tools::loader::load_directory;
use relic_tools::validate::{validate_directory, Summary};

const CARBINE_JSON: &str = r#"{
    "type": "WeaponStats",
    "name": "m1_carbine",
    "shots_per_burst": 2,
    "fire_rate": 2,
    "base_hit_chance": 0.6,
    "base_damage": 9,
    "effective_range": 20
}"#;

const PARATROOPER_RON: &str = r#"(
    id: "paratrooper",
    base_health: 90,
    base_move_speed: 5,
    weapon: "m1_carbine",
    parachute: true,
)"#;

fn write(dir: &Path, name: &str, text: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

fn content_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "eras/wwii.ron", SAMPLE_ERA_RON);
    write(dir.path(), "weapons/m1_carbine.json", CARBINE_JSON);
    write(dir.path(), "units/paratrooper.ron", PARATROOPER_RON);
    write(dir.path(), "tests/broken.ron", "(name: ");
    dir
}

#[test]
fn validate_all_reports_every_file() {
    let dir = content_dir();
    write(dir.path(), "weapons/broken.json", r#"{"name": "x", "fire_rate": "fast"}"#);

    let reports = validate_directory(dir.path()).unwrap();
    assert_eq!(reports.len(), 4, "tests/ is skipped");

    let kinds: Vec<_> = reports.iter().map(|r| r.report.kind).collect();
    assert!(kinds.contains(&Some(ConfigKind::EraConfig)));
    assert!(kinds.contains(&Some(ConfigKind::UnitArchetype)));

    let paratrooper = reports
        .iter()
        .find(|r| r.path.ends_with("paratrooper.ron"))
        .unwrap();
    assert!(paratrooper.is_valid());
    assert!(paratrooper
        .report
        .warnings
        .iter()
        .any(|w| w.path == "parachute"));

    let summary = Summary::from_reports(&reports);
    assert!(!summary.is_success());
    assert_eq!(summary.failed.len(), 1);
    assert!(summary.failed[0].ends_with("broken.json"));
}

#[test]
fn load_resolves_references_across_files() {
    let dir = content_dir();

    let registry = load_directory(dir.path()).unwrap();
    assert_eq!(registry.era_count(), 1);
    assert_eq!(registry.weapon_count(), 3);
    assert_eq!(registry.archetype_count(), 4);

    let paratrooper = registry.archetype("paratrooper").unwrap();
    assert_eq!(paratrooper.era, None);
    assert_eq!(paratrooper.weapon.as_ref().unwrap().name(), "m1_carbine");
    assert!(registry.era(Era::WorldWarTwo).is_some());
}

#[test]
fn load_fails_on_duplicate_ids() {
    let dir = content_dir();
    write(dir.path(), "eras/wwii_copy.ron", SAMPLE_ERA_RON);
    assert!(load_directory(dir.path()).is_err());
}

#[test]
fn shipped_assets_validate_and_load() {
    let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets/data");

    let reports = validate_directory(&dir).unwrap();
    assert_eq!(reports.len(), 4);
    assert!(Summary::from_reports(&reports).is_success());

    let registry = load_directory(&dir).unwrap();
    assert_eq!(registry.era_count(), 4);
    assert_eq!(registry.archetype_count(), 9);
    assert_eq!(registry.upgrade_count(), 8);
    for era in Era::ALL {
        assert!(registry.era(era).is_some(), "{era} missing");
    }
    assert!(registry.archetype("herald").unwrap().weapon.is_none());
    assert_eq!(registry.upgrades_for_era(Era::Medieval).len(), 4);
}
