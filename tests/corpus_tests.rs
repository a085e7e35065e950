//! End-to-end corpus tests
//!
//! Builds full schema + instance trees on disk and exercises the whole
//! load/validate/resolve lifecycle the way the CLIs drive it.

use std::fs;
use std::path::Path;

use fleet_registry::{
    Corpus, CorpusError, Direction, EngineRecord, EngineVariant, SchemaRegistry, Snapshot, Warning,
};
use tempfile::TempDir;

fn write_json(root: &Path, relative: &str, value: serde_json::Value) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

/// Materialize the canonical schema set into a directory so loading via
/// `SchemaRegistry::from_dir` is covered too.
fn schemas_on_disk(dir: &TempDir) -> SchemaRegistry {
    let embedded = SchemaRegistry::embedded().unwrap();
    for tag in embedded.types() {
        let kind_dir = match tag.kind().unwrap() {
            fleet_registry::EntityKind::Engine => "engines",
            fleet_registry::EntityKind::Car => "cars",
        };
        let schema = embedded.get(tag).unwrap();
        write_json(
            dir.path(),
            &format!("{kind_dir}/{tag}.json"),
            schema.source.clone(),
        );
    }
    SchemaRegistry::from_dir(dir.path()).unwrap()
}

fn write_standard_corpus(root: &Path) {
    write_json(
        root,
        "engines/engine-gas-1.json",
        serde_json::json!({
            "name": "V6 Workhorse",
            "uuid": "engine:gas-1",
            "horsepower": 280,
            "fuelEfficiency": 24.5,
            "fuelTypes": ["regular", "premium"],
            "carUuids": ["car:sedan-1"]
        }),
    );
    write_json(
        root,
        "engines/engine-electric-1.json",
        serde_json::json!({
            "name": "Ion Drive",
            "uuid": "engine:elec-1",
            "batteryCapacity": 82.0,
            "rangeMiles": 310,
            "chargingTypes": ["ccs", "chademo"],
            "carUuids": ["car:sedan-1"]
        }),
    );
    write_json(
        root,
        "engines/engine-hybrid-1.json",
        serde_json::json!({
            "name": "Dual Core",
            "uuid": "engine:hyb-1",
            "horsepower": 180,
            "batteryCapacity": 12.4,
            "carUuids": ["car:suv-1"]
        }),
    );
    write_json(
        root,
        "cars/car-sedan-1.json",
        serde_json::json!({
            "name": "Family Sedan",
            "uuid": "car:sedan-1",
            "model": "S200",
            "maxSpeed": 130,
            "features": ["sunroof"],
            "engineRelationships": [
                { "engineUuid": "engine:gas-1", "validFrom": "2020-01-01T00:00:00Z" },
                { "engineUuid": "engine:elec-1", "validFrom": "2022-01-01T00:00:00Z" }
            ]
        }),
    );
    write_json(
        root,
        "cars/car-suv-1.json",
        serde_json::json!({
            "name": "Trail SUV",
            "uuid": "car:suv-1",
            "model": "X500",
            "towingCapacity": 3500,
            "engineRelationships": [
                { "engineUuid": "engine:hyb-1", "validFrom": "2021-06-01T00:00:00Z" }
            ]
        }),
    );
}

fn load_standard() -> Snapshot {
    let schemas_dir = TempDir::new().unwrap();
    let registry = schemas_on_disk(&schemas_dir);
    let instances_dir = TempDir::new().unwrap();
    write_standard_corpus(instances_dir.path());
    Corpus::load_dir(&registry, instances_dir.path()).unwrap()
}

#[test]
fn standard_corpus_loads_cleanly() {
    let snapshot = load_standard();
    assert_eq!(snapshot.store().len(), 5);
    assert_eq!(snapshot.graph().edge_count(), 3);
    assert!(snapshot.warnings().is_empty());
}

#[test]
fn sedan_resolves_gas_but_not_hybrid() {
    let snapshot = load_standard();

    let gas = snapshot
        .resolve_engine("car:sedan-1", EngineVariant::Gas)
        .unwrap()
        .expect("gas engine installed");
    assert_eq!(gas.uuid(), "engine:gas-1");
    assert_eq!(gas.name(), "V6 Workhorse");
    match gas {
        EngineRecord::Gas(ref record) => assert_eq!(record.horsepower, 280),
        ref other => panic!("expected gas record, got {other:?}"),
    }

    let hybrid = snapshot
        .resolve_engine("car:sedan-1", EngineVariant::Hybrid)
        .unwrap();
    assert!(hybrid.is_none());
}

#[test]
fn suv_resolves_hybrid() {
    let snapshot = load_standard();
    let hybrid = snapshot
        .resolve_engine("car:suv-1", EngineVariant::Hybrid)
        .unwrap()
        .expect("hybrid engine installed");
    match hybrid {
        EngineRecord::Hybrid(record) => {
            assert_eq!(record.horsepower, 180);
            assert_eq!(record.battery_capacity, 12.4);
        }
        other => panic!("expected hybrid record, got {other:?}"),
    }
}

#[test]
fn repeated_resolution_is_identical() {
    let snapshot = load_standard();
    let first = snapshot
        .resolve_engine("car:sedan-1", EngineVariant::Electric)
        .unwrap();
    for _ in 0..3 {
        let again = snapshot
            .resolve_engine("car:sedan-1", EngineVariant::Electric)
            .unwrap();
        assert_eq!(first, again);
    }
}

#[test]
fn exported_snapshot_matches_relationships() {
    let snapshot = load_standard();
    let exported = snapshot.export_relationships();
    assert_eq!(exported.len(), 2);
    assert!(exported["car:sedan-1"].contains("engine:gas-1"));
    assert!(exported["car:sedan-1"].contains("engine:elec-1"));
    assert!(exported["car:suv-1"].contains("engine:hyb-1"));
}

#[test]
fn validity_windows_survive_the_load() {
    let snapshot = load_standard();
    let edges = snapshot.engines_for("car:sedan-1");
    assert_eq!(edges.len(), 2);
    // uuid order: elec-1 before gas-1
    assert_eq!(edges[0].engine_uuid, "engine:elec-1");
    let window = edges[0].window.as_ref().unwrap();
    assert!(window.is_open());
    assert_eq!(
        window.valid_from,
        "2022-01-01T00:00:00Z".parse::<chrono::DateTime<chrono::Utc>>().unwrap()
    );
}

#[test]
fn dangling_reference_aborts_whole_load() {
    let registry = SchemaRegistry::embedded().unwrap();
    let instances_dir = TempDir::new().unwrap();
    write_standard_corpus(instances_dir.path());
    write_json(
        instances_dir.path(),
        "cars/car-sedan-2.json",
        serde_json::json!({
            "name": "Orphan Sedan",
            "uuid": "car:sedan-2",
            "model": "S201",
            "engineRelationships": [
                { "engineUuid": "engine:missing-1", "validFrom": "2020-01-01T00:00:00Z" }
            ]
        }),
    );

    let failures = Corpus::load_dir(&registry, instances_dir.path()).unwrap_err();
    assert!(failures.iter().any(|f| matches!(
        &f.error,
        CorpusError::DanglingEngineReference { car_uuid, engine_uuid }
            if car_uuid == "car:sedan-2" && engine_uuid == "engine:missing-1"
    )));
}

#[test]
fn duplicate_uuid_aborts_load() {
    let registry = SchemaRegistry::embedded().unwrap();
    let instances_dir = TempDir::new().unwrap();
    write_standard_corpus(instances_dir.path());
    // a second document reusing an already-loaded uuid
    write_json(
        instances_dir.path(),
        "engines/engine-gas-2.json",
        serde_json::json!({
            "name": "Clone",
            "uuid": "engine:gas-1",
            "horsepower": 300
        }),
    );

    let failures = Corpus::load_dir(&registry, instances_dir.path()).unwrap_err();
    assert!(failures
        .iter()
        .any(|f| matches!(&f.error, CorpusError::DuplicateUuid { uuid, .. } if uuid == "engine:gas-1")));
}

#[test]
fn schema_violations_report_every_failure() {
    let registry = SchemaRegistry::embedded().unwrap();
    let instances_dir = TempDir::new().unwrap();
    write_json(
        instances_dir.path(),
        "engines/engine-gas-1.json",
        serde_json::json!({
            "name": "Bad Engine",
            "uuid": "engine:gas-1",
            "horsepower": 0,
            "fuelEfficiency": "very"
        }),
    );

    let failures = Corpus::load_dir(&registry, instances_dir.path()).unwrap_err();
    assert_eq!(failures.len(), 1);
    match &failures[0].error {
        CorpusError::Validation { report, .. } => {
            // horsepower below minimum AND fuelEfficiency mistyped
            assert!(report.len() >= 2, "incomplete report: {report}");
        }
        other => panic!("expected Validation, got {other}"),
    }
}

#[test]
fn ambiguous_variant_returns_one_deterministic_record() {
    let registry = SchemaRegistry::embedded().unwrap();
    let instances_dir = TempDir::new().unwrap();
    write_json(
        instances_dir.path(),
        "engines/engine-gas-1.json",
        serde_json::json!({ "name": "First", "uuid": "engine:gas-1", "horsepower": 100 }),
    );
    write_json(
        instances_dir.path(),
        "engines/engine-gas-2.json",
        serde_json::json!({ "name": "Second", "uuid": "engine:gas-2", "horsepower": 200 }),
    );
    write_json(
        instances_dir.path(),
        "cars/car-sedan-1.json",
        serde_json::json!({
            "name": "Twin Engine Sedan",
            "uuid": "car:sedan-1",
            "model": "S200",
            "engineRelationships": [
                { "engineUuid": "engine:gas-2", "validFrom": "2020-01-01T00:00:00Z" },
                { "engineUuid": "engine:gas-1", "validFrom": "2021-01-01T00:00:00Z" }
            ]
        }),
    );

    let snapshot = Corpus::load_dir(&registry, instances_dir.path()).unwrap();
    for _ in 0..2 {
        let record = snapshot
            .resolve_engine("car:sedan-1", EngineVariant::Gas)
            .unwrap()
            .expect("one record, never none, never both");
        assert_eq!(record.uuid(), "engine:gas-1");
    }
}

#[test]
fn directional_mismatch_is_warning_not_error() {
    let registry = SchemaRegistry::embedded().unwrap();
    let instances_dir = TempDir::new().unwrap();
    write_json(
        instances_dir.path(),
        "engines/engine-gas-1.json",
        serde_json::json!({
            "name": "Claimed",
            "uuid": "engine:gas-1",
            "horsepower": 150,
            // back-reference the car never confirms
            "carUuids": ["car:sedan-1"]
        }),
    );
    write_json(
        instances_dir.path(),
        "cars/car-sedan-1.json",
        serde_json::json!({
            "name": "Engineless Sedan",
            "uuid": "car:sedan-1",
            "model": "S200",
            // the car maintains a relationship list and it disagrees
            "engineRelationships": []
        }),
    );

    let snapshot = Corpus::load_dir(&registry, instances_dir.path()).unwrap();
    assert_eq!(
        snapshot.warnings(),
        &[Warning::DirectionalMismatch {
            car_uuid: "car:sedan-1".to_string(),
            engine_uuid: "engine:gas-1".to_string(),
            missing_in: Direction::CarSide,
        }]
    );
    // and the car resolves to a clean no-match
    assert!(snapshot
        .resolve_engine("car:sedan-1", EngineVariant::Gas)
        .unwrap()
        .is_none());
}

#[test]
fn documents_without_relationship_lists_load_without_warnings() {
    let registry = SchemaRegistry::embedded().unwrap();
    let instances_dir = TempDir::new().unwrap();
    // engine declares no carUuids at all; the forward edge alone must not
    // count as a disagreement
    write_json(
        instances_dir.path(),
        "engines/engine-gas-1.json",
        serde_json::json!({
            "name": "Quiet",
            "uuid": "engine:gas-1",
            "horsepower": 150
        }),
    );
    write_json(
        instances_dir.path(),
        "cars/car-sedan-1.json",
        serde_json::json!({
            "name": "Family Sedan",
            "uuid": "car:sedan-1",
            "model": "S200",
            "engineRelationships": [
                { "engineUuid": "engine:gas-1", "validFrom": "2020-01-01T00:00:00Z" }
            ]
        }),
    );

    let snapshot = Corpus::load_dir(&registry, instances_dir.path()).unwrap();
    assert!(snapshot.warnings().is_empty());
    assert_eq!(snapshot.graph().edge_count(), 1);
}

#[test]
fn unknown_car_and_engineless_car_are_indistinguishable() {
    let snapshot = load_standard();
    let unknown = snapshot
        .resolve_engine("car:never-loaded", EngineVariant::Gas)
        .unwrap();
    assert!(unknown.is_none());
}

#[test]
fn fingerprint_identifies_the_corpus() {
    let registry = SchemaRegistry::embedded().unwrap();

    let dir_a = TempDir::new().unwrap();
    write_standard_corpus(dir_a.path());
    let a = Corpus::load_dir(&registry, dir_a.path()).unwrap();

    let dir_b = TempDir::new().unwrap();
    write_standard_corpus(dir_b.path());
    let b = Corpus::load_dir(&registry, dir_b.path()).unwrap();
    assert_eq!(a.fingerprint(), b.fingerprint());

    let dir_c = TempDir::new().unwrap();
    write_standard_corpus(dir_c.path());
    write_json(
        dir_c.path(),
        "engines/engine-gas-9.json",
        serde_json::json!({ "name": "Extra", "uuid": "engine:gas-9", "horsepower": 90 }),
    );
    let c = Corpus::load_dir(&registry, dir_c.path()).unwrap();
    assert_ne!(a.fingerprint(), c.fingerprint());
}

#[test]
fn snapshot_is_shareable_across_threads() {
    let snapshot = std::sync::Arc::new(load_standard());
    let mut handles = Vec::new();
    for _ in 0..4 {
        let snapshot = snapshot.clone();
        handles.push(std::thread::spawn(move || {
            snapshot
                .resolve_engine("car:sedan-1", EngineVariant::Gas)
                .unwrap()
                .map(|record| record.uuid().to_string())
        }));
    }
    for handle in handles {
        assert_eq!(handle.join().unwrap().as_deref(), Some("engine:gas-1"));
    }
}
