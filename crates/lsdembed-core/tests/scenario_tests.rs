//! End-to-end scenarios for the public engine API.

use lsdembed_core::{
    create_index, recall_at_k, DistanceMetric, Engine, EngineState, Error, IndexConfig, Snapshot,
};

fn scenario_engine() -> Engine<&'static str> {
    let engine = create_index(4, 2, 3, 42, DistanceMetric::Euclidean).unwrap();
    engine.insert("a", &[1.0, 0.0, 0.0, 0.0]).unwrap();
    engine.insert("b", &[0.0, 1.0, 0.0, 0.0]).unwrap();
    engine.insert("c", &[0.99, 0.01, 0.0, 0.0]).unwrap();
    engine
}

#[test]
fn test_nearest_pair_scenario() {
    let engine = scenario_engine();
    let results = engine.query(&[1.0, 0.0, 0.0, 0.0], 2).unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, "a");
    assert_eq!(results[0].distance, 0.0);
    assert_eq!(results[1].id, "c");
    assert!(results.iter().all(|r| r.id != "b"));
}

#[test]
fn test_empty_index_returns_empty_result() {
    let engine: Engine<u64> = create_index(4, 2, 3, 42, DistanceMetric::Euclidean).unwrap();
    assert_eq!(engine.state(), EngineState::Empty);
    let results = engine.query(&[1.0, 0.0, 0.0, 0.0], 5).unwrap();
    assert!(results.is_empty());
}

#[test]
fn test_delete_of_unknown_id_then_insert() {
    let engine: Engine<&str> = create_index(4, 2, 3, 42, DistanceMetric::Euclidean).unwrap();
    assert!(matches!(engine.delete(&"ghost").unwrap_err(), Error::NotFound(_)));
    engine.insert("ghost", &[0.0, 0.0, 1.0, 0.0]).unwrap();
    assert!(engine.contains(&"ghost"));
}

#[test]
fn test_delete_removes_observability() {
    let engine = scenario_engine();
    engine.delete(&"a").unwrap();

    for probe in [[1.0, 0.0, 0.0, 0.0], [0.99, 0.01, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]] {
        let results = engine.query(&probe, 3).unwrap();
        assert!(results.iter().all(|r| r.id != "a"));
    }
    assert!(matches!(engine.get(&"a").unwrap_err(), Error::NotFound(_)));

    let results = engine.query(&[1.0, 0.0, 0.0, 0.0], 1).unwrap();
    assert_eq!(results[0].id, "c");
}

#[test]
fn test_compaction_is_idempotent() {
    let engine = scenario_engine();
    assert_eq!(engine.compact(), 0);

    engine.delete(&"b").unwrap();
    engine.delete(&"c").unwrap();
    assert_eq!(engine.compact(), 2);
    assert_eq!(engine.compact(), 0);

    let results = engine.query(&[1.0, 0.0, 0.0, 0.0], 3).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "a");
}

#[test]
fn test_tombstoned_id_is_reserved_until_compaction() {
    let engine = scenario_engine();
    engine.delete(&"b").unwrap();
    assert!(matches!(
        engine.insert("b", &[0.0, 1.0, 0.0, 0.0]).unwrap_err(),
        Error::DuplicateId(_)
    ));

    engine.compact();
    engine.insert("b", &[0.0, 0.0, 0.0, 1.0]).unwrap();
    let results = engine.query(&[0.0, 0.0, 0.0, 1.0], 1).unwrap();
    assert_eq!(results[0].id, "b");
}

#[test]
fn test_dimension_enforced_on_every_path() {
    let engine = scenario_engine();
    for bad in [&[1.0_f32][..], &[1.0, 0.0, 0.0, 0.0, 0.0][..], &[][..]] {
        assert!(matches!(
            engine.insert("z", bad).unwrap_err(),
            Error::DimensionMismatch { expected: 4, .. }
        ));
        assert!(matches!(
            engine.query(bad, 1).unwrap_err(),
            Error::DimensionMismatch { expected: 4, .. }
        ));
    }
}

#[test]
fn test_approximate_recall_against_brute_force() {
    let engine: Engine<u32> = Engine::new(
        IndexConfig::new(16, 12, 6, 7, DistanceMetric::Cosine).with_probe_radius(2),
    )
    .unwrap();

    // Two tight clusters around orthogonal axes.
    for i in 0..200_u32 {
        let mut v = vec![0.0_f32; 16];
        let axis = (i % 2) as usize;
        v[axis] = 1.0;
        v[2 + (i as usize % 14)] = 0.05 * (i as f32 / 200.0);
        engine.insert(i, &v).unwrap();
    }

    let mut probe = vec![0.0_f32; 16];
    probe[0] = 1.0;
    probe[3] = 0.01;
    let approx: Vec<u32> = engine.query(&probe, 10).unwrap().into_iter().map(|r| r.id).collect();
    let exact: Vec<u32> = engine
        .brute_force(&probe, 10)
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect();

    assert_eq!(approx.len(), 10);
    assert!(approx.iter().all(|id| id % 2 == 0));
    assert!(recall_at_k(&exact, &approx) >= 0.5);
}

#[test]
fn test_snapshot_file_restores_engine() {
    let engine = scenario_engine();
    engine.delete(&"b").unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scenario.lsde");
    engine.snapshot().save(&path).unwrap();

    let restored = Engine::from_snapshot(Snapshot::<String>::load(&path).unwrap()).unwrap();
    assert_eq!(restored.len(), 2);
    let results = restored.query(&[1.0, 0.0, 0.0, 0.0], 2).unwrap();
    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "c"]);
}
