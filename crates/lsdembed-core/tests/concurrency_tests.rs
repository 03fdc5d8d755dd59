//! Multi-threaded tests for the engine's locking protocol.

use lsdembed_core::{lock_safety_snapshot, DistanceMetric, Engine, Error, IndexConfig};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Barrier;

const DIM: usize = 8;
const WRITERS: u32 = 4;
const PER_WRITER: u32 = 150;

fn engine() -> Engine<u32> {
    Engine::new(IndexConfig::new(DIM, 6, 8, 1234, DistanceMetric::Euclidean)).unwrap()
}

/// Deterministic, distinct vector for `id`.
fn vector_for(id: u32) -> Vec<f32> {
    (0..DIM)
        .map(|d| {
            let x = id.wrapping_mul(2_654_435_761).rotate_left(d as u32 * 4);
            (x % 1000) as f32 / 100.0 + d as f32 * 0.001 + id as f32 * 1e-4
        })
        .collect()
}

#[test]
fn test_concurrent_inserts_all_land() {
    let engine = engine();
    let before = lock_safety_snapshot();

    std::thread::scope(|s| {
        for w in 0..WRITERS {
            let engine = &engine;
            s.spawn(move || {
                for i in 0..PER_WRITER {
                    let id = w * PER_WRITER + i;
                    engine.insert(id, &vector_for(id)).unwrap();
                }
            });
        }
    });

    let total = (WRITERS * PER_WRITER) as usize;
    assert_eq!(engine.len(), total);
    let stats = engine.stats();
    assert_eq!(stats.pending, 0);
    assert!(stats.tables.iter().all(|t| t.slots == total));

    for id in (0..WRITERS * PER_WRITER).step_by(37) {
        let results = engine.query(&vector_for(id), 1).unwrap();
        assert_eq!(results[0].id, id);
    }

    let after = lock_safety_snapshot();
    assert_eq!(after.invariant_violation_total, before.invariant_violation_total);
    assert_eq!(after.release_mismatch_total, before.release_mismatch_total);
}

#[test]
fn test_racing_duplicate_inserts_admit_one() {
    let engine = engine();
    let barrier = Barrier::new(8);
    let winners = AtomicUsize::new(0);

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                barrier.wait();
                match engine.insert(7, &vector_for(7)) {
                    Ok(()) => {
                        winners.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(Error::DuplicateId(_)) => {}
                    Err(other) => panic!("unexpected error: {other}"),
                }
            });
        }
    });

    assert_eq!(winners.load(Ordering::Relaxed), 1);
    assert_eq!(engine.len(), 1);
}

#[test]
fn test_queries_run_during_inserts() {
    let engine = engine();
    for id in 0..100 {
        engine.insert(id, &vector_for(id)).unwrap();
    }
    let done = AtomicBool::new(false);

    std::thread::scope(|s| {
        s.spawn(|| {
            for id in 100..400 {
                engine.insert(id, &vector_for(id)).unwrap();
            }
            done.store(true, Ordering::Release);
        });

        for _ in 0..3 {
            s.spawn(|| {
                let mut round = 0_u32;
                while !done.load(Ordering::Acquire) || round < 10 {
                    let id = round % 100;
                    let results = engine.query(&vector_for(id), 5).unwrap();
                    assert_eq!(results[0].id, id);
                    assert!(results.windows(2).all(|w| w[0].distance <= w[1].distance));
                    let unique: HashSet<u32> = results.iter().map(|r| r.id).collect();
                    assert_eq!(unique.len(), results.len());
                    round += 1;
                }
            });
        }
    });

    assert_eq!(engine.len(), 400);
}

#[test]
fn test_completed_deletes_are_never_observed() {
    let engine = engine();
    for id in 0..300 {
        engine.insert(id, &vector_for(id)).unwrap();
    }
    let deleted: Mutex<HashSet<u32>> = Mutex::new(HashSet::new());
    let done = AtomicBool::new(false);

    std::thread::scope(|s| {
        s.spawn(|| {
            for id in (0..300).step_by(2) {
                engine.delete(&id).unwrap();
                deleted.lock().insert(id);
            }
            done.store(true, Ordering::Release);
        });

        for r in 0..3_u32 {
            let engine = &engine;
            let deleted = &deleted;
            let done = &done;
            s.spawn(move || {
                let mut probe_id = r;
                while !done.load(Ordering::Acquire) {
                    let already_gone = deleted.lock().clone();
                    let results = engine.query(&vector_for(probe_id % 300), 10).unwrap();
                    for hit in results {
                        assert!(
                            !already_gone.contains(&hit.id),
                            "id {} returned after its delete completed",
                            hit.id
                        );
                    }
                    probe_id += 7;
                }
            });
        }
    });

    assert_eq!(engine.len(), 150);
    assert_eq!(engine.stats().tombstoned, 150);
}

#[test]
fn test_compaction_concurrent_with_queries() {
    let engine = engine();
    for id in 0..400 {
        engine.insert(id, &vector_for(id)).unwrap();
    }
    for id in (0..400).filter(|id| id % 3 == 0) {
        engine.delete(&id).unwrap();
    }
    let done = AtomicBool::new(false);

    std::thread::scope(|s| {
        s.spawn(|| {
            assert_eq!(engine.compact(), 134);
            for id in 400..450 {
                engine.insert(id, &vector_for(id)).unwrap();
            }
            engine.delete(&401).unwrap();
            assert_eq!(engine.compact(), 1);
            done.store(true, Ordering::Release);
        });

        for r in 0..3_u32 {
            let engine = &engine;
            let done = &done;
            s.spawn(move || {
                let mut id = 1 + r;
                while !done.load(Ordering::Acquire) {
                    if id % 3 != 0 {
                        let results = engine.query(&vector_for(id), 3).unwrap();
                        assert_eq!(results[0].id, id);
                        assert!(results.iter().all(|hit| hit.id % 3 != 0 || hit.id >= 400));
                    }
                    id = (id + 11) % 400;
                }
            });
        }
    });

    let stats = engine.stats();
    assert_eq!(stats.live, 400 - 134 + 49);
    assert_eq!(stats.tombstoned, 0);
    assert!(engine.contains(&449));
    assert!(!engine.contains(&401));
}
