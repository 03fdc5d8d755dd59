//! Tests for the multi-table index.

use super::*;
use crate::store::VectorStore;

#[test]
fn test_insert_files_slot_in_every_table() {
    let index = MultiTableIndex::new(3, 4);
    index.insert(0, &[0b0001, 0b0010, 0b0100]);

    assert_eq!(index.candidates(&[0b0001, 0b1111, 0b1111]).len(), 1);
    assert_eq!(index.candidates(&[0b1111, 0b0010, 0b1111]).len(), 1);
    assert_eq!(index.candidates(&[0b1111, 0b1111, 0b0100]).len(), 1);
    assert!(index.candidates(&[0b1111, 0b1111, 0b1111]).is_empty());
}

#[test]
fn test_candidates_union_has_no_duplicates() {
    let index = MultiTableIndex::new(2, 4);
    index.insert(0, &[1, 1]);
    index.insert(1, &[1, 2]);
    index.insert(2, &[3, 1]);

    let found: Vec<Slot> = index.candidates(&[1, 1]).into_iter().collect();
    assert_eq!(found, vec![0, 1, 2]);
}

#[test]
fn test_bucket_order_is_insertion_order_even_when_filed_late() {
    let mut table = HashTable::new();
    assert!(table.insert(5, 7));
    assert!(table.insert(2, 7));
    assert!(table.insert(9, 7));
    assert_eq!(table.bucket(7), &[2, 5, 9]);
}

#[test]
fn test_bucket_never_holds_duplicates() {
    let mut table = HashTable::new();
    assert!(table.insert(1, 3));
    assert!(!table.insert(1, 3));
    assert!(!table.insert(1, 4), "slot already filed under another key");
    assert_eq!(table.bucket(3), &[1]);
    assert!(table.bucket(4).is_empty());
}

#[test]
fn test_remove_uses_reverse_map() {
    let index = MultiTableIndex::new(2, 4);
    index.insert(0, &[1, 2]);
    index.insert(1, &[1, 3]);

    assert_eq!(index.signatures_of(0), Some(vec![1, 2]));
    assert_eq!(index.remove(0), 2);
    assert_eq!(index.signatures_of(0), None);
    assert_eq!(index.remove(0), 0);

    let found: Vec<Slot> = index.candidates(&[1, 2]).into_iter().collect();
    assert_eq!(found, vec![1]);
}

#[test]
fn test_remove_drops_empty_buckets() {
    let mut table = HashTable::new();
    table.insert(0, 9);
    assert_eq!(table.bucket_count(), 1);
    assert_eq!(table.remove(0), Some(9));
    assert_eq!(table.bucket_count(), 0);
    assert!(table.is_empty());
}

#[test]
fn test_probe_radius_one_reaches_neighbour_buckets() {
    let index = MultiTableIndex::new(1, 3);
    index.insert(0, &[0b000]);
    index.insert(1, &[0b001]);
    index.insert(2, &[0b011]);

    let mut found = index.candidates(&[0b000]);
    assert_eq!(found.len(), 1);

    let visited = index.probe(&[0b000], 1, &mut found);
    assert_eq!(visited, 1);
    let slots: Vec<Slot> = found.iter().copied().collect();
    assert_eq!(slots, vec![0, 1]);

    index.probe(&[0b000], 2, &mut found);
    assert!(found.contains(&2));
}

#[test]
fn test_remap_after_compaction() {
    let mut store: VectorStore<u32> = VectorStore::new(1);
    let index = MultiTableIndex::new(2, 2);
    for id in 0..4_u32 {
        #[allow(clippy::cast_precision_loss)]
        let slot = store.put(id, &[id as f32]).unwrap();
        index.insert(slot, &[0, u64::from(id % 2)]);
    }
    let gone = store.remove(&1).unwrap();
    index.remove(gone);

    let remap = store.compact().remap.unwrap();
    index.remap(&remap);

    let table0: Vec<Slot> = index.candidates(&[0, 3]).into_iter().collect();
    assert_eq!(table0, vec![0, 1, 2]);
    assert_eq!(index.signatures_of(2), Some(vec![0, 1]), "id 3 moved to slot 2");
    assert_eq!(index.signatures_of(3), None);
}

#[test]
fn test_stats_reflect_occupancy() {
    let index = MultiTableIndex::new(2, 4);
    index.insert(0, &[1, 1]);
    index.insert(1, &[1, 2]);
    let stats = index.stats();
    assert_eq!(stats.len(), 2);
    assert_eq!(
        stats[0],
        TableStats {
            bucket_count: 1,
            largest_bucket: 2,
            slots: 2
        }
    );
    assert_eq!(stats[1].bucket_count, 2);
    assert_eq!(stats[1].largest_bucket, 1);
}
