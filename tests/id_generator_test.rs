use docgraph::id_gen::{IdGenerator, ID_FILE_NAME};
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;
use tempfile::TempDir;

#[test]
fn test_concurrent_batches_are_unique_and_contiguous() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join(ID_FILE_NAME);
    let ids = Arc::new(IdGenerator::open(&path));

    let handles: Vec<_> = (0..8)
        .map(|t| {
            let ids = Arc::clone(&ids);
            thread::spawn(move || {
                let mut taken = Vec::new();
                for round in 0..20 {
                    let size = (t * 7 + round * 3) % 50 + 1;
                    let batch = ids.next_ids(size).unwrap();
                    assert_eq!(batch.len(), size);
                    let values: Vec<u64> = batch.iter().map(|id| id.as_u64().unwrap()).collect();
                    // Each batch is a run of consecutive IDs
                    for pair in values.windows(2) {
                        assert_eq!(pair[1], pair[0] + 1);
                    }
                    taken.extend(values);
                }
                taken
            })
        })
        .collect();

    let mut all = Vec::new();
    for handle in handles {
        all.extend(handle.join().unwrap());
    }

    let unique: HashSet<u64> = all.iter().copied().collect();
    assert_eq!(unique.len(), all.len());

    all.sort_unstable();
    let total = all.len() as u64;
    assert_eq!(all, (1..=total).collect::<Vec<_>>());
    assert_eq!(ids.current(), total);

    drop(ids);
    let reopened = IdGenerator::open(&path);
    assert_eq!(reopened.current(), total);
    assert_eq!(reopened.next_id().unwrap().as_u64(), Some(total + 1));
}

#[test]
fn test_zero_sized_batch_allocates_nothing() {
    let temp_dir = TempDir::new().unwrap();
    let ids = IdGenerator::open(temp_dir.path().join(ID_FILE_NAME));
    assert!(ids.next_ids(0).unwrap().is_empty());
    assert_eq!(ids.current(), 0);
    assert_eq!(ids.next_id().unwrap().as_str(), "1");
}
