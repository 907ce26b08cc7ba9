//! Pruned top-K queries against unpruned runs, with real-valued fields, on
//! every backend layout `DbOptions` can open.

use rankdb::{Db, DbOptions, postings::SplitPolicy};
use rankdb_testkit::{
    data_gen::{FieldSpec, real_records},
    ranking::{arithmetic_scorers, assert_pruning_preserves_ranking},
};

fn check_pruning(db: &mut Db, seed: u64) {
    let fields = [
        FieldSpec::signed("a", -2, 3),
        FieldSpec::signed("b", -1, 2),
        FieldSpec::non_negative("c", -1, 3),
    ];
    let mut rng = fastrand::Rng::with_seed(seed);
    let mut count = 0;
    for _ in 0..6 {
        let n = rng.usize(30..90);
        let batch = real_records(&mut rng, &fields, n);
        count += batch.len();
        db.bulk_index(&batch).unwrap();
    }
    for scorer in arithmetic_scorers() {
        assert_pruning_preserves_ranking(db, &scorer, count);
    }
}

#[test]
fn test_pruning_in_memory() {
    check_pruning(&mut DbOptions::default().open().unwrap(), 21);
}

#[test]
fn test_pruning_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = DbOptions::default()
        .with_data_dir(dir.path())
        .with_split_policy(SplitPolicy::default().with_base_capacity(32))
        .open()
        .unwrap();
    check_pruning(&mut db, 22);
}

#[test]
fn test_pruning_sharded_in_memory() {
    check_pruning(&mut DbOptions::default().with_shard_count(3).open().unwrap(), 23);
}

#[test]
fn test_pruning_sharded_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let mut db = DbOptions::default()
        .with_data_dir(dir.path())
        .with_shard_count(2)
        .with_split_policy(SplitPolicy::default().with_base_capacity(32))
        .open()
        .unwrap();
    check_pruning(&mut db, 24);
}
