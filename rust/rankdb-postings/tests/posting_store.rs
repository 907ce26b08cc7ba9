use std::{fs::OpenOptions, io::Write};

use rankdb_common::ErrorKind;
use rankdb_postings::{BucketKey, PostingStore, SplitPolicy, StoreOptions};
use rankdb_scoring::{DocId, DocItr};

fn drain(itr: &mut dyn DocItr) -> Vec<(DocId, f32)> {
    let mut out = Vec::new();
    let mut min_id = 0;
    while itr.next(min_id).unwrap() {
        out.push(itr.cur());
        min_id = itr.cur().0 + 1;
    }
    out
}

fn write_all(store: &mut PostingStore, field: &str, postings: &[(DocId, f32)]) {
    let mut batch = store.begin_batch();
    for &(id, value) in postings {
        batch.write(field, id, value).unwrap();
    }
    batch.commit().unwrap();
}

#[test]
fn test_append_across_batches_and_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let mut expected = Vec::new();
    {
        let mut store = PostingStore::open(dir.path(), StoreOptions::default()).unwrap();
        for batch in 0..5 {
            let postings = (0..7)
                .map(|i| {
                    let id = (batch * 7 + i + 1) as DocId;
                    (id, 1.0 + id as f32 / 64.0)
                })
                .collect::<Vec<_>>();
            write_all(&mut store, "score", &postings);
            expected.extend(postings);
        }
        assert_eq!(drain(store.field_doc_itr("score").as_mut()), expected);
    }
    let store = PostingStore::open(dir.path(), StoreOptions::default()).unwrap();
    assert_eq!(store.field_names().collect::<Vec<_>>(), vec!["score"]);
    let buckets = store.buckets("score");
    assert_eq!(buckets.len(), 1);
    let header = buckets[0].1;
    assert_eq!(header.count, 35);
    assert_eq!(header.first_doc_id, 1);
    assert_eq!(header.last_doc_id, 35);
    assert_eq!(header.min, 1.0 + 1.0 / 64.0);
    assert_eq!(drain(store.field_doc_itr("score").as_mut()), expected);
}

#[test]
fn test_random_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = PostingStore::open(dir.path(), StoreOptions::default()).unwrap();
    let mut rng = fastrand::Rng::with_seed(7);
    let mut expected = Vec::new();
    let mut id: DocId = 0;
    for _ in 0..4 {
        let mut batch = store.begin_batch();
        for _ in 0..500 {
            // Gaps spanning all four varuint size classes.
            id += match rng.u8(0..4) {
                0 => rng.i64(1..8),
                1 => rng.i64(8..128),
                2 => rng.i64(128..32_000),
                _ => rng.i64(32_000..1_000_000),
            };
            let value = match rng.u8(0..3) {
                0 => rng.u8(0..100) as f32,
                1 => rng.f32() * 1000.0 - 500.0,
                _ => 0.5,
            };
            batch.write("v", id, value).unwrap();
            expected.push((id, value));
        }
        batch.commit().unwrap();
    }
    assert_eq!(drain(store.field_doc_itr("v").as_mut()), expected);
}

#[test]
fn test_full_bucket_splits() {
    let dir = tempfile::tempdir().unwrap();
    let options =
        StoreOptions::default().with_split_policy(SplitPolicy::default().with_base_capacity(4));
    let mut store = PostingStore::open(dir.path(), options).unwrap();
    // 1.0..2.0 share an exponent; capacity at 23 variable bits is 4 + 1.
    let postings = (1..=12)
        .map(|id| (id as DocId, 1.0 + id as f32 / 16.0))
        .collect::<Vec<_>>();
    write_all(&mut store, "f", &postings[..8]);
    write_all(&mut store, "f", &postings[8..]);

    let buckets = store.buckets("f");
    assert!(buckets.len() >= 2, "{buckets:?}");
    let coarse = BucketKey::for_value(1.5, 23);
    let (_, coarse_header) = buckets.iter().find(|(k, _)| *k == coarse).unwrap();
    assert_eq!(coarse_header.count, 6);
    for (key, _) in &buckets {
        assert!(key.variable_bits == 23 || key.variable_bits == 19);
    }
    assert_eq!(drain(store.field_doc_itr("f").as_mut()), postings);
}

#[test]
fn test_bounds_prune_buckets() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = PostingStore::open(dir.path(), StoreOptions::default()).unwrap();
    write_all(
        &mut store,
        "h",
        &[(1, 0.5), (2, 3.0), (3, 100.0), (4, 0.75), (5, 120.0)],
    );
    let mut itr = store.field_doc_itr("h");
    assert_eq!(itr.get_bounds(), (0.5, 120.0));
    assert!(itr.set_bounds(50.0, f32::INFINITY));
    assert_eq!(drain(itr.as_mut()), vec![(3, 100.0), (5, 120.0)]);
    assert!(!itr.set_bounds(500.0, f32::INFINITY));
}

#[test]
fn test_truncated_stream_is_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = PostingStore::open(dir.path(), StoreOptions::default()).unwrap();
    write_all(&mut store, "c", &[(1, 1.0), (2, 1.5), (3, 1.25), (4, 1.75)]);
    let key = BucketKey::for_value(1.0, 23);
    let path = dir.path().join("fields").join("c").join(key.file_name());
    let len = std::fs::metadata(&path).unwrap().len();
    OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len(len - 6)
        .unwrap();

    let store = PostingStore::open(dir.path(), StoreOptions::default()).unwrap();
    let mut itr = store.field_doc_itr("c");
    let mut min_id = 0;
    let err = loop {
        match itr.next(min_id) {
            Ok(true) => min_id = itr.cur().0 + 1,
            Ok(false) => panic!("truncation not detected"),
            Err(e) => break e,
        }
    };
    assert!(matches!(err.kind(), ErrorKind::InvalidFormat { .. }), "{err}");
}

#[test]
fn test_zero_delta_is_corruption() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = PostingStore::open(dir.path(), StoreOptions::default()).unwrap();
    write_all(&mut store, "z", &[(1, 2.0), (2, 2.0)]);
    let key = BucketKey::for_value(2.0, 23);
    let path = dir.path().join("fields").join("z").join(key.file_name());
    let mut bytes = std::fs::read(&path).unwrap();
    // varuint(0): class 00 + payload 0000, then byte-aligned trailer.
    bytes.truncate(40);
    bytes.extend_from_slice(&[0x00, 0x00, 8]);
    OpenOptions::new()
        .write(true)
        .truncate(true)
        .open(&path)
        .unwrap()
        .write_all(&bytes)
        .unwrap();

    let store = PostingStore::open(dir.path(), StoreOptions::default()).unwrap();
    let mut itr = store.field_doc_itr("z");
    assert!(itr.next(0).unwrap());
    let err = itr.next(2).unwrap_err();
    assert!(matches!(err.kind(), ErrorKind::InvalidFormat { .. }));
}
