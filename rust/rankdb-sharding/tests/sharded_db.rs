use std::collections::HashMap;

use rankdb_common::ErrorKind;
use rankdb_query::{BackendDb, Query, Record, ScoreDb, ScorerExpr, StreamingDb};
use rankdb_sharding::{ShardOptions, ShardedDb};
use rankdb_testkit::{
    VecBackend,
    data_gen::{FieldSpec, real_records},
    record,
    ranking::{arithmetic_scorers, assert_pruning_preserves_ranking},
};

fn sharded(count: usize) -> ShardedDb<BackendDb<VecBackend>> {
    let shards = (0..count)
        .map(|_| BackendDb::new(VecBackend::new()))
        .collect();
    ShardedDb::new(shards, ShardOptions::default()).unwrap()
}

#[test]
fn test_sharded_matches_single_backend() {
    let mut rng = fastrand::Rng::with_seed(5);
    let mut single = ScoreDb::new(BackendDb::new(VecBackend::new()));
    let mut multi = ScoreDb::new(sharded(4));
    // Packed id in the sharded db -> id in the single db.
    let mut id_map = HashMap::new();

    for _ in 0..12 {
        let batch = (0..rng.usize(1..80))
            .map(|_| {
                let mut r = Record::new();
                r.insert("x".to_string(), rng.u8(0..50) as f32);
                if rng.bool() {
                    r.insert("y".to_string(), rng.u8(0..20) as f32);
                }
                r
            })
            .collect::<Vec<_>>();
        let single_ids = single.bulk_index(&batch).unwrap();
        let multi_ids = multi.bulk_index(&batch).unwrap();
        id_map.extend(multi_ids.into_iter().zip(single_ids));
    }

    let scorers = [
        r#"["field", "x"]"#,
        r#"["sum", ["field", "x"], ["scale", 2, ["field", "y"]]]"#,
        r#"["product", ["field", "x"], ["field", "y"]]"#,
        r#"["diff", 20, ["field", "x"]]"#,
        r#"["min", ["field", "x"], ["field", "y"]]"#,
    ];
    for scorer in scorers {
        let scorer: ScorerExpr = scorer.parse().unwrap();
        for (offset, limit) in [(0, 1), (0, 10), (3, 7), (0, 1000)] {
            let query = Query::new(scorer.clone())
                .with_offset(offset)
                .with_limit(limit);
            let expected = single.query(&query).unwrap();
            let actual = multi.query(&query).unwrap();
            let expected_scores = expected.hits.iter().map(|h| h.score).collect::<Vec<_>>();
            let actual_scores = actual.hits.iter().map(|h| h.score).collect::<Vec<_>>();
            assert_eq!(actual_scores, expected_scores, "{scorer} {offset} {limit}");

            // Every sharded hit names a document with exactly that score.
            let all = single
                .query(&Query::new(scorer.clone()).with_limit(usize::MAX))
                .unwrap();
            let by_id = all
                .hits
                .iter()
                .map(|h| (h.doc_id, h.score))
                .collect::<HashMap<_, _>>();
            for hit in &actual.hits {
                assert_eq!(by_id[&id_map[&hit.doc_id]], hit.score);
            }
        }
    }
}

#[test]
fn test_batches_round_robin() {
    let mut db = sharded(3);
    let ids = db.ids();
    let mut shards_seen = Vec::new();
    for i in 0..6 {
        let packed = db.bulk_index(&[record(&[("v", i as f32)])]).unwrap();
        shards_seen.push(ids.unpack(packed[0]));
    }
    assert_eq!(
        shards_seen,
        vec![(0, 1), (1, 1), (2, 1), (0, 2), (1, 2), (2, 2)]
    );
}

#[test]
fn test_end_to_end_across_shards() {
    let mut db = ScoreDb::new(sharded(2));
    let r1 = db.index(record(&[("age", 32.0), ("height", 2.0)])).unwrap();
    let r2 = db.index(record(&[("age", 25.0), ("height", 1.5)])).unwrap();
    let r3 = db.index(record(&[("age", 16.0), ("height", 2.5)])).unwrap();

    let query = |scorer: &str, limit: usize| {
        db.query(&Query::new(scorer.parse().unwrap()).with_limit(limit))
            .unwrap()
            .ids()
    };
    assert_eq!(query(r#"["field", "height"]"#, 2), vec![r3, r1]);
    assert_eq!(
        query(r#"["sum", ["field", "age"], ["field", "height"]]"#, 2),
        vec![r1, r2]
    );
    assert_eq!(
        query(r#"["product", ["field", "age"], ["field", "height"]]"#, 3),
        vec![r1, r3, r2]
    );
    assert!(query(r#"["field", "height"]"#, 0).is_empty());
}

#[test]
fn test_shard_budget() {
    let shards = (0..5)
        .map(|_| BackendDb::new(VecBackend::new()))
        .collect::<Vec<_>>();
    let err = ShardedDb::new(shards, ShardOptions::default().with_shard_bits(2))
        .err()
        .unwrap();
    assert!(matches!(err.kind(), ErrorKind::ResourceExhausted { .. }));
}

#[test]
fn test_pruning_with_real_values_across_shards() {
    let fields = [
        FieldSpec::signed("a", -2, 3),
        FieldSpec::signed("b", -1, 2),
        FieldSpec::non_negative("c", -1, 3),
    ];
    let mut rng = fastrand::Rng::with_seed(77);
    let mut db = ScoreDb::new(sharded(3));
    let mut count = 0;
    for _ in 0..8 {
        let n = rng.usize(20..60);
        let batch = real_records(&mut rng, &fields, n);
        count += batch.len();
        db.bulk_index(&batch).unwrap();
    }
    for scorer in arithmetic_scorers() {
        assert_pruning_preserves_ranking(&db, &scorer, count);
    }
}
