use rankdb_query::{Query, ScoreDb, ScorerExpr, StreamingDb};

/// Asserts that every page of a pruned top-K query over `scorer` equals the
/// matching slice of an unpruned run.
///
/// The unpruned run asks for more hits than there are documents, so the top-K
/// floor is never raised and no bound reaches the iterator tree.
pub fn assert_pruning_preserves_ranking<S: StreamingDb>(
    db: &ScoreDb<S>,
    scorer: &ScorerExpr,
    doc_count: usize,
) {
    let full = db
        .query(&Query::new(scorer.clone()).with_limit(doc_count + 1))
        .unwrap();
    for limit in [1, 2, 3, 5, 8, 13, 21, 34, 100] {
        let page = db
            .query(&Query::new(scorer.clone()).with_limit(limit))
            .unwrap();
        let expected = &full.hits[..limit.min(full.len())];
        assert_eq!(page.hits, expected, "{scorer} limit {limit}");
    }
    for offset in [1, 4, 17] {
        let page = db
            .query(&Query::new(scorer.clone()).with_offset(offset).with_limit(6))
            .unwrap();
        let expected = full.hits.iter().skip(offset).take(6).copied().collect::<Vec<_>>();
        assert_eq!(page.hits, expected, "{scorer} offset {offset}");
    }
    if let Some(threshold) = full.hits.get(20) {
        let page = db
            .query(
                &Query::new(scorer.clone())
                    .with_limit(doc_count + 1)
                    .with_min_score(threshold.score),
            )
            .unwrap();
        let expected = full
            .hits
            .iter()
            .take_while(|hit| hit.score >= threshold.score)
            .copied()
            .collect::<Vec<_>>();
        assert_eq!(page.hits, expected, "{scorer} min_score {}", threshold.score);
    }
}

/// Scorers over fields `a` (signed), `b` (signed) and `c` (non-negative) that
/// exercise the inversion of every arithmetic combinator.
pub fn arithmetic_scorers() -> Vec<ScorerExpr> {
    [
        r#"["sum", ["field", "a"], ["scale", 3.3, ["field", "c"]]]"#,
        r#"["sum", ["field", "a"], ["field", "b"], ["scale", -0.7, ["field", "c"]]]"#,
        r#"["product", ["field", "a"], ["field", "c"]]"#,
        r#"["product", ["field", "c"], ["scale", 1.7, ["field", "c"]]]"#,
        r#"["scale", -0.37, ["field", "b"]]"#,
        r#"["pow", ["field", "c"], 0.5]"#,
        r#"["pow", ["diff", 3.1, ["field", "c"]], 1.5]"#,
        r#"["custom_linear", [[0, 0], [50, 10], [1000, -5]], ["field", "c"]]"#,
        r#"["sum", ["custom_linear", [[-10, 4], [10, 1.3]], ["field", "a"]], ["scale", 0.01, ["field", "c"]]]"#,
        r#"["min", ["field", "a"], ["scale", 2.5, ["field", "b"]]]"#,
        r#"["sum", ["product", ["field", "a"], ["field", "c"]], ["pow", ["field", "c"], 1.5], ["scale", 0.01, ["field", "b"]]]"#,
    ]
    .iter()
    .map(|json| json.parse().unwrap())
    .collect()
}
