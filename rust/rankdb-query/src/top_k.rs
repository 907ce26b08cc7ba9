//! Bounded top-K selection over a score iterator.
//!
//! The engine keeps the best `offset + limit` candidates in a heap whose top is
//! the worst retained candidate. Once the heap is full, the worst score becomes
//! a floor and is pushed into the iterator tree with
//! [`set_bounds`](rankdb_scoring::DocItr::set_bounds), letting the leaves skip
//! buckets that can no longer contribute.

use std::{cmp::Ordering, collections::BinaryHeap};

use ordered_float::OrderedFloat;
use rankdb_common::Result;
use rankdb_scoring::{BoxedDocItr, DocId, DocItr, NOT_POSITIONED};
use serde::{Deserialize, Serialize};

/// A scored document in a result set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DocScore {
    pub doc_id: DocId,
    pub score: f32,
}

impl DocScore {
    pub fn new(doc_id: DocId, score: f32) -> DocScore {
        DocScore { doc_id, score }
    }
}

/// Heap entry ordered so that the worst candidate (lowest score, then highest
/// id) is the greatest.
#[derive(PartialEq, Eq)]
struct Candidate {
    score: OrderedFloat<f32>,
    doc_id: DocId,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| self.doc_id.cmp(&other.doc_id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Drains `itr` and returns the results ranked `offset..offset + limit`, best
/// first. Ties are broken by ascending document id.
///
/// Only scores `>= min_score` are considered. The iterator is always closed,
/// including when it fails.
pub fn top_k(
    mut itr: BoxedDocItr,
    offset: usize,
    limit: usize,
    min_score: f32,
) -> Result<Vec<DocScore>> {
    let result = collect(itr.as_mut(), offset, limit, min_score);
    itr.close();
    result
}

fn collect(
    itr: &mut dyn DocItr,
    offset: usize,
    limit: usize,
    min_score: f32,
) -> Result<Vec<DocScore>> {
    if limit == 0 {
        return Ok(Vec::new());
    }
    let capacity = offset.saturating_add(limit);
    let mut floor = min_score;
    if floor.is_finite() && !itr.set_bounds(floor, f32::INFINITY) {
        log::debug!("top_k: no document can reach min score {floor}");
        return Ok(Vec::new());
    }

    let mut heap = BinaryHeap::with_capacity(capacity.min(1 << 16) + 1);
    let mut doc_id = NOT_POSITIONED;
    let mut visited = 0u64;
    while itr.next(doc_id + 1)? {
        visited += 1;
        let (id, score) = itr.cur();
        doc_id = id;
        if score.is_nan() || score < floor {
            continue;
        }
        heap.push(Candidate {
            score: OrderedFloat(score),
            doc_id: id,
        });
        if heap.len() > capacity {
            heap.pop();
            if let Some(worst) = heap.peek() {
                floor = worst.score.0;
            }
            if !itr.set_bounds(floor, f32::INFINITY) {
                break;
            }
        }
    }
    log::debug!(
        "top_k: visited {visited} documents, kept {}, floor {floor}",
        heap.len()
    );

    // Ascending by `Candidate` order is best first.
    Ok(heap
        .into_sorted_vec()
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(|c| DocScore::new(c.doc_id, c.score.0))
        .collect())
}
