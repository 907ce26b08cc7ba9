//! K-way union of the per-bucket iterators of one field.

use std::collections::{BinaryHeap, binary_heap::PeekMut};

use rankdb_common::Result;

use crate::doc_itr::{BoxedDocItr, DocId, DocItr, NOT_POSITIONED, intersect_bounds};

/// Merges several id-ordered iterators over disjoint documents into a single
/// id-ordered stream.
///
/// Children are kept in a min-heap keyed by their current document id. Narrowing
/// the bounds evicts (and closes) every child whose own range no longer
/// intersects the window, so whole buckets drop out of the scan.
pub struct FieldMergeDocItr {
    field: String,
    heap: BinaryHeap<HeapEntry>,
    doc_id: DocId,
    score: f32,
    bounds: (f32, f32),
}

impl FieldMergeDocItr {
    pub fn new(field: impl Into<String>, children: Vec<BoxedDocItr>) -> FieldMergeDocItr {
        let bounds = children.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY),
            |(min, max), child| {
                let (child_min, child_max) = child.get_bounds();
                (min.min(child_min), max.max(child_max))
            },
        );
        FieldMergeDocItr {
            field: field.into(),
            heap: children.into_iter().map(HeapEntry).collect(),
            doc_id: NOT_POSITIONED,
            score: 0.0,
            bounds,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Number of child iterators that are still live.
    pub fn child_count(&self) -> usize {
        self.heap.len()
    }
}

impl DocItr for FieldMergeDocItr {
    fn cur(&self) -> (DocId, f32) {
        (self.doc_id, self.score)
    }

    fn next(&mut self, min_id: DocId) -> Result<bool> {
        loop {
            let Some(mut top) = self.heap.peek_mut() else {
                return Ok(false);
            };
            let (id, score) = top.0.cur();
            if id >= min_id {
                self.doc_id = id;
                self.score = score;
                return Ok(true);
            }
            if !top.0.next(min_id)? {
                let mut exhausted = PeekMut::pop(top);
                exhausted.0.close();
            }
        }
    }

    fn get_bounds(&self) -> (f32, f32) {
        self.bounds
    }

    fn set_bounds(&mut self, min: f32, max: f32) -> bool {
        self.bounds = intersect_bounds(self.bounds, min, max);
        let (min, max) = self.bounds;
        let before = self.heap.len();
        let mut children = std::mem::take(&mut self.heap).into_vec();
        children.retain_mut(|child| {
            if child.0.set_bounds(min, max) {
                true
            } else {
                child.0.close();
                false
            }
        });
        self.heap = children.into();
        if self.heap.len() != before {
            log::debug!(
                "field '{}': evicted {} of {} buckets for window [{min}, {max}]",
                self.field,
                before - self.heap.len(),
                before
            );
        }
        !self.heap.is_empty()
    }

    fn close(&mut self) {
        for mut child in std::mem::take(&mut self.heap).into_vec() {
            child.0.close();
        }
    }
}

/// Heap slot ordered so that the child with the smallest current id is on top.
struct HeapEntry(BoxedDocItr);

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.0.cur().0 == other.0.cur().0
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other.0.cur().0.cmp(&self.0.cur().0)
    }
}
