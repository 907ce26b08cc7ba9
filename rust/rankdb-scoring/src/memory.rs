//! In-memory leaf iterator.

use std::sync::Arc;

use rankdb_common::Result;

use crate::doc_itr::{DocId, DocItr, NOT_POSITIONED, intersect_bounds};

/// Iterates a shared, id-sorted vector of `(id, score)` postings.
///
/// Reported bounds start as the observed score range of the postings. Narrowing
/// only changes the reported bounds: every posting is still produced, and
/// rejecting out-of-window scores is left to the consumer.
pub struct MemoryDocItr {
    postings: Arc<Vec<(DocId, f32)>>,
    pos: usize,
    doc_id: DocId,
    score: f32,
    bounds: (f32, f32),
}

impl MemoryDocItr {
    /// Creates an iterator over `postings`, which must be sorted by ascending id
    /// without duplicates.
    pub fn new(postings: Arc<Vec<(DocId, f32)>>) -> MemoryDocItr {
        debug_assert!(postings.windows(2).all(|w| w[0].0 < w[1].0));
        let bounds = postings.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY),
            |(min, max), &(_, score)| (min.min(score), max.max(score)),
        );
        MemoryDocItr {
            postings,
            pos: 0,
            doc_id: NOT_POSITIONED,
            score: 0.0,
            bounds,
        }
    }

    /// Convenience constructor assigning ids `1, 2, 3, ...` to `scores`.
    pub fn from_scores(scores: &[f32]) -> MemoryDocItr {
        let postings = scores
            .iter()
            .enumerate()
            .map(|(i, &score)| (i as DocId + 1, score))
            .collect::<Vec<_>>();
        MemoryDocItr::new(Arc::new(postings))
    }

    /// An iterator that never produces a value.
    pub fn empty() -> MemoryDocItr {
        MemoryDocItr::new(Arc::new(Vec::new()))
    }
}

impl DocItr for MemoryDocItr {
    fn cur(&self) -> (DocId, f32) {
        (self.doc_id, self.score)
    }

    fn next(&mut self, min_id: DocId) -> Result<bool> {
        while let Some(&(id, score)) = self.postings.get(self.pos) {
            self.pos += 1;
            if id >= min_id {
                self.doc_id = id;
                self.score = score;
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn get_bounds(&self) -> (f32, f32) {
        self.bounds
    }

    fn set_bounds(&mut self, min: f32, max: f32) -> bool {
        self.bounds = intersect_bounds(self.bounds, min, max);
        self.bounds.0 <= self.bounds.1
    }

    fn close(&mut self) {
        self.pos = self.postings.len();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_doc_itr_bounds() {
        let mut itr = MemoryDocItr::from_scores(&[3.0, 1.0, 4.0, 1.5, 9.0]);
        assert_eq!(itr.cur().0, NOT_POSITIONED);
        assert_eq!(itr.get_bounds(), (1.0, 9.0));

        assert!(itr.next(0).unwrap());
        assert_eq!(itr.cur(), (1, 3.0));

        assert!(itr.set_bounds(2.0, 5.0));
        assert_eq!(itr.get_bounds(), (2.0, 5.0));
        // Narrowing does not hide postings.
        assert!(itr.next(2).unwrap());
        assert_eq!(itr.cur(), (2, 1.0));
        assert!(itr.next(5).unwrap());
        assert_eq!(itr.cur(), (5, 9.0));

        assert!(!itr.set_bounds(6.0, 7.0));
    }

    #[test]
    fn test_memory_doc_itr_skips_to_min_id() {
        let mut itr = MemoryDocItr::from_scores(&[1.0, 2.0, 3.0, 4.0]);
        assert!(itr.next(3).unwrap());
        assert_eq!(itr.cur(), (3, 3.0));
        // Always advances, even when already at min_id.
        assert!(itr.next(3).unwrap());
        assert_eq!(itr.cur(), (4, 4.0));
        itr.close();
        assert!(!itr.next(0).unwrap());
    }

    #[test]
    fn test_empty() {
        let mut itr = MemoryDocItr::empty();
        let (min, max) = itr.get_bounds();
        assert!(min > max);
        assert!(!itr.next(0).unwrap());
    }
}
