//! Bounded top-k selection.
//!
//! Each scoring worker owns one [`TopK`]: a fixed-capacity binary min-heap
//! stored in a flat `Vec`, rooted at the currently worst kept candidate.
//! Ranking follows [`ScoredCandidate::rank_cmp`], so equal scores are broken
//! by the lower chunk index no matter how candidates were split across workers.

use crate::vector::types::ScoredCandidate;

/// Upper bound on slots reserved up front; larger selectors grow on demand.
const MAX_PREALLOCATED: usize = 1024;

/// Fixed-capacity min-heap of the best `k` candidates seen so far.
#[derive(Debug, Clone)]
pub struct TopK {
    heap: Vec<ScoredCandidate>,
    k: usize,
}

impl TopK {
    /// Creates an empty selector keeping at most `k` candidates.
    #[must_use]
    pub fn new(k: usize) -> Self {
        Self {
            heap: Vec::with_capacity(k.min(MAX_PREALLOCATED)),
            k,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// The worst candidate currently kept.
    #[must_use]
    pub fn peek_worst(&self) -> Option<&ScoredCandidate> {
        self.heap.first()
    }

    /// Offers a candidate.
    ///
    /// Pushes while there is room; once full, replaces the worst kept
    /// candidate only if the new one strictly outranks it.
    #[inline]
    pub fn offer(&mut self, candidate: ScoredCandidate) {
        if self.k == 0 {
            return;
        }
        if self.heap.len() < self.k {
            self.heap.push(candidate);
            self.sift_up(self.heap.len() - 1);
        } else if self
            .peek_worst()
            .is_some_and(|worst| candidate.outranks(worst))
        {
            self.heap[0] = candidate;
            self.sift_down(0);
        }
    }

    /// Folds another selector into this one.
    pub fn merge(&mut self, other: TopK) {
        for candidate in other.heap {
            self.offer(candidate);
        }
    }

    /// Consumes the selector, returning candidates best first.
    #[must_use]
    pub fn into_sorted_vec(self) -> Vec<ScoredCandidate> {
        let mut items = self.heap;
        items.sort_unstable_by(|a, b| b.rank_cmp(a));
        items
    }

    fn sift_up(&mut self, mut pos: usize) {
        while pos > 0 {
            let parent = (pos - 1) / 2;
            if self.heap[parent].outranks(&self.heap[pos]) {
                self.heap.swap(parent, pos);
                pos = parent;
            } else {
                break;
            }
        }
    }

    fn sift_down(&mut self, mut pos: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * pos + 1;
            let right = left + 1;
            let mut worst = pos;
            if left < len && self.heap[worst].outranks(&self.heap[left]) {
                worst = left;
            }
            if right < len && self.heap[worst].outranks(&self.heap[right]) {
                worst = right;
            }
            if worst == pos {
                break;
            }
            self.heap.swap(pos, worst);
            pos = worst;
        }
    }
}
