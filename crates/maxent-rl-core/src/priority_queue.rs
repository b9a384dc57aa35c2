//! Max-heap over a fixed index domain with push-or-raise semantics
//!
//! Every index in `[0, N)` is either absent or queued exactly once. Pushing an
//! index that is already queued raises its priority to the maximum of the old
//! and new value and restores the heap in place.

use crate::{RLError, Result};

const ABSENT: usize = usize::MAX;

/// Mutable-priority max-heap over indices `0..len`
#[derive(Debug, Clone)]
pub struct PriorityQueue {
    /// Heap of domain indices
    heap: Vec<usize>,
    /// Priority per domain index, meaningful only while queued
    priorities: Vec<f64>,
    /// Heap slot per domain index, `ABSENT` when not queued
    positions: Vec<usize>,
}

impl PriorityQueue {
    /// Create an empty queue over the domain `0..len`
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            heap: Vec::new(),
            priorities: vec![0.0; len],
            positions: vec![ABSENT; len],
        }
    }

    /// Size of the index domain
    #[must_use]
    pub fn domain(&self) -> usize {
        self.positions.len()
    }

    /// Number of queued indices
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether nothing is queued
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Whether `index` is currently queued
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.positions[index] != ABSENT
    }

    /// Priority of a queued index
    #[must_use]
    pub fn priority(&self, index: usize) -> Option<f64> {
        self.contains(index).then(|| self.priorities[index])
    }

    /// Insert `index`, or raise its priority if already queued.
    ///
    /// # Panics
    ///
    /// Panics if `index` is outside the domain.
    pub fn push(&mut self, index: usize, priority: f64) {
        let position = self.positions[index];
        if position == ABSENT {
            self.priorities[index] = priority;
            self.positions[index] = self.heap.len();
            self.heap.push(index);
            self.sift_up(self.heap.len() - 1);
        } else if self.priorities[index] < priority {
            self.priorities[index] = priority;
            self.sift_up(position);
        }
    }

    /// Remove and return the index with the highest priority
    pub fn pop(&mut self) -> Result<(usize, f64)> {
        if self.heap.is_empty() {
            return Err(RLError::EmptyQueue);
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let index = self.heap.pop().ok_or(RLError::EmptyQueue)?;
        self.positions[index] = ABSENT;
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Ok((index, self.priorities[index]))
    }

    /// Drop every queued index
    pub fn clear(&mut self) {
        for &index in &self.heap {
            self.positions[index] = ABSENT;
        }
        self.heap.clear();
    }

    fn higher(&self, a: usize, b: usize) -> bool {
        self.priorities[self.heap[a]] > self.priorities[self.heap[b]]
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.positions[self.heap[a]] = a;
        self.positions[self.heap[b]] = b;
    }

    fn sift_up(&mut self, mut slot: usize) {
        while slot > 0 {
            let parent = (slot - 1) / 2;
            if !self.higher(slot, parent) {
                break;
            }
            self.swap(slot, parent);
            slot = parent;
        }
    }

    fn sift_down(&mut self, mut slot: usize) {
        let len = self.heap.len();
        loop {
            let left = 2 * slot + 1;
            let right = left + 1;
            let mut largest = slot;
            if left < len && self.higher(left, largest) {
                largest = left;
            }
            if right < len && self.higher(right, largest) {
                largest = right;
            }
            if largest == slot {
                break;
            }
            self.swap(slot, largest);
            slot = largest;
        }
    }
}
