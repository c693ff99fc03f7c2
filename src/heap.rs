//! Min-heap priority queue over anything with a deadline.
//!
//! Binary heap backed by a `Vec`, ordered by ascending deadline (the
//! earliest deadline is the root). The source's `dvector_t` is the
//! substitutable dynamic array `spec.md` §1 calls out as an external
//! collaborator — `Vec` plays that role here, with the growth/shrink policy
//! reproduced explicitly on top of it rather than left to `Vec`'s own
//! (different, and unspecified) amortized-growth behaviour.

use std::time::Instant;

const INITIAL_CAPACITY: usize = 10;
const GROWTH_FACTOR: usize = 2;
const MIN_CAPACITY_FOR_SHRINK: usize = 4;

/// Anything orderable by a wall-clock deadline, as the heap needs.
pub trait HasDeadline {
    fn deadline(&self) -> Instant;
}

/// Binary min-heap, smallest deadline at the root.
///
/// Stability is not guaranteed: two entries with an equal deadline may come
/// out in either order (`spec.md` §4.C).
pub struct BinaryMinHeap<T: HasDeadline> {
    items: Vec<T>,
}

impl<T: HasDeadline> BinaryMinHeap<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::with_capacity(INITIAL_CAPACITY),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current backing capacity, exposed only so tests can assert on the
    /// grow/shrink discipline below.
    #[cfg(test)]
    pub fn capacity(&self) -> usize {
        self.items.capacity()
    }

    pub fn peek(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn push(&mut self, item: T) {
        self.grow_if_full();
        self.items.push(item);
        self.sift_up(self.items.len() - 1);
    }

    pub fn pop(&mut self) -> Option<T> {
        if self.items.is_empty() {
            return None;
        }

        let last_idx = self.items.len() - 1;
        self.items.swap(0, last_idx);
        let popped = self.items.pop();

        if !self.items.is_empty() {
            self.sift_down(0);
        }
        self.shrink_if_sparse();

        popped
    }

    /// Remove and return the first item matching `predicate`, restoring the
    /// heap property. A linear scan, as the source documents (`HeapRemove`).
    ///
    /// The source restores the property with a sift-down only after
    /// swapping in the last element; that is insufficient in general (the
    /// replacement can be smaller than its new parent) and would violate
    /// `spec.md` §8's quantified heap-order invariant, so this tries
    /// sift-up first and falls back to sift-down.
    pub fn erase_where(&mut self, mut predicate: impl FnMut(&T) -> bool) -> Option<T> {
        let idx = self.items.iter().position(|item| predicate(item))?;
        let last_idx = self.items.len() - 1;

        self.items.swap(idx, last_idx);
        let removed = self.items.pop();

        if idx < self.items.len() {
            let after_sift_up = self.sift_up(idx);
            if after_sift_up == idx {
                self.sift_down(idx);
            }
        }
        self.shrink_if_sparse();

        removed
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.shrink_if_sparse();
    }

    fn grow_if_full(&mut self) {
        if self.items.len() == self.items.capacity() {
            let new_capacity = self.items.capacity() * GROWTH_FACTOR + 1;
            self.items.reserve_exact(new_capacity - self.items.len());
        }
    }

    fn shrink_if_sparse(&mut self) {
        let capacity = self.items.capacity();
        if capacity > MIN_CAPACITY_FOR_SHRINK && self.items.len() < capacity / 4 {
            self.items.shrink_to(self.items.len());
        }
    }

    fn parent(idx: usize) -> usize {
        (idx - 1) / 2
    }

    fn left(idx: usize) -> usize {
        2 * idx + 1
    }

    fn right(idx: usize) -> usize {
        2 * idx + 2
    }

    /// Sift `idx` up while it precedes its parent. Returns the index it
    /// settled at, so callers can tell whether any swap happened.
    fn sift_up(&mut self, mut idx: usize) -> usize {
        while idx > 0 {
            let parent = Self::parent(idx);
            if self.items[idx].deadline() < self.items[parent].deadline() {
                self.items.swap(idx, parent);
                idx = parent;
            } else {
                break;
            }
        }
        idx
    }

    fn sift_down(&mut self, mut idx: usize) {
        loop {
            let left = Self::left(idx);
            let right = Self::right(idx);
            let len = self.items.len();

            let mut smallest = idx;
            if left < len && self.items[left].deadline() < self.items[smallest].deadline() {
                smallest = left;
            }
            if right < len && self.items[right].deadline() < self.items[smallest].deadline() {
                smallest = right;
            }

            if smallest == idx {
                break;
            }

            self.items.swap(idx, smallest);
            idx = smallest;
        }
    }
}

impl<T: HasDeadline> Default for BinaryMinHeap<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[derive(Debug, PartialEq, Eq, Clone, Copy)]
    struct Entry {
        label: u32,
        at: Instant,
    }

    impl HasDeadline for Entry {
        fn deadline(&self) -> Instant {
            self.at
        }
    }

    fn entry(base: Instant, label: u32, secs: u64) -> Entry {
        Entry {
            label,
            at: base + Duration::from_secs(secs),
        }
    }

    fn assert_heap_ordered(heap: &BinaryMinHeap<Entry>) {
        for i in 1..heap.items.len() {
            let parent = BinaryMinHeap::<Entry>::parent(i);
            assert!(
                heap.items[parent].deadline() <= heap.items[i].deadline(),
                "heap order violated at index {i}"
            );
        }
    }

    #[test]
    fn empty_heap_has_no_peek_or_pop() {
        let mut heap: BinaryMinHeap<Entry> = BinaryMinHeap::new();
        assert!(heap.peek().is_none());
        assert!(heap.pop().is_none());
        assert!(heap.is_empty());
    }

    #[test]
    fn peek_is_always_the_minimum() {
        let base = Instant::now();
        let mut heap = BinaryMinHeap::new();
        for (label, secs) in [(1, 5), (2, 1), (3, 9), (4, 3)] {
            heap.push(entry(base, label, secs));
        }

        assert_eq!(heap.peek().unwrap().label, 2);
    }

    #[test]
    fn pop_returns_items_in_nondecreasing_deadline_order() {
        let base = Instant::now();
        let mut heap = BinaryMinHeap::new();
        for (label, secs) in [(1, 5), (2, 1), (3, 9), (4, 3), (5, 7)] {
            heap.push(entry(base, label, secs));
        }

        let mut popped = Vec::new();
        while let Some(item) = heap.pop() {
            popped.push(item.label);
        }

        assert_eq!(popped, vec![2, 4, 1, 5, 3]);
    }

    #[test]
    fn heap_order_holds_after_every_push() {
        let base = Instant::now();
        let mut heap = BinaryMinHeap::new();
        for secs in [8, 1, 6, 2, 9, 0, 4, 7, 3, 5] {
            heap.push(entry(base, secs as u32, secs));
            assert_heap_ordered(&heap);
        }
    }

    #[test]
    fn heap_order_holds_after_every_pop() {
        let base = Instant::now();
        let mut heap = BinaryMinHeap::new();
        for secs in [8, 1, 6, 2, 9, 0, 4, 7, 3, 5] {
            heap.push(entry(base, secs as u32, secs));
        }

        while heap.pop().is_some() {
            assert_heap_ordered(&heap);
        }
    }

    #[test]
    fn erase_where_removes_matching_entry_and_preserves_order() {
        let base = Instant::now();
        let mut heap = BinaryMinHeap::new();
        for (label, secs) in [(1, 5), (2, 1), (3, 9), (4, 3), (5, 7), (6, 2)] {
            heap.push(entry(base, label, secs));
        }

        let removed = heap.erase_where(|e| e.label == 4);
        assert_eq!(removed.unwrap().label, 4);
        assert_eq!(heap.len(), 5);
        assert_heap_ordered(&heap);

        let mut labels = Vec::new();
        while let Some(item) = heap.pop() {
            labels.push(item.label);
        }
        assert_eq!(labels, vec![2, 6, 1, 5, 3]);
    }

    #[test]
    fn erase_where_on_missing_predicate_returns_none() {
        let base = Instant::now();
        let mut heap = BinaryMinHeap::new();
        heap.push(entry(base, 1, 1));

        assert!(heap.erase_where(|e| e.label == 999).is_none());
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn clear_empties_the_heap() {
        let base = Instant::now();
        let mut heap = BinaryMinHeap::new();
        for secs in 0..5 {
            heap.push(entry(base, secs, secs as u64));
        }

        heap.clear();

        assert!(heap.is_empty());
        assert_eq!(heap.len(), 0);
    }

    #[test]
    fn capacity_doubles_when_full_and_shrinks_when_sparse() {
        let base = Instant::now();
        let mut heap: BinaryMinHeap<Entry> = BinaryMinHeap::new();
        assert_eq!(heap.capacity(), INITIAL_CAPACITY);

        for secs in 0..INITIAL_CAPACITY as u64 {
            heap.push(entry(base, secs as u32, secs));
        }
        assert_eq!(heap.capacity(), INITIAL_CAPACITY);

        heap.push(entry(base, 99, 99));
        assert_eq!(heap.capacity(), INITIAL_CAPACITY * GROWTH_FACTOR + 1);

        for _ in 0..9 {
            heap.pop();
        }
        // len is now 2, well under capacity/4 -> should have shrunk.
        assert!(heap.capacity() < INITIAL_CAPACITY * GROWTH_FACTOR + 1);
    }
}
