use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Number of largest files reported per top-level directory.
pub const TOP_K: usize = 5;

/// Bounded accumulator of the K largest `(size, name)` pairs.
///
/// Holds at most K entries in a min-heap whose root is the weakest entry.
/// Strength is `(size, earlier observation)`, so on equal sizes the name
/// seen first keeps its place and repeated scans of the same tree agree.
#[derive(Debug, Clone)]
pub struct TopKFileTracker {
    k: usize,
    seq: u64,
    heap: BinaryHeap<Reverse<(u64, Reverse<u64>, String)>>,
}

impl Default for TopKFileTracker {
    fn default() -> Self {
        Self::new(TOP_K)
    }
}

impl TopKFileTracker {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            seq: 0,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    pub fn observe(&mut self, size: u64, name: impl Into<String>) {
        if self.k == 0 {
            return;
        }
        let seq = self.seq;
        self.seq += 1;

        if self.heap.len() < self.k {
            self.heap.push(Reverse((size, Reverse(seq), name.into())));
            return;
        }
        // A later observation never beats an equal size, so only strictly
        // larger files displace the weakest entry.
        let displaces = self
            .heap
            .peek()
            .map(|Reverse((weakest, _, _))| size > *weakest)
            .unwrap_or(false);
        if displaces {
            self.heap.pop();
            self.heap.push(Reverse((size, Reverse(seq), name.into())));
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Names largest first; equal sizes in observation order.
    pub fn result(&self) -> Vec<String> {
        let mut entries: Vec<_> = self.heap.iter().map(|Reverse(e)| e).collect();
        entries.sort_by(|a, b| b.0.cmp(&a.0).then(a.1 .0.cmp(&b.1 .0)));
        entries.into_iter().map(|e| e.2.clone()).collect()
    }

    pub fn into_result(self) -> Vec<String> {
        self.result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_five_largest_in_order() {
        let mut tracker = TopKFileTracker::default();
        let observed = [(10, "a"), (50, "b"), (5, "c"), (70, "d"), (20, "e"), (60, "f"), (1, "g")];
        for (size, name) in observed {
            tracker.observe(size, name);
        }
        assert_eq!(tracker.result(), vec!["d", "f", "b", "e", "a"]);
    }

    #[test]
    fn ties_prefer_first_observed() {
        let mut tracker = TopKFileTracker::new(2);
        tracker.observe(100, "first");
        tracker.observe(100, "second");
        tracker.observe(100, "third");
        assert_eq!(tracker.result(), vec!["first", "second"]);
    }

    #[test]
    fn ties_inside_result_follow_observation_order() {
        let mut tracker = TopKFileTracker::default();
        tracker.observe(7, "x");
        tracker.observe(9, "big");
        tracker.observe(7, "y");
        assert_eq!(tracker.result(), vec!["big", "x", "y"]);
    }

    #[test]
    fn zero_byte_files_rank_lowest() {
        let mut tracker = TopKFileTracker::new(3);
        tracker.observe(0, "empty");
        tracker.observe(3, "three");
        tracker.observe(1, "one");
        assert_eq!(tracker.result(), vec!["three", "one", "empty"]);

        tracker.observe(2, "two");
        assert_eq!(tracker.result(), vec!["three", "two", "one"]);
    }

    #[test]
    fn permutation_preserving_tie_order_gives_same_result() {
        let files = [(4u64, "p"), (8, "q"), (4, "r"), (2, "s"), (8, "t"), (6, "u"), (1, "v")];
        let mut forward = TopKFileTracker::default();
        for (size, name) in files {
            forward.observe(size, name);
        }

        // Reordered, but "p" still before "r" and "q" before "t".
        let shuffled = [(1u64, "v"), (6, "u"), (4, "p"), (8, "q"), (2, "s"), (4, "r"), (8, "t")];
        let mut other = TopKFileTracker::default();
        for (size, name) in shuffled {
            other.observe(size, name);
        }

        assert_eq!(forward.result(), vec!["q", "t", "u", "p", "r"]);
        assert_eq!(forward.result(), other.result());
    }

    #[test]
    fn fewer_than_k_files() {
        let mut tracker = TopKFileTracker::default();
        assert!(tracker.is_empty());
        tracker.observe(1, "only");
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.into_result(), vec!["only"]);
    }
}
