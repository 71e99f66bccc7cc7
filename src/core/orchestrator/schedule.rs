//! Time-ordered retry schedule
//!
//! Operations waiting out a backoff delay sit here, keyed by fire time, and
//! are promoted back onto the work queue by the orchestration loop itself.
//! No timer tasks are spawned.

use crate::domain::Operation;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tokio::time::Instant;

struct Scheduled<I> {
    fire_at: Instant,
    seq: u64,
    operation: Operation<I>,
}

impl<I> PartialEq for Scheduled<I> {
    fn eq(&self, other: &Self) -> bool {
        self.fire_at == other.fire_at && self.seq == other.seq
    }
}

impl<I> Eq for Scheduled<I> {}

impl<I> PartialOrd for Scheduled<I> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<I> Ord for Scheduled<I> {
    // Reversed so the max-heap pops the earliest fire time; ties keep
    // scheduling order.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .fire_at
            .cmp(&self.fire_at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-heap of operations keyed by fire time
pub struct RetrySchedule<I> {
    heap: BinaryHeap<Scheduled<I>>,
    next_seq: u64,
}

impl<I> RetrySchedule<I> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            next_seq: 0,
        }
    }

    /// Schedule `operation` to become due at `fire_at`
    pub fn schedule(&mut self, operation: Operation<I>, fire_at: Instant) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled {
            fire_at,
            seq,
            operation,
        });
    }

    /// Remove and return every operation due at or before `now`, earliest first
    pub fn pop_due(&mut self, now: Instant) -> Vec<Operation<I>> {
        let mut due = Vec::new();
        while self.heap.peek().map(|s| s.fire_at <= now).unwrap_or(false) {
            if let Some(scheduled) = self.heap.pop() {
                due.push(scheduled.operation);
            }
        }
        due
    }

    /// Earliest pending fire time
    pub fn next_fire_at(&self) -> Option<Instant> {
        self.heap.peek().map(|s| s.fire_at)
    }

    /// Number of pending timers
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Remove every pending operation regardless of fire time
    pub fn drain(&mut self) -> Vec<Operation<I>> {
        let mut drained: Vec<Scheduled<I>> = self.heap.drain().collect();
        drained.sort_by(|a, b| b.cmp(a));
        drained.into_iter().map(|s| s.operation).collect()
    }
}

impl<I> Default for RetrySchedule<I> {
    fn default() -> Self {
        Self::new()
    }
}
