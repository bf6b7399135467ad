//! Logical-time task queue for the simulation clock.
//!
//! Tasks run in due-time order; ties run in the order they were scheduled.
//! Nothing here sleeps. The engine pops due tasks while it advances time.

use crate::types::Timestamp;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    Tick,
    News,
    MarginCallExpiry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Scheduled {
    due: Timestamp,
    seq: u64,
    task: Task,
}

impl Ord for Scheduled {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.due, self.seq).cmp(&(other.due, other.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    queue: BinaryHeap<Reverse<Scheduled>>,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, due: Timestamp, task: Task) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(Reverse(Scheduled { due, seq, task }));
    }

    /// Drops every pending instance of `task`. Returns whether any were pending.
    pub fn cancel(&mut self, task: Task) -> bool {
        let before = self.queue.len();
        self.queue.retain(|Reverse(s)| s.task != task);
        self.queue.len() != before
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn is_scheduled(&self, task: Task) -> bool {
        self.queue.iter().any(|Reverse(s)| s.task == task)
    }

    /// Earliest due time of `task`, if pending.
    pub fn due_of(&self, task: Task) -> Option<Timestamp> {
        self.queue
            .iter()
            .filter(|Reverse(s)| s.task == task)
            .map(|Reverse(s)| s.due)
            .min()
    }

    pub fn peek_due(&self) -> Option<Timestamp> {
        self.queue.peek().map(|Reverse(s)| s.due)
    }

    /// Next task due at or before `until`.
    pub fn pop_due(&mut self, until: Timestamp) -> Option<(Timestamp, Task)> {
        match self.queue.peek() {
            Some(Reverse(s)) if s.due <= until => {
                let Reverse(s) = self.queue.pop()?;
                Some((s.due, s.task))
            }
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
