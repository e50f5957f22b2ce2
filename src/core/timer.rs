//! One-shot timers for the event loop

use std::time::{Duration, Instant};

/// Pending one-shot tasks, fired in deadline order.
///
/// Tasks are never cancelled; the owner decides whether a fired task still
/// applies.
#[derive(Debug)]
pub struct TimerQueue<T> {
    entries: Vec<(Instant, u64, T)>,
    next_seq: u64,
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            next_seq: 0,
        }
    }

    /// Schedule `task` to fire `delay` after `now`
    pub fn add(&mut self, now: Instant, delay: Duration, task: T) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.push((now + delay, seq, task));
    }

    /// Earliest deadline, if any task is pending
    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.iter().map(|(at, _, _)| *at).min()
    }

    /// Time left until the earliest deadline, zero if already due
    pub fn timeout(&self, now: Instant) -> Option<Duration> {
        self.next_deadline()
            .map(|at| at.saturating_duration_since(now))
    }

    /// Remove and return every task due at `now`, earliest first
    pub fn pop_due(&mut self, now: Instant) -> Vec<T> {
        let mut due = Vec::new();
        let mut i = 0;
        while i < self.entries.len() {
            if self.entries[i].0 <= now {
                due.push(self.entries.swap_remove(i));
            } else {
                i += 1;
            }
        }
        due.sort_by_key(|(at, seq, _)| (*at, *seq));
        due.into_iter().map(|(_, _, task)| task).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
