//! Debounced save scheduling.
//!
//! Mutations mark keys dirty; the dirty set is released once no mutation
//! has happened for the configured idle delay. Time is passed in by the
//! caller so the policy stays deterministic.

use crate::persist::StorageKey;
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct SaveScheduler {
    delay: Duration,
    dirty: BTreeSet<StorageKey>,
    last_mutation: Option<Instant>,
}

impl SaveScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            dirty: BTreeSet::new(),
            last_mutation: None,
        }
    }

    /// Marks keys dirty and restarts the idle timer.
    pub fn mark_dirty(&mut self, keys: &[StorageKey], now: Instant) {
        if keys.is_empty() {
            return;
        }
        self.dirty.extend(keys.iter().copied());
        self.last_mutation = Some(now);
    }

    pub fn has_pending(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Whether the idle delay has elapsed since the last mutation.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.last_mutation {
            Some(last) if self.has_pending() => now.saturating_duration_since(last) >= self.delay,
            _ => false,
        }
    }

    /// Takes the dirty set if due; otherwise leaves it pending.
    pub fn take_due(&mut self, now: Instant) -> Vec<StorageKey> {
        if !self.is_due(now) {
            return Vec::new();
        }
        self.take_all()
    }

    /// Takes the dirty set regardless of the timer.
    pub fn take_all(&mut self) -> Vec<StorageKey> {
        self.last_mutation = None;
        std::mem::take(&mut self.dirty).into_iter().collect()
    }

    /// Clears pending keys without writing them.
    pub fn discard(&mut self) {
        self.dirty.clear();
        self.last_mutation = None;
    }
}
