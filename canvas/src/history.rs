//! Snapshot undo stack.
//!
//! Before each undoable mutation the engine pushes a copy of the whole project
//! collection. Undo pops the newest copy and swaps it in. There is no redo:
//! popping discards the snapshot.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::VecDeque;

use crate::consts::HISTORY_CAPACITY;
use crate::doc::Project;

/// Bounded LIFO of project-collection snapshots. When full, the oldest
/// snapshot is evicted.
#[derive(Debug, Clone)]
pub struct History {
    snapshots: VecDeque<Vec<Project>>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl History {
    /// Create an empty history retaining at most `capacity` snapshots.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { snapshots: VecDeque::with_capacity(capacity), capacity }
    }

    /// Store a copy of `projects` as the newest snapshot.
    pub fn push(&mut self, projects: &[Project]) {
        if self.capacity == 0 {
            return;
        }
        while self.snapshots.len() >= self.capacity {
            self.snapshots.pop_front();
        }
        self.snapshots.push_back(projects.to_vec());
    }

    /// Remove and return the newest snapshot.
    pub fn pop(&mut self) -> Option<Vec<Project>> {
        self.snapshots.pop_back()
    }

    pub fn clear(&mut self) {
        self.snapshots.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
