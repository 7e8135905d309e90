use std::collections::VecDeque;

pub const DEFAULT_UNDO_CAPACITY: usize = 25;

/// Bounded LIFO; pushing onto a full buffer evicts the oldest entry.
#[derive(Debug, Clone)]
pub struct UndoBuffer<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> Default for UndoBuffer<T> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_UNDO_CAPACITY)
    }
}

impl<T> UndoBuffer<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn pop(&mut self) -> Option<T> {
        self.entries.pop_back()
    }

    /// Drops every entry for which `keep` returns `false`.
    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.entries.retain(keep);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
