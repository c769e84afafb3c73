use std::collections::VecDeque;

pub const DEFAULT_UNDO_LIMIT: usize = 20;

#[derive(Debug, Clone)]
struct Entry<T> {
    label: String,
    state: T,
}

/// Bounded snapshot history.
///
/// `record` stores the state as it was before a mutation. The oldest
/// snapshot is dropped once the limit is reached, and any new record
/// invalidates the redo stack.
#[derive(Debug, Clone)]
pub struct History<T: Clone> {
    undo: VecDeque<Entry<T>>,
    redo: Vec<Entry<T>>,
    limit: usize,
}

impl<T: Clone> History<T> {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: VecDeque::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    pub fn record(&mut self, label: &str, snapshot: T) {
        self.push_undo(Entry {
            label: label.to_string(),
            state: snapshot,
        });
        self.redo.clear();
    }

    /// Step back. `current` is parked on the redo stack under the same label.
    pub fn undo(&mut self, current: T) -> Option<(String, T)> {
        let entry = self.undo.pop_back()?;
        self.redo.push(Entry {
            label: entry.label.clone(),
            state: current,
        });
        Some((entry.label, entry.state))
    }

    pub fn redo(&mut self, current: T) -> Option<(String, T)> {
        let entry = self.redo.pop()?;
        self.push_undo(Entry {
            label: entry.label.clone(),
            state: current,
        });
        Some((entry.label, entry.state))
    }

    fn push_undo(&mut self, entry: Entry<T>) {
        self.undo.push_back(entry);
        while self.undo.len() > self.limit {
            self.undo.pop_front();
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo.len()
    }

    pub fn undo_label(&self) -> Option<&str> {
        self.undo.back().map(|e| e.label.as_str())
    }

    pub fn redo_label(&self) -> Option<&str> {
        self.redo.last().map(|e| e.label.as_str())
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

impl<T: Clone> Default for History<T> {
    fn default() -> Self {
        Self::new(DEFAULT_UNDO_LIMIT)
    }
}
