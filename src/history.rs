use crate::model::{Annotation, PageCanvas};
use std::collections::VecDeque;

/// Maximum retained undo snapshots before the oldest is discarded.
pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

/// Snapshot-based history over the whole annotation sequence.
///
/// Every forward mutation (append, clear, bulk replace) first pushes a full
/// snapshot of the current canvas onto the undo stack and clears the redo
/// stack. An initial empty snapshot is pushed at creation, so the first undo
/// is a harmless no-op rather than an error.
#[derive(Debug, Clone)]
pub struct SnapshotHistory {
    current: PageCanvas,
    undo_stack: VecDeque<PageCanvas>,
    redo_stack: Vec<PageCanvas>,
    capacity: usize,
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let mut undo_stack = VecDeque::new();
        undo_stack.push_back(PageCanvas::default());
        Self {
            current: PageCanvas::default(),
            undo_stack,
            redo_stack: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    pub fn canvas(&self) -> &PageCanvas {
        &self.current
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo_stack.len()
    }

    fn snapshot_before_mutation(&mut self) {
        self.undo_stack.push_back(self.current.clone());
        while self.undo_stack.len() > self.capacity {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
    }

    pub fn append(&mut self, annotation: Annotation) {
        self.snapshot_before_mutation();
        self.current.annotations.push(annotation);
    }

    /// Replaces the sequence with an empty one, undoably.
    pub fn clear(&mut self) {
        self.snapshot_before_mutation();
        self.current = PageCanvas::default();
    }

    /// Bulk replacement used by state restore; same snapshot discipline as
    /// every other forward mutation.
    pub fn replace(&mut self, canvas: PageCanvas) {
        self.snapshot_before_mutation();
        self.current = canvas;
    }

    /// Returns whether a snapshot was restored. Empty stack is a no-op.
    pub fn undo(&mut self) -> bool {
        match self.undo_stack.pop_back() {
            Some(previous) => {
                self.redo_stack
                    .push(std::mem::replace(&mut self.current, previous));
                true
            }
            None => false,
        }
    }

    /// Returns whether a snapshot was reapplied. Empty stack is a no-op.
    pub fn redo(&mut self) -> bool {
        match self.redo_stack.pop() {
            Some(next) => {
                self.undo_stack
                    .push_back(std::mem::replace(&mut self.current, next));
                while self.undo_stack.len() > self.capacity {
                    self.undo_stack.pop_front();
                }
                true
            }
            None => false,
        }
    }
}

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::new()
    }
}
