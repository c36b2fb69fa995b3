//! Bounded undo/redo over `{vertices, shapes}` snapshots.
//!
//! A snapshot is two `Arc` clones, so recording one costs nothing until the
//! document is next mutated. Selection, hover, groups and frames are not
//! versioned.

#[cfg(test)]
#[path = "history_test.rs"]
mod history_test;

use std::collections::VecDeque;
use std::sync::Arc;

use crate::consts::HISTORY_CAPACITY;
use crate::doc::{Document, ShapeMap, VertexMap};

/// Captured topology used for undo/redo.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub vertices: Arc<VertexMap>,
    pub shapes: Arc<ShapeMap>,
}

impl Snapshot {
    #[must_use]
    pub fn of(doc: &Document) -> Self {
        Self { vertices: Arc::clone(&doc.vertices), shapes: Arc::clone(&doc.shapes) }
    }

    /// Whether `doc` still holds exactly this topology (same allocations).
    #[must_use]
    pub fn is_current(&self, doc: &Document) -> bool {
        Arc::ptr_eq(&self.vertices, &doc.vertices) && Arc::ptr_eq(&self.shapes, &doc.shapes)
    }

    /// Swap this topology into `doc`, dropping selection and hover that no longer resolve.
    pub fn restore_into(self, doc: &mut Document) {
        doc.vertices = self.vertices;
        doc.shapes = self.shapes;
        doc.prune_transient();
    }
}

/// Undo/redo stacks. `past` is a ring buffer evicting its oldest entry at capacity.
#[derive(Debug, Clone)]
pub struct History {
    past: VecDeque<Snapshot>,
    future: Vec<Snapshot>,
    capacity: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl History {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self { past: VecDeque::with_capacity(capacity), future: Vec::new(), capacity: capacity.max(1) }
    }

    /// Push a snapshot taken before a structural edit. Clears the redo stack.
    pub fn push(&mut self, snapshot: Snapshot) {
        self.push_past(snapshot);
        self.future.clear();
    }

    /// Record the document's current topology. Clears the redo stack.
    pub fn record(&mut self, doc: &Document) {
        self.push(Snapshot::of(doc));
    }

    fn push_past(&mut self, snapshot: Snapshot) {
        self.past.push_back(snapshot);
        while self.past.len() > self.capacity {
            self.past.pop_front();
        }
    }

    /// Step back. Returns false (and leaves `doc` alone) when there is nothing to undo.
    pub fn undo(&mut self, doc: &mut Document) -> bool {
        let Some(prev) = self.past.pop_back() else {
            return false;
        };
        self.future.push(Snapshot::of(doc));
        prev.restore_into(doc);
        true
    }

    /// Step forward. Returns false (and leaves `doc` alone) when there is nothing to redo.
    pub fn redo(&mut self, doc: &mut Document) -> bool {
        let Some(next) = self.future.pop() else {
            return false;
        };
        self.push_past(Snapshot::of(doc));
        next.restore_into(doc);
        true
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    #[must_use]
    pub fn past_len(&self) -> usize {
        self.past.len()
    }

    #[must_use]
    pub fn future_len(&self) -> usize {
        self.future.len()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
    }
}
