//! State container pairing the document with its history.
//!
//! All mutation goes through [`Store::dispatch`]. Structural actions are
//! snapshotted immediately before they are applied; if the action turns out
//! not to touch topology the snapshot is discarded, so a rejected edit never
//! leaves an empty undo step behind.

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;

use crate::doc::Document;
use crate::history::{History, Snapshot};
use crate::reduce::{Action, reduce};

#[derive(Debug, Clone, Default)]
pub struct Store {
    doc: Document,
    history: History,
}

impl Store {
    #[must_use]
    pub fn new(history_capacity: usize) -> Self {
        Self { doc: Document::default(), history: History::new(history_capacity) }
    }

    #[must_use]
    pub fn doc(&self) -> &Document {
        &self.doc
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Apply one action, snapshotting first when it is structural.
    pub fn dispatch(&mut self, action: Action) {
        match action {
            Action::Undo => {
                self.undo();
            }
            Action::Redo => {
                self.redo();
            }
            Action::ClearAll => self.clear_all(),
            action if action.is_structural() => {
                let before = Snapshot::of(&self.doc);
                self.apply(action);
                if !before.is_current(&self.doc) {
                    self.history.push(before);
                }
            }
            action => self.apply(action),
        }
    }

    /// Apply several actions as one undo step.
    ///
    /// A single snapshot is taken up front if any action is structural.
    /// History commands inside a batch are ignored.
    pub fn dispatch_batch(&mut self, actions: Vec<Action>) {
        let structural = actions.iter().any(Action::is_structural);
        let before = Snapshot::of(&self.doc);
        for action in actions {
            if matches!(action, Action::Undo | Action::Redo | Action::ClearAll) {
                continue;
            }
            self.apply(action);
        }
        if structural && !before.is_current(&self.doc) {
            self.history.push(before);
        }
    }

    /// Record the current topology ahead of a continuous gesture (drag, resize)
    /// whose intermediate steps are not snapshotted.
    pub fn checkpoint(&mut self) {
        self.history.record(&self.doc);
    }

    /// Returns false when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let undone = self.history.undo(&mut self.doc);
        if !undone {
            tracing::debug!("undo with empty history");
        }
        undone
    }

    /// Returns false when there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let redone = self.history.redo(&mut self.doc);
        if !redone {
            tracing::debug!("redo with empty future");
        }
        redone
    }

    /// Reset to an empty document and forget all history.
    pub fn clear_all(&mut self) {
        self.doc = Document::default();
        self.history.clear();
    }

    fn apply(&mut self, action: Action) {
        let doc = std::mem::take(&mut self.doc);
        self.doc = reduce(doc, action);
    }
}
