//! Linear undo/redo over full-document snapshots.
//!
//! Snapshots are serialized sheet-specification text, not diffs. Writing
//! while the cursor is behind the tail discards the forward states first
//! (standard linear-history truncation). The stack is bounded; eviction
//! drops the oldest entry without moving the cursor back.

use std::time::{Duration, Instant};

use crate::document::{DocumentError, SheetDocument};

pub const DEFAULT_CAP: usize = 100;

/// Trailing debounce for manual form edits: rapid changes inside the window
/// coalesce into a single history capture. Time is passed in explicitly so
/// hosts drive it from their own tick and tests stay deterministic.
pub const MANUAL_EDIT_DEBOUNCE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct HistoryStack {
    snapshots: Vec<String>,
    cursor: usize,
    cap: usize,
}

impl Default for HistoryStack {
    fn default() -> Self {
        Self::new(DEFAULT_CAP)
    }
}

impl HistoryStack {
    pub fn new(cap: usize) -> Self {
        Self { snapshots: Vec::new(), cursor: 0, cap: cap.max(1) }
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        !self.snapshots.is_empty() && self.cursor < self.snapshots.len() - 1
    }

    /// Push the current document state. Any redo states beyond the cursor
    /// are discarded first.
    pub fn capture(&mut self, doc: &SheetDocument) {
        if !self.snapshots.is_empty() {
            self.snapshots.truncate(self.cursor + 1);
        }
        self.snapshots.push(doc.to_spec_string());
        if self.snapshots.len() > self.cap {
            // Evict the oldest; the cursor keeps pointing at the tail.
            self.snapshots.remove(0);
        } else if self.snapshots.len() > 1 {
            self.cursor += 1;
        }
    }

    /// Step back one snapshot and return the document to restore, or None
    /// when already at the oldest retained state.
    pub fn undo(&mut self) -> Result<Option<SheetDocument>, DocumentError> {
        if !self.can_undo() {
            return Ok(None);
        }
        let doc = SheetDocument::parse_spec(&self.snapshots[self.cursor - 1])?;
        self.cursor -= 1;
        Ok(Some(doc))
    }

    /// Step forward one snapshot and return the document to restore, or
    /// None when already at the tail.
    pub fn redo(&mut self) -> Result<Option<SheetDocument>, DocumentError> {
        if !self.can_redo() {
            return Ok(None);
        }
        let doc = SheetDocument::parse_spec(&self.snapshots[self.cursor + 1])?;
        self.cursor += 1;
        Ok(Some(doc))
    }
}

#[derive(Debug, Clone, Default)]
pub struct EditCoalescer {
    last_edit: Option<Instant>,
}

impl EditCoalescer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a manual edit; restarts the trailing window.
    pub fn note_edit(&mut self, now: Instant) {
        self.last_edit = Some(now);
    }

    pub fn pending(&self) -> bool {
        self.last_edit.is_some()
    }

    /// True exactly once when the debounce window has elapsed since the
    /// last recorded edit; the caller then captures a snapshot.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.last_edit {
            Some(last) if now.duration_since(last) >= MANUAL_EDIT_DEBOUNCE => {
                self.last_edit = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FieldForm, NodeKind};

    fn doc_with_answer(answer: &str) -> SheetDocument {
        let mut doc = SheetDocument::new();
        let top = doc.allocate("group", NodeKind::Category { prior: 0 });
        doc.attach(top, None, 0).unwrap();
        let mut form = FieldForm::skeleton();
        form.answer = answer.to_string();
        let field = doc.allocate("field", NodeKind::Field(Box::new(form)));
        doc.attach(field, Some(top), 0).unwrap();
        crate::ids::assign(&mut doc).unwrap();
        doc
    }

    #[test]
    fn test_undo_returns_to_previous_state() {
        let mut history = HistoryStack::default();
        history.capture(&doc_with_answer(""));
        history.capture(&doc_with_answer("first"));
        assert!(history.can_undo());
        assert!(!history.can_redo());

        let restored = history.undo().unwrap().unwrap();
        let field = restored.find_by_code("A-01").unwrap();
        let form = restored.node(field).unwrap().kind.form().unwrap().clone();
        assert_eq!(form.answer, "");
        assert!(history.can_redo());
    }

    #[test]
    fn test_undo_at_origin_is_noop() {
        let mut history = HistoryStack::default();
        history.capture(&doc_with_answer(""));
        assert!(history.undo().unwrap().is_none());
        assert_eq!(history.cursor(), 0);
    }

    #[test]
    fn test_history_linearity_truncates_redo_branch() {
        let mut history = HistoryStack::default();
        history.capture(&doc_with_answer("one"));
        history.capture(&doc_with_answer("two"));
        history.capture(&doc_with_answer("three"));

        history.undo().unwrap().unwrap();
        history.undo().unwrap().unwrap();
        assert!(history.can_redo());

        history.capture(&doc_with_answer("branch"));
        assert!(!history.can_redo());
        assert!(history.redo().unwrap().is_none());
        assert_eq!(history.len(), 2);

        // The discarded "two"/"three" states are unreachable.
        let restored = history.undo().unwrap().unwrap();
        let field = restored.find_by_code("A-01").unwrap();
        assert_eq!(restored.node(field).unwrap().kind.form().unwrap().answer, "one");
    }

    #[test]
    fn test_eviction_keeps_cursor_at_tail() {
        let mut history = HistoryStack::new(3);
        for i in 0..5 {
            history.capture(&doc_with_answer(&i.to_string()));
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.cursor(), 2);
        assert!(!history.can_redo());

        // Oldest retained entry is "2"; undo twice reaches it, no further.
        history.undo().unwrap().unwrap();
        let restored = history.undo().unwrap().unwrap();
        let field = restored.find_by_code("A-01").unwrap();
        assert_eq!(restored.node(field).unwrap().kind.form().unwrap().answer, "2");
        assert!(history.undo().unwrap().is_none());
    }

    #[test]
    fn test_coalescer_merges_rapid_edits() {
        let mut coalescer = EditCoalescer::new();
        let start = Instant::now();

        let mut captures = 0;
        for i in 0..10 {
            let t = start + Duration::from_millis(i * 30);
            coalescer.note_edit(t);
            if coalescer.poll(t) {
                captures += 1;
            }
        }
        // Window has not elapsed during the burst.
        assert_eq!(captures, 0);

        let settle = start + Duration::from_millis(9 * 30) + MANUAL_EDIT_DEBOUNCE;
        assert!(coalescer.poll(settle));
        captures += 1;
        assert_eq!(captures, 1);

        // Nothing further pending.
        assert!(!coalescer.poll(settle + Duration::from_secs(1)));
    }

    #[test]
    fn test_coalescer_window_restarts_on_new_edit() {
        let mut coalescer = EditCoalescer::new();
        let start = Instant::now();
        coalescer.note_edit(start);
        coalescer.note_edit(start + Duration::from_millis(400));
        assert!(!coalescer.poll(start + Duration::from_millis(700)));
        assert!(coalescer.poll(start + Duration::from_millis(400) + MANUAL_EDIT_DEBOUNCE));
    }
}
