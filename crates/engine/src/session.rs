//! Editing session: one document plus its undo history, edit coalescing,
//! and change events.
//!
//! Capture discipline, which every mutation path goes through:
//!
//! - loading (or starting blank) captures the initial state,
//! - manual form edits coalesce through the trailing debounce window and
//!   capture once when it elapses,
//! - a model update batch captures once per batch, never per field,
//! - structural edits and clear-all capture immediately,
//! - any pending coalesced edit is committed before another mutation kind
//!   runs, so its snapshot is not folded into the next one.

use std::time::Instant;

use crate::binder::{self, FieldUpdate, UpdateReport};
use crate::document::{DocumentError, SheetDocument};
use crate::editor::{self, EditError, MetaPatch};
use crate::events::SheetEvent;
use crate::history::{EditCoalescer, HistoryStack};

#[derive(Debug)]
pub struct SheetSession {
    doc: SheetDocument,
    history: HistoryStack,
    coalescer: EditCoalescer,
    events: Vec<SheetEvent>,
}

impl SheetSession {
    /// Start a session on an empty sheet.
    pub fn new() -> Self {
        Self::from_document(SheetDocument::new())
    }

    /// Start a session on a parsed sheet specification.
    pub fn load(json: &str) -> Result<Self, DocumentError> {
        Ok(Self::from_document(SheetDocument::parse_spec(json)?))
    }

    fn from_document(doc: SheetDocument) -> Self {
        let mut history = HistoryStack::default();
        history.capture(&doc);
        Self { doc, history, coalescer: EditCoalescer::new(), events: Vec::new() }
    }

    pub fn document(&self) -> &SheetDocument {
        &self.doc
    }

    pub fn serialize(&self) -> String {
        self.doc.to_spec_string()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Take all events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<SheetEvent> {
        std::mem::take(&mut self.events)
    }

    fn capture(&mut self) {
        self.history.capture(&self.doc);
        self.events.push(SheetEvent::SnapshotCaptured);
    }

    /// Commit any coalesced manual edit now, so its snapshot is separate
    /// from whatever mutation follows.
    fn commit_pending(&mut self) {
        if self.coalescer.pending() {
            self.coalescer = EditCoalescer::new();
            self.capture();
        }
    }

    // ── Manual form edits ───────────────────────────────────────────

    /// Write a field's main answer, as entered through its control. The
    /// capture is deferred through the debounce window; call [`tick`] to
    /// drive it.
    ///
    /// [`tick`]: SheetSession::tick
    pub fn set_answer(&mut self, id: &str, value: &str, now: Instant) -> Result<(), EditError> {
        self.set_form_text(id, value, now, false)
    }

    /// Write a field's sub-control ("other") text.
    pub fn set_sub_answer(&mut self, id: &str, value: &str, now: Instant) -> Result<(), EditError> {
        self.set_form_text(id, value, now, true)
    }

    fn set_form_text(
        &mut self,
        id: &str,
        value: &str,
        now: Instant,
        sub: bool,
    ) -> Result<(), EditError> {
        let handle = self
            .doc
            .find_by_code(id)
            .ok_or_else(|| EditError::NotFound { op: "set", id: id.to_string() })?;
        let form = self
            .doc
            .node_mut(handle)
            .and_then(|n| n.kind.form_mut())
            .ok_or_else(|| EditError::NotFound { op: "set", id: id.to_string() })?;
        if sub {
            form.sub_answer = value.to_string();
        } else {
            form.answer = value.to_string();
        }
        self.coalescer.note_edit(now);
        self.events.push(SheetEvent::FieldsUpdated { fields: vec![id.to_string()] });
        Ok(())
    }

    /// Drive the debounce clock; captures a snapshot once the window has
    /// elapsed since the last manual edit.
    pub fn tick(&mut self, now: Instant) {
        if self.coalescer.poll(now) {
            self.capture();
        }
    }

    // ── Model update batches ────────────────────────────────────────

    /// Apply a conversation turn's field updates. One snapshot for the
    /// whole batch; undo removes the entire turn.
    pub fn apply_field_updates(&mut self, updates: &[FieldUpdate]) -> UpdateReport {
        self.apply_batch(updates)
    }

    /// Apply a bulk-import result. Same discipline: exactly one snapshot
    /// per import, however many fields it fills.
    pub fn apply_bulk_fields(&mut self, updates: &[FieldUpdate]) -> UpdateReport {
        self.apply_batch(updates)
    }

    fn apply_batch(&mut self, updates: &[FieldUpdate]) -> UpdateReport {
        self.commit_pending();
        let report = binder::apply_batch(&mut self.doc, updates);
        if !report.applied.is_empty() {
            self.events.push(SheetEvent::FieldsUpdated { fields: report.applied.clone() });
            self.capture();
        }
        report
    }

    // ── Structural edits ────────────────────────────────────────────

    pub fn add_child(&mut self, parent_id: &str) -> Result<String, EditError> {
        self.commit_pending();
        let code = editor::add_child(&mut self.doc, parent_id)?;
        self.events.push(SheetEvent::StructureChanged);
        self.capture();
        Ok(code)
    }

    pub fn delete(&mut self, id: &str) -> Result<usize, EditError> {
        self.commit_pending();
        let removed = editor::delete(&mut self.doc, id)?;
        self.events.push(SheetEvent::StructureChanged);
        self.capture();
        Ok(removed)
    }

    pub fn move_node(
        &mut self,
        id: &str,
        new_parent: Option<&str>,
        index: usize,
    ) -> Result<(), EditError> {
        self.commit_pending();
        editor::move_node(&mut self.doc, id, new_parent, index)?;
        self.events.push(SheetEvent::StructureChanged);
        self.capture();
        Ok(())
    }

    pub fn update_meta(&mut self, id: &str, patch: &MetaPatch) -> Result<(), EditError> {
        self.commit_pending();
        editor::update_meta(&mut self.doc, id, patch)?;
        self.events.push(SheetEvent::StructureChanged);
        self.capture();
        Ok(())
    }

    /// Blank every answer on the sheet. One snapshot; undo restores all.
    pub fn clear_all(&mut self) {
        self.commit_pending();
        let fields: Vec<String> = self
            .doc
            .terminal_fields()
            .iter()
            .filter_map(|&h| self.doc.node(h).map(|n| n.code().to_string()))
            .collect();
        editor::clear_all_answers(&mut self.doc);
        self.events.push(SheetEvent::FieldsUpdated { fields });
        self.capture();
    }

    // ── History ─────────────────────────────────────────────────────

    /// Step back one state. Returns false when already at the oldest
    /// retained snapshot.
    pub fn undo(&mut self) -> Result<bool, DocumentError> {
        self.commit_pending();
        match self.history.undo()? {
            Some(doc) => {
                self.doc = doc;
                self.events.push(SheetEvent::HistoryMoved {
                    can_undo: self.history.can_undo(),
                    can_redo: self.history.can_redo(),
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Step forward one state. Returns false when already at the tail.
    ///
    /// A manual edit still inside the debounce window is committed first;
    /// its capture truncates the forward states, so the redo becomes a
    /// no-op rather than clobbering the edit.
    pub fn redo(&mut self) -> Result<bool, DocumentError> {
        self.commit_pending();
        match self.history.redo()? {
            Some(doc) => {
                self.doc = doc;
                self.events.push(SheetEvent::HistoryMoved {
                    can_undo: self.history.can_undo(),
                    can_redo: self.history.can_redo(),
                });
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl Default for SheetSession {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::MANUAL_EDIT_DEBOUNCE;
    use std::time::Duration;

    const SPEC: &str = r#"{"sheet-content": [
        {"id": "A", "parent": "root", "level": 1, "type": "nonterminal", "name": "授業情報", "form": {"prior": 1}},
        {"id": "A-01", "parent": "A", "level": 2, "type": "terminal", "name": "学年", "form": {"prior": 1}},
        {"id": "A-02", "parent": "A", "level": 2, "type": "terminal", "name": "活動内容",
         "form": {"form-main": "checkbox",
                  "form-main-option": "調べ学習／読み聞かせ・ブックトーク／その他／未定"}}
    ]}"#;

    fn answer(session: &SheetSession, code: &str) -> String {
        let doc = session.document();
        let handle = doc.find_by_code(code).unwrap();
        doc.node(handle).unwrap().kind.form().unwrap().answer.clone()
    }

    #[test]
    fn test_load_captures_initial_state() {
        let mut session = SheetSession::load(SPEC).unwrap();
        assert!(!session.can_undo());
        assert!(!session.can_redo());
        assert!(!session.undo().unwrap());
    }

    #[test]
    fn test_manual_edit_captures_after_debounce() {
        let mut session = SheetSession::load(SPEC).unwrap();
        let start = Instant::now();
        session.set_answer("A-01", "3年生", start).unwrap();
        assert!(!session.can_undo());

        session.tick(start + MANUAL_EDIT_DEBOUNCE);
        assert!(session.can_undo());
        assert!(session.undo().unwrap());
        assert_eq!(answer(&session, "A-01"), "");
    }

    #[test]
    fn test_rapid_edits_coalesce_into_one_snapshot() {
        let mut session = SheetSession::load(SPEC).unwrap();
        let start = Instant::now();
        for (i, value) in ["3", "3年", "3年生"].iter().enumerate() {
            let t = start + Duration::from_millis(i as u64 * 100);
            session.set_answer("A-01", value, t).unwrap();
            session.tick(t);
        }
        session.tick(start + Duration::from_millis(200) + MANUAL_EDIT_DEBOUNCE);

        let events = session.drain_events();
        let captures = events
            .iter()
            .filter(|e| matches!(e, SheetEvent::SnapshotCaptured))
            .count();
        assert_eq!(captures, 1);

        // Undo jumps over the whole burst.
        assert!(session.undo().unwrap());
        assert_eq!(answer(&session, "A-01"), "");
        assert!(!session.can_undo());
    }

    #[test]
    fn test_update_batch_is_one_undo_step() {
        let mut session = SheetSession::load(SPEC).unwrap();
        let report = session.apply_field_updates(&[
            FieldUpdate::new("A-01", "3年生"),
            FieldUpdate::new("A-02", "調べ学習／その他"),
        ]);
        assert_eq!(report.applied_count(), 2);
        assert_eq!(answer(&session, "A-02"), "調べ学習／その他");

        assert!(session.undo().unwrap());
        assert_eq!(answer(&session, "A-01"), "");
        assert_eq!(answer(&session, "A-02"), "");
    }

    #[test]
    fn test_bulk_apply_captures_exactly_once() {
        let mut session = SheetSession::load(SPEC).unwrap();
        session.drain_events();
        let report = session.apply_bulk_fields(&[
            FieldUpdate::new("A-01", "5年生"),
            FieldUpdate::new("Z-99", "dropped"),
            FieldUpdate::new("A-02", "未定"),
        ]);
        assert_eq!(report.applied, vec!["A-01", "A-02"]);
        assert_eq!(report.skipped.len(), 1);

        let events = session.drain_events();
        let captures = events
            .iter()
            .filter(|e| matches!(e, SheetEvent::SnapshotCaptured))
            .count();
        assert_eq!(captures, 1);
    }

    #[test]
    fn test_batch_with_no_applicable_updates_captures_nothing() {
        let mut session = SheetSession::load(SPEC).unwrap();
        session.drain_events();
        let report = session.apply_field_updates(&[FieldUpdate::new("Z-99", "lost")]);
        assert_eq!(report.applied_count(), 0);
        assert!(session.drain_events().is_empty());
        assert!(!session.can_undo());
    }

    #[test]
    fn test_structural_edit_is_undoable() {
        let mut session = SheetSession::load(SPEC).unwrap();
        let code = session.add_child("A").unwrap();
        assert_eq!(code, "A-01");
        assert_eq!(session.document().len(), 4);

        let events = session.drain_events();
        assert!(events.contains(&SheetEvent::StructureChanged));

        assert!(session.undo().unwrap());
        assert_eq!(session.document().len(), 3);
        assert!(session.document().find_by_code("A-03").is_none());
    }

    #[test]
    fn test_delete_then_undo_restores_subtree() {
        let mut session = SheetSession::load(SPEC).unwrap();
        session.set_answer("A-01", "keep", Instant::now()).unwrap();
        let removed = session.delete("A").unwrap();
        assert_eq!(removed, 3);
        assert!(session.document().is_empty());

        assert!(session.undo().unwrap());
        assert_eq!(session.document().len(), 3);
        assert_eq!(answer(&session, "A-01"), "keep");
    }

    #[test]
    fn test_pending_edit_commits_before_structural_snapshot() {
        let mut session = SheetSession::load(SPEC).unwrap();
        session.set_answer("A-01", "typed", Instant::now()).unwrap();
        // Structural op lands before the debounce window elapses.
        session.add_child("A").unwrap();

        // Two snapshots: the manual edit, then the add. First undo removes
        // the add but keeps the typed answer.
        assert!(session.undo().unwrap());
        assert_eq!(session.document().len(), 3);
        assert_eq!(answer(&session, "A-01"), "typed");
        // Second undo removes the typed answer.
        assert!(session.undo().unwrap());
        assert_eq!(answer(&session, "A-01"), "");
    }

    #[test]
    fn test_clear_all_is_one_undo_step() {
        let mut session = SheetSession::load(SPEC).unwrap();
        session.apply_field_updates(&[
            FieldUpdate::new("A-01", "3年生"),
            FieldUpdate::new("A-02", "未定"),
        ]);
        session.clear_all();
        assert_eq!(answer(&session, "A-01"), "");
        assert_eq!(answer(&session, "A-02"), "");

        assert!(session.undo().unwrap());
        assert_eq!(answer(&session, "A-01"), "3年生");
        assert_eq!(answer(&session, "A-02"), "未定");
    }

    #[test]
    fn test_redo_after_undo() {
        let mut session = SheetSession::load(SPEC).unwrap();
        session.apply_field_updates(&[FieldUpdate::new("A-01", "6年生")]);
        session.undo().unwrap();
        assert_eq!(answer(&session, "A-01"), "");
        assert!(session.can_redo());

        assert!(session.redo().unwrap());
        assert_eq!(answer(&session, "A-01"), "6年生");
        assert!(!session.can_redo());
    }

    #[test]
    fn test_pending_edit_survives_redo() {
        let mut session = SheetSession::load(SPEC).unwrap();
        session.apply_field_updates(&[FieldUpdate::new("A-01", "6年生")]);
        session.undo().unwrap();
        assert!(session.can_redo());

        // Typing inside the debounce window starts a new branch; the redo
        // state is discarded, not restored over the edit.
        session.set_answer("A-01", "4年生", Instant::now()).unwrap();
        assert!(!session.redo().unwrap());
        assert_eq!(answer(&session, "A-01"), "4年生");
        assert!(!session.can_redo());

        // The committed edit is its own undo step.
        assert!(session.undo().unwrap());
        assert_eq!(answer(&session, "A-01"), "");
    }
}
