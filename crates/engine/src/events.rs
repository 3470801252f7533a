//! Change notifications emitted by a sheet session.
//!
//! A rendering front end drains these to know when to re-render the tree,
//! refresh individual controls, or update undo/redo affordances. The test
//! suite uses them to verify capture discipline.

/// Events emitted by SheetSession mutations.
#[derive(Debug, Clone, PartialEq)]
pub enum SheetEvent {
    /// One or more field answers changed; carries the display codes.
    FieldsUpdated { fields: Vec<String> },

    /// Tree shape changed (add/delete/move/meta edit). Codes have been
    /// renumbered; a full re-render is required.
    StructureChanged,

    /// A snapshot was pushed onto the history stack.
    SnapshotCaptured,

    /// The history cursor moved (undo/redo); the document was replaced
    /// wholesale and derived UI state must refresh.
    HistoryMoved { can_undo: bool, can_redo: bool },
}
