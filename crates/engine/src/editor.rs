//! Structural mutations: add child, delete subtree, reorder/reparent, and
//! node metadata edits.
//!
//! Every operation either commits fully and renumbers the whole tree, or
//! leaves the document untouched: a failed renumber rolls the mutation
//! back. History capture and events are the session's concern.

use std::fmt;

use crate::document::{DocumentError, NodeType, SheetDocument};
use crate::ids::{self, IdError};
use crate::node::{ControlKind, FieldForm, NodeHandle, NodeKind};

/// Deepest nesting the sheet supports. The original UI stops offering
/// "add child" one level above this.
pub const MAX_LEVEL: u32 = 4;

/// Display name given to freshly added items.
pub const NEW_ITEM_NAME: &str = "新しい項目";

#[derive(Debug, Clone, PartialEq)]
pub enum EditError {
    NotFound { op: &'static str, id: String },
    LevelCap { id: String, max: u32 },
    MoveIntoDescendant { id: String },
    Renumber(IdError),
    Document(DocumentError),
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditError::NotFound { op, id } => write!(f, "{}: item {} not found", op, id),
            EditError::LevelCap { id, max } => {
                write!(f, "cannot nest {} deeper than level {}", id, max)
            }
            EditError::MoveIntoDescendant { id } => {
                write!(f, "cannot move {} into its own subtree", id)
            }
            EditError::Renumber(e) => write!(f, "renumbering failed: {}", e),
            EditError::Document(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for EditError {}

impl From<IdError> for EditError {
    fn from(e: IdError) -> Self {
        EditError::Renumber(e)
    }
}

impl From<DocumentError> for EditError {
    fn from(e: DocumentError) -> Self {
        EditError::Document(e)
    }
}

/// Metadata patch for one node. Unset members are left as-is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetaPatch {
    pub name: Option<String>,
    /// Switching to terminal populates a full form skeleton; switching to
    /// nonterminal collapses the form to the priority flag.
    pub node_type: Option<NodeType>,
    pub description: Option<String>,
    pub example: Option<String>,
    pub control: Option<ControlKind>,
    pub options: Option<String>,
    pub importance: Option<u8>,
    pub prior: Option<u8>,
}

/// Run a mutation, renumber, and roll everything back if renumbering fails.
fn commit<T>(
    doc: &mut SheetDocument,
    mutate: impl FnOnce(&mut SheetDocument) -> Result<T, EditError>,
) -> Result<T, EditError> {
    let saved = doc.clone();
    let result = mutate(doc).and_then(|value| {
        ids::assign(doc)?;
        Ok(value)
    });
    if result.is_err() {
        *doc = saved;
    }
    result
}

/// Add a default terminal child under `parent_id`, inserted as first child
/// (the original splices new items immediately after the parent in flat
/// document order). Returns the new node's canonical code.
pub fn add_child(doc: &mut SheetDocument, parent_id: &str) -> Result<String, EditError> {
    let parent = doc
        .find_by_code(parent_id)
        .ok_or_else(|| EditError::NotFound { op: "add child", id: parent_id.to_string() })?;
    let parent_level = doc.level(parent).unwrap_or(1);
    if parent_level >= MAX_LEVEL {
        return Err(EditError::LevelCap { id: parent_id.to_string(), max: MAX_LEVEL });
    }

    let handle = commit(doc, |doc| {
        let handle = doc.allocate(
            NEW_ITEM_NAME,
            NodeKind::Field(Box::new(FieldForm::skeleton())),
        );
        doc.attach(handle, Some(parent), 0)?;
        Ok(handle)
    })?;
    Ok(doc
        .node(handle)
        .map(|n| n.code().to_string())
        .unwrap_or_default())
}

/// Delete a node and its whole subtree. Returns the number of removed
/// nodes (for confirmation messages).
pub fn delete(doc: &mut SheetDocument, id: &str) -> Result<usize, EditError> {
    let handle = doc
        .find_by_code(id)
        .ok_or_else(|| EditError::NotFound { op: "delete", id: id.to_string() })?;
    commit(doc, |doc| Ok(doc.remove_subtree(handle)?))
}

/// Reparent/reorder: place `id` under `new_parent` (None = top level) at
/// `index` among its new siblings, then renumber the whole tree.
pub fn move_node(
    doc: &mut SheetDocument,
    id: &str,
    new_parent: Option<&str>,
    index: usize,
) -> Result<(), EditError> {
    let handle = doc
        .find_by_code(id)
        .ok_or_else(|| EditError::NotFound { op: "move", id: id.to_string() })?;
    let parent_handle = match new_parent {
        Some(code) => Some(
            doc.find_by_code(code)
                .ok_or_else(|| EditError::NotFound { op: "move", id: code.to_string() })?,
        ),
        None => None,
    };

    if let Some(parent) = parent_handle {
        if doc.in_subtree(handle, parent) {
            return Err(EditError::MoveIntoDescendant { id: id.to_string() });
        }
    }
    let base_level = match parent_handle {
        Some(parent) => doc.level(parent).unwrap_or(1),
        None => 0,
    };
    if base_level + doc.subtree_height(handle) > MAX_LEVEL {
        return Err(EditError::LevelCap { id: id.to_string(), max: MAX_LEVEL });
    }

    commit(doc, |doc| {
        doc.detach(handle)?;
        doc.attach(handle, parent_handle, index)?;
        Ok(())
    })
}

/// Patch a node's name/type/form settings. Not a structural op for ids
/// (codes are unaffected), but type switches rebuild the form payload.
pub fn update_meta(doc: &mut SheetDocument, id: &str, patch: &MetaPatch) -> Result<(), EditError> {
    let handle = doc
        .find_by_code(id)
        .ok_or_else(|| EditError::NotFound { op: "edit", id: id.to_string() })?;
    let node = doc
        .node_mut(handle)
        .ok_or_else(|| EditError::NotFound { op: "edit", id: id.to_string() })?;

    if let Some(name) = &patch.name {
        node.name = name.clone();
    }

    if let Some(node_type) = patch.node_type {
        let switched = match (node_type, &node.kind) {
            (NodeType::Terminal, NodeKind::Category { prior }) => {
                let mut form = FieldForm::skeleton();
                form.prior = *prior;
                Some(NodeKind::Field(Box::new(form)))
            }
            (NodeType::Nonterminal, NodeKind::Field(form)) => {
                Some(NodeKind::Category { prior: form.prior })
            }
            _ => None,
        };
        if let Some(kind) = switched {
            node.kind = kind;
        }
    }

    match &mut node.kind {
        NodeKind::Field(form) => {
            if let Some(description) = &patch.description {
                form.description = description.clone();
            }
            if let Some(example) = &patch.example {
                form.example = example.clone();
            }
            if let Some(control) = patch.control {
                form.control = control;
            }
            if let Some(options) = &patch.options {
                form.options = options.clone();
            }
            if let Some(importance) = patch.importance {
                form.importance = importance;
            }
            if let Some(prior) = patch.prior {
                form.prior = prior;
            }
        }
        NodeKind::Category { prior } => {
            if let Some(new_prior) = patch.prior {
                *prior = new_prior;
            }
        }
    }
    Ok(())
}

/// Blank every answer and sub-answer ("clear all").
pub fn clear_all_answers(doc: &mut SheetDocument) {
    for handle in doc.terminal_fields() {
        if let Some(form) = doc.node_mut(handle).and_then(|n| n.kind.form_mut()) {
            form.answer.clear();
            form.sub_answer.clear();
        }
    }
}
