//! Deterministic hierarchical code assignment.
//!
//! Codes are recomputed wholesale from tree order after every structural
//! change, never patched incrementally, so the code of a node is a pure
//! function of the tree shape. Scheme per level:
//!
//! - level 1: `A, B, C, …`
//! - level 2: `{parent}-01, {parent}-02, …` (zero-padded two digits)
//! - level 3: `{parent}-a, {parent}-b, …`
//! - level 4+: `{parent}-1, {parent}-2, …`
//!
//! Letter-coded levels hold at most 26 siblings; exceeding that fails the
//! whole pass loudly instead of emitting undefined codes, and the document
//! is left untouched.

use std::fmt;

use crate::document::SheetDocument;
use crate::node::NodeHandle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// More than 26 top-level nodes.
    TopLevelOverflow { count: usize },
    /// More than 26 children under a letter-coded (level-3) parent.
    SiblingOverflow { parent: String, count: usize },
}

impl fmt::Display for IdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdError::TopLevelOverflow { count } => {
                write!(f, "cannot code {} top-level items (letter codes stop at Z)", count)
            }
            IdError::SiblingOverflow { parent, count } => {
                write!(f, "cannot code {} children of {} (letter codes stop at z)", count, parent)
            }
        }
    }
}

impl std::error::Error for IdError {}

/// Recompute every node's display code from the current tree shape.
/// Idempotent: re-running on an unchanged tree is a no-op.
pub fn assign(doc: &mut SheetDocument) -> Result<(), IdError> {
    // Compute into a buffer first so an overflow mutates nothing.
    let mut codes: Vec<(NodeHandle, String)> = Vec::with_capacity(doc.len());

    let roots: Vec<NodeHandle> = doc.roots().to_vec();
    if roots.len() > 26 {
        return Err(IdError::TopLevelOverflow { count: roots.len() });
    }
    for (index, &root) in roots.iter().enumerate() {
        let code = ((b'A' + index as u8) as char).to_string();
        assign_children(doc, root, &code, 2, &mut codes)?;
        codes.push((root, code));
    }

    for (handle, code) in codes {
        doc.set_code(handle, code);
    }
    doc.rebuild_code_index();
    Ok(())
}

fn assign_children(
    doc: &SheetDocument,
    parent: NodeHandle,
    parent_code: &str,
    level: u32,
    codes: &mut Vec<(NodeHandle, String)>,
) -> Result<(), IdError> {
    let children: Vec<NodeHandle> = doc.children(parent).to_vec();
    if level == 3 && children.len() > 26 {
        return Err(IdError::SiblingOverflow { parent: parent_code.to_string(), count: children.len() });
    }
    for (index, &child) in children.iter().enumerate() {
        let code = match level {
            2 => format!("{}-{:02}", parent_code, index + 1),
            3 => format!("{}-{}", parent_code, (b'a' + index as u8) as char),
            _ => format!("{}-{}", parent_code, index + 1),
        };
        assign_children(doc, child, &code, level + 1, codes)?;
        codes.push((child, code));
    }
    Ok(())
}
