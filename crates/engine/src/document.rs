//! Canonical sheet document: an explicit tree of nodes with an ordered root
//! list and per-node ordered children.
//!
//! The serialized form is the original flat `{"sheet-content": [...]}` list
//! in depth-first order, joined by string codes and a stored level. In memory
//! the structure is explicit; parent links and levels are derived, so they
//! cannot drift from the tree shape.

use std::fmt;

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::node::{FieldForm, Node, NodeHandle, NodeKind};

/// Sentinel parent code for top-level nodes in the wire format.
pub const ROOT: &str = "root";

#[derive(Debug, Clone, PartialEq)]
pub enum DocumentError {
    DuplicateId(String),
    UnknownParent { id: String, parent: String },
    LevelMismatch { id: String, level: u32, expected: u32 },
    Cycle(String),
    UnknownNode,
    Parse(String),
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentError::DuplicateId(id) => write!(f, "duplicate node id: {}", id),
            DocumentError::UnknownParent { id, parent } => {
                write!(f, "node {} references unknown parent {}", id, parent)
            }
            DocumentError::LevelMismatch { id, level, expected } => {
                write!(f, "node {} has level {} but its position implies {}", id, level, expected)
            }
            DocumentError::Cycle(id) => write!(f, "node {} is part of a parent cycle", id),
            DocumentError::UnknownNode => write!(f, "node not found in document"),
            DocumentError::Parse(msg) => write!(f, "sheet parse error: {}", msg),
        }
    }
}

impl std::error::Error for DocumentError {}

/// Wire shape of one node in `sheet-content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: String,
    pub parent: String,
    pub level: u32,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: String,
    #[serde(default)]
    pub form: FormRecord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Terminal,
    Nonterminal,
}

/// Form payload on the wire. Nonterminal nodes carry only the priority flag;
/// terminal nodes carry the full form object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormRecord {
    Category(CategoryForm),
    Field(Box<FieldForm>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CategoryForm {
    pub prior: u8,
}

impl Default for FormRecord {
    fn default() -> Self {
        FormRecord::Category(CategoryForm::default())
    }
}

/// Top-level file shape: this is both the load format and the save format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetSpecFile {
    #[serde(rename = "sheet-content")]
    pub sheet_content: Vec<NodeRecord>,
}

#[derive(Debug, Clone, Default)]
pub struct SheetDocument {
    nodes: FxHashMap<NodeHandle, Node>,
    roots: Vec<NodeHandle>,
    code_index: FxHashMap<String, NodeHandle>,
    next_handle: u64,
}

impl SheetDocument {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Lookup ──────────────────────────────────────────────────────

    pub fn node(&self, handle: NodeHandle) -> Option<&Node> {
        self.nodes.get(&handle)
    }

    pub fn node_mut(&mut self, handle: NodeHandle) -> Option<&mut Node> {
        self.nodes.get_mut(&handle)
    }

    /// Resolve a display code (`A-01`) to its node. O(1) via the code index,
    /// which is rebuilt on every renumber.
    pub fn find_by_code(&self, code: &str) -> Option<NodeHandle> {
        self.code_index.get(code).copied()
    }

    pub fn roots(&self) -> &[NodeHandle] {
        &self.roots
    }

    pub fn children(&self, handle: NodeHandle) -> &[NodeHandle] {
        self.nodes.get(&handle).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn parent_of(&self, handle: NodeHandle) -> Option<NodeHandle> {
        self.nodes.get(&handle).and_then(|n| n.parent)
    }

    /// Depth, 1 = top level. Derived by walking parent links.
    pub fn level(&self, handle: NodeHandle) -> Option<u32> {
        let mut level = 1;
        let mut current = self.nodes.get(&handle)?;
        while let Some(parent) = current.parent {
            current = self.nodes.get(&parent)?;
            level += 1;
        }
        Some(level)
    }

    /// True if `candidate` lies inside the subtree rooted at `root`
    /// (including `root` itself).
    pub fn in_subtree(&self, root: NodeHandle, candidate: NodeHandle) -> bool {
        let mut current = Some(candidate);
        while let Some(handle) = current {
            if handle == root {
                return true;
            }
            current = self.parent_of(handle);
        }
        false
    }

    /// Height of the subtree rooted at `handle` (a leaf has height 1).
    pub fn subtree_height(&self, handle: NodeHandle) -> u32 {
        1 + self
            .children(handle)
            .iter()
            .map(|&child| self.subtree_height(child))
            .max()
            .unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All handles in depth-first order (roots first, children in order).
    pub fn dfs(&self) -> Vec<NodeHandle> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<NodeHandle> = self.roots.iter().rev().copied().collect();
        while let Some(handle) = stack.pop() {
            out.push(handle);
            for &child in self.children(handle).iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    /// Terminal fields in depth-first order, for prompt building and
    /// analysis.
    pub fn terminal_fields(&self) -> Vec<NodeHandle> {
        self.dfs()
            .into_iter()
            .filter(|&h| self.node(h).map(|n| n.is_field()).unwrap_or(false))
            .collect()
    }

    // ── Mutation primitives ─────────────────────────────────────────

    /// Create a detached node. It is not reachable until attached, and its
    /// code is a placeholder until the next renumber.
    pub fn allocate(&mut self, name: impl Into<String>, kind: NodeKind) -> NodeHandle {
        self.next_handle += 1;
        let handle = NodeHandle(self.next_handle);
        self.nodes.insert(
            handle,
            Node {
                handle,
                code: format!("new-{}", self.next_handle),
                name: name.into(),
                kind,
                parent: None,
                children: Vec::new(),
            },
        );
        handle
    }

    /// Attach a detached node under `parent` (None = top level) at `index`
    /// among its siblings. An out-of-range index appends.
    pub fn attach(
        &mut self,
        handle: NodeHandle,
        parent: Option<NodeHandle>,
        index: usize,
    ) -> Result<(), DocumentError> {
        if !self.nodes.contains_key(&handle) {
            return Err(DocumentError::UnknownNode);
        }
        match parent {
            Some(parent_handle) => {
                let siblings = &mut self
                    .nodes
                    .get_mut(&parent_handle)
                    .ok_or(DocumentError::UnknownNode)?
                    .children;
                let at = index.min(siblings.len());
                siblings.insert(at, handle);
            }
            None => {
                let at = index.min(self.roots.len());
                self.roots.insert(at, handle);
            }
        }
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.parent = parent;
        }
        Ok(())
    }

    /// Unlink a node from its parent (or the root list). The node and its
    /// subtree stay in the table, ready to be re-attached.
    pub fn detach(&mut self, handle: NodeHandle) -> Result<(), DocumentError> {
        let parent = self
            .nodes
            .get(&handle)
            .ok_or(DocumentError::UnknownNode)?
            .parent;
        match parent {
            Some(parent_handle) => {
                if let Some(parent_node) = self.nodes.get_mut(&parent_handle) {
                    parent_node.children.retain(|&c| c != handle);
                }
            }
            None => self.roots.retain(|&r| r != handle),
        }
        if let Some(node) = self.nodes.get_mut(&handle) {
            node.parent = None;
        }
        Ok(())
    }

    /// Remove a node and its entire descendant subtree. Returns the number
    /// of nodes removed.
    pub fn remove_subtree(&mut self, handle: NodeHandle) -> Result<usize, DocumentError> {
        self.detach(handle)?;
        let mut removed = 0;
        let mut stack = vec![handle];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                self.code_index.remove(&node.code);
                stack.extend(node.children);
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub(crate) fn set_code(&mut self, handle: NodeHandle, code: String) {
        if let Some(node) = self.nodes.get_mut(&handle) {
            self.code_index.remove(&node.code);
            node.code = code.clone();
            self.code_index.insert(code, handle);
        }
    }

    pub(crate) fn rebuild_code_index(&mut self) {
        self.code_index.clear();
        let entries: Vec<(String, NodeHandle)> = self
            .nodes
            .values()
            .map(|n| (n.code.clone(), n.handle))
            .collect();
        self.code_index.extend(entries);
    }

    // ── Serialization ───────────────────────────────────────────────

    /// Flatten to wire records in depth-first order.
    pub fn to_records(&self) -> Vec<NodeRecord> {
        let mut records = Vec::with_capacity(self.nodes.len());
        for handle in self.dfs() {
            let node = &self.nodes[&handle];
            let parent_code = node
                .parent
                .and_then(|p| self.nodes.get(&p))
                .map(|p| p.code.clone())
                .unwrap_or_else(|| ROOT.to_string());
            let (node_type, form) = match &node.kind {
                NodeKind::Category { prior } => (
                    NodeType::Nonterminal,
                    FormRecord::Category(CategoryForm { prior: *prior }),
                ),
                NodeKind::Field(form) => (NodeType::Terminal, FormRecord::Field(form.clone())),
            };
            records.push(NodeRecord {
                id: node.code.clone(),
                parent: parent_code,
                level: self.level(handle).unwrap_or(1),
                node_type,
                name: node.name.clone(),
                form,
            });
        }
        records
    }

    /// Rebuild a document from wire records, validating referential
    /// integrity and the stored levels.
    pub fn from_records(records: &[NodeRecord]) -> Result<Self, DocumentError> {
        let mut doc = Self::new();
        let mut by_id: FxHashMap<&str, NodeHandle> = FxHashMap::default();

        for record in records {
            if by_id.contains_key(record.id.as_str()) {
                return Err(DocumentError::DuplicateId(record.id.clone()));
            }
            let kind = match record.node_type {
                NodeType::Nonterminal => {
                    let prior = match &record.form {
                        FormRecord::Category(c) => c.prior,
                        FormRecord::Field(form) => form.prior,
                    };
                    NodeKind::Category { prior }
                }
                NodeType::Terminal => {
                    let form = match &record.form {
                        FormRecord::Field(form) => form.clone(),
                        FormRecord::Category(c) => {
                            let mut form = FieldForm::skeleton();
                            form.prior = c.prior;
                            Box::new(form)
                        }
                    };
                    NodeKind::Field(form)
                }
            };
            let handle = doc.allocate(record.name.clone(), kind);
            doc.set_code(handle, record.id.clone());
            by_id.insert(record.id.as_str(), handle);
        }

        // Link in record order so sibling order follows the file even when
        // siblings are not contiguous.
        for record in records {
            let handle = by_id[record.id.as_str()];
            if record.parent == ROOT {
                doc.roots.push(handle);
            } else {
                let parent = *by_id.get(record.parent.as_str()).ok_or_else(|| {
                    DocumentError::UnknownParent {
                        id: record.id.clone(),
                        parent: record.parent.clone(),
                    }
                })?;
                if let Some(node) = doc.nodes.get_mut(&handle) {
                    node.parent = Some(parent);
                }
                if let Some(parent_node) = doc.nodes.get_mut(&parent) {
                    parent_node.children.push(handle);
                }
            }
        }

        // Validate: every node reaches root (no parent cycles) and the
        // stored level matches the derived one.
        let limit = records.len() as u32 + 1;
        for record in records {
            let handle = by_id[record.id.as_str()];
            let mut depth = 1u32;
            let mut current = doc.parent_of(handle);
            while let Some(parent) = current {
                depth += 1;
                if depth > limit {
                    return Err(DocumentError::Cycle(record.id.clone()));
                }
                current = doc.parent_of(parent);
            }
            if record.level != depth {
                return Err(DocumentError::LevelMismatch {
                    id: record.id.clone(),
                    level: record.level,
                    expected: depth,
                });
            }
        }

        Ok(doc)
    }

    /// Serialize as sheet-specification JSON (the save/export format).
    pub fn to_spec_string(&self) -> String {
        let file = SheetSpecFile { sheet_content: self.to_records() };
        serde_json::to_string_pretty(&file).unwrap_or_else(|_| String::from("{\"sheet-content\":[]}"))
    }

    /// Parse sheet-specification JSON.
    pub fn parse_spec(json: &str) -> Result<Self, DocumentError> {
        let file: SheetSpecFile =
            serde_json::from_str(json).map_err(|e| DocumentError::Parse(e.to_string()))?;
        Self::from_records(&file.sheet_content)
    }
}

/// Structural equality: two documents are equal when they flatten to the
/// same records, regardless of internal handle values.
impl PartialEq for SheetDocument {
    fn eq(&self, other: &Self) -> bool {
        self.to_records() == other.to_records()
    }
}
