use serde::{Deserialize, Serialize};

/// Delimiter used everywhere multi-valued text is exchanged: choice lists,
/// multi-select answers, example lists. Full-width slash, not ASCII "/".
pub const OPTION_DELIMITER: char = '／';

/// Split a "／"-delimited option list into trimmed, non-empty parts.
pub fn split_options(raw: &str) -> Vec<&str> {
    raw.split(OPTION_DELIMITER)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Join selected options back into the wire form.
pub fn join_options<S: AsRef<str>>(parts: &[S]) -> String {
    parts
        .iter()
        .map(|s| s.as_ref())
        .collect::<Vec<_>>()
        .join(&OPTION_DELIMITER.to_string())
}

/// Opaque node identity, stable for the life of a node within one document.
/// The human-readable hierarchical code (`A-01`, …) is display/serialization
/// state and is recomputed after every structural change; handles are not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeHandle(pub(crate) u64);

/// Kind of input control a terminal field renders as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    #[default]
    Input,
    Textarea,
    Select,
    Checkbox,
    Radio,
}

impl ControlKind {
    /// Control kinds that carry a "／"-delimited option list.
    pub fn has_options(&self) -> bool {
        matches!(self, ControlKind::Select | ControlKind::Checkbox | ControlKind::Radio)
    }
}

/// Full form payload of a terminal field.
///
/// Serialized under the original kebab-case keys so sheet specification
/// files round-trip exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldForm {
    pub description: String,
    pub example: String,
    #[serde(rename = "form-main")]
    pub control: ControlKind,
    #[serde(rename = "form-main-option")]
    pub options: String,
    #[serde(rename = "form-main-default")]
    pub default: String,
    #[serde(rename = "form-main-answer")]
    pub answer: String,
    /// Secondary free-text detail field ("other, please specify").
    #[serde(rename = "form-sub")]
    pub sub_label: String,
    #[serde(rename = "form-sub-default")]
    pub sub_default: String,
    #[serde(rename = "form-sub-answer")]
    pub sub_answer: String,
    /// 1 (low) to 3 (high).
    pub importance: u8,
    /// 1 = ask about this field before non-priority fields.
    pub prior: u8,
    pub dependence: String,
    pub memo: String,
}

impl Default for FieldForm {
    fn default() -> Self {
        Self {
            description: String::new(),
            example: String::new(),
            control: ControlKind::Input,
            options: String::new(),
            default: String::new(),
            answer: String::new(),
            sub_label: String::new(),
            sub_default: String::new(),
            sub_answer: String::new(),
            importance: 1,
            prior: 0,
            dependence: String::new(),
            memo: String::new(),
        }
    }
}

impl FieldForm {
    /// Empty skeleton with every key present, as created for new items.
    pub fn skeleton() -> Self {
        Self::default()
    }

    pub fn option_list(&self) -> Vec<&str> {
        split_options(&self.options)
    }

    pub fn has_answer(&self) -> bool {
        !self.answer.trim().is_empty()
    }

    pub fn is_priority(&self) -> bool {
        self.prior == 1
    }
}

/// Tagged node payload: a grouping category or a leaf input field.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Grouping node; carries only the priority flag.
    Category { prior: u8 },
    /// Leaf field that collects a user-entered value.
    Field(Box<FieldForm>),
}

impl NodeKind {
    pub fn is_field(&self) -> bool {
        matches!(self, NodeKind::Field(_))
    }

    pub fn form(&self) -> Option<&FieldForm> {
        match self {
            NodeKind::Field(form) => Some(form),
            NodeKind::Category { .. } => None,
        }
    }

    pub fn form_mut(&mut self) -> Option<&mut FieldForm> {
        match self {
            NodeKind::Field(form) => Some(form),
            NodeKind::Category { .. } => None,
        }
    }
}

/// A single sheet item. Parent/children links and the derived level live in
/// the document; the node owns its display state and payload.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) handle: NodeHandle,
    pub(crate) code: String,
    pub name: String,
    pub kind: NodeKind,
    pub(crate) parent: Option<NodeHandle>,
    pub(crate) children: Vec<NodeHandle>,
}

impl Node {
    pub fn handle(&self) -> NodeHandle {
        self.handle
    }

    /// Human-readable hierarchical code (`A`, `A-01`, `A-01-a`, …).
    /// Valid until the next structural change renumbers the tree.
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn parent(&self) -> Option<NodeHandle> {
        self.parent
    }

    pub fn children(&self) -> &[NodeHandle] {
        &self.children
    }

    pub fn is_field(&self) -> bool {
        self.kind.is_field()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_options_trims_and_drops_empties() {
        assert_eq!(
            split_options("調べ学習／読み聞かせ・ブックトーク／ その他 ／未定"),
            vec!["調べ学習", "読み聞かせ・ブックトーク", "その他", "未定"]
        );
        assert_eq!(split_options(""), Vec::<&str>::new());
        assert_eq!(split_options("／／a"), vec!["a"]);
    }

    #[test]
    fn test_join_options_round_trip() {
        let parts = split_options("A／B／C");
        assert_eq!(join_options(&parts), "A／B／C");
    }

    #[test]
    fn test_field_form_defaults() {
        let form = FieldForm::skeleton();
        assert_eq!(form.control, ControlKind::Input);
        assert_eq!(form.importance, 1);
        assert_eq!(form.prior, 0);
        assert!(form.answer.is_empty());
        assert!(!form.has_answer());
    }

    #[test]
    fn test_field_form_wire_keys() {
        let json = serde_json::to_value(FieldForm::skeleton()).unwrap();
        assert!(json.get("form-main").is_some());
        assert!(json.get("form-main-option").is_some());
        assert!(json.get("form-main-answer").is_some());
        assert!(json.get("form-sub-answer").is_some());
        assert_eq!(json["form-main"], "input");
    }

    #[test]
    fn test_control_kind_options() {
        assert!(ControlKind::Checkbox.has_options());
        assert!(ControlKind::Radio.has_options());
        assert!(ControlKind::Select.has_options());
        assert!(!ControlKind::Input.has_options());
        assert!(!ControlKind::Textarea.has_options());
    }
}
