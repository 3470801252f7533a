//! Applies `(field_id, value)` updates to terminal fields.
//!
//! Dispatch order is checkbox, then radio, then the generic text path,
//! never the reverse. A field can carry both a choice group and a free-text
//! sub-control ("other, please specify"); routing by declared control kind
//! keeps choice values out of the sub-control.
//!
//! Lookup misses and non-matching options are warnings, not failures: a
//! batch of updates always runs to completion.

use serde::{Deserialize, Serialize};

use crate::document::SheetDocument;
use crate::node::{join_options, split_options, ControlKind};

/// One field update, as produced by the model's `sheet_update` contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldUpdate {
    pub field_id: String,
    pub value: String,
}

impl FieldUpdate {
    pub fn new(field_id: impl Into<String>, value: impl Into<String>) -> Self {
        Self { field_id: field_id.into(), value: value.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// No node with this code exists.
    UnknownField,
    /// The code resolves to a category node, which has no controls.
    NotAField,
    /// Radio value matched none of the declared options; field untouched.
    NoMatchingOption,
}

/// Result of a batch application. Skips never abort the batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateReport {
    pub applied: Vec<String>,
    pub skipped: Vec<(String, SkipReason)>,
}

impl UpdateReport {
    pub fn applied_count(&self) -> usize {
        self.applied.len()
    }
}

/// Apply a single update. Returns the skip reason when nothing was written.
pub fn apply_update(
    doc: &mut SheetDocument,
    field_id: &str,
    value: &str,
) -> Result<(), SkipReason> {
    let handle = match doc.find_by_code(field_id) {
        Some(handle) => handle,
        None => {
            log::warn!("field not found: {}", field_id);
            return Err(SkipReason::UnknownField);
        }
    };
    let node = doc.node_mut(handle).ok_or(SkipReason::UnknownField)?;
    let form = match node.kind.form_mut() {
        Some(form) => form,
        None => {
            log::warn!("update target {} is a category, not a field", field_id);
            return Err(SkipReason::NotAField);
        }
    };

    match form.control {
        ControlKind::Checkbox => {
            // Check exactly the declared options present in the incoming
            // value; the answer is re-joined in declared-option order.
            let incoming: Vec<&str> = split_options(value);
            let checked: Vec<&str> = form
                .option_list()
                .into_iter()
                .filter(|opt| incoming.contains(opt))
                .collect();
            if checked.is_empty() && !incoming.is_empty() {
                log::warn!("no matching checkbox option for {:?} in {}", value, field_id);
            }
            form.answer = join_options(&checked);
            Ok(())
        }
        ControlKind::Radio => {
            let trimmed = value.trim();
            if form.option_list().iter().any(|opt| *opt == trimmed) {
                form.answer = trimmed.to_string();
                Ok(())
            } else {
                log::warn!("no matching radio option for {:?} in {}", trimmed, field_id);
                Err(SkipReason::NoMatchingOption)
            }
        }
        ControlKind::Input | ControlKind::Textarea | ControlKind::Select => {
            form.answer = value.to_string();
            Ok(())
        }
    }
}

/// Apply a batch of updates. Each miss is skipped individually; the batch
/// never aborts. History capture is the caller's concern (one capture per
/// batch, not per field).
pub fn apply_batch(doc: &mut SheetDocument, updates: &[FieldUpdate]) -> UpdateReport {
    let mut report = UpdateReport::default();
    for update in updates {
        match apply_update(doc, &update.field_id, &update.value) {
            Ok(()) => report.applied.push(update.field_id.clone()),
            Err(reason) => report.skipped.push((update.field_id.clone(), reason)),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{FieldForm, NodeKind};

    fn doc_with_field(form: FieldForm) -> SheetDocument {
        let mut doc = SheetDocument::new();
        let top = doc.allocate("group", NodeKind::Category { prior: 0 });
        doc.attach(top, None, 0).unwrap();
        let field = doc.allocate("field", NodeKind::Field(Box::new(form)));
        doc.attach(field, Some(top), 0).unwrap();
        crate::ids::assign(&mut doc).unwrap();
        doc
    }

    fn answer_of(doc: &SheetDocument, code: &str) -> String {
        let handle = doc.find_by_code(code).unwrap();
        doc.node(handle).unwrap().kind.form().unwrap().answer.clone()
    }

    #[test]
    fn test_checkbox_checks_exactly_matching_options() {
        let mut form = FieldForm::skeleton();
        form.control = ControlKind::Checkbox;
        form.options = "調べ学習／読み聞かせ・ブックトーク／その他／未定".into();
        let mut doc = doc_with_field(form);

        apply_update(&mut doc, "A-01", "調べ学習／その他").unwrap();
        assert_eq!(answer_of(&doc, "A-01"), "調べ学習／その他");
    }

    #[test]
    fn test_checkbox_reorders_to_declared_option_order() {
        let mut form = FieldForm::skeleton();
        form.control = ControlKind::Checkbox;
        form.options = "a／b／c".into();
        let mut doc = doc_with_field(form);

        apply_update(&mut doc, "A-01", "c／a").unwrap();
        assert_eq!(answer_of(&doc, "A-01"), "a／c");
    }

    #[test]
    fn test_checkbox_does_not_touch_sub_answer() {
        let mut form = FieldForm::skeleton();
        form.control = ControlKind::Checkbox;
        form.options = "X／Y／Z".into();
        form.sub_label = "詳細".into();
        form.sub_answer = "keep me".into();
        let mut doc = doc_with_field(form);

        apply_update(&mut doc, "A-01", "X／Y").unwrap();
        let handle = doc.find_by_code("A-01").unwrap();
        let form = doc.node(handle).unwrap().kind.form().unwrap();
        assert_eq!(form.answer, "X／Y");
        assert_eq!(form.sub_answer, "keep me");
    }

    #[test]
    fn test_checkbox_unmatched_values_uncheck_all() {
        let mut form = FieldForm::skeleton();
        form.control = ControlKind::Checkbox;
        form.options = "a／b".into();
        form.answer = "a".into();
        let mut doc = doc_with_field(form);

        apply_update(&mut doc, "A-01", "zzz").unwrap();
        assert_eq!(answer_of(&doc, "A-01"), "");
    }

    #[test]
    fn test_radio_exact_match_only() {
        let mut form = FieldForm::skeleton();
        form.control = ControlKind::Radio;
        form.options = "はい／いいえ".into();
        form.answer = "はい".into();
        let mut doc = doc_with_field(form);

        // Whitespace is trimmed before matching.
        apply_update(&mut doc, "A-01", " いいえ ").unwrap();
        assert_eq!(answer_of(&doc, "A-01"), "いいえ");

        // No match leaves the group untouched.
        let err = apply_update(&mut doc, "A-01", "たぶん").unwrap_err();
        assert_eq!(err, SkipReason::NoMatchingOption);
        assert_eq!(answer_of(&doc, "A-01"), "いいえ");
    }

    #[test]
    fn test_generic_control_assigns_verbatim() {
        let mut doc = doc_with_field(FieldForm::skeleton());
        apply_update(&mut doc, "A-01", "  3年生 ").unwrap();
        assert_eq!(answer_of(&doc, "A-01"), "  3年生 ");
    }

    #[test]
    fn test_batch_continues_past_misses() {
        let mut doc = doc_with_field(FieldForm::skeleton());
        let report = apply_batch(
            &mut doc,
            &[
                FieldUpdate::new("Z-99", "lost"),
                FieldUpdate::new("A", "category target"),
                FieldUpdate::new("A-01", "kept"),
            ],
        );
        assert_eq!(report.applied, vec!["A-01"]);
        assert_eq!(
            report.skipped,
            vec![
                ("Z-99".to_string(), SkipReason::UnknownField),
                ("A".to_string(), SkipReason::NotAField),
            ]
        );
        assert_eq!(answer_of(&doc, "A-01"), "kept");
    }
}
