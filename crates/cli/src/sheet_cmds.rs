// Sheet file commands: validate, show, set, add, delete, move, edit, clear.
// Each command loads the file, applies one edit, renumbers, and writes the
// canonical form back.

use std::path::Path;

use bridgesheet_engine::binder::{self, SkipReason};
use bridgesheet_engine::document::SheetDocument;
use bridgesheet_engine::editor::{self, EditError, MetaPatch};
use bridgesheet_io::sheet_file::{self, SheetFileError};

use crate::{CliError, ShowFormat};

pub fn load_sheet(path: &Path) -> Result<SheetDocument, CliError> {
    sheet_file::load(path).map_err(|e| match e {
        SheetFileError::Io(e) => {
            CliError::usage(format!("cannot read {}: {}", path.display(), e))
        }
        SheetFileError::Format(e) => {
            CliError::usage(format!("{}: {}", path.display(), e))
        }
    })
}

pub fn save_sheet(doc: &SheetDocument, path: &Path) -> Result<(), CliError> {
    sheet_file::save(doc, path)
        .map_err(|e| CliError::error(format!("cannot write {}: {}", path.display(), e)))
}

fn edit_error(e: EditError) -> CliError {
    match e {
        EditError::NotFound { .. } | EditError::LevelCap { .. } => CliError::usage(e.to_string()),
        EditError::MoveIntoDescendant { .. } => CliError::usage(e.to_string()),
        EditError::Renumber(_) | EditError::Document(_) => CliError::error(e.to_string()),
    }
}

pub fn cmd_validate(path: &Path) -> Result<(), CliError> {
    let doc = load_sheet(path)?;
    let fields = doc.terminal_fields();
    let filled = fields
        .iter()
        .filter(|&&h| doc.node(h).and_then(|n| n.kind.form()).is_some_and(|f| f.has_answer()))
        .count();
    println!(
        "ok: {} items ({} fields, {} filled)",
        doc.len(),
        fields.len(),
        filled
    );
    Ok(())
}

pub fn cmd_show(path: &Path, format: ShowFormat) -> Result<(), CliError> {
    let doc = load_sheet(path)?;
    match format {
        ShowFormat::Json => println!("{}", doc.to_spec_string()),
        ShowFormat::Tree => print!("{}", render_tree(&doc)),
    }
    Ok(())
}

fn render_tree(doc: &SheetDocument) -> String {
    let mut out = String::new();
    for handle in doc.dfs() {
        let Some(node) = doc.node(handle) else { continue };
        let level = doc.level(handle).unwrap_or(1);
        let indent = "  ".repeat((level - 1) as usize);
        out.push_str(&format!("{}{} {}", indent, node.code(), node.name));
        if let Some(form) = node.kind.form() {
            if !form.answer.is_empty() {
                out.push_str(&format!(" = {}", form.answer));
            }
            if !form.sub_answer.is_empty() {
                out.push_str(&format!(" ({})", form.sub_answer));
            }
        }
        out.push('\n');
    }
    out
}

pub fn cmd_set(path: &Path, id: &str, value: &str, sub: bool) -> Result<(), CliError> {
    let mut doc = load_sheet(path)?;
    if sub {
        let handle = doc
            .find_by_code(id)
            .ok_or_else(|| CliError::usage(format!("field {} not found", id)))?;
        let form = doc
            .node_mut(handle)
            .and_then(|n| n.kind.form_mut())
            .ok_or_else(|| CliError::usage(format!("field {} not found", id)))?;
        form.sub_answer = value.to_string();
    } else {
        binder::apply_update(&mut doc, id, value).map_err(|reason| match reason {
            SkipReason::UnknownField => CliError::usage(format!("field {} not found", id)),
            SkipReason::NotAField => {
                CliError::usage(format!("{} is a category, not a field", id))
            }
            SkipReason::NoMatchingOption => {
                let options = doc
                    .find_by_code(id)
                    .and_then(|h| doc.node(h))
                    .and_then(|n| n.kind.form())
                    .map(|f| f.options.clone())
                    .unwrap_or_default();
                CliError::usage(format!("{:?} is not an option of {}", value, id))
                    .with_hint(format!("options: {}", options))
            }
        })?;
    }
    save_sheet(&doc, path)?;
    println!("{} = {}", id, value);
    Ok(())
}

pub fn cmd_add(path: &Path, parent: &str) -> Result<(), CliError> {
    let mut doc = load_sheet(path)?;
    let code = editor::add_child(&mut doc, parent).map_err(edit_error)?;
    save_sheet(&doc, path)?;
    println!("added {}", code);
    Ok(())
}

pub fn cmd_delete(path: &Path, id: &str, yes: bool) -> Result<(), CliError> {
    let mut doc = load_sheet(path)?;
    let handle = doc
        .find_by_code(id)
        .ok_or_else(|| CliError::usage(format!("item {} not found", id)))?;
    let count = doc.dfs().iter().filter(|&&h| doc.in_subtree(handle, h)).count();
    if !yes {
        return Err(CliError::usage(format!(
            "delete would remove {} item{}",
            count,
            if count == 1 { "" } else { "s" }
        ))
        .with_hint("re-run with --yes to confirm"));
    }
    let removed = editor::delete(&mut doc, id).map_err(edit_error)?;
    save_sheet(&doc, path)?;
    println!("deleted {} items", removed);
    Ok(())
}

pub fn cmd_move(
    path: &Path,
    id: &str,
    new_parent: Option<&str>,
    index: usize,
) -> Result<(), CliError> {
    let mut doc = load_sheet(path)?;
    let handle = doc
        .find_by_code(id)
        .ok_or_else(|| CliError::usage(format!("item {} not found", id)))?;
    editor::move_node(&mut doc, id, new_parent, index).map_err(edit_error)?;
    save_sheet(&doc, path)?;
    // Renumbering may have changed the code.
    let code = doc.node(handle).map(|n| n.code().to_string()).unwrap_or_default();
    println!("moved to {}", code);
    Ok(())
}

pub fn cmd_edit(path: &Path, id: &str, patch: MetaPatch) -> Result<(), CliError> {
    if patch == MetaPatch::default() {
        return Err(CliError::usage("nothing to edit")
            .with_hint("pass at least one of --name, --type, --control, ..."));
    }
    let mut doc = load_sheet(path)?;
    editor::update_meta(&mut doc, id, &patch).map_err(edit_error)?;
    save_sheet(&doc, path)?;
    println!("edited {}", id);
    Ok(())
}

pub fn cmd_clear(path: &Path, yes: bool) -> Result<(), CliError> {
    let mut doc = load_sheet(path)?;
    let filled = doc
        .terminal_fields()
        .iter()
        .filter(|&&h| doc.node(h).and_then(|n| n.kind.form()).is_some_and(|f| f.has_answer()))
        .count();
    if !yes {
        return Err(CliError::usage(format!(
            "clear would blank {} answered field{}",
            filled,
            if filled == 1 { "" } else { "s" }
        ))
        .with_hint("re-run with --yes to confirm"));
    }
    editor::clear_all_answers(&mut doc);
    save_sheet(&doc, path)?;
    println!("cleared {} fields", filled);
    Ok(())
}
