//! The four mutation handlers.
//!
//! Each handler receives the resolved [`MatchSet`], runs the existence check
//! that applies to it, and only then touches the tree. Failures are detected
//! before the first mutation, so an error never leaves a half-edited tree
//! behind.

use tracing::{debug, warn};

use super::check::{self, BlockCheck};
use crate::error::{EditError, ParseError};
use crate::parser::is_blank;
use crate::tree::{Document, NodeId, NodeKind};
use crate::xpath::{resolve, Anchor, MatchSet, PathExpr};

/// What a handler did.
#[derive(Debug)]
pub(crate) struct Applied {
    pub(crate) changed: bool,
    pub(crate) message: String,
}

impl Applied {
    fn changed(message: String) -> Self {
        Self {
            changed: true,
            message,
        }
    }

    fn unchanged(message: String) -> Self {
        Self {
            changed: false,
            message,
        }
    }
}

fn first_match(expr: &PathExpr, matches: &MatchSet) -> Result<NodeId, EditError> {
    matches.first().ok_or_else(|| EditError::not_found(expr))
}

/// Sets an attribute value or an element's text, creating the element under
/// its parent when the path does not pin down an existing one.
pub(crate) fn upsert(
    doc: &mut Document,
    expr: &PathExpr,
    matches: &MatchSet,
    value: &str,
) -> Result<Applied, EditError> {
    if let Some(name) = matches.attribute() {
        let owner = first_match(expr, matches)?;
        if check::attribute_holds(doc, owner, name, value) {
            return Ok(Applied::unchanged(format!(
                "attribute '{name}' already set to '{value}'"
            )));
        }
        let previous = doc.set_attribute(owner, name, value);
        debug!(attribute = name, ?previous, "attribute set");
        return Ok(Applied::changed(format!("set attribute '{name}' to '{value}'")));
    }

    if check::element_text_holds(doc, expr, value) {
        return Ok(Applied::unchanged(format!(
            "'{expr}' already has text '{value}'"
        )));
    }

    if expr.is_predicated() {
        let target = first_match(expr, matches)?;
        doc.set_element_text(target, value);
        return Ok(Applied::changed(format!("set text of '{expr}' to '{value}'")));
    }

    let Some(step) = expr.last_step() else {
        return Err(EditError::not_found(expr));
    };
    let parent = match expr.parent_path() {
        Some(parent_expr) => resolve(doc, &parent_expr).first().ok_or_else(|| {
            EditError::AmbiguousTarget {
                path: expr.to_string(),
                reason: format!("parent '{parent_expr}' matches nothing"),
            }
        })?,
        None if expr.anchor == Anchor::Relative => {
            doc.root_element().ok_or_else(|| EditError::AmbiguousTarget {
                path: expr.to_string(),
                reason: "the document has no root element".to_string(),
            })?
        }
        None => {
            let target = matches.first().ok_or_else(|| EditError::AmbiguousTarget {
                path: expr.to_string(),
                reason: "a top-level element has no parent to be created under".to_string(),
            })?;
            doc.set_element_text(target, value);
            return Ok(Applied::changed(format!("set text of '{expr}' to '{value}'")));
        }
    };

    let element = doc.create_element(step.name.as_str());
    doc.set_element_text(element, value);
    doc.append_child(parent, element);
    debug!(element = %step.name, "element created");
    Ok(Applied::changed(format!(
        "created '{}' with text '{value}'",
        step.name
    )))
}

/// Removes an attribute, or detaches an element together with its subtree.
pub(crate) fn delete(
    doc: &mut Document,
    expr: &PathExpr,
    matches: &MatchSet,
) -> Result<Applied, EditError> {
    let target = first_match(expr, matches)?;

    if let Some(name) = matches.attribute() {
        doc.remove_attribute(target, name)
            .ok_or_else(|| EditError::not_found(expr))?;
        return Ok(Applied::changed(format!("removed attribute '{name}'")));
    }

    if doc.root_element() == Some(target) {
        return Err(EditError::invalid_operation(
            "the root element cannot be deleted",
        ));
    }

    let parent = doc.parent(target);
    doc.detach(target);
    if let Some(parent) = parent {
        drop_layout_whitespace(doc, parent);
    }
    Ok(Applied::changed(format!("deleted '{expr}'")))
}

/// Removes the children of `parent` if they are nothing but blank text.
fn drop_layout_whitespace(doc: &mut Document, parent: NodeId) {
    let children: Vec<_> = doc.children(parent).collect();
    let only_blank = children.iter().all(|&child| {
        matches!(&doc.node(child).kind, NodeKind::Text { content } if is_blank(content))
    });
    if only_blank {
        for child in children {
            doc.detach(child);
        }
    }
}

/// Copies the element parsed from `literal` into the document right after
/// the first match.
pub(crate) fn insert_raw(
    doc: &mut Document,
    expr: &PathExpr,
    matches: &MatchSet,
    literal: &str,
    fragment: &Document,
    block_check: BlockCheck,
) -> Result<Applied, EditError> {
    let anchor = first_match(expr, matches)?;
    if doc.root_element() == Some(anchor) {
        return Err(EditError::invalid_operation(
            "cannot insert a sibling of the root element",
        ));
    }
    if check::block_holds(doc, fragment, literal, block_check) {
        return Ok(Applied::unchanged(format!(
            "block already present ({block_check} check)"
        )));
    }

    let block = fragment.root_element().ok_or_else(|| {
        EditError::MalformedLiteral(ParseError::without_location("literal holds no element"))
    })?;
    let copy = doc.import_subtree(fragment, block);
    doc.insert_after(anchor, copy);
    Ok(Applied::changed(format!("inserted block after '{expr}'")))
}

/// Renames an attribute key or an element tag in place.
pub(crate) fn rename(
    doc: &mut Document,
    expr: &PathExpr,
    matches: &MatchSet,
    new_name: &str,
) -> Result<Applied, EditError> {
    let target = first_match(expr, matches)?;

    if let Some(name) = matches.attribute() {
        let value = doc
            .attribute(target, name)
            .ok_or_else(|| EditError::not_found(expr))?
            .to_string();
        if name == new_name {
            warn!(attribute = name, "rename to the current name skipped");
            return Ok(Applied::unchanged(format!(
                "attribute '{name}' already has that name"
            )));
        }
        doc.remove_attribute(target, name);
        doc.set_attribute(target, new_name, &value);
        return Ok(Applied::changed(format!(
            "renamed attribute '{name}' to '{new_name}'"
        )));
    }

    match doc.rename_element(target, new_name) {
        Some(old) if old == new_name => {
            warn!(element = new_name, "rename to the current name skipped");
            Ok(Applied::unchanged(format!(
                "element '{old}' already has that name"
            )))
        }
        Some(old) => Ok(Applied::changed(format!(
            "renamed element '{old}' to '{new_name}'"
        ))),
        None => Err(EditError::not_found(expr)),
    }
}
