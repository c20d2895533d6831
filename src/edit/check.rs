//! Existence checks deciding whether a requested state already holds.
//!
//! Every operation that can be a no-op asks one of these first. When a check
//! holds, the document is left untouched and the run reports no change.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::parser::is_blank;
use crate::serial::serialize_node;
use crate::tree::{Document, NodeId};
use crate::xpath::eval::text_runs;
use crate::xpath::{resolve, PathExpr};

/// How an insert-raw literal is looked for in the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockCheck {
    /// The compact serialization of the root element contains the literal
    /// text. Sensitive to attribute order, quoting, and whitespace.
    ///
    /// A pretty-printing codec saves a literal with child elements indented,
    /// so the next run no longer finds it and inserts it again. Use
    /// [`BlockCheck::Structural`] for nested blocks.
    #[default]
    Literal,
    /// Some element in the document is structurally equal to the parsed
    /// literal: same name, same attributes in any order, same non-blank
    /// text, and structurally equal element children.
    Structural,
}

impl BlockCheck {
    /// Returns the lowercase name used on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Literal => "literal",
            Self::Structural => "structural",
        }
    }
}

impl fmt::Display for BlockCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockCheck {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "literal" => Ok(Self::Literal),
            "structural" => Ok(Self::Structural),
            other => Err(format!(
                "unknown block check '{other}' (expected 'literal' or 'structural')"
            )),
        }
    }
}

/// The attribute exists on `owner` with exactly `value`.
pub(crate) fn attribute_holds(doc: &Document, owner: NodeId, name: &str, value: &str) -> bool {
    doc.attribute(owner, name) == Some(value)
}

/// Some element addressed by `expr` already carries `value` as text.
pub(crate) fn element_text_holds(doc: &Document, expr: &PathExpr, value: &str) -> bool {
    !resolve(doc, &expr.with_text_predicate(value)).is_empty()
}

/// The block given as `literal`, parsed into `fragment`, is already in the
/// document.
pub(crate) fn block_holds(
    doc: &Document,
    fragment: &Document,
    literal: &str,
    mode: BlockCheck,
) -> bool {
    let Some(root) = doc.root_element() else {
        return false;
    };
    match mode {
        BlockCheck::Literal => serialize_node(doc, root).contains(literal.trim()),
        BlockCheck::Structural => {
            let Some(block) = fragment.root_element() else {
                return false;
            };
            std::iter::once(root)
                .chain(doc.descendants(root))
                .filter(|&id| doc.is_element(id))
                .any(|id| structurally_equal(doc, id, fragment, block))
        }
    }
}

fn structurally_equal(a_doc: &Document, a: NodeId, b_doc: &Document, b: NodeId) -> bool {
    if a_doc.node_name(a) != b_doc.node_name(b) {
        return false;
    }

    let (a_attrs, b_attrs) = (a_doc.attributes(a), b_doc.attributes(b));
    if a_attrs.len() != b_attrs.len()
        || !a_attrs
            .iter()
            .all(|attr| b_doc.attribute(b, &attr.name) == Some(attr.value.as_str()))
    {
        return false;
    }

    if significant_text(a_doc, a) != significant_text(b_doc, b) {
        return false;
    }

    let a_children: Vec<_> = a_doc.children(a).filter(|&c| a_doc.is_element(c)).collect();
    let b_children: Vec<_> = b_doc.children(b).filter(|&c| b_doc.is_element(c)).collect();
    a_children.len() == b_children.len()
        && a_children
            .iter()
            .zip(&b_children)
            .all(|(&x, &y)| structurally_equal(a_doc, x, b_doc, y))
}

/// Text runs of an element with layout whitespace removed.
fn significant_text(doc: &Document, id: NodeId) -> Vec<String> {
    text_runs(doc, id)
        .into_iter()
        .filter(|run| !is_blank(run))
        .map(|run| run.trim().to_string())
        .collect()
}
