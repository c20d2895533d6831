//! Path expression evaluator.
//!
//! Walks a [`PathExpr`] step by step over a [`Document`]. Every step maps the
//! current context set to the matching element children of each context node,
//! filters each parent's group through the step's predicates, and sorts the
//! union back into document order.
//!
//! Evaluation never fails: an expression that selects nothing yields an empty
//! [`MatchSet`], and it is up to the caller to decide whether that is an
//! error.

use std::collections::HashMap;

use super::ast::{Anchor, PathExpr, Predicate, Step};
use crate::tree::{Document, NodeId, NodeKind};

/// The nodes selected by a path expression.
///
/// Holds the matched elements in document order and, for expressions ending
/// in `/@name`, the attribute name. The attribute need not exist on any of
/// the elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSet {
    elements: Vec<NodeId>,
    attribute: Option<String>,
}

impl MatchSet {
    /// Matched elements (attribute owners for attribute expressions), in
    /// document order.
    pub fn elements(&self) -> &[NodeId] {
        &self.elements
    }

    /// The first matched element.
    pub fn first(&self) -> Option<NodeId> {
        self.elements.first().copied()
    }

    /// The attribute selected by the expression, if any.
    pub fn attribute(&self) -> Option<&str> {
        self.attribute.as_deref()
    }

    /// Number of matched elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if no element matched.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Resolves a parsed expression against a document.
///
/// # Examples
///
/// ```
/// use xmledit::Document;
/// use xmledit::xpath::{parse, resolve};
///
/// let doc = Document::parse_str("<a><b>1</b><b>2</b><c><b>3</b></c></a>").unwrap();
/// let matches = resolve(&doc, &parse("//b").unwrap());
/// let texts: Vec<_> = matches.elements().iter().map(|&b| doc.element_text(b)).collect();
/// assert_eq!(texts, ["1", "2", "3"]);
///
/// let matches = resolve(&doc, &parse("/a/b[2]/@type").unwrap());
/// assert_eq!(matches.len(), 1);
/// assert_eq!(matches.attribute(), Some("type"));
/// ```
pub fn resolve(doc: &Document, expr: &PathExpr) -> MatchSet {
    let mut context = initial_context(doc, expr.anchor);
    let mut order = None;
    for step in &expr.steps {
        if context.is_empty() {
            break;
        }
        let multiple_parents = context.len() > 1;
        context = apply_step(doc, &context, step);
        if multiple_parents {
            let order = order.get_or_insert_with(|| document_order(doc));
            sort_document_order(&mut context, order);
        }
    }
    MatchSet {
        elements: context,
        attribute: expr.attribute.clone(),
    }
}

fn initial_context(doc: &Document, anchor: Anchor) -> Vec<NodeId> {
    match anchor {
        Anchor::Root => vec![doc.root()],
        Anchor::Descendant => std::iter::once(doc.root())
            .chain(doc.descendants(doc.root()).filter(|&id| doc.is_element(id)))
            .collect(),
        Anchor::Relative => doc.root_element().into_iter().collect(),
    }
}

fn apply_step(doc: &Document, context: &[NodeId], step: &Step) -> Vec<NodeId> {
    let mut result = Vec::new();
    for &parent in context {
        let mut group: Vec<NodeId> = doc
            .children(parent)
            .filter(|&child| doc.is_element(child) && doc.node_name(child) == Some(step.name.as_str()))
            .collect();
        for predicate in &step.predicates {
            group = apply_predicate(doc, group, predicate);
        }
        result.extend(group);
    }
    result
}

fn apply_predicate(doc: &Document, group: Vec<NodeId>, predicate: &Predicate) -> Vec<NodeId> {
    match predicate {
        Predicate::Position(n) => n
            .checked_sub(1)
            .and_then(|index| group.get(index).copied())
            .into_iter()
            .collect(),
        Predicate::Text(value) => group
            .into_iter()
            .filter(|&id| has_text_run(doc, id, value))
            .collect(),
        Predicate::Attribute { name, value } => group
            .into_iter()
            .filter(|&id| match (doc.attribute(id, name), value) {
                (Some(actual), Some(wanted)) => actual == wanted,
                (Some(_), None) => true,
                (None, _) => false,
            })
            .collect(),
    }
}

/// Returns the maximal runs of adjacent text and CDATA children of an
/// element, each run concatenated.
pub(crate) fn text_runs(doc: &Document, id: NodeId) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current: Option<String> = None;
    for child in doc.children(id) {
        match &doc.node(child).kind {
            NodeKind::Text { content } | NodeKind::CData { content } => {
                current.get_or_insert_with(String::new).push_str(content);
            }
            _ => runs.extend(current.take()),
        }
    }
    runs.extend(current);
    runs
}

/// `text()="v"` semantics: some text run equals `v`. An element without any
/// text counts as having the empty string.
fn has_text_run(doc: &Document, id: NodeId, value: &str) -> bool {
    let runs = text_runs(doc, id);
    if runs.is_empty() {
        return value.is_empty();
    }
    runs.iter().any(|run| run == value)
}

/// Pre-order index of every node reachable from the document node.
///
/// Arena ids follow creation order, which stops matching document order as
/// soon as nodes are inserted, so positions are computed from the tree.
fn document_order(doc: &Document) -> HashMap<NodeId, usize> {
    std::iter::once(doc.root())
        .chain(doc.descendants(doc.root()))
        .enumerate()
        .map(|(index, id)| (id, index))
        .collect()
}

fn sort_document_order(nodes: &mut Vec<NodeId>, order: &HashMap<NodeId, usize>) {
    nodes.sort_by_key(|id| order.get(id).copied().unwrap_or(usize::MAX));
    nodes.dedup();
}
