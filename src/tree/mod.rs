//! Arena-based XML document tree.
//!
//! All nodes live in a contiguous `Vec<NodeData>` owned by the `Document` and
//! are referenced by `NodeId`, a newtype over `NonZeroU32`. Parent, child, and
//! sibling links are arena indices, so a node never owns another node and a
//! detached subtree simply becomes unreachable from the document node.
//!
//! Besides navigation, the tree offers the mutation primitives the edit engine
//! is built from: attribute set/remove, element rename, text replacement,
//! sibling insertion, detaching, and deep import of a subtree parsed into a
//! separate document.

mod node;

pub use node::NodeKind;

use crate::error::ParseError;
use std::num::NonZeroU32;

/// A typed index into the document's node arena.
///
/// `Option<NodeId>` has the same size as `NodeId` thanks to the niche.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NodeId(NonZeroU32);

impl NodeId {
    /// Creates a `NodeId` from an arena index.
    ///
    /// # Panics
    ///
    /// Panics if `index` is 0.
    #[allow(clippy::expect_used, clippy::cast_possible_truncation)]
    fn from_index(index: usize) -> Self {
        Self(NonZeroU32::new(index as u32).expect("NodeId index must be non-zero"))
    }

    fn as_index(self) -> usize {
        self.0.get() as usize
    }
}

/// Storage for a single node in the document arena.
#[derive(Debug, Clone)]
pub struct NodeData {
    /// What kind of node this is and its payload.
    pub kind: NodeKind,
    /// Parent node. The document node and detached nodes have none.
    pub parent: Option<NodeId>,
    /// First child node.
    pub first_child: Option<NodeId>,
    /// Last child node (for O(1) append).
    pub last_child: Option<NodeId>,
    /// Next sibling.
    pub next_sibling: Option<NodeId>,
    /// Previous sibling.
    pub prev_sibling: Option<NodeId>,
}

impl NodeData {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            next_sibling: None,
            prev_sibling: None,
        }
    }
}

/// An attribute on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute name, qualified names kept verbatim.
    pub name: String,
    /// The attribute value with references expanded.
    pub value: String,
}

impl Attribute {
    /// Creates an attribute.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// An XML document.
///
/// # Examples
///
/// ```
/// use xmledit::Document;
///
/// let doc = Document::parse_str("<root/>").unwrap();
/// let root = doc.root_element().unwrap();
/// assert_eq!(doc.node_name(root), Some("root"));
/// ```
#[derive(Debug, Clone)]
pub struct Document {
    /// The node arena. Index 0 is a placeholder for the `NonZeroU32` niche.
    nodes: Vec<NodeData>,
    /// The document node (not the root element).
    root: NodeId,
    /// XML version from the XML declaration (e.g. "1.0").
    pub version: Option<String>,
    /// Encoding from the XML declaration (e.g. "UTF-8").
    pub encoding: Option<String>,
    /// Standalone flag from the XML declaration.
    pub standalone: Option<bool>,
}

impl Document {
    /// Creates an empty document holding only the document node.
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        nodes.push(NodeData::new(NodeKind::Document));
        nodes.push(NodeData::new(NodeKind::Document));
        Self {
            nodes,
            root: NodeId::from_index(1),
            version: None,
            encoding: None,
            standalone: None,
        }
    }

    /// Parses an XML string with default options.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the input is not well-formed XML.
    pub fn parse_str(input: &str) -> Result<Self, ParseError> {
        crate::parser::parse_str(input)
    }

    /// Parses XML from raw bytes, detecting the encoding first.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the bytes cannot be decoded or the decoded text
    /// is not well-formed.
    pub fn parse_bytes(input: &[u8]) -> Result<Self, ParseError> {
        let text = crate::encoding::decode_to_utf8(input)?;
        crate::parser::parse_str(&text)
    }

    /// Returns the document node id.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the single top-level element, if any.
    pub fn root_element(&self) -> Option<NodeId> {
        self.children(self.root).find(|&id| self.is_element(id))
    }

    /// Returns the `NodeData` for the given node.
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.as_index()]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.as_index()]
    }

    /// Returns `true` if the node is an element.
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.node(id).kind, NodeKind::Element { .. })
    }

    /// Returns the name of an element or the target of a processing instruction.
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Element { name, .. }
            | NodeKind::ProcessingInstruction { target: name, .. } => Some(name),
            _ => None,
        }
    }

    /// Returns the content of a text, CDATA, comment, or PI node.
    pub fn node_text(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).kind {
            NodeKind::Text { content }
            | NodeKind::CData { content }
            | NodeKind::Comment { content } => Some(content),
            NodeKind::ProcessingInstruction { data, .. } => data.as_deref(),
            _ => None,
        }
    }

    /// Returns the text payload of an element: the concatenation of the text
    /// and CDATA children that precede its first other child.
    ///
    /// ```
    /// use xmledit::Document;
    ///
    /// let doc = Document::parse_str("<a>head<b/>tail</a>").unwrap();
    /// let a = doc.root_element().unwrap();
    /// assert_eq!(doc.element_text(a), "head");
    /// ```
    pub fn element_text(&self, id: NodeId) -> String {
        self.children(id)
            .map_while(|child| match &self.node(child).kind {
                NodeKind::Text { content } | NodeKind::CData { content } => Some(content.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Returns the attributes of an element, or an empty slice.
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.node(id).kind {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    /// Returns the value of an attribute by name.
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    // --- Navigation ---

    /// Returns the parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Returns the first child of a node.
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).first_child
    }

    /// Returns the last child of a node.
    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).last_child
    }

    /// Returns the next sibling of a node.
    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).next_sibling
    }

    /// Returns the previous sibling of a node.
    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).prev_sibling
    }

    /// Returns an iterator over the children of a node.
    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            doc: self,
            next: self.node(id).first_child,
        }
    }

    /// Returns an iterator over all descendants of a node in document order,
    /// excluding the node itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            root: id,
            next: self.first_child(id),
        }
    }

    // --- Mutation ---

    /// Allocates a new, detached node in the arena.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let index = self.nodes.len();
        self.nodes.push(NodeData::new(kind));
        NodeId::from_index(index)
    }

    /// Allocates a detached element with no attributes.
    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.create_node(NodeKind::Element {
            name: name.into(),
            attributes: Vec::new(),
        })
    }

    /// Allocates a detached text node.
    pub fn create_text(&mut self, content: impl Into<String>) -> NodeId {
        self.create_node(NodeKind::Text {
            content: content.into(),
        })
    }

    /// Appends a child node to the end of a parent's child list.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(
            self.node(child).parent.is_none(),
            "child already has a parent; detach it first"
        );

        self.node_mut(child).parent = Some(parent);

        if let Some(last) = self.node(parent).last_child {
            self.node_mut(last).next_sibling = Some(child);
            self.node_mut(child).prev_sibling = Some(last);
        } else {
            self.node_mut(parent).first_child = Some(child);
        }
        self.node_mut(parent).last_child = Some(child);
    }

    /// Inserts `new_child` immediately before `reference` under the same parent.
    ///
    /// Does nothing if `reference` is detached.
    pub fn insert_before(&mut self, reference: NodeId, new_child: NodeId) {
        debug_assert!(
            self.node(new_child).parent.is_none(),
            "new_child already has a parent; detach it first"
        );
        let Some(parent) = self.node(reference).parent else {
            return;
        };
        self.node_mut(new_child).parent = Some(parent);

        if let Some(prev) = self.node(reference).prev_sibling {
            self.node_mut(prev).next_sibling = Some(new_child);
            self.node_mut(new_child).prev_sibling = Some(prev);
        } else {
            self.node_mut(parent).first_child = Some(new_child);
        }

        self.node_mut(new_child).next_sibling = Some(reference);
        self.node_mut(reference).prev_sibling = Some(new_child);
    }

    /// Inserts `new_child` immediately after `reference` under the same parent.
    ///
    /// Does nothing if `reference` is detached.
    pub fn insert_after(&mut self, reference: NodeId, new_child: NodeId) {
        match (self.node(reference).next_sibling, self.node(reference).parent) {
            (Some(next), _) => self.insert_before(next, new_child),
            (None, Some(parent)) => self.append_child(parent, new_child),
            (None, None) => {}
        }
    }

    /// Detaches a node (and with it its subtree) from its parent.
    ///
    /// The node stays allocated in the arena but is no longer reachable.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.node(id).parent else {
            return;
        };

        let prev = self.node(id).prev_sibling;
        let next = self.node(id).next_sibling;

        match prev {
            Some(p) => self.node_mut(p).next_sibling = next,
            None => self.node_mut(parent).first_child = next,
        }
        match next {
            Some(n) => self.node_mut(n).prev_sibling = prev,
            None => self.node_mut(parent).last_child = prev,
        }

        let data = self.node_mut(id);
        data.parent = None;
        data.prev_sibling = None;
        data.next_sibling = None;
    }

    /// Replaces the text payload of an element (see [`element_text`]) with a
    /// single text node. An empty `text` leaves no text node behind.
    ///
    /// [`element_text`]: Document::element_text
    pub fn set_element_text(&mut self, id: NodeId, text: &str) {
        while let Some(first) = self.first_child(id) {
            if !self.node(first).kind.is_character_data() {
                break;
            }
            self.detach(first);
        }
        if text.is_empty() {
            return;
        }
        let text_node = self.create_text(text);
        match self.first_child(id) {
            Some(first) => self.insert_before(first, text_node),
            None => self.append_child(id, text_node),
        }
    }

    /// Sets an attribute on an element, overwriting the value in place when
    /// the name exists and appending it otherwise.
    ///
    /// Returns the previous value. Non-element nodes are left untouched.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Option<String> {
        let NodeKind::Element { attributes, .. } = &mut self.node_mut(id).kind else {
            return None;
        };
        if let Some(attr) = attributes.iter_mut().find(|a| a.name == name) {
            return Some(std::mem::replace(&mut attr.value, value.to_string()));
        }
        attributes.push(Attribute::new(name, value));
        None
    }

    /// Removes an attribute from an element, returning its value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let NodeKind::Element { attributes, .. } = &mut self.node_mut(id).kind else {
            return None;
        };
        let index = attributes.iter().position(|a| a.name == name)?;
        Some(attributes.remove(index).value)
    }

    /// Changes the tag of an element in place, returning the old tag.
    ///
    /// Children, text, and attributes are untouched and the `NodeId` stays
    /// the same.
    pub fn rename_element(&mut self, id: NodeId, new_name: &str) -> Option<String> {
        let NodeKind::Element { name, .. } = &mut self.node_mut(id).kind else {
            return None;
        };
        Some(std::mem::replace(name, new_name.to_string()))
    }

    /// Deep-copies `node` and its subtree out of `source` into this document.
    ///
    /// The copy is returned detached, ready to be linked with
    /// [`append_child`](Document::append_child) or one of the insert methods.
    pub fn import_subtree(&mut self, source: &Document, node: NodeId) -> NodeId {
        let copy = self.create_node(source.node(node).kind.clone());
        for child in source.children(node) {
            let child_copy = self.import_subtree(source, child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Returns the total number of allocated nodes, reachable or not.
    pub fn node_count(&self) -> usize {
        self.nodes.len() - 1
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

// --- Iterators ---

/// Iterator over the children of a node.
pub struct Children<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.node(current).next_sibling;
        Some(current)
    }
}

/// Depth-first, pre-order iterator over the descendants of a node.
pub struct Descendants<'a> {
    doc: &'a Document,
    root: NodeId,
    next: Option<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;

        if let Some(child) = self.doc.first_child(current) {
            self.next = Some(child);
            return Some(current);
        }

        let mut cursor = Some(current);
        while let Some(node) = cursor {
            if node == self.root {
                break;
            }
            if let Some(sibling) = self.doc.next_sibling(node) {
                self.next = Some(sibling);
                return Some(current);
            }
            cursor = self.doc.parent(node);
        }

        self.next = None;
        Some(current)
    }
}
