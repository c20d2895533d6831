//! Node type definitions.
//!
//! The `NodeKind` enum carries the payload of each node type. Navigation links
//! (parent, children, siblings) live in `NodeData`, not here.

use super::Attribute;

/// The kind of an XML node and its associated data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document node. There is exactly one per `Document`.
    Document,

    /// An element node, e.g. `<service name="web">`.
    Element {
        /// The element's qualified name, kept verbatim (`svg:rect` stays `svg:rect`).
        name: String,
        /// Attributes in source order.
        attributes: Vec<Attribute>,
    },

    /// A text node containing character data (references already decoded).
    Text {
        /// The text content.
        content: String,
    },

    /// A CDATA section, e.g. `<![CDATA[...]]>`.
    CData {
        /// The CDATA content.
        content: String,
    },

    /// A comment, without the `<!--` and `-->` delimiters.
    Comment {
        /// The comment text.
        content: String,
    },

    /// A processing instruction, e.g. `<?xml-stylesheet href="a.css"?>`.
    ProcessingInstruction {
        /// The PI target.
        target: String,
        /// The PI data, if any.
        data: Option<String>,
    },

    /// A document type declaration, e.g. `<!DOCTYPE config SYSTEM "config.dtd">`.
    DocumentType {
        /// The root element name declared in the DOCTYPE.
        name: String,
        /// The SYSTEM identifier, if any.
        system_id: Option<String>,
        /// The PUBLIC identifier, if any.
        public_id: Option<String>,
        /// The internal subset between `[` and `]`, stored unparsed.
        internal_subset: Option<String>,
    },
}

impl NodeKind {
    /// Returns `true` for text and CDATA nodes.
    pub fn is_character_data(&self) -> bool {
        matches!(self, Self::Text { .. } | Self::CData { .. })
    }
}
