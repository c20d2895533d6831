//! XML serializer.
//!
//! Serializes a `Document` tree into a well-formed XML string. With
//! [`SerializeOptions::indent`] enabled, element-only content is re-indented
//! while mixed content is written exactly as stored, so re-serializing an
//! indented document yields the same text.

use std::fmt::Write as _;

use crate::parser::is_blank;
use crate::tree::{Document, NodeId, NodeKind};

/// Options controlling XML serialization output.
///
/// ```
/// use xmledit::Document;
/// use xmledit::serial::{serialize_with_options, SerializeOptions};
///
/// let doc = Document::parse_str("<root><child>Hello</child></root>").unwrap();
/// let xml = serialize_with_options(&doc, &SerializeOptions::default().indent(true));
/// assert_eq!(xml, "<root>\n  <child>Hello</child>\n</root>\n");
/// ```
#[derive(Debug, Clone)]
pub struct SerializeOptions {
    /// Whether to indent element-only content. Defaults to `false`.
    pub indent: bool,
    /// The string written per nesting level when `indent` is `true`.
    /// Defaults to two spaces.
    pub indent_str: String,
    /// Whether to write the XML declaration for documents that were parsed
    /// with one. Defaults to `true`.
    pub xml_declaration: bool,
}

impl Default for SerializeOptions {
    fn default() -> Self {
        Self {
            indent: false,
            indent_str: "  ".to_string(),
            xml_declaration: true,
        }
    }
}

impl SerializeOptions {
    /// Enables or disables indentation of element-only content.
    #[must_use]
    pub fn indent(mut self, indent: bool) -> Self {
        self.indent = indent;
        self
    }

    /// Sets the indentation string used for each nesting level.
    #[must_use]
    pub fn indent_str(mut self, s: &str) -> Self {
        self.indent_str = s.to_string();
        self
    }

    /// Enables or disables the XML declaration.
    #[must_use]
    pub fn xml_declaration(mut self, yes: bool) -> Self {
        self.xml_declaration = yes;
        self
    }
}

/// Serializes a document with default options.
pub fn serialize(doc: &Document) -> String {
    serialize_with_options(doc, &SerializeOptions::default())
}

/// Serializes a document with the given options.
///
/// Every top-level node is followed by a newline, so the output always ends
/// with one.
pub fn serialize_with_options(doc: &Document, options: &SerializeOptions) -> String {
    let mut out = String::new();

    if let Some(version) = doc.version.as_deref().filter(|_| options.xml_declaration) {
        let _ = write!(out, "<?xml version=\"{version}\"");
        if let Some(encoding) = &doc.encoding {
            let _ = write!(out, " encoding=\"{encoding}\"");
        }
        if let Some(standalone) = doc.standalone {
            let flag = if standalone { "yes" } else { "no" };
            let _ = write!(out, " standalone=\"{flag}\"");
        }
        out.push_str("?>\n");
    }

    let mut writer = Writer { doc, options, out };
    for child in doc.children(doc.root()) {
        writer.node(child, 0, false);
        writer.out.push('\n');
    }
    writer.out
}

/// Serializes one node and its subtree without indentation.
///
/// ```
/// use xmledit::Document;
/// use xmledit::serial::serialize_node;
///
/// let doc = Document::parse_str("<r>\n  <a k=\"v\">t</a>\n</r>").unwrap();
/// let a = doc.descendants(doc.root()).nth(2).unwrap();
/// assert_eq!(serialize_node(&doc, a), "<a k=\"v\">t</a>");
/// ```
pub fn serialize_node(doc: &Document, id: NodeId) -> String {
    let options = SerializeOptions::default();
    let mut writer = Writer {
        doc,
        options: &options,
        out: String::new(),
    };
    writer.node(id, 0, false);
    writer.out
}

/// Returns `true` if the element has element children and no character
/// data other than whitespace, so that its layout can be re-indented.
fn is_element_only(doc: &Document, id: NodeId) -> bool {
    let mut has_element_child = false;
    for child in doc.children(id) {
        match &doc.node(child).kind {
            NodeKind::Element { .. } => has_element_child = true,
            NodeKind::Text { content } if !is_blank(content) => return false,
            NodeKind::CData { .. } => return false,
            _ => {}
        }
    }
    has_element_child
}

struct Writer<'a> {
    doc: &'a Document,
    options: &'a SerializeOptions,
    out: String,
}

impl Writer<'_> {
    fn pad(&mut self, depth: usize) {
        for _ in 0..depth {
            self.out.push_str(&self.options.indent_str);
        }
    }

    /// Writes a node. `laid_out` is set when the parent is being re-indented,
    /// in which case the node owns its own line.
    fn node(&mut self, id: NodeId, depth: usize, laid_out: bool) {
        let doc = self.doc;
        if laid_out {
            self.pad(depth);
        }
        match &doc.node(id).kind {
            NodeKind::Element { name, attributes } => {
                self.out.push('<');
                self.out.push_str(name);
                for attr in attributes {
                    let _ = write!(self.out, " {}=\"", attr.name);
                    write_escaped_attr(&mut self.out, &attr.value);
                    self.out.push('"');
                }

                if doc.first_child(id).is_none() {
                    self.out.push_str("/>");
                } else {
                    self.out.push('>');
                    let element_only = self.options.indent && is_element_only(doc, id);
                    if element_only {
                        self.out.push('\n');
                    }
                    for child in doc.children(id) {
                        let blank = matches!(
                            &doc.node(child).kind,
                            NodeKind::Text { content } if is_blank(content)
                        );
                        if element_only && blank {
                            continue;
                        }
                        self.node(child, depth + 1, element_only);
                    }
                    if element_only {
                        self.pad(depth);
                    }
                    let _ = write!(self.out, "</{name}>");
                }
            }
            NodeKind::Text { content } => write_escaped_text(&mut self.out, content),
            NodeKind::CData { content } => {
                let _ = write!(self.out, "<![CDATA[{content}]]>");
            }
            NodeKind::Comment { content } => {
                let _ = write!(self.out, "<!--{content}-->");
            }
            NodeKind::ProcessingInstruction { target, data } => {
                let _ = match data {
                    Some(data) => write!(self.out, "<?{target} {data}?>"),
                    None => write!(self.out, "<?{target}?>"),
                };
            }
            NodeKind::DocumentType {
                name,
                system_id,
                public_id,
                internal_subset,
            } => {
                let _ = write!(self.out, "<!DOCTYPE {name}");
                match (public_id, system_id) {
                    (Some(public_id), Some(system_id)) => {
                        let _ = write!(self.out, " PUBLIC \"{public_id}\" \"{system_id}\"");
                    }
                    (None, Some(system_id)) => {
                        let _ = write!(self.out, " SYSTEM \"{system_id}\"");
                    }
                    _ => {}
                }
                if let Some(subset) = internal_subset {
                    let _ = write!(self.out, " [{subset}]");
                }
                self.out.push('>');
            }
            NodeKind::Document => {}
        }
        if laid_out {
            self.out.push('\n');
        }
    }
}

fn write_escaped_text(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
}

fn write_escaped_attr(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#9;"),
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pretty(source: &str) -> String {
        let doc = Document::parse_str(source).unwrap();
        serialize_with_options(&doc, &SerializeOptions::default().indent(true))
    }

    #[test]
    fn test_serialize_built_tree() {
        let mut doc = Document::new();
        let root = doc.create_element("root");
        doc.append_child(doc.root(), root);
        doc.set_attribute(root, "k", "a\"b<c");
        let text = doc.create_text("x & y");
        doc.append_child(root, text);
        assert_eq!(
            serialize(&doc),
            "<root k=\"a&quot;b&lt;c\">x &amp; y</root>\n"
        );
    }

    #[test]
    fn test_declaration_only_when_source_had_one() {
        let doc = Document::parse_str("<r/>").unwrap();
        assert_eq!(serialize(&doc), "<r/>\n");

        let doc =
            Document::parse_str("<?xml version='1.0' encoding='utf-8' standalone='yes'?><r/>")
                .unwrap();
        assert_eq!(
            serialize(&doc),
            "<?xml version=\"1.0\" encoding=\"utf-8\" standalone=\"yes\"?>\n<r/>\n"
        );
        let bare = serialize_with_options(&doc, &SerializeOptions::default().xml_declaration(false));
        assert_eq!(bare, "<r/>\n");
    }

    #[test]
    fn test_pretty_print_nested() {
        assert_eq!(
            pretty("<root><child><inner>text</inner></child></root>"),
            "<root>\n  <child>\n    <inner>text</inner>\n  </child>\n</root>\n"
        );
    }

    #[test]
    fn test_pretty_print_reindents_existing_layout() {
        let source = "<root>\n\t<a/>\n\n\t\t<b>x</b>\n<!-- c -->\n</root>";
        assert_eq!(
            pretty(source),
            "<root>\n  <a/>\n  <b>x</b>\n  <!-- c -->\n</root>\n"
        );
    }

    #[test]
    fn test_pretty_print_leaves_mixed_content() {
        assert_eq!(
            pretty("<root><p>Hello <b>world</b>\n  !</p></root>"),
            "<root>\n  <p>Hello <b>world</b>\n  !</p>\n</root>\n"
        );
    }

    #[test]
    fn test_pretty_print_is_stable() {
        let once = pretty("<a><b c=\"1\"><d/></b><!--x--><?pi y?><e><![CDATA[z]]></e></a>");
        assert_eq!(pretty(&once), once);
    }

    #[test]
    fn test_custom_indent() {
        let doc = Document::parse_str("<root><child/></root>").unwrap();
        let opts = SerializeOptions::default().indent(true).indent_str("\t");
        assert_eq!(serialize_with_options(&doc, &opts), "<root>\n\t<child/>\n</root>\n");
    }

    #[test]
    fn test_prolog_nodes_each_on_own_line() {
        let doc = Document::parse_str(
            "<?xml version=\"1.0\"?><!DOCTYPE r SYSTEM \"r.dtd\"><!--top--><r/><?after?>",
        )
        .unwrap();
        assert_eq!(
            serialize(&doc),
            "<?xml version=\"1.0\"?>\n<!DOCTYPE r SYSTEM \"r.dtd\">\n<!--top-->\n<r/>\n<?after?>\n"
        );
    }

    #[test]
    fn test_attribute_whitespace_escaped() {
        let mut doc = Document::parse_str("<r/>").unwrap();
        let r = doc.root_element().unwrap();
        doc.set_attribute(r, "v", "a\nb\tc");
        assert_eq!(serialize(&doc), "<r v=\"a&#10;b&#9;c\"/>\n");
    }

    #[test]
    fn test_serialize_node_keeps_stored_layout() {
        let doc = Document::parse_str("<r>\n  <a>\n    <b/>\n  </a>\n</r>").unwrap();
        let r = doc.root_element().unwrap();
        assert_eq!(
            serialize_node(&doc, r),
            "<r>\n  <a>\n    <b/>\n  </a>\n</r>"
        );
    }
}
