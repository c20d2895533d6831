//! Recursive descent parser for XML 1.0 documents.
//!
//! Builds a [`Document`] from the source text. Whitespace between top-level
//! constructs is not stored since the serializer lays those out itself; all
//! whitespace inside the root element is kept as text nodes unless
//! [`ParseOptions::no_blanks`] is set.

use crate::error::ParseError;
use crate::tree::{Attribute, Document, NodeId, NodeKind};

use super::input::{
    parse_cdata_content, parse_comment_content, parse_pi_content, parse_xml_decl, ParserInput,
};
use super::ParseOptions;

pub(crate) struct XmlParser<'a> {
    input: ParserInput<'a>,
    doc: Document,
    options: ParseOptions,
}

impl<'a> XmlParser<'a> {
    pub fn new(input: &'a str, options: &ParseOptions) -> Self {
        let mut cursor = ParserInput::new(input.strip_prefix('\u{FEFF}').unwrap_or(input));
        cursor.set_max_depth(options.max_depth);
        cursor.set_max_name_length(options.max_name_length);
        Self {
            input: cursor,
            doc: Document::new(),
            options: options.clone(),
        }
    }

    /// Parses the entire document.
    pub fn parse(mut self) -> Result<Document, ParseError> {
        if self.looking_at_xml_decl() {
            let decl = parse_xml_decl(&mut self.input)?;
            self.doc.version = Some(decl.version);
            self.doc.encoding = decl.encoding;
            self.doc.standalone = decl.standalone;
        } else if self.input.skip_whitespace() && self.looking_at_xml_decl() {
            return Err(self
                .input
                .fatal("XML declaration must be at the start of the document"));
        }

        let document = self.doc.root();
        self.parse_misc(document)?;

        if self.input.looking_at(b"<!DOCTYPE") {
            self.parse_doctype(document)?;
            self.parse_misc(document)?;
        }

        if self.input.peek() == Some(b'<')
            && self.input.peek_at(1).is_some_and(|b| b != b'!' && b != b'?')
        {
            self.parse_element(document)?;
        } else {
            return Err(self.input.fatal("missing root element"));
        }

        self.parse_misc(document)?;
        if !self.input.at_end() {
            return Err(self.input.fatal("content after document element"));
        }
        Ok(self.doc)
    }

    fn looking_at_xml_decl(&self) -> bool {
        self.input.looking_at(b"<?xml")
            && matches!(self.input.peek_at(5), Some(b' ' | b'\t' | b'\r' | b'\n'))
    }

    // --- Misc (comments, PIs, whitespace) ---

    fn parse_misc(&mut self, parent: NodeId) -> Result<(), ParseError> {
        loop {
            self.input.skip_whitespace();
            if self.input.looking_at(b"<!--") {
                self.parse_comment(parent)?;
            } else if self.input.looking_at(b"<?") {
                if self.looking_at_xml_decl() {
                    return Err(self
                        .input
                        .fatal("XML declaration must be at the start of the document"));
                }
                self.parse_processing_instruction(parent)?;
            } else {
                return Ok(());
            }
        }
    }

    // --- DOCTYPE Declaration (XML 1.0 §2.8) ---

    fn parse_doctype(&mut self, parent: NodeId) -> Result<(), ParseError> {
        self.input.expect_str(b"<!DOCTYPE")?;
        self.input.skip_whitespace_required()?;
        let name = self.input.parse_name()?;
        self.input.skip_whitespace();

        let mut system_id = None;
        let mut public_id = None;
        if self.input.looking_at(b"SYSTEM") {
            self.input.expect_str(b"SYSTEM")?;
            self.input.skip_whitespace_required()?;
            system_id = Some(self.input.parse_quoted_value()?);
        } else if self.input.looking_at(b"PUBLIC") {
            self.input.expect_str(b"PUBLIC")?;
            self.input.skip_whitespace_required()?;
            public_id = Some(self.input.parse_quoted_value()?);
            self.input.skip_whitespace_required()?;
            system_id = Some(self.input.parse_quoted_value()?);
        }
        self.input.skip_whitespace();

        let internal_subset = if self.input.peek() == Some(b'[') {
            self.input.advance(1);
            let start = self.input.pos();
            self.parse_internal_subset()?;
            let subset = self.input.slice(start, self.input.pos()).to_string();
            self.input.expect_byte(b']')?;
            self.input.skip_whitespace();
            Some(subset)
        } else {
            None
        };
        self.input.expect_byte(b'>')?;

        let doctype = self.doc.create_node(NodeKind::DocumentType {
            name,
            system_id,
            public_id,
            internal_subset,
        });
        self.doc.append_child(parent, doctype);
        Ok(())
    }

    /// Walks the internal subset up to (not including) its closing `]`,
    /// recording internal general entity declarations. Other markup
    /// declarations are skipped.
    fn parse_internal_subset(&mut self) -> Result<(), ParseError> {
        loop {
            self.input.skip_whitespace();
            match self.input.peek() {
                None => return Err(self.input.fatal("unexpected end of input in DOCTYPE")),
                Some(b']') => return Ok(()),
                Some(b'%') => {
                    self.input.advance(1);
                    self.input.parse_name()?;
                    self.input.expect_byte(b';')?;
                }
                Some(_) if self.input.looking_at(b"<!--") => {
                    parse_comment_content(&mut self.input)?;
                }
                Some(_) if self.input.looking_at(b"<?") => {
                    parse_pi_content(&mut self.input)?;
                }
                Some(_) if self.input.looking_at(b"<!ENTITY") => self.parse_entity_decl()?,
                Some(_) if self.input.looking_at(b"<!") => self.skip_markup_decl()?,
                Some(_) => return Err(self.input.fatal("invalid content in DOCTYPE")),
            }
        }
    }

    fn parse_entity_decl(&mut self) -> Result<(), ParseError> {
        self.input.expect_str(b"<!ENTITY")?;
        self.input.skip_whitespace_required()?;
        let parameter = self.input.peek() == Some(b'%');
        if parameter {
            self.input.advance(1);
            self.input.skip_whitespace_required()?;
        }
        let name = self.input.parse_name()?;
        self.input.skip_whitespace_required()?;

        if matches!(self.input.peek(), Some(b'"' | b'\'')) {
            let value = self.input.parse_quoted_value()?;
            // The first declaration of an entity is binding.
            if !parameter && !self.input.entities.contains_key(&name) {
                self.input.entities.insert(name, value);
            }
            self.input.skip_whitespace();
            return self.input.expect_byte(b'>');
        }
        // External entities are never loaded, so they stay undeclared.
        self.skip_markup_decl()
    }

    /// Skips to the `>` that closes the current markup declaration.
    fn skip_markup_decl(&mut self) -> Result<(), ParseError> {
        let mut quote = None;
        loop {
            let ch = self.input.next_char()?;
            match (quote, ch) {
                (None, '"' | '\'') => quote = Some(ch),
                (Some(q), c) if q == c => quote = None,
                (None, '>') => return Ok(()),
                _ => {}
            }
        }
    }

    // --- Elements (XML 1.0 §3.1) ---

    fn parse_element(&mut self, parent: NodeId) -> Result<NodeId, ParseError> {
        self.input.increment_depth()?;
        self.input.expect_byte(b'<')?;
        let name = self.input.parse_name()?;
        let mut attributes: Vec<Attribute> = Vec::new();

        loop {
            let had_ws = self.input.skip_whitespace();
            if self.input.peek() == Some(b'>') || self.input.looking_at(b"/>") {
                break;
            }
            if !had_ws {
                return Err(self.input.fatal("whitespace required between attributes"));
            }
            let attr = self.parse_attribute()?;
            if attributes.iter().any(|a| a.name == attr.name) {
                return Err(self
                    .input
                    .fatal(format!("duplicate attribute: '{}'", attr.name)));
            }
            attributes.push(attr);
            if attributes.len() > self.options.max_attributes as usize {
                return Err(self.input.fatal(format!(
                    "too many attributes on element '{name}' (maximum {})",
                    self.options.max_attributes
                )));
            }
        }

        let element = self.doc.create_node(NodeKind::Element {
            name: name.clone(),
            attributes,
        });
        self.doc.append_child(parent, element);

        if self.input.looking_at(b"/>") {
            self.input.advance(2);
        } else {
            self.input.expect_byte(b'>')?;
            self.parse_content(element)?;

            self.input.expect_str(b"</")?;
            let end_name = self.input.parse_name()?;
            if end_name != name {
                return Err(self.input.fatal(format!(
                    "mismatched end tag: expected </{name}>, found </{end_name}>"
                )));
            }
            self.input.skip_whitespace();
            self.input.expect_byte(b'>')?;
        }

        self.input.decrement_depth();
        Ok(element)
    }

    fn parse_attribute(&mut self) -> Result<Attribute, ParseError> {
        let name = self.input.parse_name()?;
        self.input.skip_whitespace();
        self.input.expect_byte(b'=')?;
        self.input.skip_whitespace();
        let value = self.input.parse_attribute_value()?;
        Ok(Attribute { name, value })
    }

    // --- Content (XML 1.0 §3.1) ---

    fn parse_content(&mut self, parent: NodeId) -> Result<(), ParseError> {
        loop {
            if self.input.at_end() {
                return Err(self
                    .input
                    .fatal("unexpected end of input in element content"));
            }
            if self.input.looking_at(b"</") {
                return Ok(());
            }

            if self.input.looking_at(b"<![CDATA[") {
                let content = parse_cdata_content(&mut self.input)?;
                let cdata = self.doc.create_node(NodeKind::CData { content });
                self.doc.append_child(parent, cdata);
            } else if self.input.looking_at(b"<!--") {
                self.parse_comment(parent)?;
            } else if self.input.looking_at(b"<?") {
                self.parse_processing_instruction(parent)?;
            } else if self.input.peek() == Some(b'<') {
                self.parse_element(parent)?;
            } else {
                self.parse_char_data(parent)?;
            }
        }
    }

    /// Parses a run of character data and references into one text node.
    fn parse_char_data(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let mut text = String::new();
        loop {
            match self.input.peek() {
                None | Some(b'<') => break,
                Some(b'&') => {
                    let resolved = self.input.parse_reference()?;
                    text.push_str(&resolved);
                }
                Some(b']') if self.input.looking_at(b"]]>") => {
                    return Err(self.input.fatal("']]>' not allowed in character data"));
                }
                Some(_) => text.push(self.input.next_char()?),
            }
        }

        if text.is_empty() || (self.options.no_blanks && is_blank(&text)) {
            return Ok(());
        }
        let node = self.doc.create_text(text);
        self.doc.append_child(parent, node);
        Ok(())
    }

    fn parse_comment(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let content = parse_comment_content(&mut self.input)?;
        let comment = self.doc.create_node(NodeKind::Comment { content });
        self.doc.append_child(parent, comment);
        Ok(())
    }

    fn parse_processing_instruction(&mut self, parent: NodeId) -> Result<(), ParseError> {
        let (target, data) = parse_pi_content(&mut self.input)?;
        let pi = self
            .doc
            .create_node(NodeKind::ProcessingInstruction { target, data });
        self.doc.append_child(parent, pi);
        Ok(())
    }
}

/// Returns `true` if the text consists only of XML whitespace.
pub(crate) fn is_blank(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}
