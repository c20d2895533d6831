//! Conversion between stored bytes and the document tree.
//!
//! The edit engine only talks to storage through a [`TreeCodec`], so that the
//! mutation logic is independent of how documents are decoded and written
//! back. [`XmlCodec`] is the XML implementation used by default.

use crate::encoding::{decode_to_utf8, encode_from_utf8, first_unencodable, EncodingError};
use crate::error::ParseError;
use crate::parser::{parse_fragment, parse_str_with_options, ParseOptions};
use crate::serial::{serialize_with_options, SerializeOptions};
use crate::tree::{Document, NodeKind};

/// Loads and saves document trees.
pub trait TreeCodec {
    /// Decodes and parses a stored document.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the bytes cannot be decoded or are not a
    /// well-formed document.
    fn load(&self, bytes: &[u8]) -> Result<Document, ParseError>;

    /// Serializes a document into the bytes to store.
    ///
    /// # Errors
    ///
    /// Returns `EncodingError` if the document's declared encoding cannot be
    /// produced, or cannot represent a character outside text and attribute
    /// values.
    fn save(&self, doc: &Document) -> Result<Vec<u8>, EncodingError>;

    /// Parses a raw literal that must hold exactly one element. The element
    /// is the root element of the returned document.
    ///
    /// # Errors
    ///
    /// Returns `ParseError` if the literal is not a single well-formed
    /// element.
    fn parse_element(&self, literal: &str) -> Result<Document, ParseError>;
}

/// XML codec built on the crate's parser and serializer.
///
/// Saving pretty-prints element-only content, keeps the XML declaration when
/// the source had one, and re-encodes the output to the declared encoding.
///
/// ```
/// use xmledit::codec::{TreeCodec, XmlCodec};
///
/// let codec = XmlCodec::default();
/// let doc = codec.load(b"<a><b>x</b></a>").unwrap();
/// assert_eq!(codec.save(&doc).unwrap(), b"<a>\n  <b>x</b>\n</a>\n");
/// ```
#[derive(Debug, Clone)]
pub struct XmlCodec {
    parse_options: ParseOptions,
    serialize_options: SerializeOptions,
}

impl Default for XmlCodec {
    fn default() -> Self {
        Self {
            parse_options: ParseOptions::default(),
            serialize_options: SerializeOptions::default().indent(true),
        }
    }
}

impl XmlCodec {
    /// Creates a codec with explicit parser and serializer options.
    pub fn new(parse_options: ParseOptions, serialize_options: SerializeOptions) -> Self {
        Self {
            parse_options,
            serialize_options,
        }
    }

    /// The options used when loading documents and literals.
    pub fn parse_options(&self) -> &ParseOptions {
        &self.parse_options
    }

    /// The options used when saving documents.
    pub fn serialize_options(&self) -> &SerializeOptions {
        &self.serialize_options
    }
}

impl TreeCodec for XmlCodec {
    fn load(&self, bytes: &[u8]) -> Result<Document, ParseError> {
        let text = decode_to_utf8(bytes)?;
        parse_str_with_options(&text, &self.parse_options)
    }

    fn save(&self, doc: &Document) -> Result<Vec<u8>, EncodingError> {
        let encoding = doc.encoding.as_deref().unwrap_or("UTF-8");
        check_markup_encodable(doc, encoding)?;
        let text = serialize_with_options(doc, &self.serialize_options);
        encode_from_utf8(&text, encoding)
    }

    fn parse_element(&self, literal: &str) -> Result<Document, ParseError> {
        parse_fragment(literal, &self.parse_options)
    }
}

/// Fails if a name, CDATA section, comment, processing instruction, or
/// DOCTYPE holds a character the encoding cannot represent. Character
/// references would be read back as markup or as different content there.
fn check_markup_encodable(doc: &Document, encoding: &str) -> Result<(), EncodingError> {
    let check = |what: &str, text: &str| -> Result<(), EncodingError> {
        match first_unencodable(text, encoding)? {
            Some(ch) => Err(EncodingError::new(format!(
                "{what} '{text}' contains '{ch}', which {encoding} cannot represent"
            ))),
            None => Ok(()),
        }
    };

    for id in doc.descendants(doc.root()) {
        match &doc.node(id).kind {
            NodeKind::Element { name, attributes } => {
                check("element name", name)?;
                for attr in attributes {
                    check("attribute name", &attr.name)?;
                }
            }
            NodeKind::CData { content } => check("CDATA section", content)?,
            NodeKind::Comment { content } => check("comment", content)?,
            NodeKind::ProcessingInstruction { target, data } => {
                check("processing instruction", target)?;
                check("processing instruction", data.as_deref().unwrap_or(""))?;
            }
            NodeKind::DocumentType {
                name,
                system_id,
                public_id,
                internal_subset,
            } => {
                let ids = [system_id, public_id, internal_subset];
                check("DOCTYPE", name)?;
                for part in ids.into_iter().flatten() {
                    check("DOCTYPE", part)?;
                }
            }
            NodeKind::Document | NodeKind::Text { .. } => {}
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_round_trip_is_stable_after_first_save() {
        let codec = XmlCodec::default();
        let source = "<?xml version='1.0'?>\n<cfg>\n    <a k='1'>x</a><b></b>\n</cfg>";
        let once = codec.save(&codec.load(source.as_bytes()).unwrap()).unwrap();
        let twice = codec.save(&codec.load(&once).unwrap()).unwrap();
        assert_eq!(
            String::from_utf8(once.clone()).unwrap(),
            "<?xml version=\"1.0\"?>\n<cfg>\n  <a k=\"1\">x</a>\n  <b/>\n</cfg>\n"
        );
        assert_eq!(once, twice);
    }

    #[test]
    fn test_save_reencodes_declared_encoding() {
        let codec = XmlCodec::default();
        let source = b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><r>caf\xE9</r>";
        let doc = codec.load(source).unwrap();
        assert_eq!(doc.element_text(doc.root_element().unwrap()), "caf\u{e9}");
        let saved = codec.save(&doc).unwrap();
        assert!(saved.windows(4).any(|w| w == b"caf\xE9"));
    }

    #[test]
    fn test_save_escapes_unencodable_text_and_attribute_values() {
        let codec = XmlCodec::default();
        let mut doc = codec
            .load(b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><r/>")
            .unwrap();
        let r = doc.root_element().unwrap();
        doc.set_element_text(r, "5 \u{4e2d}");
        doc.set_attribute(r, "k", "\u{4e2d}");

        let saved = codec.save(&doc).unwrap();
        let reloaded = codec.load(&saved).unwrap();
        let r = reloaded.root_element().unwrap();
        assert_eq!(reloaded.element_text(r), "5 \u{4e2d}");
        assert_eq!(reloaded.attribute(r, "k"), Some("\u{4e2d}"));
    }

    #[test]
    fn test_save_rejects_unencodable_markup() {
        let codec = XmlCodec::default();
        let latin1 = "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>";
        for body in [
            "<\u{4e2d}/>",
            "<r \u{4e2d}='1'/>",
            "<r><![CDATA[5 \u{4e2d}]]></r>",
            "<r><!-- \u{4e2d} --></r>",
            "<r><?app \u{4e2d}?></r>",
        ] {
            let doc = Document::parse_str(&format!("{latin1}{body}")).unwrap();
            let err = codec.save(&doc).unwrap_err();
            assert!(err.message.contains("ISO-8859-1"), "{body}: {err}");
        }
    }

    #[test]
    fn test_save_utf8_accepts_any_markup() {
        let codec = XmlCodec::default();
        let doc = Document::parse_str("<\u{4e2d}><![CDATA[\u{4e2d}]]></\u{4e2d}>").unwrap();
        assert!(codec.save(&doc).is_ok());
    }

    #[test]
    fn test_save_utf16_with_bom() {
        let codec = XmlCodec::default();
        let mut source = vec![0xFF, 0xFE];
        for unit in "<?xml version=\"1.0\" encoding=\"UTF-16\"?><r/>".encode_utf16() {
            source.extend_from_slice(&unit.to_le_bytes());
        }
        let doc = codec.load(&source).unwrap();
        let saved = codec.save(&doc).unwrap();
        assert_eq!(&saved[..2], &[0xFF, 0xFE]);
        let reloaded = codec.load(&saved).unwrap();
        let root = reloaded.root_element().unwrap();
        assert_eq!(reloaded.node_name(root), Some("r"));
    }

    #[test]
    fn test_parse_element_requires_single_element() {
        let codec = XmlCodec::default();
        assert!(codec.parse_element("<d/>").is_ok());
        assert!(codec.parse_element("<d/><e/>").is_err());
        assert!(codec.parse_element("d").is_err());
    }

    #[test]
    fn test_custom_options() {
        let codec = XmlCodec::new(
            ParseOptions::default().no_blanks(true),
            SerializeOptions::default(),
        );
        let doc = codec.load(b"<a>\n  <b/>\n</a>").unwrap();
        assert_eq!(codec.save(&doc).unwrap(), b"<a><b/></a>\n");
    }
}
