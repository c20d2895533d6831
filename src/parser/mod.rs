//! XML 1.0 parser.
//!
//! A hand-rolled recursive descent parser that builds a [`Document`] tree.
//! It checks well-formedness, expands the predefined entities, character
//! references, and internal entities declared in the DOCTYPE, and never
//! loads anything external.
//!
//! Besides whole documents, [`parse_fragment`] parses the raw subtree
//! literals used by insert operations.

pub(crate) mod input;
mod xml;

pub use input::is_valid_name;
pub(crate) use xml::is_blank;

use crate::error::ParseError;
use crate::tree::{Document, NodeKind};

use input::{DEFAULT_MAX_ATTRIBUTES, DEFAULT_MAX_DEPTH, DEFAULT_MAX_NAME_LENGTH};

/// Parse options controlling parser behavior and limits.
///
/// ```
/// use xmledit::parser::ParseOptions;
///
/// let opts = ParseOptions::default()
///     .no_blanks(true)
///     .max_depth(128);
/// ```
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// If true, whitespace-only text nodes are dropped.
    pub no_blanks: bool,
    /// Maximum element nesting depth (default: 256).
    pub max_depth: u32,
    /// Maximum number of attributes on a single element (default: 256).
    pub max_attributes: u32,
    /// Maximum length in bytes of an element or attribute name (default: 50,000).
    pub max_name_length: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            no_blanks: false,
            max_depth: DEFAULT_MAX_DEPTH,
            max_attributes: DEFAULT_MAX_ATTRIBUTES,
            max_name_length: DEFAULT_MAX_NAME_LENGTH,
        }
    }
}

impl ParseOptions {
    /// Enables or disables stripping of blank text nodes.
    #[must_use]
    pub fn no_blanks(mut self, yes: bool) -> Self {
        self.no_blanks = yes;
        self
    }

    /// Sets the maximum element nesting depth.
    #[must_use]
    pub fn max_depth(mut self, max: u32) -> Self {
        self.max_depth = max;
        self
    }

    /// Sets the maximum number of attributes per element.
    #[must_use]
    pub fn max_attributes(mut self, max: u32) -> Self {
        self.max_attributes = max;
        self
    }

    /// Sets the maximum element/attribute name length in bytes.
    #[must_use]
    pub fn max_name_length(mut self, max: usize) -> Self {
        self.max_name_length = max;
        self
    }
}

/// Parses an XML string with default options.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed XML.
pub fn parse_str(input: &str) -> Result<Document, ParseError> {
    parse_str_with_options(input, &ParseOptions::default())
}

/// Parses an XML string with the given options.
///
/// # Errors
///
/// Returns `ParseError` if the input is not well-formed XML.
pub fn parse_str_with_options(input: &str, options: &ParseOptions) -> Result<Document, ParseError> {
    xml::XmlParser::new(input, options).parse()
}

/// Parses a literal that must consist of exactly one element.
///
/// An XML declaration is tolerated; comments, processing instructions, or a
/// DOCTYPE around the element are not. The returned document's root element
/// is the parsed subtree.
///
/// # Errors
///
/// Returns `ParseError` if the literal is not well-formed or holds anything
/// besides a single element.
///
/// ```
/// use xmledit::parser::{parse_fragment, ParseOptions};
///
/// let fragment = parse_fragment("<d k=\"1\"/>", &ParseOptions::default()).unwrap();
/// assert!(fragment.root_element().is_some());
/// assert!(parse_fragment("text", &ParseOptions::default()).is_err());
/// assert!(parse_fragment("<a/><b/>", &ParseOptions::default()).is_err());
/// ```
pub fn parse_fragment(literal: &str, options: &ParseOptions) -> Result<Document, ParseError> {
    let fragment = parse_str_with_options(literal.trim(), options)?;
    let stray = fragment
        .children(fragment.root())
        .find(|&id| !matches!(fragment.node(id).kind, NodeKind::Element { .. }));
    if stray.is_some() {
        return Err(ParseError::without_location(
            "expected a single element without surrounding markup",
        ));
    }
    Ok(fragment)
}
