//! Path expressions addressing elements and attributes.
//!
//! The supported language is a small, closed subset of `XPath`: an optional
//! `/` or `//` anchor, element steps with at most one predicate each, and an
//! optional trailing attribute selector.
//!
//! ```text
//! /config/server/port
//! //service[@name="web"]/timeout
//! //a/b[2]/@type
//! items/item[text()="x"]
//! ```
//!
//! Parsing is separate from evaluation so that a request can be validated
//! before any document is read.
//!
//! ```
//! use xmledit::Document;
//! use xmledit::xpath::{parse, resolve};
//!
//! let doc = Document::parse_str("<config><port>80</port></config>").unwrap();
//! let expr = parse("/config/port").unwrap();
//! let port = resolve(&doc, &expr).first().unwrap();
//! assert_eq!(doc.element_text(port), "80");
//! ```
//!
//! # Submodules
//!
//! - [`ast`]: Parsed expression types.
//! - [`lexer`]: Tokenizer for expression strings.
//! - [`parser`]: Recursive descent parser producing a [`PathExpr`].
//! - [`eval`]: Resolution of a [`PathExpr`] against a document.

pub mod ast;
pub mod eval;
pub mod lexer;
pub mod parser;

pub use ast::{Anchor, PathExpr, Predicate, Step};
pub use eval::{resolve, MatchSet};
pub use lexer::XPathError;
pub use parser::parse;
