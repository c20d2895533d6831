//! # xmledit
//!
//! Targeted, idempotent edits of XML documents. A path expression picks an
//! element or attribute, and one of four operations (upsert, delete,
//! insert-raw, rename) brings it into the requested state. Running the same
//! request twice changes the document at most once.
//!
//! ## Quick Start
//!
//! ```
//! use xmledit::Document;
//! use xmledit::edit::{Editor, Operation};
//!
//! let mut doc = Document::parse_str("<config><port>80</port></config>").unwrap();
//! let editor = Editor::new();
//!
//! let outcome = editor
//!     .apply_to_document(&mut doc, "/config/port[1]", &Operation::Upsert("8080".into()))
//!     .unwrap();
//! assert!(outcome.changed);
//! assert_eq!(xmledit::serial::serialize(&doc), "<config><port>8080</port></config>\n");
//! ```
//!
//! Documents on disk are edited with [`Editor::run`](edit::Editor::run),
//! which reads, edits, and writes back through a [`codec::TreeCodec`].

pub mod codec;
pub mod edit;
pub mod encoding;
pub mod error;
pub mod parser;
pub mod serial;
pub mod tree;
pub mod xpath;

// Re-export primary types at the crate root for convenience.
pub use edit::{EditOptions, EditRequest, Editor, Operation, Outcome};
pub use error::{EditError, ErrorKind};
pub use tree::{Attribute, Document, NodeId};
