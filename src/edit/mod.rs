//! Idempotent edit operations on stored documents.
//!
//! An [`Editor`] takes an [`EditRequest`] (document location, path
//! expression, [`Operation`]) through a fixed pipeline:
//!
//! 1. parse the path and validate the operation's argument,
//! 2. read and decode the document,
//! 3. resolve the path,
//! 4. check whether the requested state already holds,
//! 5. mutate the tree if it does not,
//! 6. write the document back if anything changed.
//!
//! Requests are validated before the document is read, so a malformed request
//! never touches storage.
//!
//! ```no_run
//! use xmledit::edit::{EditRequest, Editor, Operation};
//!
//! let request = EditRequest::new(
//!     "config.xml",
//!     "//server/port",
//!     Operation::Upsert("8080".into()),
//! );
//! let outcome = Editor::new().run(&request)?;
//! println!("changed: {}", outcome.changed);
//! # Ok::<(), xmledit::EditError>(())
//! ```

pub mod check;
mod mutate;

use std::fmt;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub use check::BlockCheck;

use crate::codec::{TreeCodec, XmlCodec};
use crate::error::EditError;
use crate::parser::is_valid_name;
use crate::tree::Document;
use crate::xpath::{parse, resolve, PathExpr};

/// The requested target state, as named by callers.
///
/// Each state maps onto one [`Operation`]; see [`Operation::from_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    /// The element text or attribute value is set. Alias: `upsert`.
    #[serde(alias = "upsert")]
    Present,
    /// The element or attribute is removed. Alias: `delete`.
    #[serde(alias = "delete")]
    Absent,
    /// A raw element literal is present after the target. Alias: `insert-raw`.
    #[serde(alias = "insert-raw")]
    Addblock,
    /// The element or attribute carries a new name.
    Rename,
}

impl State {
    /// Returns the primary name of the state.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Addblock => "addblock",
            Self::Rename => "rename",
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "present" | "upsert" => Ok(Self::Present),
            "absent" | "delete" => Ok(Self::Absent),
            "addblock" | "insert-raw" => Ok(Self::Addblock),
            "rename" => Ok(Self::Rename),
            other => Err(format!(
                "unknown state '{other}' (expected present, absent, addblock or rename)"
            )),
        }
    }
}

/// One of the four edit operations, with its argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    /// Set the attribute value or element text, creating the element if
    /// needed.
    Upsert(String),
    /// Remove the attribute or element.
    Delete,
    /// Insert a raw element literal as the next sibling of the target.
    InsertRaw(String),
    /// Rename the attribute or element.
    Rename(String),
}

impl Operation {
    /// Builds the operation for `state`, taking the argument from `value`.
    ///
    /// # Errors
    ///
    /// Returns [`EditError::InvalidOperation`] when the state needs a value
    /// and none was given.
    ///
    /// ```
    /// use xmledit::edit::{Operation, State};
    ///
    /// let op = Operation::from_state(State::Rename, Some("beer".into())).unwrap();
    /// assert_eq!(op, Operation::Rename("beer".into()));
    /// assert!(Operation::from_state(State::Present, None).is_err());
    /// ```
    pub fn from_state(state: State, value: Option<String>) -> Result<Self, EditError> {
        let require = |value: Option<String>| {
            value.ok_or_else(|| {
                EditError::invalid_operation(format!("state '{state}' requires a value"))
            })
        };
        match state {
            State::Present => require(value).map(Self::Upsert),
            State::Absent => Ok(Self::Delete),
            State::Addblock => require(value).map(Self::InsertRaw),
            State::Rename => require(value).map(Self::Rename),
        }
    }

    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Upsert(_) => "upsert",
            Self::Delete => "delete",
            Self::InsertRaw(_) => "insert-raw",
            Self::Rename(_) => "rename",
        }
    }
}

/// A complete edit request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditRequest {
    /// Location of the document.
    pub path: PathBuf,
    /// Path expression addressing the target.
    pub xpath: String,
    /// What to do with the target.
    pub operation: Operation,
}

impl EditRequest {
    /// Creates a request.
    pub fn new(path: impl Into<PathBuf>, xpath: impl Into<String>, operation: Operation) -> Self {
        Self {
            path: path.into(),
            xpath: xpath.into(),
            operation,
        }
    }
}

/// The result of a successful run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    /// Whether the document was (or, in check mode, would be) modified.
    pub changed: bool,
    /// Human-readable summary.
    pub message: String,
    /// Number of elements the path matched before the edit.
    pub matched_count: usize,
}

/// Options controlling an [`Editor`].
///
/// ```
/// use xmledit::edit::{BlockCheck, EditOptions};
///
/// let opts = EditOptions::default()
///     .check_mode(true)
///     .block_check(BlockCheck::Structural);
/// assert!(opts.check_mode);
/// ```
#[derive(Debug, Clone, Default)]
pub struct EditOptions {
    /// Run the whole pipeline but never write the document back.
    pub check_mode: bool,
    /// How insert-raw decides that its block is already present.
    pub block_check: BlockCheck,
}

impl EditOptions {
    /// Enables or disables check mode.
    #[must_use]
    pub fn check_mode(mut self, yes: bool) -> Self {
        self.check_mode = yes;
        self
    }

    /// Sets the insert-raw existence check.
    #[must_use]
    pub fn block_check(mut self, mode: BlockCheck) -> Self {
        self.block_check = mode;
        self
    }
}

/// A request whose path and argument have been validated.
enum Prepared<'r> {
    Upsert(&'r str),
    Delete,
    InsertRaw { literal: &'r str, fragment: Document },
    Rename(&'r str),
}

/// Applies edit requests to documents through a [`TreeCodec`].
#[derive(Debug, Clone, Default)]
pub struct Editor<C: TreeCodec = XmlCodec> {
    codec: C,
    options: EditOptions,
}

impl Editor {
    /// Creates an editor using the XML codec and default options.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: TreeCodec> Editor<C> {
    /// Creates an editor using the given codec.
    pub fn with_codec(codec: C) -> Self {
        Self {
            codec,
            options: EditOptions::default(),
        }
    }

    /// Replaces the editor's options.
    #[must_use]
    pub fn options(mut self, options: EditOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs a request against the stored document.
    ///
    /// The document is read once and, if the edit changed it and check mode
    /// is off, written once. Nothing is locked: concurrent runs against the
    /// same file race and the last writer wins. A failed write may leave the
    /// file truncated.
    ///
    /// # Errors
    ///
    /// Returns an [`EditError`] describing the first failure. No partial
    /// result is ever written.
    pub fn run(&self, request: &EditRequest) -> Result<Outcome, EditError> {
        let expr = parse_path(&request.xpath)?;
        let prepared = self.prepare(&expr, &request.operation)?;
        debug!(
            operation = request.operation.name(),
            xpath = %expr,
            "request validated"
        );

        let io_error = |source: io::Error| EditError::Io {
            path: request.path.clone(),
            source,
        };
        let bytes = fs::read(&request.path).map_err(io_error)?;
        let mut doc = self.codec.load(&bytes)?;
        debug!(path = %request.path.display(), nodes = doc.node_count(), "document loaded");

        let outcome = self.apply(&mut doc, &expr, prepared)?;

        if outcome.changed && !self.options.check_mode {
            let bytes = self
                .codec
                .save(&doc)
                .map_err(|err| io_error(io::Error::new(io::ErrorKind::InvalidData, err)))?;
            fs::write(&request.path, bytes).map_err(io_error)?;
            debug!(path = %request.path.display(), "document saved");
        } else if outcome.changed {
            debug!("check mode, document not saved");
        }

        info!(
            changed = outcome.changed,
            matched = outcome.matched_count,
            "{}",
            outcome.message
        );
        Ok(outcome)
    }

    /// Applies an operation to an in-memory document.
    ///
    /// ```
    /// use xmledit::Document;
    /// use xmledit::edit::{Editor, Operation};
    ///
    /// let mut doc = Document::parse_str("<a><b/></a>").unwrap();
    /// let editor = Editor::new();
    /// let op = Operation::Upsert("x".into());
    /// assert!(editor.apply_to_document(&mut doc, "//b/@k", &op).unwrap().changed);
    /// assert!(!editor.apply_to_document(&mut doc, "//b/@k", &op).unwrap().changed);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an [`EditError`] if the path or argument is invalid or the
    /// operation cannot be applied. The document is unchanged on error.
    pub fn apply_to_document(
        &self,
        doc: &mut Document,
        xpath: &str,
        operation: &Operation,
    ) -> Result<Outcome, EditError> {
        let expr = parse_path(xpath)?;
        let prepared = self.prepare(&expr, operation)?;
        self.apply(doc, &expr, prepared)
    }

    fn prepare<'r>(
        &self,
        expr: &PathExpr,
        operation: &'r Operation,
    ) -> Result<Prepared<'r>, EditError> {
        match operation {
            Operation::Upsert(value) => Ok(Prepared::Upsert(value)),
            Operation::Delete => Ok(Prepared::Delete),
            Operation::InsertRaw(literal) => {
                if expr.is_attribute() {
                    return Err(EditError::invalid_operation(format!(
                        "cannot insert a block next to attribute '{expr}'"
                    )));
                }
                let fragment = self
                    .codec
                    .parse_element(literal)
                    .map_err(EditError::MalformedLiteral)?;
                Ok(Prepared::InsertRaw { literal, fragment })
            }
            Operation::Rename(new_name) => {
                if !is_valid_name(new_name) {
                    return Err(EditError::invalid_operation(format!(
                        "'{new_name}' is not a valid XML name"
                    )));
                }
                Ok(Prepared::Rename(new_name))
            }
        }
    }

    fn apply(
        &self,
        doc: &mut Document,
        expr: &PathExpr,
        prepared: Prepared<'_>,
    ) -> Result<Outcome, EditError> {
        let matches = resolve(doc, expr);
        debug!(matched = matches.len(), "path resolved");

        let applied = match prepared {
            Prepared::Upsert(value) => mutate::upsert(doc, expr, &matches, value),
            Prepared::Delete => mutate::delete(doc, expr, &matches),
            Prepared::InsertRaw { literal, fragment } => mutate::insert_raw(
                doc,
                expr,
                &matches,
                literal,
                &fragment,
                self.options.block_check,
            ),
            Prepared::Rename(new_name) => mutate::rename(doc, expr, &matches, new_name),
        }?;
        debug!(changed = applied.changed, "operation applied");

        Ok(Outcome {
            changed: applied.changed,
            message: applied.message,
            matched_count: matches.len(),
        })
    }
}

fn parse_path(xpath: &str) -> Result<PathExpr, EditError> {
    parse(xpath).map_err(|source| EditError::InvalidPath {
        path: xpath.to_string(),
        source,
    })
}
