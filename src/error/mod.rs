//! Error types for document parsing and edit operations.
//!
//! Parse failures carry a [`SourceLocation`] (line, column, and byte offset) so
//! that a broken document or a malformed raw literal can be reported precisely.
//! Every failure of an edit run is surfaced as an [`EditError`], whose
//! [`ErrorKind`] is the stable name a host prints next to the message.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::encoding::EncodingError;
use crate::xpath::XPathError;

/// Source location within an XML document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based byte offset from the start of the input.
    pub byte_offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The error type returned when XML parsing fails.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// The primary error message.
    pub message: String,
    /// Where in the source the error occurred.
    pub location: SourceLocation,
}

impl ParseError {
    /// Creates a parse error that has no meaningful source position.
    pub(crate) fn without_location(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: SourceLocation::default(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at {}: {}", self.location, self.message)
    }
}

impl std::error::Error for ParseError {}

impl From<EncodingError> for ParseError {
    fn from(err: EncodingError) -> Self {
        Self::without_location(err.to_string())
    }
}

/// The category of an [`EditError`].
///
/// The names returned by [`ErrorKind::as_str`] are stable and safe to match on
/// from scripts consuming the command-line output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The path expression could not be parsed.
    InvalidPath,
    /// The stored document is not well-formed.
    ParseError,
    /// The raw subtree literal is not exactly one well-formed element.
    MalformedLiteral,
    /// The operation requires a node that the path does not match.
    NotFound,
    /// No parent could be resolved for an element that would be created.
    AmbiguousTarget,
    /// The operation is not applicable to the addressed target.
    InvalidOperation,
    /// Reading or writing the document failed.
    IoError,
}

impl ErrorKind {
    /// Returns the stable name of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InvalidPath => "InvalidPath",
            Self::ParseError => "ParseError",
            Self::MalformedLiteral => "MalformedLiteral",
            Self::NotFound => "NotFound",
            Self::AmbiguousTarget => "AmbiguousTarget",
            Self::InvalidOperation => "InvalidOperation",
            Self::IoError => "IoError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error type returned by an edit run.
#[derive(Debug)]
pub enum EditError {
    /// The path expression is syntactically invalid or uses unsupported syntax.
    InvalidPath {
        /// The path as supplied.
        path: String,
        /// The underlying path error.
        source: XPathError,
    },
    /// The document could not be decoded or parsed.
    Parse(ParseError),
    /// The literal given to an insert-raw operation is not one element.
    MalformedLiteral(ParseError),
    /// The path resolved to nothing (or the attribute is absent).
    NotFound {
        /// Canonical form of the unresolved path.
        path: String,
    },
    /// The parent of an element to be created did not resolve.
    AmbiguousTarget {
        /// Canonical form of the requested path.
        path: String,
        /// Why no parent could be chosen.
        reason: String,
    },
    /// The operation cannot be applied to the addressed target.
    InvalidOperation(String),
    /// A filesystem read or write failed.
    Io {
        /// The document location involved.
        path: PathBuf,
        /// The underlying I/O error.
        source: io::Error,
    },
}

impl EditError {
    /// Returns the category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidPath { .. } => ErrorKind::InvalidPath,
            Self::Parse(_) => ErrorKind::ParseError,
            Self::MalformedLiteral(_) => ErrorKind::MalformedLiteral,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AmbiguousTarget { .. } => ErrorKind::AmbiguousTarget,
            Self::InvalidOperation(_) => ErrorKind::InvalidOperation,
            Self::Io { .. } => ErrorKind::IoError,
        }
    }

    pub(crate) fn not_found(path: impl fmt::Display) -> Self {
        Self::NotFound {
            path: path.to_string(),
        }
    }

    pub(crate) fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation(message.into())
    }
}

impl fmt::Display for EditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPath { path, source } => {
                write!(f, "invalid path '{path}': {source}")
            }
            Self::Parse(err) => write!(f, "document {err}"),
            Self::MalformedLiteral(err) => write!(f, "malformed raw literal: {err}"),
            Self::NotFound { path } => write!(f, "no node matches '{path}'"),
            Self::AmbiguousTarget { path, reason } => {
                write!(f, "cannot create '{path}': {reason}")
            }
            Self::InvalidOperation(message) => f.write_str(message),
            Self::Io { path, source } => write!(f, "{}: {source}", path.display()),
        }
    }
}

impl std::error::Error for EditError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidPath { source, .. } => Some(source),
            Self::Parse(err) | Self::MalformedLiteral(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::NotFound { .. } | Self::AmbiguousTarget { .. } | Self::InvalidOperation(_) => {
                None
            }
        }
    }
}

impl From<ParseError> for EditError {
    fn from(err: ParseError) -> Self {
        Self::Parse(err)
    }
}
