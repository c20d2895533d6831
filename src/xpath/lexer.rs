//! Path expression tokenizer.
//!
//! Converts a path string into a sequence of [`Token`]s, each tagged with the
//! byte offset it starts at. The token set is limited to what the path grammar
//! uses; XPath syntax outside it (wildcards, axes, abbreviated steps, unions,
//! variables, operators) is rejected here with a message naming the construct.

use std::fmt;

use crate::parser::input::{is_name_char, is_name_start_char};

/// An error that occurred while tokenizing or parsing a path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XPathError {
    /// Human-readable error message.
    pub message: String,
    /// 0-based byte offset in the expression where the error occurred.
    pub position: usize,
}

impl XPathError {
    pub(crate) fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl fmt::Display for XPathError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "at position {}: {}", self.position, self.message)
    }
}

impl std::error::Error for XPathError {}

/// A token produced by the path lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// `/` -- child step separator or root anchor.
    Slash,
    /// `//` -- descendant anchor.
    DoubleSlash,
    /// `[` -- predicate open.
    LeftBracket,
    /// `]` -- predicate close.
    RightBracket,
    /// `(`
    LeftParen,
    /// `)`
    RightParen,
    /// `@` -- attribute selector.
    At,
    /// `=`
    Equal,
    /// An unsigned integer literal, kept as written.
    Number(String),
    /// A quoted string literal, without its quotes.
    Literal(String),
    /// An XML name, qualified names kept verbatim.
    Name(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slash => f.write_str("/"),
            Self::DoubleSlash => f.write_str("//"),
            Self::LeftBracket => f.write_str("["),
            Self::RightBracket => f.write_str("]"),
            Self::LeftParen => f.write_str("("),
            Self::RightParen => f.write_str(")"),
            Self::At => f.write_str("@"),
            Self::Equal => f.write_str("="),
            Self::Number(n) => f.write_str(n),
            Self::Literal(s) => write!(f, "\"{s}\""),
            Self::Name(s) => f.write_str(s),
        }
    }
}

/// A token together with the byte offset where it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    /// The token.
    pub token: Token,
    /// 0-based byte offset of the token's first character.
    pub position: usize,
}

/// Path expression tokenizer.
///
/// ```
/// use xmledit::xpath::lexer::{Lexer, Token};
///
/// let tokens = Lexer::new("//a/@b").tokenize().unwrap();
/// let kinds: Vec<_> = tokens.into_iter().map(|s| s.token).collect();
/// assert_eq!(
///     kinds,
///     vec![Token::DoubleSlash, Token::Name("a".into()), Token::Slash, Token::At, Token::Name("b".into())]
/// );
/// ```
pub struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given expression.
    pub fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    /// Tokenizes the entire expression.
    ///
    /// # Errors
    ///
    /// Returns [`XPathError`] on an unterminated literal or on any character
    /// that does not start a token of the path grammar.
    pub fn tokenize(&mut self) -> Result<Vec<Spanned>, XPathError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(ch) = self.peek() else {
                return Ok(tokens);
            };
            let position = self.pos;
            let token = self.next_token(ch)?;
            tokens.push(Spanned { token, position });
        }
    }

    fn next_token(&mut self, ch: char) -> Result<Token, XPathError> {
        let single = match ch {
            '[' => Some(Token::LeftBracket),
            ']' => Some(Token::RightBracket),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            '@' => Some(Token::At),
            '=' => Some(Token::Equal),
            _ => None,
        };
        if let Some(token) = single {
            self.pos += 1;
            return Ok(token);
        }

        match ch {
            '/' => {
                self.pos += 1;
                if self.peek() == Some('/') {
                    self.pos += 1;
                    return Ok(Token::DoubleSlash);
                }
                Ok(Token::Slash)
            }
            '"' | '\'' => self.read_literal(ch),
            '0'..='9' => Ok(Token::Number(self.take_while(|c| c.is_ascii_digit()).to_string())),
            '*' => Err(self.error("wildcards are not supported")),
            '.' => Err(self.error("'.' and '..' steps are not supported")),
            ':' => Err(self.error("axes are not supported")),
            '|' => Err(self.error("unions are not supported")),
            '$' => Err(self.error("variables are not supported")),
            c if is_name_start_char(c) => Ok(self.read_name()),
            c => Err(self.error(format!("unexpected character '{c}'"))),
        }
    }

    fn read_literal(&mut self, quote: char) -> Result<Token, XPathError> {
        let start = self.pos;
        self.pos += 1;
        let content_start = self.pos;
        self.take_while(|c| c != quote);
        if self.peek().is_none() {
            return Err(XPathError::new(start, "unterminated string literal"));
        }
        let content = self.input[content_start..self.pos].to_string();
        self.pos += 1;
        Ok(Token::Literal(content))
    }

    /// Reads a name. A `::` ends the name so that `child::a` reports the axis
    /// rather than a strange element name.
    fn read_name(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek().filter(|&c| is_name_char(c)) {
            if c == ':' && self.input[self.pos + 1..].starts_with(':') {
                break;
            }
            self.pos += c.len_utf8();
        }
        Token::Name(self.input[start..self.pos].to_string())
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while let Some(c) = self.peek().filter(|&c| pred(c)) {
            self.pos += c.len_utf8();
        }
        &self.input[start..self.pos]
    }

    fn skip_whitespace(&mut self) {
        self.take_while(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
    }

    fn error(&self, message: impl Into<String>) -> XPathError {
        XPathError::new(self.pos, message)
    }
}
