//! Recursive descent parser for path expressions.
//!
//! Grammar:
//!
//! ```text
//! path      := anchor? step ('/' step)* ('/' '@' name)?
//! anchor    := '//' | '/'
//! step      := name predicate?
//! predicate := '[' ( integer
//!                  | 'text()' '=' literal
//!                  | '@' name ( '=' literal )? ) ']'
//! ```

use super::ast::{Anchor, PathExpr, Predicate, Step};
use super::lexer::{Lexer, Spanned, Token, XPathError};

/// Parses a path expression string.
///
/// # Errors
///
/// Returns [`XPathError`] if the input is empty, malformed, or uses syntax
/// outside the supported grammar.
///
/// ```
/// use xmledit::xpath::parse;
///
/// let expr = parse("//service[@name='web']/port").unwrap();
/// assert_eq!(expr.steps.len(), 2);
/// assert!(parse("//a//b").is_err());
/// ```
pub fn parse(input: &str) -> Result<PathExpr, XPathError> {
    let tokens = Lexer::new(input).tokenize()?;
    if tokens.is_empty() {
        return Err(XPathError::new(0, "empty path expression"));
    }
    let mut parser = Parser {
        tokens,
        pos: 0,
        end: input.len(),
    };
    parser.parse_path()
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    /// Byte length of the input, reported for errors at end of input.
    end: usize,
}

impl Parser {
    // -----------------------------------------------------------------------
    // Token access helpers
    // -----------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn check(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        let matched = self.check(token);
        if matched {
            self.pos += 1;
        }
        matched
    }

    fn expect(&mut self, token: &Token) -> Result<(), XPathError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.error(format!(
                "expected '{token}', found {}",
                self.describe_current()
            )))
        }
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.peek()?.clone();
        self.pos += 1;
        Some(token)
    }

    /// Byte offset of the current token, or the input length at the end.
    fn position(&self) -> usize {
        self.tokens.get(self.pos).map_or(self.end, |s| s.position)
    }

    fn describe_current(&self) -> String {
        self.peek()
            .map_or_else(|| "end of expression".to_string(), |t| format!("'{t}'"))
    }

    fn error(&self, message: impl Into<String>) -> XPathError {
        XPathError::new(self.position(), message)
    }

    fn expect_name(&mut self, what: &str) -> Result<String, XPathError> {
        match self.peek() {
            Some(Token::Name(name)) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(self.error(format!(
                "expected {what}, found {}",
                self.describe_current()
            ))),
        }
    }

    fn expect_literal(&mut self) -> Result<String, XPathError> {
        match self.peek() {
            Some(Token::Literal(value)) => {
                let value = value.clone();
                self.pos += 1;
                Ok(value)
            }
            _ => Err(self.error(format!(
                "expected a quoted string, found {}",
                self.describe_current()
            ))),
        }
    }

    // -----------------------------------------------------------------------
    // Grammar productions
    // -----------------------------------------------------------------------

    fn parse_path(&mut self) -> Result<PathExpr, XPathError> {
        let anchor = if self.eat(&Token::DoubleSlash) {
            Anchor::Descendant
        } else if self.eat(&Token::Slash) {
            Anchor::Root
        } else {
            Anchor::Relative
        };

        let mut steps = Vec::new();
        let mut attribute = None;
        loop {
            if self.check(&Token::At) {
                if steps.is_empty() {
                    return Err(self.error("an attribute selector needs an element step before it"));
                }
                self.pos += 1;
                attribute = Some(self.expect_name("attribute name")?);
                if self.peek().is_some() {
                    return Err(self.error("the attribute selector must end the path"));
                }
                break;
            }

            steps.push(self.parse_step()?);

            match self.peek() {
                None => break,
                Some(Token::Slash) => {
                    self.pos += 1;
                    if self.peek().is_none() {
                        return Err(self.error("path must not end with '/'"));
                    }
                }
                Some(Token::DoubleSlash) => {
                    return Err(self.error("'//' is only supported at the start of a path"));
                }
                Some(Token::LeftBracket) => {
                    return Err(self.error("only one predicate per step is supported"));
                }
                Some(_) => {
                    return Err(self.error(format!("unexpected {}", self.describe_current())));
                }
            }
        }

        Ok(PathExpr {
            anchor,
            steps,
            attribute,
        })
    }

    fn parse_step(&mut self) -> Result<Step, XPathError> {
        let name = self.expect_name("element name")?;
        if self.check(&Token::LeftParen) {
            return Err(self.error(if name == "text" {
                "text() is only supported inside a predicate".to_string()
            } else {
                format!("function '{name}()' is not supported")
            }));
        }

        let mut step = Step::new(name);
        if self.eat(&Token::LeftBracket) {
            step.predicates.push(self.parse_predicate()?);
            self.expect(&Token::RightBracket)?;
        }
        Ok(step)
    }

    fn parse_predicate(&mut self) -> Result<Predicate, XPathError> {
        let start = self.position();
        match self.advance() {
            Some(Token::Number(digits)) => match digits.parse::<usize>() {
                Ok(0) => Err(XPathError::new(start, "positions are 1-based")),
                Ok(n) => Ok(Predicate::Position(n)),
                Err(_) => Err(XPathError::new(start, format!("position {digits} is too large"))),
            },
            Some(Token::At) => {
                let name = self.expect_name("attribute name")?;
                let value = if self.eat(&Token::Equal) {
                    Some(self.expect_literal()?)
                } else {
                    None
                };
                Ok(Predicate::Attribute { name, value })
            }
            Some(Token::Name(name)) if self.check(&Token::LeftParen) => {
                if name != "text" {
                    return Err(XPathError::new(
                        start,
                        format!("function '{name}()' is not supported"),
                    ));
                }
                self.expect(&Token::LeftParen)?;
                self.expect(&Token::RightParen)?;
                self.expect(&Token::Equal)?;
                Ok(Predicate::Text(self.expect_literal()?))
            }
            Some(Token::RightBracket) => Err(XPathError::new(start, "empty predicate")),
            None => Err(XPathError::new(start, "unterminated predicate")),
            Some(_) => {
                let hint = if matches!(self.peek_at(0), Some(Token::LeftBracket)) {
                    "nested predicates are not supported"
                } else {
                    "unsupported predicate; expected a position, text()=\"...\" or @name"
                };
                Err(XPathError::new(start, hint))
            }
        }
    }
}
