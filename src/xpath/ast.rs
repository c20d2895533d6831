//! Syntax tree of a parsed path expression.
//!
//! A [`PathExpr`] is an anchor, a non-empty list of element [`Step`]s, and an
//! optional trailing attribute selector. Its `Display` output is the canonical
//! spelling of the expression and is what error messages and logs show.

use std::fmt;

/// Where evaluation of the first step starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    /// `/a`: the first step selects the root element.
    Root,
    /// `//a`: the first step selects matching elements anywhere.
    Descendant,
    /// `a`: the first step selects children of the root element.
    Relative,
}

/// A filter applied to the elements selected by a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `[n]`: the n-th (1-based) element among those selected under the same
    /// parent.
    Position(usize),
    /// `[text()="v"]`: some text run directly inside the element equals `v`.
    Text(String),
    /// `[@name]` or `[@name="v"]`: the attribute exists, optionally with the
    /// given value.
    Attribute {
        /// Attribute name.
        name: String,
        /// Required value, if any.
        value: Option<String>,
    },
}

/// One element step: a tag name and its predicates, applied in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Tag name to match, compared verbatim.
    pub name: String,
    /// Predicates applied left to right.
    pub predicates: Vec<Predicate>,
}

impl Step {
    /// Creates a step without predicates.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            predicates: Vec::new(),
        }
    }
}

/// A parsed path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpr {
    /// Evaluation anchor.
    pub anchor: Anchor,
    /// Element steps. Never empty for an expression produced by the parser.
    pub steps: Vec<Step>,
    /// Trailing `@name` selector.
    pub attribute: Option<String>,
}

impl PathExpr {
    /// Returns `true` if the expression addresses an attribute.
    pub fn is_attribute(&self) -> bool {
        self.attribute.is_some()
    }

    /// Returns the final element step.
    pub fn last_step(&self) -> Option<&Step> {
        self.steps.last()
    }

    /// Returns `true` if the final element step carries a predicate.
    pub fn is_predicated(&self) -> bool {
        self.last_step().is_some_and(|s| !s.predicates.is_empty())
    }

    /// Returns the expression with its final element step removed, or `None`
    /// when there is only one step. Any attribute selector is dropped too.
    ///
    /// ```
    /// use xmledit::xpath::parse;
    ///
    /// let expr = parse("//a/b[2]").unwrap();
    /// assert_eq!(expr.parent_path().unwrap().to_string(), "//a");
    /// assert!(parse("/a").unwrap().parent_path().is_none());
    /// ```
    pub fn parent_path(&self) -> Option<PathExpr> {
        let (_, parent_steps) = self.steps.split_last()?;
        if parent_steps.is_empty() {
            return None;
        }
        Some(PathExpr {
            anchor: self.anchor,
            steps: parent_steps.to_vec(),
            attribute: None,
        })
    }

    /// Returns the element part of the expression with a text-equality
    /// predicate appended to its final step.
    ///
    /// ```
    /// use xmledit::xpath::parse;
    ///
    /// let expr = parse("//a/b[2]").unwrap();
    /// assert_eq!(expr.with_text_predicate("x").to_string(), "//a/b[2][text()=\"x\"]");
    /// ```
    pub fn with_text_predicate(&self, value: &str) -> PathExpr {
        let mut expr = PathExpr {
            attribute: None,
            ..self.clone()
        };
        if let Some(last) = expr.steps.last_mut() {
            last.predicates.push(Predicate::Text(value.to_string()));
        }
        expr
    }
}

fn write_literal(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    if value.contains('"') {
        write!(f, "'{value}'")
    } else {
        write!(f, "\"{value}\"")
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        match self {
            Self::Position(n) => write!(f, "{n}")?,
            Self::Text(value) => {
                f.write_str("text()=")?;
                write_literal(f, value)?;
            }
            Self::Attribute { name, value } => {
                write!(f, "@{name}")?;
                if let Some(value) = value {
                    f.write_str("=")?;
                    write_literal(f, value)?;
                }
            }
        }
        f.write_str("]")
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.anchor {
            Anchor::Root => f.write_str("/")?,
            Anchor::Descendant => f.write_str("//")?,
            Anchor::Relative => {}
        }
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(&step.name)?;
            for predicate in &step.predicates {
                write!(f, "{predicate}")?;
            }
        }
        if let Some(attribute) = &self.attribute {
            write!(f, "/@{attribute}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn expr(anchor: Anchor, steps: Vec<Step>, attribute: Option<&str>) -> PathExpr {
        PathExpr {
            anchor,
            steps,
            attribute: attribute.map(str::to_string),
        }
    }

    #[test]
    fn test_display_canonical_forms() {
        let e = expr(
            Anchor::Descendant,
            vec![
                Step::new("a"),
                Step {
                    name: "b".into(),
                    predicates: vec![Predicate::Attribute {
                        name: "id".into(),
                        value: Some("x\"y".into()),
                    }],
                },
            ],
            Some("type"),
        );
        assert_eq!(e.to_string(), "//a/b[@id='x\"y']/@type");

        let e = expr(Anchor::Relative, vec![Step::new("a"), Step::new("b")], None);
        assert_eq!(e.to_string(), "a/b");
    }

    #[test]
    fn test_parent_path_drops_attribute() {
        let e = expr(Anchor::Root, vec![Step::new("a"), Step::new("b")], Some("k"));
        let parent = e.parent_path().unwrap();
        assert_eq!(parent.to_string(), "/a");
        assert!(!parent.is_attribute());
    }

    #[test]
    fn test_with_text_predicate_leaves_receiver_untouched() {
        let e = expr(Anchor::Relative, vec![Step::new("a")], Some("k"));
        let checked = e.with_text_predicate("v");
        assert_eq!(checked.to_string(), "a[text()=\"v\"]");
        assert!(checked.is_predicated());
        assert!(!e.is_predicated());
        assert!(e.is_attribute());
    }
}
