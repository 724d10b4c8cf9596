//! Parsed predicates.

use crate::lexer::{Command, ComparisonOp};
use std::fmt;

/// Separator between navigation hops in a property path.
pub const PATH_SEPARATOR: char = '/';

/// Operator of a parsed predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
    Ne,
    SubstringOf,
    StartsWith,
    EndsWith,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Gt => "gt",
            Operator::Ge => "ge",
            Operator::Lt => "lt",
            Operator::Le => "le",
            Operator::Ne => "ne",
            Operator::SubstringOf => "substringof",
            Operator::StartsWith => "startswith",
            Operator::EndsWith => "endswith",
        }
    }

    /// Whether the operator is one of the string commands.
    pub fn is_string_command(&self) -> bool {
        matches!(
            self,
            Operator::SubstringOf | Operator::StartsWith | Operator::EndsWith
        )
    }
}

impl From<ComparisonOp> for Operator {
    fn from(op: ComparisonOp) -> Self {
        match op {
            ComparisonOp::Eq => Operator::Eq,
            ComparisonOp::Gt => Operator::Gt,
            ComparisonOp::Ge => Operator::Ge,
            ComparisonOp::Lt => Operator::Lt,
            ComparisonOp::Le => Operator::Le,
            ComparisonOp::Ne => Operator::Ne,
        }
    }
}

impl From<Command> for Operator {
    fn from(cmd: Command) -> Self {
        match cmd {
            Command::SubstringOf => Operator::SubstringOf,
            Command::StartsWith => Operator::StartsWith,
            Command::EndsWith => Operator::EndsWith,
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single `(property, operator, value)` condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    /// Slash-delimited path; the last segment is the field name.
    pub property: String,
    pub operator: Operator,
    /// Literal exactly as written, quotes removed.
    pub value: String,
}

impl Predicate {
    pub fn new(property: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            operator,
            value: value.into(),
        }
    }

    /// Navigation hops leading to the field.
    pub fn navigation_path(&self) -> Vec<&str> {
        split_path(&self.property).0
    }

    /// The terminal field name.
    pub fn field(&self) -> &str {
        split_path(&self.property).1
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({} {} '{}')", self.property, self.operator, self.value)
    }
}

/// Split a property path into navigation hops and the terminal field.
pub fn split_path(path: &str) -> (Vec<&str>, &str) {
    let mut segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    let field = segments.pop().unwrap_or_default();
    (segments, field)
}
