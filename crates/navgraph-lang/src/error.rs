//! Error types for scanning and parsing filter strings.

use crate::span::{render_caret, Span};
use thiserror::Error;

/// What went wrong while scanning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanErrorKind {
    /// A `'` was opened but never closed.
    UnterminatedString,
    /// A space-introduced word is neither an operator nor a binary combinator.
    UnknownWord,
    /// Input the scanner has no rule for.
    Unrecognized,
}

/// Error while turning the filter string into tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{} at column {column}: [{word}]", .kind.describe())]
pub struct ScanError {
    pub kind: ScanErrorKind,
    /// Offending region of the source.
    pub span: Span,
    /// 1-based column of the offending word.
    pub column: usize,
    /// The partial word that was being scanned.
    pub word: String,
}

impl ScanErrorKind {
    fn describe(&self) -> &'static str {
        match self {
            ScanErrorKind::UnterminatedString => "unterminated quoted string",
            ScanErrorKind::UnknownWord => "unknown operator",
            ScanErrorKind::Unrecognized => "unrecognized input",
        }
    }
}

impl ScanError {
    pub fn new(kind: ScanErrorKind, span: Span, source: &str, word: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            column: span.column(source),
            word: word.into(),
        }
    }

    /// Format the error with a caret under the offending column.
    pub fn format_with_source(&self, source: &str) -> String {
        render_caret(source, self.span, &self.to_string())
    }
}

/// Error while reducing tokens to predicates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (token {offset})")]
pub struct ParseError {
    pub message: String,
    /// Source span of the offending token.
    pub span: Span,
    /// Index of the offending token in the token stream.
    pub offset: usize,
    /// Optional hint for fixing the filter.
    pub hint: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span, offset: usize) -> Self {
        Self {
            message: message.into(),
            span,
            offset,
            hint: None,
        }
    }

    /// Build the standard "expected X, found Y" error.
    pub fn unexpected(expected: &str, found: &str, span: Span, offset: usize) -> Self {
        Self::new(format!("expected {expected}, found {found}"), span, offset)
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Format the error with a caret under the offending token.
    pub fn format_with_source(&self, source: &str) -> String {
        let mut out = render_caret(source, self.span, &self.message);
        if let Some(hint) = &self.hint {
            out.push_str(&format!("   = hint: {hint}\n"));
        }
        out
    }
}

/// Any error raised while turning a filter string into predicates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LangError {
    #[error("scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
}

impl LangError {
    pub fn format_with_source(&self, source: &str) -> String {
        match self {
            LangError::Scan(e) => e.format_with_source(source),
            LangError::Parse(e) => e.format_with_source(source),
        }
    }

    pub fn span(&self) -> Span {
        match self {
            LangError::Scan(e) => e.span,
            LangError::Parse(e) => e.span,
        }
    }
}
