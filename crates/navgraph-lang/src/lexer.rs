//! Tokenizer for the filter language using logos.
//!
//! Scanning rules are positional rather than keyword-based: a leading space
//! introduces a word that must be an operator or a binary combinator, a `'`
//! opens a quoted literal, and anything else is a bare word.

use crate::error::{ScanError, ScanErrorKind};
use crate::span::Span;
use logos::Logos;
use std::fmt;

/// Comparison operators usable between a property and a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOp {
    Eq,
    Gt,
    Ge,
    Lt,
    Le,
    Ne,
}

impl ComparisonOp {
    const WORDS: [(&'static str, ComparisonOp); 6] = [
        ("eq", ComparisonOp::Eq),
        ("gt", ComparisonOp::Gt),
        ("ge", ComparisonOp::Ge),
        ("lt", ComparisonOp::Lt),
        ("le", ComparisonOp::Le),
        ("ne", ComparisonOp::Ne),
    ];

    pub fn from_word(word: &str) -> Option<Self> {
        Self::WORDS
            .iter()
            .find(|(w, _)| *w == word)
            .map(|(_, op)| *op)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "eq",
            ComparisonOp::Gt => "gt",
            ComparisonOp::Ge => "ge",
            ComparisonOp::Lt => "lt",
            ComparisonOp::Le => "le",
            ComparisonOp::Ne => "ne",
        }
    }
}

/// Combinators between predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binary {
    And,
    Or,
}

impl Binary {
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "and" => Some(Binary::And),
            "or" => Some(Binary::Or),
            _ => None,
        }
    }
}

/// String commands of the form `command(arg, arg) eq true`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    SubstringOf,
    StartsWith,
    EndsWith,
}

impl Command {
    pub fn from_word(word: &str) -> Option<Self> {
        match word {
            "substringof" => Some(Command::SubstringOf),
            "startswith" => Some(Command::StartsWith),
            "endswith" => Some(Command::EndsWith),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Command::SubstringOf => "substringof",
            Command::StartsWith => "startswith",
            Command::EndsWith => "endswith",
        }
    }
}

/// A classified filter token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    OpenBracket,
    CloseBracket,
    Comma,
    Operator(ComparisonOp),
    Binary(Binary),
    Command(Command),
    Bool(bool),
    /// A `'`-quoted literal with `''` already collapsed to `'`.
    QuotedString(String),
    /// A bare word: a property path or an unquoted value.
    String(String),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::OpenBracket => f.write_str("'('"),
            Token::CloseBracket => f.write_str("')'"),
            Token::Comma => f.write_str("','"),
            Token::Operator(op) => write!(f, "operator '{}'", op.as_str()),
            Token::Binary(Binary::And) => f.write_str("'and'"),
            Token::Binary(Binary::Or) => f.write_str("'or'"),
            Token::Command(cmd) => write!(f, "command '{}'", cmd.as_str()),
            Token::Bool(b) => write!(f, "boolean '{b}'"),
            Token::QuotedString(s) => write!(f, "quoted string '{s}'"),
            Token::String(s) => write!(f, "word '{s}'"),
        }
    }
}

/// Lexer-level failure carried out of logos callbacks.
#[derive(Debug, Clone, PartialEq, Default)]
enum LexError {
    #[default]
    Unrecognized,
    UnknownWord(String),
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(error = LexError)]
enum RawToken {
    #[token("(")]
    Open,

    #[token(")")]
    Close,

    #[token(",")]
    Comma,

    // The surrounding spaces belong to the word.
    #[regex(r" [^ ]* ", spaced_word)]
    Spaced(Token),

    #[regex(r"'([^']|'')*'", quoted_string)]
    Quoted(String),

    #[regex(r"[^() ,'][^() ,]*", bare_word)]
    Bare(Token),
}

fn spaced_word(lex: &mut logos::Lexer<RawToken>) -> Result<Token, LexError> {
    let word = lex.slice().trim();
    if let Some(op) = ComparisonOp::from_word(word) {
        return Ok(Token::Operator(op));
    }
    if let Some(binary) = Binary::from_word(word) {
        return Ok(Token::Binary(binary));
    }
    Err(LexError::UnknownWord(word.to_string()))
}

fn quoted_string(lex: &mut logos::Lexer<RawToken>) -> String {
    let s = lex.slice();
    s[1..s.len() - 1].replace("''", "'")
}

fn bare_word(lex: &mut logos::Lexer<RawToken>) -> Token {
    let word = lex.slice().trim();
    if let Some(cmd) = Command::from_word(word) {
        return Token::Command(cmd);
    }
    match word {
        "true" => Token::Bool(true),
        "false" => Token::Bool(false),
        _ => Token::String(decode_path(word)),
    }
}

/// Recover `/` separators that arrived percent-encoded.
pub fn decode_path(word: &str) -> String {
    word.replace("%2F", "/").replace("%2f", "/")
}

/// A token with its span in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Tokenize a filter string.
///
/// Leading and trailing whitespace is ignored; the first scan failure aborts.
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, ScanError> {
    let trimmed = source.trim_end();
    let start = trimmed.len() - trimmed.trim_start().len();
    let mut lexer = RawToken::lexer(&trimmed[start..]);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let local = lexer.span();
        let span = Span::new(local.start + start, local.end + start);

        let token = match result {
            Ok(RawToken::Open) => Token::OpenBracket,
            Ok(RawToken::Close) => Token::CloseBracket,
            Ok(RawToken::Comma) => Token::Comma,
            Ok(RawToken::Spaced(token)) | Ok(RawToken::Bare(token)) => token,
            Ok(RawToken::Quoted(value)) => Token::QuotedString(value),
            Err(LexError::UnknownWord(word)) => {
                return Err(ScanError::new(ScanErrorKind::UnknownWord, span, source, word));
            }
            Err(LexError::Unrecognized) => {
                return Err(unrecognized(source, span.start));
            }
        };

        tokens.push(SpannedToken { token, span });
    }

    Ok(tokens)
}

/// Classify a position logos could not match: the rest of the input from there
/// is the partial word.
fn unrecognized(source: &str, offset: usize) -> ScanError {
    let rest = source[offset..].trim_end();
    let span = Span::new(offset, offset + rest.len());

    if rest.starts_with('\'') {
        ScanError::new(ScanErrorKind::UnterminatedString, span, source, rest)
    } else if rest.starts_with(' ') {
        ScanError::new(ScanErrorKind::UnknownWord, span, source, rest.trim())
    } else {
        ScanError::new(ScanErrorKind::Unrecognized, span, source, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.token)
            .collect()
    }

    #[test]
    fn test_property_predicate() {
        assert_eq!(
            kinds("(LocationID gt 13000)"),
            vec![
                Token::OpenBracket,
                Token::String("LocationID".to_string()),
                Token::Operator(ComparisonOp::Gt),
                Token::String("13000".to_string()),
                Token::CloseBracket,
            ]
        );
    }

    #[test]
    fn test_encoded_path_and_binary() {
        let tokens = kinds("(A eq 1) and (LookupCountys%2FLookupNations%2FNation eq 'Wales')");
        assert_eq!(tokens[5], Token::Binary(Binary::And));
        assert_eq!(
            tokens[7],
            Token::String("LookupCountys/LookupNations/Nation".to_string())
        );
        assert_eq!(tokens[9], Token::QuotedString("Wales".to_string()));
    }

    #[test]
    fn test_escaped_quote() {
        assert_eq!(
            kinds("(Name eq 'O''Brien')")[3],
            Token::QuotedString("O'Brien".to_string())
        );
        assert_eq!(kinds("'it'''")[0], Token::QuotedString("it'".to_string()));
    }

    #[test]
    fn test_command_tokens() {
        assert_eq!(
            kinds("substringof('ham',Description) eq true"),
            vec![
                Token::Command(Command::SubstringOf),
                Token::OpenBracket,
                Token::QuotedString("ham".to_string()),
                Token::Comma,
                Token::String("Description".to_string()),
                Token::CloseBracket,
                Token::Operator(ComparisonOp::Eq),
                Token::Bool(true),
            ]
        );
    }

    #[test]
    fn test_spans_track_source() {
        let tokens = tokenize("  (Name eq 'x')").unwrap();
        assert_eq!(tokens[0].span, Span::new(2, 3));
        assert_eq!(tokens[2].span, Span::new(7, 11));
    }

    #[test]
    fn test_unterminated_string() {
        let err = tokenize("(Name eq 'abc)").unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::UnterminatedString);
        assert_eq!(err.word, "'abc)");
        assert_eq!(err.column, 10);
    }

    #[test]
    fn test_unknown_operator_word() {
        let err = tokenize("(Name like 'abc')").unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::UnknownWord);
        assert_eq!(err.word, "like");
        assert_eq!(err.column, 6);
    }

    #[test]
    fn test_dangling_operator_at_end() {
        let err = tokenize("(Name eq").unwrap_err();
        assert_eq!(err.kind, ScanErrorKind::UnknownWord);
        assert_eq!(err.word, "eq");
    }
}
