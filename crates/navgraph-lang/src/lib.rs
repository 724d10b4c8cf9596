//! navgraph filter language
//!
//! Tokenizer and parser for the OData-style filter strings accepted by the
//! navgraph query engine.
//!
//! # Syntax
//!
//! ```text
//! (LocationID gt 13000)
//! (LocationID gt 13000) and (LookupCountys/LookupNations/Nation eq 'Wales')
//! (substringof('ham',Description) eq true)
//! (startswith(Town,'Birm') eq true) and (Name eq 'O''Brien')
//! ```
//!
//! Property paths traverse navigation properties with `/`, which may arrive
//! percent-encoded as `%2F`. Predicates combine with `and` only.
//!
//! # Usage
//!
//! ```rust
//! use navgraph_lang::{parse_filter, Operator};
//!
//! let predicates = parse_filter("(LocationID gt 13000)").unwrap();
//! assert_eq!(predicates[0].operator, Operator::Gt);
//! ```

pub mod error;
pub mod lexer;
pub mod parser;
pub mod predicate;
pub mod span;

pub use error::{LangError, ParseError, ScanError, ScanErrorKind};
pub use lexer::{Binary, Command, ComparisonOp, SpannedToken, Token};
pub use predicate::{split_path, Operator, Predicate, PATH_SEPARATOR};
pub use span::Span;

/// Scan a filter string into tokens.
///
/// # Example
///
/// ```rust
/// use navgraph_lang::tokenize;
///
/// let tokens = tokenize("(Town eq 'Leeds')").unwrap();
/// assert_eq!(tokens.len(), 5);
/// ```
pub fn tokenize(source: &str) -> Result<Vec<SpannedToken>, ScanError> {
    lexer::tokenize(source)
}

/// Reduce scanned tokens to predicates.
pub fn parse(tokens: &[SpannedToken]) -> Result<Vec<Predicate>, ParseError> {
    parser::parse(tokens)
}

/// Tokenize and parse in one step.
pub fn parse_filter(source: &str) -> Result<Vec<Predicate>, LangError> {
    let tokens = tokenize(source)?;
    Ok(parse(&tokens)?)
}

/// Split a comma-separated select list into property paths.
///
/// Blank entries are dropped and `%2F` is decoded to `/`.
///
/// ```rust
/// use navgraph_lang::parse_select;
///
/// assert_eq!(
///     parse_select("Town, LookupCountys%2FCounty"),
///     vec!["Town".to_string(), "LookupCountys/County".to_string()]
/// );
/// ```
pub fn parse_select(source: &str) -> Vec<String> {
    source
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(lexer::decode_path)
        .collect()
}
