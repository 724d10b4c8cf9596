//! Parser reducing filter tokens to a flat list of predicates.
//!
//! The grammar is deliberately small: predicates are concatenated with `and`,
//! each wrapped in optional redundant brackets. There is no precedence and no
//! `or`.

use crate::error::ParseError;
use crate::lexer::{Binary, SpannedToken, Token};
use crate::predicate::{Operator, Predicate};
use crate::span::Span;

/// Parser over a scanned token stream.
pub struct Parser<'a> {
    tokens: &'a [SpannedToken],
    pos: usize,
    /// Unclosed `(` as (span, token offset), innermost last.
    open: Vec<(Span, usize)>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [SpannedToken]) -> Self {
        Self {
            tokens,
            pos: 0,
            open: Vec::new(),
        }
    }

    /// Parse every predicate in the stream, preserving source order.
    pub fn parse_predicates(&mut self) -> Result<Vec<Predicate>, ParseError> {
        let mut predicates = Vec::new();

        while let Some(tok) = self.peek() {
            match &tok.token {
                Token::String(_) | Token::Command(_) => {
                    predicates.push(self.parse_predicate()?);
                }
                Token::OpenBracket => {
                    self.open.push((tok.span, self.pos));
                    self.pos += 1;
                    match self.peek().map(|t| &t.token) {
                        Some(Token::OpenBracket | Token::String(_) | Token::Command(_)) => {}
                        _ => {
                            let (found, span) = self.describe_next();
                            return Err(ParseError::unexpected(
                                "predicate after '('",
                                &found,
                                span,
                                self.pos,
                            ));
                        }
                    }
                }
                Token::CloseBracket => {
                    if self.open.pop().is_none() {
                        return Err(ParseError::new("unmatched ')'", tok.span, self.pos));
                    }
                    self.pos += 1;
                }
                Token::Binary(Binary::And) => {
                    self.pos += 1;
                }
                Token::Binary(Binary::Or) => {
                    return Err(
                        ParseError::new("'or' is not supported", tok.span, self.pos)
                            .with_hint("predicates can only be combined with 'and'"),
                    );
                }
                other => {
                    return Err(ParseError::unexpected(
                        "predicate",
                        &other.to_string(),
                        tok.span,
                        self.pos,
                    ));
                }
            }
        }

        if let Some((span, offset)) = self.open.pop() {
            return Err(ParseError::new("unclosed '('", span, offset)
                .with_hint("every '(' needs a matching ')'"));
        }
        Ok(predicates)
    }

    fn parse_predicate(&mut self) -> Result<Predicate, ParseError> {
        let tok = self.next_token()?;
        match tok.token {
            Token::String(property) => self.parse_property_predicate(property),
            Token::Command(cmd) => self.parse_command_predicate(cmd.into()),
            other => Err(ParseError::unexpected(
                "property or command",
                &other.to_string(),
                tok.span,
                self.pos - 1,
            )),
        }
    }

    /// `STRING OPERATOR (STRING | QUOTED_STRING) [)]`
    fn parse_property_predicate(&mut self, property: String) -> Result<Predicate, ParseError> {
        let tok = self.next_token()?;
        let operator = match tok.token {
            Token::Operator(op) => Operator::from(op),
            other => {
                return Err(ParseError::unexpected(
                    "comparison operator",
                    &other.to_string(),
                    tok.span,
                    self.pos - 1,
                ))
            }
        };

        let tok = self.next_token()?;
        let value = match tok.token {
            Token::String(v) | Token::QuotedString(v) => v,
            other => {
                return Err(ParseError::unexpected(
                    "value",
                    &other.to_string(),
                    tok.span,
                    self.pos - 1,
                ))
            }
        };

        self.skip_close();
        Ok(Predicate::new(property, operator, value))
    }

    /// `COMMAND ( arg , arg ) OPERATOR BOOL [)]`
    ///
    /// The STRING argument is the property and the QUOTED_STRING argument the
    /// literal, whatever their positions.
    fn parse_command_predicate(&mut self, operator: Operator) -> Result<Predicate, ParseError> {
        self.expect(Token::OpenBracket, "'('")?;
        let first = self.next_token()?;
        self.expect(Token::Comma, "','")?;
        let second = self.next_token()?;
        self.expect(Token::CloseBracket, "')'")?;

        let (property, value) = match (first.token, second.token) {
            (Token::String(p), Token::QuotedString(v)) | (Token::QuotedString(v), Token::String(p)) => {
                (p, v)
            }
            (a, b) => {
                return Err(ParseError::new(
                    format!(
                        "{operator} expects a property and a quoted literal, found {a} and {b}"
                    ),
                    first.span.merge(second.span),
                    self.pos - 4,
                ))
            }
        };

        let tok = self.next_token()?;
        if !matches!(tok.token, Token::Operator(_)) {
            return Err(ParseError::unexpected(
                "comparison operator",
                &tok.token.to_string(),
                tok.span,
                self.pos - 1,
            ));
        }
        let tok = self.next_token()?;
        if !matches!(tok.token, Token::Bool(_)) {
            return Err(ParseError::unexpected(
                "boolean",
                &tok.token.to_string(),
                tok.span,
                self.pos - 1,
            ));
        }

        self.skip_close();
        Ok(Predicate::new(property, operator, value))
    }

    /// Consume the `)` closing the predicate's own bracket, if any is open.
    fn skip_close(&mut self) {
        if !self.open.is_empty()
            && matches!(self.peek().map(|t| &t.token), Some(Token::CloseBracket))
        {
            self.open.pop();
            self.pos += 1;
        }
    }

    fn expect(&mut self, expected: Token, label: &str) -> Result<SpannedToken, ParseError> {
        let tok = self.next_token()?;
        if std::mem::discriminant(&tok.token) == std::mem::discriminant(&expected) {
            Ok(tok)
        } else {
            Err(ParseError::unexpected(
                label,
                &tok.token.to_string(),
                tok.span,
                self.pos - 1,
            ))
        }
    }

    fn peek(&self) -> Option<&'a SpannedToken> {
        self.tokens.get(self.pos)
    }

    fn next_token(&mut self) -> Result<SpannedToken, ParseError> {
        match self.tokens.get(self.pos) {
            Some(tok) => {
                self.pos += 1;
                Ok(tok.clone())
            }
            None => Err(ParseError::new(
                "unexpected end of input",
                self.end_span(),
                self.pos,
            )),
        }
    }

    fn describe_next(&self) -> (String, Span) {
        match self.peek() {
            Some(tok) => (tok.token.to_string(), tok.span),
            None => ("end of input".to_string(), self.end_span()),
        }
    }

    fn end_span(&self) -> Span {
        Span::at(self.tokens.last().map(|t| t.span.end).unwrap_or(0))
    }
}

/// Parse a token stream into predicates.
pub fn parse(tokens: &[SpannedToken]) -> Result<Vec<Predicate>, ParseError> {
    Parser::new(tokens).parse_predicates()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn parse_str(source: &str) -> Result<Vec<Predicate>, ParseError> {
        parse(&tokenize(source).unwrap())
    }

    #[test]
    fn test_parse_two_predicates() {
        let predicates = parse_str(
            "(LocationID gt 13000) and (LookupCountys%2FLookupNations%2FNation eq 'Wales')",
        )
        .unwrap();
        assert_eq!(
            predicates,
            vec![
                Predicate::new("LocationID", Operator::Gt, "13000"),
                Predicate::new("LookupCountys/LookupNations/Nation", Operator::Eq, "Wales"),
            ]
        );
    }

    #[test]
    fn test_parse_escaped_quote_literal() {
        let predicates = parse_str("(Name eq 'O''Brien''s')").unwrap();
        assert_eq!(predicates[0].value, "O'Brien's");
    }

    #[test]
    fn test_parse_substringof_normalizes_arguments() {
        let predicates = parse_str("substringof('ham',Description) eq true").unwrap();
        assert_eq!(
            predicates,
            vec![Predicate::new("Description", Operator::SubstringOf, "ham")]
        );
    }

    #[test]
    fn test_parse_startswith_in_brackets() {
        let predicates =
            parse_str("(startswith(Town,'Birm') eq true) and (LocationID le 10)").unwrap();
        assert_eq!(
            predicates,
            vec![
                Predicate::new("Town", Operator::StartsWith, "Birm"),
                Predicate::new("LocationID", Operator::Le, "10"),
            ]
        );
    }

    #[test]
    fn test_parse_redundant_brackets() {
        let predicates = parse_str("((LocationID gt 13000) and (Town ne 'Leeds'))").unwrap();
        assert_eq!(predicates.len(), 2);
        assert_eq!(predicates[1], Predicate::new("Town", Operator::Ne, "Leeds"));
    }

    #[test]
    fn test_parse_unclosed_bracket() {
        let err = parse_str("((A eq 1").unwrap_err();
        assert_eq!(err.message, "unclosed '('");
        assert_eq!(err.offset, 1);
        assert!(err.hint.is_some());

        let err = parse_str("((A eq 1) and (B eq 2)").unwrap_err();
        assert_eq!(err.message, "unclosed '('");
    }

    #[test]
    fn test_parse_unmatched_close_bracket() {
        let err = parse_str("A eq 1)))").unwrap_err();
        assert_eq!(err.message, "unmatched ')'");
        assert_eq!(err.offset, 3);

        let err = parse_str("(A eq 1)) and (B eq 2)").unwrap_err();
        assert_eq!(err.message, "unmatched ')'");
        assert_eq!(err.offset, 5);
    }

    #[test]
    fn test_parse_without_brackets() {
        let predicates = parse_str("LocationID ge 5").unwrap();
        assert_eq!(predicates, vec![Predicate::new("LocationID", Operator::Ge, "5")]);
    }

    #[test]
    fn test_parse_empty_filter() {
        assert!(parse_str("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_or() {
        let err = parse_str("(A eq 1) or (B eq 2)").unwrap_err();
        assert!(err.message.contains("'or'"));
        assert_eq!(err.offset, 5);
        assert!(err.hint.is_some());
    }

    #[test]
    fn test_parse_missing_value() {
        let err = parse_str("(LocationID gt )").unwrap_err();
        assert_eq!(err.message, "expected value, found ')'");
        assert_eq!(err.offset, 3);
    }

    #[test]
    fn test_parse_command_needs_literal() {
        let err = parse_str("endswith(Town,Postcode) eq true").unwrap_err();
        assert!(err.message.contains("quoted literal"));
    }

    #[test]
    fn test_parse_command_needs_bool() {
        let err = parse_str("endswith(Town,'ham') eq 'yes'").unwrap_err();
        assert!(err.message.starts_with("expected boolean"));
    }

    #[test]
    fn test_parse_unexpected_end() {
        let err = parse_str("(LocationID").unwrap_err();
        assert_eq!(err.message, "unexpected end of input");
    }

    #[test]
    fn test_parse_empty_brackets() {
        let err = parse_str("()").unwrap_err();
        assert!(err.message.starts_with("expected predicate after '('"));
    }
}
