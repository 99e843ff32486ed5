//! The token definitions for the filter query language.

use serde::Serialize;
use thiserror::Error;

/// Represents a span in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    /// The starting byte offset.
    pub start: usize,
    /// The ending byte offset (exclusive).
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Moves both ends by `delta` bytes.
    pub fn shifted(self, delta: isize) -> Self {
        Self {
            start: self.start.saturating_add_signed(delta),
            end: self.end.saturating_add_signed(delta),
        }
    }
}

/// The grammatical role of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    ParenthesisOpen,
    ParenthesisClose,
    Field,
    /// A comparison operator.
    Condition,
    FieldValue,
    /// `and`, `or`, `not`
    Keyword,
    Whitespace,
}

impl Role {
    pub fn is_parenthesis(self) -> bool {
        matches!(self, Role::ParenthesisOpen | Role::ParenthesisClose)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::ParenthesisOpen => "PARENTHESIS_OPEN",
            Role::ParenthesisClose => "PARENTHESIS_CLOSE",
            Role::Field => "FIELD",
            Role::Condition => "CONDITION",
            Role::FieldValue => "FIELD_VALUE",
            Role::Keyword => "KEYWORD",
            Role::Whitespace => "WHITESPACE",
        }
    }
}

/// The value type a FIELD token resolved to against the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedType {
    String,
    Number,
    Unknown,
}

impl ResolvedType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResolvedType::String => "string",
            ResolvedType::Number => "number",
            ResolvedType::Unknown => "unknown",
        }
    }
}

/// Why a token is invalid. Every error is local to the token that carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize)]
pub enum TokenError {
    #[error("unknown field name")]
    UnknownField,
    #[error("expected a comparison operator (=, <, <=, >, >=)")]
    MalformedOperator,
    #[error("expected a number or a quoted string")]
    MalformedValue,
    #[error("unmatched opening parenthesis")]
    UnmatchedOpenParen,
    #[error("unmatched closing parenthesis")]
    UnmatchedCloseParen,
    #[error("expected `and` or `or`")]
    UnexpectedKeyword,
    #[error("unterminated string literal")]
    UnterminatedLiteral,
}

/// A classified unit of the query text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub role: Role,
    /// The exact source text, including the quotes of a literal.
    pub text: String,
    pub span: Span,
    /// `None` when the token is syntactically acceptable.
    pub error: Option<TokenError>,
    /// Only set on FIELD tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_type: Option<ResolvedType>,
}

impl Token {
    pub(crate) fn new(role: Role, text: &str, span: Span) -> Self {
        Self {
            role,
            text: text.to_string(),
            span,
            error: None,
            resolved_type: None,
        }
    }

    pub(crate) fn with_error(mut self, error: TokenError) -> Self {
        self.error = Some(error);
        self
    }

    pub(crate) fn with_type(mut self, resolved: ResolvedType) -> Self {
        self.resolved_type = Some(resolved);
        self
    }

    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

/// The classified tokens of a query together with the text they cover.
///
/// Spans are contiguous and non-overlapping and the token texts concatenate
/// to exactly `source`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TokenSequence {
    source: String,
    tokens: Vec<Token>,
}

impl TokenSequence {
    pub(crate) fn from_parts(source: String, tokens: Vec<Token>) -> Self {
        Self { source, tokens }
    }

    pub(crate) fn parts_mut(&mut self) -> (&mut String, &mut Vec<Token>) {
        (&mut self.source, &mut self.tokens)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.tokens.iter()
    }

    /// The token a caret at `offset` sits inside or at the end of.
    pub fn token_at_caret(&self, offset: usize) -> Option<(usize, &Token)> {
        let index = self.tokens.partition_point(|t| t.span.end < offset);
        self.tokens
            .get(index)
            .filter(|t| t.span.start < offset && offset <= t.span.end)
            .map(|t| (index, t))
    }

    /// Concatenates the token texts in order.
    pub fn render_text(&self) -> String {
        self.tokens.iter().map(|t| t.text.as_str()).collect()
    }

    /// Every invalid token together with its error.
    pub fn diagnostics(&self) -> impl Iterator<Item = (&Token, TokenError)> + '_ {
        self.tokens
            .iter()
            .filter_map(|t| t.error.map(|error| (t, error)))
    }
}

impl<'a> IntoIterator for &'a TokenSequence {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.tokens.iter()
    }
}
