//! Context classifier for the filter query language.
//!
//! ## Grammar
//!
//! ```text
//! query   := "not"? clause (("and" | "or") clause)*
//! clause  := field COND value | "(" query ")"
//! COND    := "=" | "<" | "<=" | ">" | ">="
//! value   := number | "quoted string"
//! ```
//!
//! No tree is built. Each span is classified from its own text and the role of
//! the previous non-whitespace token, following this table:
//!
//! ```text
//! previous role              this span becomes
//! -------------------------  ------------------------------------------
//! start / "(" / KEYWORD      FIELD (registered name) or KEYWORD "not"
//! FIELD                      CONDITION
//! CONDITION                  FIELD_VALUE
//! FIELD_VALUE / ")"          KEYWORD "and" | "or"
//! ```
//!
//! Parentheses bypass the table. Their validity is the only global verdict and
//! is settled afterwards by [`balance_parentheses`].

use std::sync::Arc;

use crate::lexer::{Lexer, RawKind, RawSpan};
use crate::registry::FieldRegistry;
use crate::token::{ResolvedType, Role, Token, TokenError, TokenSequence};

/// Classifies query text against a field registry.
#[derive(Debug, Clone)]
pub struct Classifier {
    registry: Arc<FieldRegistry>,
}

impl Classifier {
    pub fn new(registry: Arc<FieldRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub(crate) fn shared_registry(&self) -> Arc<FieldRegistry> {
        Arc::clone(&self.registry)
    }

    /// Tokenizes and classifies the whole text.
    pub fn classify(&self, text: &str) -> TokenSequence {
        let mut previous = None;
        let mut tokens: Vec<Token> = Lexer::new(text)
            .map(|raw| {
                let token = self.classify_span(previous, &raw);
                advance(&mut previous, &token);
                token
            })
            .collect();

        let balance = balance_parentheses(&mut tokens);
        tracing::debug!(
            tokens = tokens.len(),
            unmatched_open = balance.unmatched_open.len(),
            unmatched_close = balance.unmatched_close,
            "classified query"
        );
        TokenSequence::from_parts(text.to_string(), tokens)
    }

    /// Classifies one raw span given the role of the previous non-whitespace token.
    ///
    /// Parentheses come out valid here; their verdict is decided by
    /// [`balance_parentheses`] once the whole sequence is known.
    pub(crate) fn classify_span(&self, previous: Option<Role>, raw: &RawSpan<'_>) -> Token {
        match raw.kind {
            RawKind::Whitespace => Token::new(Role::Whitespace, raw.text, raw.span),
            RawKind::OpenParen => Token::new(Role::ParenthesisOpen, raw.text, raw.span),
            RawKind::CloseParen => Token::new(Role::ParenthesisClose, raw.text, raw.span),
            _ => match previous {
                None | Some(Role::ParenthesisOpen | Role::Keyword | Role::Whitespace) => {
                    self.field_or_negation(previous, raw)
                }
                Some(Role::Field) => condition(raw),
                Some(Role::Condition) => field_value(raw),
                Some(Role::FieldValue | Role::ParenthesisClose) => conjunction(raw),
            },
        }
    }

    fn field_or_negation(&self, previous: Option<Role>, raw: &RawSpan<'_>) -> Token {
        if let Some(field) = self.registry.get(raw.text) {
            return Token::new(Role::Field, raw.text, raw.span).with_type(field.value_type.into());
        }
        // `not` only opens a clause, it never follows another keyword.
        if raw.text == "not" && previous != Some(Role::Keyword) {
            return Token::new(Role::Keyword, raw.text, raw.span);
        }
        Token::new(Role::Field, raw.text, raw.span)
            .with_type(ResolvedType::Unknown)
            .with_error(TokenError::UnknownField)
    }
}

fn condition(raw: &RawSpan<'_>) -> Token {
    let token = Token::new(Role::Condition, raw.text, raw.span);
    if raw.kind == RawKind::Operator && is_comparison_operator(raw.text) {
        token
    } else {
        token.with_error(TokenError::MalformedOperator)
    }
}

fn field_value(raw: &RawSpan<'_>) -> Token {
    let token = Token::new(Role::FieldValue, raw.text, raw.span);
    match raw.kind {
        RawKind::Quoted { terminated: true } => token,
        RawKind::Quoted { terminated: false } => token.with_error(TokenError::UnterminatedLiteral),
        RawKind::Word if is_number(raw.text) => token,
        _ => token.with_error(TokenError::MalformedValue),
    }
}

fn conjunction(raw: &RawSpan<'_>) -> Token {
    let token = Token::new(Role::Keyword, raw.text, raw.span);
    if matches!(raw.text, "and" | "or") {
        token
    } else {
        token.with_error(TokenError::UnexpectedKeyword)
    }
}

fn is_comparison_operator(text: &str) -> bool {
    matches!(text, "=" | "<" | "<=" | ">" | ">=")
}

/// `digits` or `digits.digits?`
fn is_number(text: &str) -> bool {
    let (integer, fraction) = text.split_once('.').unwrap_or((text, ""));
    !integer.is_empty()
        && integer.bytes().all(|b| b.is_ascii_digit())
        && fraction.bytes().all(|b| b.is_ascii_digit())
}

/// Updates the single-slot lookback state after emitting `token`.
pub(crate) fn advance(previous: &mut Option<Role>, token: &Token) {
    if token.role != Role::Whitespace {
        *previous = Some(token.role);
    }
}

/// The lookback state in effect just before `tokens[index]`.
pub(crate) fn lookback(tokens: &[Token], index: usize) -> Option<Role> {
    tokens[..index]
        .iter()
        .rev()
        .map(|t| t.role)
        .find(|&role| role != Role::Whitespace)
}

/// Outcome of matching parentheses over a sequence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParenBalance {
    /// Indices of `(` tokens left open at end of input.
    pub unmatched_open: Vec<usize>,
    /// Number of `)` tokens met while nothing was open.
    pub unmatched_close: usize,
}

/// Sets the verdict of every parenthesis token from a left-to-right match.
pub fn balance_parentheses(tokens: &mut [Token]) -> ParenBalance {
    let mut balance = ParenBalance::default();
    for (index, token) in tokens.iter_mut().enumerate() {
        match token.role {
            Role::ParenthesisOpen => {
                token.error = None;
                balance.unmatched_open.push(index);
            }
            Role::ParenthesisClose => {
                if balance.unmatched_open.pop().is_some() {
                    token.error = None;
                } else {
                    token.error = Some(TokenError::UnmatchedCloseParen);
                    balance.unmatched_close += 1;
                }
            }
            _ => {}
        }
    }
    for &index in &balance.unmatched_open {
        tokens[index].error = Some(TokenError::UnmatchedOpenParen);
    }
    balance
}
