//! Lexer for the filter query language.
//!
//! The lexer only knows about the shape of the text: it never looks at the
//! grammar context, so scanning can resume at any earlier span boundary and
//! produce exactly the spans a scan from the start would have produced.

use crate::token::Span;

/// The shape of a raw span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKind {
    Whitespace,
    OpenParen,
    CloseParen,
    /// `=`, `<`, `<=`, `>`, `>=`
    Operator,
    /// A double-quoted literal, `terminated` is false when it runs to the end of input.
    Quoted { terminated: bool },
    /// Field names, keywords, numbers and any other run of ordinary characters.
    Word,
}

/// A span of source text produced by the lexer, not yet classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawSpan<'a> {
    pub kind: RawKind,
    pub text: &'a str,
    pub span: Span,
}

/// Space characters. U+00A0 is what rich-text surfaces insert for typed spaces.
pub(crate) fn is_space(c: char) -> bool {
    c == ' ' || c == '\u{a0}'
}

/// Characters that end a bareword.
fn is_delimiter(c: char) -> bool {
    is_space(c) || matches!(c, '(' | ')' | '<' | '=' | '>')
}

pub struct Lexer<'a> {
    input: &'a str,
    /// Current byte offset in the input.
    position: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Lexer { input, position: 0 }
    }

    /// Resumes scanning at `offset`, which must be a span boundary.
    pub(crate) fn starting_at(input: &'a str, offset: usize) -> Self {
        debug_assert!(input.is_char_boundary(offset));
        Lexer {
            input,
            position: offset,
        }
    }

    /// Returns the character at the current position without advancing.
    fn peek(&self) -> Option<char> {
        self.input[self.position..].chars().next()
    }

    /// Advances one character and returns it.
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if let Some(c) = c {
            self.position += c.len_utf8();
        }
        c
    }

    fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if predicate(c) {
                self.bump();
            } else {
                break;
            }
        }
    }

    /// Reads the rest of a double-quoted literal.
    /// The opening quote has already been consumed by the caller.
    fn read_string(&mut self) -> RawKind {
        while let Some(c) = self.bump() {
            if c == '"' {
                return RawKind::Quoted { terminated: true };
            }
        }
        RawKind::Quoted { terminated: false }
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = RawSpan<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let start = self.position;
        let c = self.bump()?;

        let kind = match c {
            c if is_space(c) => {
                self.eat_while(is_space);
                RawKind::Whitespace
            }
            '(' => RawKind::OpenParen,
            ')' => RawKind::CloseParen,
            '=' => RawKind::Operator,
            '<' | '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                }
                RawKind::Operator
            }
            '"' => self.read_string(),
            _ => {
                self.eat_while(|c| !is_delimiter(c));
                RawKind::Word
            }
        };

        Some(RawSpan {
            kind,
            text: &self.input[start..self.position],
            span: Span::new(start, self.position),
        })
    }
}

/// Splits `text` into raw spans covering it without gaps.
pub fn lex(text: &str) -> Vec<RawSpan<'_>> {
    Lexer::new(text).collect()
}
