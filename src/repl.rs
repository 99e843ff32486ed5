//! Terminal editing surface built on rustyline.
//!
//! The helper keeps a [`QueryDocument`] in step with the line being edited,
//! so every keystroke goes through the incremental path and the line is
//! repainted from the published token sequence.

use std::borrow::Cow;
use std::cell::RefCell;

use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Helper};

use hql_editor::{Classifier, QueryDocument, ResolvedType, Role, Token, TokenSequence};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

/// Colors per token verdict. `None` leaves the terminal's default color.
#[derive(Debug, Clone)]
pub struct Palette {
    pub parenthesis: Option<Rgb>,
    pub string_field: Rgb,
    pub number_field: Rgb,
    pub condition: Rgb,
    pub keyword: Rgb,
    pub value: Rgb,
    pub error: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            parenthesis: None,
            string_field: Rgb(0x21, 0x96, 0xF3),
            number_field: Rgb(0x67, 0x3A, 0xB7),
            condition: Rgb(0x79, 0x55, 0x48),
            keyword: Rgb(0xFF, 0x85, 0x00),
            value: Rgb(0x6B, 0xB3, 0x59),
            error: Rgb(0xD5, 0x00, 0x00),
        }
    }
}

impl Palette {
    pub fn color(&self, token: &Token) -> Option<Rgb> {
        if !token.is_valid() {
            return Some(self.error);
        }
        match token.role {
            Role::Whitespace => None,
            Role::ParenthesisOpen | Role::ParenthesisClose => self.parenthesis,
            Role::Field => match token.resolved_type {
                Some(ResolvedType::Number) => Some(self.number_field),
                _ => Some(self.string_field),
            },
            Role::Condition => Some(self.condition),
            Role::FieldValue => Some(self.value),
            Role::Keyword => Some(self.keyword),
        }
    }

    /// Renders the sequence with 24-bit ANSI colors.
    pub fn paint(&self, sequence: &TokenSequence) -> String {
        let mut out = String::with_capacity(sequence.source().len() * 2);
        for token in sequence {
            match self.color(token) {
                Some(Rgb(r, g, b)) => {
                    out.push_str(&format!("\x1b[38;2;{r};{g};{b}m{}\x1b[0m", token.text));
                }
                None => out.push_str(&token.text),
            }
        }
        out
    }
}

pub struct QueryHelper {
    document: RefCell<QueryDocument>,
    palette: Palette,
}

impl QueryHelper {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            document: RefCell::new(QueryDocument::new(classifier)),
            palette: Palette::default(),
        }
    }

    /// Brings the document to `line` and returns the published sequence.
    pub fn finish_line(&self, line: &str) -> TokenSequence {
        let mut document = self.document.borrow_mut();
        sync_document(&mut document, line);
        let sequence = document.sequence().clone();
        document.reset();
        sequence
    }

    fn sync(&self, line: &str) {
        sync_document(&mut self.document.borrow_mut(), line);
    }
}

/// Falls back to classifying the line from scratch if the edit is rejected.
fn sync_document(document: &mut QueryDocument, line: &str) {
    if let Err(e) = document.sync_text(line) {
        tracing::warn!(error = %e, "line edit rejected, reclassifying from scratch");
        document.reset();
        if let Err(e) = document.sync_text(line) {
            tracing::error!(error = %e, "cannot classify line");
        }
    }
}

impl Completer for QueryHelper {
    type Candidate = Pair;

    fn complete(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> rustyline::Result<(usize, Vec<Pair>)> {
        self.sync(line);
        let document = self.document.borrow();
        let Some((index, fields)) = document.suggestions_at(pos) else {
            return Ok((pos, Vec::new()));
        };
        let start = document.sequence().tokens()[index].span.start;
        let candidates = fields
            .into_iter()
            .map(|field| Pair {
                display: match &field.description {
                    Some(description) => format!("{}  ({description})", field.name),
                    None => field.name.clone(),
                },
                replacement: field.name.clone(),
            })
            .collect();
        Ok((start, candidates))
    }
}

impl Hinter for QueryHelper {
    type Hint = String;

    /// The missing tail of the field name when only one field extends it.
    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        self.sync(line);
        let document = self.document.borrow();
        let (index, fields) = document.suggestions_at(pos)?;
        let typed = &document.sequence().tokens()[index].text;
        match fields.as_slice() {
            [only] => only.name.strip_prefix(typed.as_str()).map(str::to_string),
            _ => None,
        }
    }
}

impl Highlighter for QueryHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        self.sync(line);
        Cow::Owned(self.palette.paint(self.document.borrow().sequence()))
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[2m{hint}\x1b[0m"))
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Validator for QueryHelper {}

impl Helper for QueryHelper {}
