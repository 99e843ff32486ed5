//! Incremental re-tokenization after a single text edit.
//!
//! Only the run of tokens an edit can influence is lexed and classified again:
//!
//! ```text
//!   old:  [t0][t1][t2][t3][t4][t5][t6]
//!                   ^^^^^^ edit
//!              |restart            |resync
//!   new:  [t0][n1][n2][n3]    [t5'][t6']   (t5', t6' = t5, t6 shifted)
//! ```
//!
//! * `restart` is the start of the token before the first token whose end
//!   reaches the edit. The lexer looks one character past a span, so a token
//!   ending exactly at the edit may change, and the one before it provides the
//!   lookback role for the run.
//! * `resync` is the first new span end, at or after the edit, that lands on
//!   the start of an old token whose lookback role is unchanged. Everything
//!   from there on is identical up to a shift. Without such a point the scan
//!   runs to the end of input.
//!
//! The result always equals a full [`Classifier::classify`] of the new text.

use std::ops::Range;

use thiserror::Error;

use crate::classifier::{advance, balance_parentheses, lookback, Classifier};
use crate::lexer::Lexer;
use crate::token::{Span, TokenSequence};

/// Replacement of `range` in the current text by `replacement`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub range: Span,
    pub replacement: String,
}

impl Edit {
    pub fn insert(offset: usize, text: impl Into<String>) -> Self {
        Self::replace(Span::new(offset, offset), text)
    }

    pub fn delete(range: Span) -> Self {
        Self::replace(range, String::new())
    }

    pub fn replace(range: Span, text: impl Into<String>) -> Self {
        Self {
            range,
            replacement: text.into(),
        }
    }

    /// Checks that the edit can be applied to `source`.
    pub fn check(&self, source: &str) -> Result<(), EditError> {
        let Span { start, end } = self.range;
        if start > end || end > source.len() {
            return Err(EditError::RangeOutOfBounds {
                start,
                end,
                len: source.len(),
            });
        }
        for offset in [start, end] {
            if !source.is_char_boundary(offset) {
                return Err(EditError::NotCharBoundary(offset));
            }
        }
        Ok(())
    }

    /// Byte length change caused by the edit.
    pub fn delta(&self) -> isize {
        self.replacement.len() as isize - self.range.len() as isize
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("edit range {start}..{end} is outside the text (length {len})")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },
    #[error("offset {0} is not on a character boundary")]
    NotCharBoundary(usize),
    #[error("no token at index {0}")]
    TokenOutOfRange(usize),
    #[error("token at index {0} is not a field")]
    NotAFieldToken(usize),
}

/// What changed in a sequence after [`Classifier::reclassify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reclassified {
    /// Text span covered by the freshly classified tokens, in new offsets.
    pub affected: Span,
    /// Indices of the freshly classified tokens in the updated sequence.
    pub replaced: Range<usize>,
    /// Whether parenthesis verdicts were recomputed across the whole sequence.
    pub rebalanced: bool,
}

impl Classifier {
    /// Applies `edit` to `sequence` in place, re-classifying only the affected run.
    ///
    /// The edit is validated before anything is touched. Tokens outside the
    /// affected run keep their position in the vector; only their spans move.
    pub fn reclassify(&self, sequence: &mut TokenSequence, edit: &Edit) -> Result<Reclassified, EditError> {
        edit.check(sequence.source())?;

        let (source, tokens) = sequence.parts_mut();
        let range = edit.range;
        let delta = edit.delta();
        source.replace_range(range.start..range.end, &edit.replacement);
        let edit_end = range.start + edit.replacement.len();

        // First token whose one-character lookahead reaches the edit, then one more for lookback.
        let touched = tokens.partition_point(|t| t.span.end < range.start);
        let first = touched.saturating_sub(1);
        let restart = tokens.get(first).map_or(0, |t| t.span.start);
        let mut previous = lookback(tokens, first);

        let mut fresh = Vec::new();
        let mut resume = tokens.len();
        let mut cursor = first;
        for raw in Lexer::starting_at(source.as_str(), restart) {
            let token = self.classify_span(previous, &raw);
            advance(&mut previous, &token);
            fresh.push(token);

            let end = raw.span.end;
            if end < edit_end {
                continue;
            }
            let old_end = end.saturating_add_signed(-delta);
            while cursor < tokens.len() && tokens[cursor].span.start < old_end {
                cursor += 1;
            }
            if cursor < tokens.len()
                && tokens[cursor].span.start == old_end
                && lookback(tokens, cursor) == previous
            {
                resume = cursor;
                break;
            }
        }

        if resume == tokens.len() {
            tracing::debug!(restart, "no resync point before end of input");
        }

        let rebalanced = tokens[first..resume]
            .iter()
            .chain(&fresh)
            .any(|t| t.role.is_parenthesis());
        let inserted = fresh.len();
        let affected = Span::new(restart, fresh.last().map_or(restart, |t| t.span.end));
        tokens.splice(first..resume, fresh);
        for token in &mut tokens[first + inserted..] {
            token.span = token.span.shifted(delta);
        }
        if rebalanced {
            balance_parentheses(tokens);
        }

        tracing::debug!(
            removed = resume - first,
            inserted,
            affected_start = affected.start,
            affected_end = affected.end,
            rebalanced,
            "reclassified edit"
        );

        Ok(Reclassified {
            affected,
            replaced: first..first + inserted,
            rebalanced,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FieldRegistry;
    use crate::token::{Role, TokenError};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn classifier() -> Classifier {
        Classifier::new(Arc::new(FieldRegistry::default()))
    }

    /// Applies `edit` incrementally and checks it against a full classification.
    fn check_edit(text: &str, edit: Edit) -> (TokenSequence, Reclassified) {
        let classifier = classifier();
        let mut sequence = classifier.classify(text);
        let outcome = classifier.reclassify(&mut sequence, &edit).unwrap();

        let mut expected_text = text.to_string();
        expected_text.replace_range(edit.range.start..edit.range.end, &edit.replacement);
        assert_eq!(sequence, classifier.classify(&expected_text), "edit {edit:?} on {text:?}");
        (sequence, outcome)
    }

    #[test]
    fn test_insert_space_touches_only_the_boundary() {
        let (sequence, outcome) = check_edit("src_ip=1 and dst_port>=80", Edit::insert(6, " "));
        assert_eq!(sequence.source(), "src_ip =1 and dst_port>=80");
        // src_ip is re-read together with the new space, the tail is left alone.
        assert_eq!(outcome.replaced.start, 0);
        assert!(outcome.replaced.end <= 4);
        assert!(outcome.affected.end <= "src_ip =1".len());
        assert!(!outcome.rebalanced);
    }

    #[test]
    fn test_edit_at_start_and_end() {
        check_edit("src_ip=1", Edit::insert(0, "("));
        check_edit("src_ip=1", Edit::insert(8, " and"));
        check_edit("src_ip=1", Edit::insert(8, "0"));
        check_edit("", Edit::insert(0, "dst_port >= 80"));
    }

    #[test]
    fn test_delete_whole_token_and_everything() {
        check_edit("src_ip=1 and dst_port=2", Edit::delete(Span::new(9, 13)));
        check_edit("src_ip=1 and dst_port=2", Edit::delete(Span::new(0, 23)));
    }

    #[test]
    fn test_merge_and_split_tokens() {
        // Deleting the space merges two barewords.
        let (sequence, _) = check_edit("src _ip=1", Edit::delete(Span::new(3, 4)));
        assert_eq!(sequence.tokens()[0].text, "src_ip");
        assert!(sequence.tokens()[0].is_valid());
        // Inserting a space splits one.
        check_edit("src_ip=1", Edit::insert(3, " "));
        // Inserting an operator in the middle of a field.
        check_edit("dst_port=1 or src_ip=\"a\"", Edit::insert(4, ">"));
    }

    #[test]
    fn test_role_change_ripples_until_resync() {
        // Removing the operator shifts every later role by one position.
        let (sequence, outcome) =
            check_edit("src_ip=1 and dst_port=2 or src_port=3", Edit::delete(Span::new(6, 7)));
        assert_eq!(sequence.tokens()[1].role, Role::Whitespace);
        assert!(outcome.replaced.end >= 3);
    }

    #[test]
    fn test_paste_with_parentheses_rebalances() {
        let (sequence, outcome) = check_edit("src_ip=1)", Edit::insert(0, "(dst_port=2 or "));
        assert!(outcome.rebalanced);
        assert!(sequence.iter().all(|t| t.is_valid()));

        let (sequence, _) = check_edit("(src_ip=1)", Edit::delete(Span::new(0, 1)));
        let errors: Vec<_> = sequence.diagnostics().map(|(_, e)| e).collect();
        assert_eq!(errors, vec![TokenError::UnmatchedCloseParen]);
    }

    #[test]
    fn test_quote_insertion_swallows_the_tail() {
        check_edit("src_ip=1 and dst_ip=2", Edit::insert(7, "\""));
        check_edit("src_ip=\"a\" and dst_ip=\"b\"", Edit::delete(Span::new(10, 11)));
    }

    #[test]
    fn test_replace_with_multi_byte_text() {
        check_edit("src_ip=\"é\" or dst_port=1", Edit::replace(Span::new(7, 11), "\"ü ö\""));
    }

    #[test]
    fn test_invalid_edits_leave_sequence_untouched() {
        let classifier = classifier();
        let mut sequence = classifier.classify("src_ip=\"é\"");
        let before = sequence.clone();

        let out_of_bounds = classifier.reclassify(&mut sequence, &Edit::insert(40, "x"));
        assert!(matches!(out_of_bounds, Err(EditError::RangeOutOfBounds { .. })));

        let split_char = classifier.reclassify(&mut sequence, &Edit::delete(Span::new(8, 9)));
        assert_eq!(split_char, Err(EditError::NotCharBoundary(9)));

        let reversed = classifier.reclassify(&mut sequence, &Edit::delete(Span::new(3, 1)));
        assert!(reversed.is_err());
        assert_eq!(sequence, before);
    }

    fn query_text() -> impl Strategy<Value = String> {
        prop::collection::vec(
            prop_oneof![
                Just("src_ip"),
                Just("dst_port"),
                Just("src"),
                Just("not"),
                Just("and"),
                Just("or"),
                Just(" "),
                Just("  "),
                Just("("),
                Just(")"),
                Just("="),
                Just("<"),
                Just(">="),
                Just("\""),
                Just("\"a b\""),
                Just("80"),
                Just("1.5"),
                Just("é"),
            ],
            0..16,
        )
        .prop_map(|parts| parts.concat())
    }

    fn char_floor(text: &str, mut offset: usize) -> usize {
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }
        offset
    }

    proptest! {
        #[test]
        fn prop_reclassify_equals_full_classification(
            text in query_text(),
            a in any::<prop::sample::Index>(),
            b in any::<prop::sample::Index>(),
            replacement in query_text(),
        ) {
            let x = char_floor(&text, a.index(text.len() + 1));
            let y = char_floor(&text, b.index(text.len() + 1));
            let edit = Edit::replace(Span::new(x.min(y), x.max(y)), replacement);

            let classifier = classifier();
            let mut sequence = classifier.classify(&text);
            classifier.reclassify(&mut sequence, &edit).unwrap();

            let mut expected = text.clone();
            expected.replace_range(edit.range.start..edit.range.end, &edit.replacement);
            prop_assert_eq!(sequence, classifier.classify(&expected));
        }
    }
}
