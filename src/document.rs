//! An editing session: the single writer of a query's token sequence.
//!
//! Every change is computed in full and then published, so readers such as a
//! highlighter or the autocomplete popup only ever see a finished sequence.

use crate::classifier::Classifier;
use crate::complete::{Accepted, FieldMatcher};
use crate::incremental::{Edit, EditError, Reclassified};
use crate::registry::FieldDescriptor;
use crate::token::{Span, TokenSequence};

/// What a published edit changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub revision: u64,
    pub reclassified: Reclassified,
}

#[derive(Debug, Clone)]
pub struct QueryDocument {
    classifier: Classifier,
    matcher: FieldMatcher,
    sequence: TokenSequence,
    revision: u64,
}

impl QueryDocument {
    pub fn new(classifier: Classifier) -> Self {
        Self::with_text(classifier, "")
    }

    pub fn with_text(classifier: Classifier, text: &str) -> Self {
        let sequence = classifier.classify(text);
        let matcher = classifier.matcher();
        Self {
            classifier,
            matcher,
            sequence,
            revision: 0,
        }
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    pub fn sequence(&self) -> &TokenSequence {
        &self.sequence
    }

    pub fn text(&self) -> &str {
        self.sequence.source()
    }

    /// Incremented on every published change.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Drops the current text and starts over with an empty query.
    pub fn reset(&mut self) {
        self.sequence = TokenSequence::default();
        self.revision += 1;
    }

    pub fn apply_edit(&mut self, edit: &Edit) -> Result<EditOutcome, EditError> {
        let reclassified = self.classifier.reclassify(&mut self.sequence, edit)?;
        Ok(self.publish(reclassified))
    }

    /// Brings the document to `text` through the smallest single edit.
    ///
    /// For hosts that report the whole new text instead of the edit itself.
    /// Returns `Ok(None)` when the text is unchanged.
    pub fn sync_text(&mut self, text: &str) -> Result<Option<EditOutcome>, EditError> {
        diff(self.text(), text)
            .map(|edit| self.apply_edit(&edit))
            .transpose()
    }

    /// Field suggestions for a caret at `offset`, with the index of the FIELD token.
    pub fn suggestions_at(&self, offset: usize) -> Option<(usize, Vec<&FieldDescriptor>)> {
        self.matcher.suggest_at(&self.sequence, offset)
    }

    /// Replaces the FIELD token at `token_index` with `field`'s name and
    /// returns the caret offset after it.
    pub fn accept_suggestion(&mut self, token_index: usize, field: &FieldDescriptor) -> Result<usize, EditError> {
        let Accepted { caret, reclassified } =
            self.classifier
                .apply_suggestion(&mut self.sequence, token_index, field)?;
        self.publish(reclassified);
        Ok(caret)
    }

    fn publish(&mut self, reclassified: Reclassified) -> EditOutcome {
        self.revision += 1;
        tracing::trace!(
            revision = self.revision,
            tokens = self.sequence.len(),
            "published token sequence"
        );
        EditOutcome {
            revision: self.revision,
            reclassified,
        }
    }
}

/// The single replacement turning `old` into `new`, found by trimming the
/// common prefix and suffix on character boundaries.
fn diff(old: &str, new: &str) -> Option<Edit> {
    if old == new {
        return None;
    }
    let mut prefix = old
        .bytes()
        .zip(new.bytes())
        .take_while(|(a, b)| a == b)
        .count();
    while !(old.is_char_boundary(prefix) && new.is_char_boundary(prefix)) {
        prefix -= 1;
    }

    let (old_rest, new_rest) = (&old[prefix..], &new[prefix..]);
    let mut suffix = old_rest
        .bytes()
        .rev()
        .zip(new_rest.bytes().rev())
        .take_while(|(a, b)| a == b)
        .count();
    while !(old_rest.is_char_boundary(old_rest.len() - suffix)
        && new_rest.is_char_boundary(new_rest.len() - suffix))
    {
        suffix -= 1;
    }

    Some(Edit::replace(
        Span::new(prefix, old.len() - suffix),
        &new_rest[..new_rest.len() - suffix],
    ))
}
