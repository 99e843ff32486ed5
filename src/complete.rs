//! Field-name autocompletion.

use std::sync::Arc;

use crate::classifier::Classifier;
use crate::incremental::{Edit, EditError, Reclassified};
use crate::registry::{FieldDescriptor, FieldRegistry};
use crate::token::{Role, Token, TokenSequence};

/// Suggests registered field names for an in-progress FIELD token.
#[derive(Debug, Clone)]
pub struct FieldMatcher {
    registry: Arc<FieldRegistry>,
}

impl FieldMatcher {
    pub fn new(registry: Arc<FieldRegistry>) -> Self {
        Self { registry }
    }

    /// Every field whose name contains the token text and is longer than it,
    /// in registry order. Tokens of any other role get no suggestions.
    pub fn suggest(&self, token: &Token) -> Vec<&FieldDescriptor> {
        if token.role != Role::Field {
            return Vec::new();
        }
        let typed = token.text.as_str();
        self.registry
            .containing(typed)
            .filter(|field| field.name.len() > typed.len())
            .collect()
    }

    /// Suggestions for the FIELD token a caret at `offset` sits inside or at
    /// the end of, together with that token's index.
    pub fn suggest_at(&self, sequence: &TokenSequence, offset: usize) -> Option<(usize, Vec<&FieldDescriptor>)> {
        let (index, token) = sequence.token_at_caret(offset)?;
        let candidates = self.suggest(token);
        (!candidates.is_empty()).then_some((index, candidates))
    }
}

/// Result of accepting a suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    /// Caret offset right after the inserted field name.
    pub caret: usize,
    pub reclassified: Reclassified,
}

impl Classifier {
    pub fn matcher(&self) -> FieldMatcher {
        FieldMatcher::new(self.shared_registry())
    }

    /// Replaces the FIELD token at `token_index` with `field`'s full name.
    ///
    /// This is an ordinary edit and goes through [`Classifier::reclassify`].
    pub fn apply_suggestion(
        &self,
        sequence: &mut TokenSequence,
        token_index: usize,
        field: &FieldDescriptor,
    ) -> Result<Accepted, EditError> {
        let token = sequence
            .get(token_index)
            .ok_or(EditError::TokenOutOfRange(token_index))?;
        if token.role != Role::Field {
            return Err(EditError::NotAFieldToken(token_index));
        }
        let edit = Edit::replace(token.span, field.name.as_str());
        let caret = token.span.start + field.name.len();
        let reclassified = self.reclassify(sequence, &edit)?;
        Ok(Accepted { caret, reclassified })
    }
}
