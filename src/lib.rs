//! Live syntax classification and field completion for a small boolean
//! filter-query language (`field COND value` clauses joined by `and`/`or`,
//! with `not` and grouping parentheses).
//!
//! ```text
//! edit ──> Lexer ──> Classifier ──> TokenSequence ──> highlighter
//!            ^     (full or incremental)        └──> FieldMatcher ──> pick
//!            └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ```
//! use std::sync::Arc;
//! use hql_editor::{Classifier, FieldRegistry, Role};
//!
//! let classifier = Classifier::new(Arc::new(FieldRegistry::default()));
//! let sequence = classifier.classify("src_ip=1");
//! let roles: Vec<_> = sequence.iter().map(|t| t.role).collect();
//! assert_eq!(roles, [Role::Field, Role::Condition, Role::FieldValue]);
//! ```

pub mod classifier;
pub mod complete;
pub mod config;
pub mod document;
pub mod incremental;
pub mod lexer;
pub mod registry;
pub mod token;

pub use classifier::{balance_parentheses, Classifier, ParenBalance};
pub use complete::{Accepted, FieldMatcher};
pub use config::ConfigError;
pub use document::{EditOutcome, QueryDocument};
pub use incremental::{Edit, EditError, Reclassified};
pub use lexer::{lex, Lexer, RawKind, RawSpan};
pub use registry::{FieldDescriptor, FieldRegistry, ValueType};
pub use token::{ResolvedType, Role, Span, Token, TokenError, TokenSequence};
