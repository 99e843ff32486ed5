use std::sync::Arc;

use hql_editor::{
    Classifier, Edit, FieldDescriptor, FieldRegistry, QueryDocument, ResolvedType, Role, Span, TokenError,
    ValueType,
};
use proptest::prelude::*;

fn classifier() -> Classifier {
    Classifier::new(Arc::new(FieldRegistry::default()))
}

/// (role, text, error) for every non-whitespace token.
fn verdicts(input: &str) -> Vec<(Role, String, Option<TokenError>)> {
    classifier()
        .classify(input)
        .iter()
        .filter(|t| t.role != Role::Whitespace)
        .map(|t| (t.role, t.text.clone(), t.error))
        .collect()
}

fn owned(parts: &[(Role, &str, Option<TokenError>)]) -> Vec<(Role, String, Option<TokenError>)> {
    parts.iter().map(|&(role, text, error)| (role, text.to_string(), error)).collect()
}

#[test]
fn test_clause_with_type_mismatch_is_valid() {
    let sequence = classifier().classify("src_ip=1");
    assert_eq!(sequence.tokens()[0].resolved_type, Some(ResolvedType::String));
    assert_eq!(
        verdicts("src_ip=1"),
        owned(&[
            (Role::Field, "src_ip", None),
            (Role::Condition, "=", None),
            (Role::FieldValue, "1", None),
        ])
    );
}

#[test]
fn test_trailing_open_paren_is_flagged() {
    assert_eq!(
        verdicts("(src_ip=1"),
        owned(&[
            (Role::ParenthesisOpen, "(", Some(TokenError::UnmatchedOpenParen)),
            (Role::Field, "src_ip", None),
            (Role::Condition, "=", None),
            (Role::FieldValue, "1", None),
        ])
    );
}

#[test]
fn test_unknown_field_keeps_clause_shape() {
    assert_eq!(
        verdicts("foo=1"),
        owned(&[
            (Role::Field, "foo", Some(TokenError::UnknownField)),
            (Role::Condition, "=", None),
            (Role::FieldValue, "1", None),
        ])
    );
}

#[test]
fn test_stray_close_paren_is_flagged() {
    let found = verdicts("src_ip=1 and dst_port>=80)");
    let (last, rest) = found.split_last().unwrap();
    assert_eq!(last, &(Role::ParenthesisClose, ")".to_string(), Some(TokenError::UnmatchedCloseParen)));
    assert!(rest.iter().all(|(_, _, error)| error.is_none()));
    assert_eq!(rest[5], (Role::Condition, ">=".to_string(), None));
}

#[test]
fn test_suggestions_for_partial_field_in_registry_order() {
    let classifier = classifier();
    let sequence = classifier.classify("src_");
    let matcher = classifier.matcher();
    let (index, fields) = matcher.suggest_at(&sequence, 2).unwrap();
    assert_eq!(index, 0);
    let names: Vec<_> = fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, vec!["src_ip", "src_port"]);
}

#[test]
fn test_inserted_space_only_touches_the_boundary() {
    let classifier = classifier();
    let mut sequence = classifier.classify("src_ip=1");
    let outcome = classifier.reclassify(&mut sequence, &Edit::insert(6, " ")).unwrap();

    assert_eq!(sequence, classifier.classify("src_ip =1"));
    assert_eq!(outcome.affected, Span::new(0, 7));
    assert_eq!(outcome.replaced, 0..2);
    assert!(!outcome.rebalanced);
}

#[test]
fn test_document_session_matches_full_classification() {
    let mut document = QueryDocument::new(classifier());
    let typed = "(src_port >= 1024 or dst_ip = \"10.0.0.1\")";
    for end in 1..=typed.len() {
        document.sync_text(&typed[..end]).unwrap();
    }
    assert_eq!(document.sequence(), &classifier().classify(typed));
    assert!(document.sequence().diagnostics().next().is_none());

    let field_index = 3;
    let caret = document.accept_suggestion(field_index, &FieldDescriptor::new("dst_port", ValueType::Number));
    assert!(caret.is_err(), "index 3 is a CONDITION token");
}

#[test]
fn test_custom_registry_from_json() {
    let registry = FieldRegistry::from_json_str(r#"[{"name": "host", "valueType": "string"}]"#).unwrap();
    let classifier = Classifier::new(Arc::new(registry));
    let sequence = classifier.classify("host = \"a\" and src_ip = \"b\"");
    let errors: Vec<_> = sequence.diagnostics().map(|(t, e)| (t.text.as_str(), e)).collect();
    assert_eq!(errors, vec![("src_ip", TokenError::UnknownField)]);
}

fn query_text() -> impl Strategy<Value = String> {
    prop::collection::vec(
        prop_oneof![
            Just("src_ip"),
            Just("src_port"),
            Just("dst"),
            Just("not"),
            Just("and"),
            Just("or"),
            Just(" "),
            Just("\u{a0}"),
            Just("("),
            Just(")"),
            Just("="),
            Just("<>"),
            Just("<="),
            Just("\"x\""),
            Just("\""),
            Just("443"),
            Just("ü"),
        ],
        0..24,
    )
    .prop_map(|parts| parts.concat())
}

proptest! {
    #[test]
    fn prop_classification_is_idempotent(text in query_text()) {
        let classifier = classifier();
        let first = classifier.classify(&text);
        prop_assert_eq!(classifier.classify(&first.render_text()), first);
    }

    #[test]
    fn prop_spans_cover_input_exactly(text in any::<String>()) {
        let sequence = classifier().classify(&text);
        let mut offset = 0;
        for token in &sequence {
            prop_assert_eq!(token.span.start, offset);
            prop_assert!(!token.span.is_empty());
            prop_assert_eq!(&text[token.span.start..token.span.end], token.text.as_str());
            offset = token.span.end;
        }
        prop_assert_eq!(offset, text.len());
        prop_assert_eq!(sequence.is_empty(), text.is_empty());
    }

    #[test]
    fn prop_paren_errors_match_balance(text in query_text()) {
        let sequence = classifier().classify(&text);
        let (mut open, mut stray) = (0usize, 0usize);
        for token in &sequence {
            match token.role {
                Role::ParenthesisOpen => open += 1,
                Role::ParenthesisClose if open == 0 => stray += 1,
                Role::ParenthesisClose => open -= 1,
                _ => {}
            }
        }
        let count = |error| sequence.diagnostics().filter(|&(_, e)| e == error).count();
        prop_assert_eq!(count(TokenError::UnmatchedOpenParen), open);
        prop_assert_eq!(count(TokenError::UnmatchedCloseParen), stray);
    }

    #[test]
    fn prop_suggestions_strictly_extend_the_typed_text(text in "[a-z_]{0,8}") {
        let classifier = classifier();
        let sequence = classifier.classify(&text);
        let matcher = classifier.matcher();
        for token in &sequence {
            for field in matcher.suggest(token) {
                prop_assert!(field.name.len() > token.text.len());
                prop_assert!(field.name.contains(token.text.as_str()));
            }
        }
    }

    #[test]
    fn prop_typing_char_by_char_matches_full_classification(text in query_text()) {
        let mut document = QueryDocument::new(classifier());
        let mut typed = String::new();
        for ch in text.chars() {
            let caret = typed.len();
            typed.push(ch);
            document.apply_edit(&Edit::insert(caret, ch.to_string())).unwrap();
        }
        prop_assert_eq!(document.sequence(), &classifier().classify(&text));
    }
}
