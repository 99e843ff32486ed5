mod repl;

use std::sync::Arc;

use anyhow::Result;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use tracing_subscriber::EnvFilter;

use hql_editor::{Classifier, FieldRegistry, Role, TokenSequence};
use repl::QueryHelper;

const FIELDS_FILE: &str = "fields.json";

/// Loads the field registry, preferring the JSON file and falling back to the built-in fields.
fn load_registry() -> FieldRegistry {
    match FieldRegistry::from_json_file(FIELDS_FILE) {
        Ok(registry) => {
            println!("✅ Loaded {} fields from {FIELDS_FILE}", registry.len());
            registry
        }
        Err(e) => {
            println!("⚠️ Could not load {FIELDS_FILE} ({e}), using built-in fields");
            FieldRegistry::default()
        }
    }
}

/// One line per field whose name starts with `prefix`.
fn field_lines(registry: &FieldRegistry, prefix: &str) -> Vec<String> {
    registry
        .with_prefix(prefix)
        .map(|field| {
            let value_type = field.value_type.as_str();
            match &field.description {
                Some(description) => format!("  {:<12} {:<8} {}", field.name, value_type, description),
                None => format!("  {:<12} {}", field.name, value_type),
            }
        })
        .collect()
}

fn print_fields(registry: &FieldRegistry, prefix: &str) {
    let lines = field_lines(registry, prefix);
    if lines.is_empty() {
        println!("  no field starts with `{prefix}`");
    }
    for line in lines {
        println!("{line}");
    }
}

fn print_report(sequence: &TokenSequence) {
    for token in sequence.iter().filter(|t| t.role != Role::Whitespace) {
        let verdict = match token.error {
            Some(error) => format!("✗ {error}"),
            None => "✓".to_string(),
        };
        let resolved = token
            .resolved_type
            .map(|t| format!(" [{}]", t.as_str()))
            .unwrap_or_default();
        println!(
            "  {:>3}..{:<3} {:<17} {:<12}{} {}",
            token.span.start,
            token.span.end,
            token.role.as_str(),
            token.text,
            resolved,
            verdict
        );
    }

    let problems = sequence.diagnostics().count();
    if problems == 0 {
        println!("✓ query is well-formed");
    } else {
        println!("✗ {problems} problem(s)");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    println!("--- HQL Editor: filter query highlighter ---");
    let registry = Arc::new(load_registry());
    print_fields(&registry, "");
    println!("Tab completes field names. Commands: :fields [prefix]  :json  :quit\n");

    let classifier = Classifier::new(Arc::clone(&registry));
    let mut editor: Editor<QueryHelper, DefaultHistory> = Editor::new()?;
    editor.set_helper(Some(QueryHelper::new(classifier.clone())));

    let mut last = TokenSequence::default();
    loop {
        match editor.readline("hql> ") {
            Ok(line) => {
                let command = line.trim();
                match command {
                    "" => continue,
                    ":quit" | ":q" => break,
                    ":json" => {
                        println!("{}", serde_json::to_string_pretty(&last)?);
                        continue;
                    }
                    _ => {}
                }
                if let Some(prefix) = command.strip_prefix(":fields") {
                    print_fields(&registry, prefix.trim());
                    continue;
                }
                editor.add_history_entry(line.as_str())?;
                last = match editor.helper() {
                    Some(helper) => helper.finish_line(&line),
                    None => classifier.classify(&line),
                };
                print_report(&last);
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
