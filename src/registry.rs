//! The field registry: which field names a query may reference and their value types.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::ConfigError;
use crate::lexer::{Lexer, RawKind};
use crate::token::ResolvedType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    String,
    Number,
}

impl ValueType {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Number => "number",
        }
    }
}

impl From<ValueType> for ResolvedType {
    fn from(value: ValueType) -> Self {
        match value {
            ValueType::String => ResolvedType::String,
            ValueType::Number => ResolvedType::Number,
        }
    }
}

/// A registered field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    #[serde(rename = "valueType", alias = "type")]
    pub value_type: ValueType,
    /// Shown next to completion candidates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Immutable, ordered set of fields, looked up by exact name, prefix or substring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRegistry {
    fields: Vec<FieldDescriptor>,
    by_name: HashMap<String, usize>,
}

impl FieldRegistry {
    /// Builds a registry, keeping declaration order.
    ///
    /// Rejects empty names, duplicates, and names the lexer would not read back
    /// as a single bareword, since such a field could never be referenced.
    pub fn new(fields: Vec<FieldDescriptor>) -> Result<Self, ConfigError> {
        let mut by_name = HashMap::with_capacity(fields.len());
        for (index, field) in fields.iter().enumerate() {
            if field.name.is_empty() {
                return Err(ConfigError::EmptyFieldName { index });
            }
            if !lexes_as_single_word(&field.name) {
                return Err(ConfigError::UnlexableFieldName(field.name.clone()));
            }
            if by_name.insert(field.name.clone(), index).is_some() {
                return Err(ConfigError::DuplicateField(field.name.clone()));
            }
        }
        Ok(Self { fields, by_name })
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.by_name.get(name).map(|&index| &self.fields[index])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// All fields in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, FieldDescriptor> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn with_prefix<'r, 'p>(&'r self, prefix: &'p str) -> impl Iterator<Item = &'r FieldDescriptor> + 'p
    where
        'r: 'p,
    {
        self.fields.iter().filter(move |f| f.name.starts_with(prefix))
    }

    /// Fields borrow from the registry, not from `fragment`.
    pub fn containing<'r, 'f>(&'r self, fragment: &'f str) -> impl Iterator<Item = &'r FieldDescriptor> + 'f
    where
        'r: 'f,
    {
        self.fields.iter().filter(move |f| f.name.contains(fragment))
    }
}

/// The network-flow fields the editor ships with.
impl Default for FieldRegistry {
    fn default() -> Self {
        let fields = vec![
            FieldDescriptor::new("src_ip", ValueType::String).with_description("Source IP address"),
            FieldDescriptor::new("src_port", ValueType::Number).with_description("Source port"),
            FieldDescriptor::new("dst_ip", ValueType::String).with_description("Destination IP address"),
            FieldDescriptor::new("dst_port", ValueType::Number).with_description("Destination port"),
        ];
        let by_name = fields
            .iter()
            .enumerate()
            .map(|(index, field)| (field.name.clone(), index))
            .collect();
        Self { fields, by_name }
    }
}

impl<'a> IntoIterator for &'a FieldRegistry {
    type Item = &'a FieldDescriptor;
    type IntoIter = std::slice::Iter<'a, FieldDescriptor>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}

fn lexes_as_single_word(name: &str) -> bool {
    let mut spans = Lexer::new(name);
    matches!(
        (spans.next(), spans.next()),
        (Some(span), None) if span.kind == RawKind::Word
    )
}
