//! Configuration module: loads the field registry from a JSON file.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::registry::{FieldDescriptor, FieldRegistry};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file does not exist: {}", .0.display())]
    Missing(PathBuf),
    #[error("cannot read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot parse field registry JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("field #{index} has an empty name")]
    EmptyFieldName { index: usize },
    #[error("field `{0}` is declared more than once")]
    DuplicateField(String),
    #[error("field `{0}` cannot be typed as a single bareword")]
    UnlexableFieldName(String),
}

/// Accepted file layouts: a bare array or an object with a `fields` array.
#[derive(Deserialize)]
#[serde(untagged)]
enum RegistryFile {
    List(Vec<FieldDescriptor>),
    Table { fields: Vec<FieldDescriptor> },
}

impl FieldRegistry {
    /// Loads the registry from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::Missing(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_json_str(&content)
    }

    /// Parses the registry from JSON text.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let fields = match serde_json::from_str(content)? {
            RegistryFile::List(fields) => fields,
            RegistryFile::Table { fields } => fields,
        };
        tracing::debug!(fields = fields.len(), "loaded field registry");
        Self::new(fields)
    }
}
