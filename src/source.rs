//! Seams to the outside world: reading files and turning them into `Schema`s.
//!
//! The grammar front end is not part of this crate. It hands us each file as
//! a JSON-encoded `Schema` tree; deserialization errors carry the JSON path of
//! the offending node.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use serde::de::DeserializeOwned;

use crate::error::ParseError;
use crate::schema::Schema;

/// Deserialize with JSON-path context in error messages.
pub fn from_str_with_path<T: DeserializeOwned>(src: &str) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_str(src);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at JSON path {path} → {}", err.into_inner()))
        }
    }
}

pub fn from_slice_with_path<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, String> {
    let de = &mut serde_json::Deserializer::from_slice(bytes);
    match serde_path_to_error::deserialize::<_, T>(de) {
        Ok(v) => Ok(v),
        Err(err) => {
            let path = err.path().to_string();
            Err(format!("at JSON path {path} → {}", err.into_inner()))
        }
    }
}

/// File existence plus the parsing front end.
pub trait Sources {
    fn exists(&self, path: &Path) -> bool;
    fn parse(&self, path: &Path) -> Result<Schema, ParseError>;
}

// ————————————————————————————————————————————————————————————————————————————
// FILESYSTEM
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone, Copy, Default)]
pub struct OsSources;

impl Sources for OsSources {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }
    fn parse(&self, path: &Path) -> Result<Schema, ParseError> {
        let bytes = std::fs::read(path)
            .map_err(|error| ParseError::new(path, error.to_string()))?;
        from_slice_with_path(&bytes).map_err(|message| ParseError::new(path, message))
    }
}

// ————————————————————————————————————————————————————————————————————————————
// IN MEMORY
// ————————————————————————————————————————————————————————————————————————————

#[derive(Debug, Clone)]
enum Entry {
    Parsed(Schema),
    Text(String),
}

/// Path-keyed sources held in memory, for embedding and tests.
#[derive(Debug, Clone, Default)]
pub struct MemorySources {
    files: HashMap<PathBuf, Entry>,
}

impl MemorySources {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn with_schema(mut self, path: impl Into<PathBuf>, schema: Schema) -> Self {
        self.files.insert(path.into(), Entry::Parsed(schema));
        self
    }
    /// Raw JSON tree text, parsed lazily like a file on disk.
    pub fn with_text(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.files.insert(path.into(), Entry::Text(text.into()));
        self
    }
}

impl Sources for MemorySources {
    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }
    fn parse(&self, path: &Path) -> Result<Schema, ParseError> {
        match self.files.get(path) {
            Some(Entry::Parsed(schema)) => Ok(schema.clone()),
            Some(Entry::Text(text)) => {
                from_str_with_path(text).map_err(|message| ParseError::new(path, message))
            }
            None => Err(ParseError::new(path, "no such file")),
        }
    }
}
