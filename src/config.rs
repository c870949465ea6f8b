use std::path::{Path, PathBuf};
use serde::Deserialize;

use crate::error::ParseError;

/// Per-group settings, fixed for the lifetime of a `FileGroup`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GroupConfig {
    /// Searched, in order, after the including file's own directory.
    pub include_paths: Vec<PathBuf>,
    /// Fallback namespace for files that declare none for `target`.
    pub namespace: Option<String>,
    /// Generation target tag, as used in `namespace <target> a.b`.
    pub target: String,
}

pub const DEFAULT_TARGET: &str = "rs";

impl Default for GroupConfig {
    fn default() -> Self {
        Self {
            include_paths: Vec::new(),
            namespace: None,
            target: DEFAULT_TARGET.to_string(),
        }
    }
}

impl GroupConfig {
    pub fn with_include_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.include_paths.push(dir.into());
        self
    }
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = target.into();
        self
    }

    /// Load a JSON config file; errors name the offending JSON path.
    pub fn from_json_file(path: &Path) -> Result<Self, ParseError> {
        let source = std::fs::read_to_string(path)
            .map_err(|error| ParseError::new(path, error.to_string()))?;
        crate::source::from_str_with_path(&source)
            .map_err(|message| ParseError::new(path, message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config: GroupConfig = crate::source::from_str_with_path(r#"{"namespace": "acme"}"#).unwrap();
        assert_eq!(config.target, DEFAULT_TARGET);
        assert_eq!(config.namespace.as_deref(), Some("acme"));
        assert!(config.include_paths.is_empty());
    }

    #[test]
    fn bad_config_reports_json_path() {
        let err = crate::source::from_str_with_path::<GroupConfig>(r#"{"include_paths": [1]}"#).unwrap_err();
        assert!(err.contains("include_paths[0]"), "{err}");
    }
}
