//! Errors surfaced by the engine.
//!
//! Parse failures are collected per file and returned next to the group;
//! resolution errors are raised where the reference is used.
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// A file that could not be read or is not a valid schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to parse {}: {message}", .path.display())]
pub struct ParseError {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("unresolved reference `{name}`{}", .module.as_deref().map(|m| format!(" in module `{m}`")).unwrap_or_default())]
    UnresolvedReference { name: String, module: Option<String> },

    #[error("reference cycle never reaches a definition: {}", .chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },

    #[error("unknown module `{0}`")]
    UnknownModule(String),

    #[error("`{0}` is not a qualified `module.Name`")]
    UnqualifiedName(String),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl ParseError {
    pub fn new(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self { path: path.into(), message: message.into() }
    }
}

impl Error {
    /// The name that failed to resolve, for errors about a single reference.
    pub fn reference(&self) -> Option<&str> {
        match self {
            Error::UnresolvedReference { name, .. } => Some(name),
            Error::CyclicReference { chain } => chain.first().map(String::as_str),
            _ => None,
        }
    }
}
