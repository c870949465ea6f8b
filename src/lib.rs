//! Semantic front end for a Thrift-style IDL: merges a root schema and its
//! include closure into one symbol environment, resolves every named
//! reference to its definition, and names the output module of each entity.
pub mod config;
pub mod error;
pub mod file_group;
pub mod ir;
pub mod lower;
pub mod resolver;
pub mod schema;
pub mod source;

pub use config::GroupConfig;
pub use error::{Error, ParseError, Result};
pub use file_group::{Definition, FileGroup, ModulePath};
pub use lower::{lower_module, Scope};
pub use schema::Schema;
pub use source::{MemorySources, OsSources, Sources};
