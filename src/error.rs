//! Error types.
//!
//! Only driver-facing failures live here. Problems *inside* the schema
//! universe (malformed documents, duplicate names, dangling references,
//! cycles) are never errors at this level: they travel as diagnostics in the
//! resolution report so a single run can surface all of them at once.

use thiserror::Error;

/// Result type for schema-loom operations.
pub type Result<T> = std::result::Result<T, LoomError>;

#[derive(Error, Debug)]
pub enum LoomError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid options file: {0}")]
    Options(#[from] toml::de::Error),
}
