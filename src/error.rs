//! Error types for the go-proto-gen crate.

use std::path::PathBuf;

/// Errors that can occur while translating Go sources to proto definitions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Failed to read a source unit or configuration file from disk.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The source unit is not valid Go (as far as this front end can tell).
    #[error("{path}:{line}:{column}: {message}")]
    Parse {
        path: String,
        line: usize,
        column: usize,
        message: String,
    },

    /// JSON parse error with context.
    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The type-map file parsed but holds an unusable entry.
    #[error("type map error: {0}")]
    TypeMap(String),

    /// Failed to write generated output.
    #[error("failed to write output: {source}")]
    Write { source: std::io::Error },

    /// A stub template could not be rendered.
    #[error("template error: {0}")]
    Template(String),
}

/// Convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
