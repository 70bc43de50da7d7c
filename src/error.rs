//! Crate-wide error taxonomy.
//!
//! One `thiserror` enum covers every unrecoverable condition named by the
//! error design: malformed input (equations, matrices, markings) and
//! external-collaborator failures (reducer, oracle). A successful
//! "unreachable" verdict from marking projection is *not* an error here —
//! see [`crate::marking::ProjectionOutcome`].

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the Kong core and its driver.
#[derive(Error, Debug)]
pub enum KongError {
    /// File absent, unreadable, or write failure on an output file.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An equation line could not be classified.
    #[error("malformed equation at line {line}: '{text}'")]
    MalformedEquation { line: usize, text: String },

    /// The oracle's output contains a character outside the recognised
    /// alphabet, or a malformed run-length group.
    #[error("malformed matrix output: {0}")]
    MalformedMatrix(String),

    /// The oracle exited with an unexpected status.
    #[error("oracle exited with unexpected status {status}: {detail}")]
    OracleFailure { status: i32, detail: String },

    /// The reducer exited non-zero.
    #[error("reducer '{binary}' failed: {detail}")]
    ReducerFailure { binary: String, detail: String },

    /// The marking file had unparseable tokens.
    #[error("invalid marking token '{0}'")]
    InvalidMarking(String),

    /// Invariant violated while building the Token Flow Graph (the
    /// reducer is assumed to guarantee acyclicity and full place coverage;
    /// this indicates a contract break upstream, not user input).
    #[error("TFG invariant violated: {0}")]
    TfgInvariant(String),
}

impl KongError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        KongError::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias used throughout the core.
pub type Result<T> = std::result::Result<T, KongError>;
