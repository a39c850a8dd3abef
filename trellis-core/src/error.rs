//! Error types.
//!
//! The engine itself is infallible: failures raised by user computations
//! propagate to the caller untouched. Errors only occur at the
//! configuration boundary.

use thiserror::Error;

/// Errors produced while building a [`Runtime`](crate::reactive::Runtime).
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration document could not be parsed.
    #[error("failed to parse runtime configuration: {0}")]
    Config(#[from] serde_json::Error),

    /// The configuration parsed but holds an unusable value.
    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, Error>;
