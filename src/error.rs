//! Error types for the cache engine
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache engine.
///
/// Every variant is a local, recoverable condition. The engine never retries
/// on its own; retrying a write against a locked key is up to the caller.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Mutation attempted on a key held by another caller's lock
    #[error("Key is locked: {0}")]
    Locked(String),

    /// Counter operation on a key that is absent or expired
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Malformed glob pattern passed to pattern invalidation
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },

    /// Counter operation on a value that is not a number
    #[error("Value is not numeric: {0}")]
    NotNumeric(String),

    /// Integer counter left the representable range
    #[error("Counter overflow: {0}")]
    Overflow(String),

    /// Value could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Payload could not be compressed or decompressed
    #[error("Compression error: {0}")]
    Compression(#[from] std::io::Error),
}

// == Result Type Alias ==
/// Convenience Result type for the cache engine.
pub type Result<T> = std::result::Result<T, CacheError>;
