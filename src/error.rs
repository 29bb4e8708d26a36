//! Error types for nearfield.

use thiserror::Error;

/// Errors that can occur during index construction or querying.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LshError {
    /// Input vector length disagrees with a hash function's configured dimension.
    #[error("invalid dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    /// Invalid construction parameter.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// A fixed-capacity bucket map has no free slot left.
    #[error("bucket map capacity {capacity} exceeded")]
    CapacityExceeded { capacity: usize },

    /// A precomputation was built against a different hash pool.
    #[error("precomputed hashes refer to a different pool")]
    PoolMismatch,
}

/// Result type alias for nearfield operations.
pub type Result<T> = std::result::Result<T, LshError>;
