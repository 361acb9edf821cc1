//! Error types for the collectives core.

use thiserror::Error;

/// Core errors raised while building or parsing primitives.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("malformed share token")]
    InvalidToken,

    #[error("invalid page title: {0}")]
    InvalidTitle(String),

    #[error("unknown share tier: {0}")]
    UnknownTier(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
