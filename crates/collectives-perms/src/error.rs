//! Error types for the permissions module.

use collectives_store::StoreError;
use thiserror::Error;

/// Errors that can occur during permission checks.
#[derive(Debug, Error)]
pub enum PermsError {
    /// The gate denied the operation. Carries no detail on purpose.
    #[error("permission denied")]
    Denied,

    /// The member directory or authenticator failed.
    #[error("directory error: {0}")]
    Directory(String),

    /// Token store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type for permission operations.
pub type Result<T> = std::result::Result<T, PermsError>;
