//! Error types for the store module.

use collectives_core::CollectiveId;
use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The token was deleted earlier and may not be issued again.
    #[error("share token has been retired")]
    TokenRetired,

    /// Another token already holds the grant for this collective.
    #[error("collective {collective_id} already has a share grant")]
    Conflict { collective_id: CollectiveId },

    /// Invalid data in storage or in the request.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock guarding the store was poisoned.
    #[error("store lock poisoned: {0}")]
    Poisoned(String),

    /// A blocking task failed to complete.
    #[error("blocking task failed: {0}")]
    Task(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
