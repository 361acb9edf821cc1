//! Error types for the page index.

use collectives_core::{CollectiveId, CoreError, PageId};
use thiserror::Error;

/// Errors that can occur during page operations.
#[derive(Debug, Error)]
pub enum PagesError {
    #[error("collective not found: {0}")]
    CollectiveNotFound(CollectiveId),

    #[error("page not found: {0}")]
    PageNotFound(PageId),

    #[error("parent page not found: {0}")]
    ParentNotFound(PageId),

    /// Re-parenting `page` under `parent` would create a cycle.
    #[error("moving page {page} under {parent} would create a cycle")]
    CycleDetected { page: PageId, parent: PageId },

    /// A sibling page or another collective already uses the title.
    #[error("title already in use: {0}")]
    DuplicateTitle(String),

    #[error("invalid page: {0}")]
    InvalidPage(String),

    #[error("index lock poisoned: {0}")]
    Poisoned(String),

    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Result type for page operations.
pub type Result<T> = std::result::Result<T, PagesError>;
