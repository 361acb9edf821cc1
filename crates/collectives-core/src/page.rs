//! Collectives and pages.
//!
//! A collective is a tree of pages under a single root page. The root page
//! carries the collective's title.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::types::{CollectiveId, PageId};

/// Maximum length of a page title in bytes.
pub const MAX_TITLE_LEN: usize = 255;

/// A named, shareable tree of pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collective {
    pub id: CollectiveId,
    pub title: String,
    pub root_page_id: PageId,
}

/// A page in a collective's tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Page identifier.
    pub id: PageId,

    /// Owning collective. Never changes after insertion.
    pub collective_id: CollectiveId,

    /// Parent page, `None` only for the collective's root page.
    pub parent_id: Option<PageId>,

    /// Title, also the page's path segment.
    pub title: String,

    /// Markdown content.
    pub content: String,

    /// Content version, bumped on every content write.
    pub version: u64,

    /// Position in creation order within the collective.
    pub created_seq: u64,

    /// Logical modification clock within the collective.
    pub modified_seq: u64,

    /// Last modification (Unix ms).
    pub updated_at: i64,
}

impl Page {
    /// Create a page with empty content. Sequence numbers are assigned when
    /// the page is inserted into an index.
    pub fn new(
        id: PageId,
        collective_id: CollectiveId,
        parent_id: Option<PageId>,
        title: impl Into<String>,
    ) -> Self {
        Self {
            id,
            collective_id,
            parent_id,
            title: title.into(),
            content: String::new(),
            version: 0,
            created_seq: 0,
            modified_seq: 0,
            updated_at: 0,
        }
    }

    /// Set the initial content.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// Check that a title can be used as a page path segment.
pub fn validate_title(title: &str) -> Result<()> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(CoreError::InvalidTitle("title is empty".into()));
    }
    if trimmed.len() > MAX_TITLE_LEN {
        return Err(CoreError::InvalidTitle(format!(
            "title exceeds {} bytes",
            MAX_TITLE_LEN
        )));
    }
    if trimmed.contains('/') {
        return Err(CoreError::InvalidTitle("title contains '/'".into()));
    }
    if trimmed.chars().any(char::is_control) {
        return Err(CoreError::InvalidTitle("title contains control characters".into()));
    }
    Ok(())
}
