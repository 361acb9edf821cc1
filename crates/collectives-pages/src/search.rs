//! Page search.
//!
//! Results are produced lazily from a snapshot, in tree order. Both share
//! tiers see every page of the collective; the tier only decides what a
//! caller may write.

use std::sync::Arc;

use tracing::trace;

use collectives_core::{CollectiveId, Page, PageId, ShareTier};

use crate::error::Result;
use crate::index::PageIndex;
use crate::tree::PageTree;

/// What a query is matched against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SearchMode {
    /// Case-insensitive substring of the title.
    #[default]
    Title,
    /// Case-insensitive substring of the title or the content.
    FullText,
}

/// Lazy sequence of matching pages.
///
/// Walks the tree preorder (ancestors before descendants, siblings in
/// creation order). Holds its own snapshot, so writes made while the
/// results are consumed are not observed.
#[derive(Debug, Clone)]
pub struct SearchResults {
    tree: Arc<PageTree>,
    stack: Vec<PageId>,
    needle: String,
    mode: SearchMode,
}

impl SearchResults {
    fn new(tree: Arc<PageTree>, query: &str, mode: SearchMode) -> Self {
        let needle = query.trim().to_lowercase();
        // An empty query matches nothing
        let stack = if needle.is_empty() {
            Vec::new()
        } else {
            vec![tree.collective().root_page_id]
        };
        Self {
            tree,
            stack,
            needle,
            mode,
        }
    }

    fn matches(&self, page: &Page) -> bool {
        if page.title.to_lowercase().contains(&self.needle) {
            return true;
        }
        self.mode == SearchMode::FullText && page.content.to_lowercase().contains(&self.needle)
    }
}

impl Iterator for SearchResults {
    type Item = Page;

    fn next(&mut self) -> Option<Page> {
        while let Some(id) = self.stack.pop() {
            self.stack
                .extend(self.tree.children_of(id).iter().rev().copied());
            if let Some(page) = self.tree.page(id) {
                if self.matches(page) {
                    return Some(page.clone());
                }
            }
        }
        None
    }
}

impl PageIndex {
    /// Pages of a collective whose title contains `query`, ignoring case.
    pub fn search(
        &self,
        collective_id: CollectiveId,
        query: &str,
        tier: ShareTier,
    ) -> Result<SearchResults> {
        self.search_with(collective_id, query, tier, SearchMode::Title)
    }

    /// Like [`search`](Self::search) with an explicit match mode.
    pub fn search_with(
        &self,
        collective_id: CollectiveId,
        query: &str,
        tier: ShareTier,
        mode: SearchMode,
    ) -> Result<SearchResults> {
        let tree = self.snapshot(collective_id)?;
        trace!(%collective_id, tier = tier.as_str(), ?mode, "search");
        Ok(SearchResults::new(tree, query, mode))
    }
}
