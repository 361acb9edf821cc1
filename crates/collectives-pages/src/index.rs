//! The page index of all collectives.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info};

use collectives_core::{
    extract_outline, now_millis, validate_title, Collective, CollectiveId, OutlineItem, Page,
    PageId,
};

use crate::error::{PagesError, Result};
use crate::tree::PageTree;

/// Page trees of every collective, with copy-on-write snapshots.
///
/// Readers clone the `Arc` of a tree and work on that snapshot without
/// holding any lock. Writers validate against the current tree, then
/// mutate it through `Arc::make_mut` under the write lock; a snapshot still
/// held by a reader is cloned first, so readers never see a half-applied
/// write.
///
/// The index does not serialize writers of the same collective across
/// calls. Callers that read, decide and then write hold their own
/// per-collective lock.
pub struct PageIndex {
    inner: RwLock<PageIndexInner>,
    next_collective: AtomicU64,
    next_page: AtomicU64,
}

#[derive(Default)]
struct PageIndexInner {
    trees: HashMap<CollectiveId, Arc<PageTree>>,

    /// Page -> owning collective.
    owners: HashMap<PageId, CollectiveId>,
}

impl PageIndexInner {
    fn owner_of(&self, page_id: PageId) -> Result<CollectiveId> {
        self.owners
            .get(&page_id)
            .copied()
            .ok_or(PagesError::PageNotFound(page_id))
    }

    fn tree_mut(&mut self, collective_id: CollectiveId) -> Result<&mut Arc<PageTree>> {
        self.trees
            .get_mut(&collective_id)
            .ok_or(PagesError::CollectiveNotFound(collective_id))
    }
}

impl PageIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(PageIndexInner::default()),
            next_collective: AtomicU64::new(1),
            next_page: AtomicU64::new(1),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, PageIndexInner>> {
        self.inner
            .read()
            .map_err(|e| PagesError::Poisoned(e.to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, PageIndexInner>> {
        self.inner
            .write()
            .map_err(|e| PagesError::Poisoned(e.to_string()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Collectives
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a collective with its root page.
    ///
    /// Collective titles are unique across the index since absolute links
    /// name collectives by title.
    pub fn create_collective(&self, title: &str) -> Result<Collective> {
        let title = title.trim();
        validate_title(title)?;

        let mut inner = self.write()?;
        if inner
            .trees
            .values()
            .any(|tree| tree.collective().title == title)
        {
            return Err(PagesError::DuplicateTitle(title.to_string()));
        }

        let collective = Collective {
            id: CollectiveId(self.next_collective.fetch_add(1, Ordering::Relaxed)),
            title: title.to_string(),
            root_page_id: PageId(self.next_page.fetch_add(1, Ordering::Relaxed)),
        };

        let tree = PageTree::new(collective.clone(), now_millis());
        inner.owners.insert(collective.root_page_id, collective.id);
        inner.trees.insert(collective.id, Arc::new(tree));

        info!(collective_id = %collective.id, title = %collective.title, "created collective");
        Ok(collective)
    }

    pub fn collective(&self, collective_id: CollectiveId) -> Result<Collective> {
        Ok(self.snapshot(collective_id)?.collective().clone())
    }

    /// A consistent snapshot of one collective's tree.
    pub fn snapshot(&self, collective_id: CollectiveId) -> Result<Arc<PageTree>> {
        self.read()?
            .trees
            .get(&collective_id)
            .cloned()
            .ok_or(PagesError::CollectiveNotFound(collective_id))
    }

    /// Snapshot of the tree holding `page_id`.
    pub fn snapshot_for_page(&self, page_id: PageId) -> Result<Arc<PageTree>> {
        let inner = self.read()?;
        let collective_id = inner.owner_of(page_id)?;
        inner
            .trees
            .get(&collective_id)
            .cloned()
            .ok_or(PagesError::CollectiveNotFound(collective_id))
    }

    /// The collective a page belongs to.
    pub fn collective_of(&self, page_id: PageId) -> Result<CollectiveId> {
        self.read()?.owner_of(page_id)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Page reads
    // ─────────────────────────────────────────────────────────────────────────

    pub fn page(&self, page_id: PageId) -> Result<Page> {
        self.snapshot_for_page(page_id)?
            .page(page_id)
            .cloned()
            .ok_or(PagesError::PageNotFound(page_id))
    }

    /// Every page of a collective in tree order.
    pub fn pages_of(&self, collective_id: CollectiveId) -> Result<Vec<Page>> {
        let tree = self.snapshot(collective_id)?;
        Ok(tree
            .tree_order()
            .into_iter()
            .filter_map(|id| tree.page(id).cloned())
            .collect())
    }

    /// Pages whose current content links to `page_id`, most recently
    /// modified first, ties by ascending id.
    pub fn backlinks_of(&self, page_id: PageId) -> Result<Vec<Page>> {
        let tree = self.snapshot_for_page(page_id)?;
        Ok(tree.backlinks_of(page_id))
    }

    /// Pages the current content of `page_id` links to.
    pub fn forward_links_of(&self, page_id: PageId) -> Result<Vec<Page>> {
        let tree = self.snapshot_for_page(page_id)?;
        Ok(tree.forward_links_of(page_id))
    }

    /// Heading structure of a page's current content.
    pub fn outline_of(&self, page_id: PageId) -> Result<Vec<OutlineItem>> {
        let page = self.page(page_id)?;
        Ok(extract_outline(&page.content))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Page writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Create a page under `parent_id` with a freshly allocated id.
    pub fn create_page(
        &self,
        collective_id: CollectiveId,
        parent_id: PageId,
        title: &str,
        content: &str,
    ) -> Result<Page> {
        let id = PageId(self.next_page.fetch_add(1, Ordering::Relaxed));
        let page = Page::new(id, collective_id, Some(parent_id), title).with_content(content);
        self.upsert_page(page)
    }

    /// Insert or update a page.
    ///
    /// Moves are allowed as long as they keep the tree acyclic. On any error
    /// the tree is left unchanged. Sequence numbers and version are assigned
    /// by the index; the values on `page` are ignored.
    pub fn upsert_page(&self, mut page: Page) -> Result<Page> {
        page.title = page.title.trim().to_string();
        let next_id = page
            .id
            .0
            .checked_add(1)
            .ok_or_else(|| PagesError::InvalidPage(format!("page id {} out of range", page.id)))?;

        let mut inner = self.write()?;
        if let Some(owner) = inner.owners.get(&page.id) {
            if *owner != page.collective_id {
                return Err(PagesError::InvalidPage(format!(
                    "page {} belongs to collective {}",
                    page.id, owner
                )));
            }
        }

        // The root page carries the collective title, unique across the index
        let is_root = inner
            .trees
            .get(&page.collective_id)
            .is_some_and(|tree| tree.collective().root_page_id == page.id);
        if is_root
            && inner.trees.iter().any(|(id, tree)| {
                *id != page.collective_id && tree.collective().title == page.title
            })
        {
            return Err(PagesError::DuplicateTitle(page.title));
        }

        let tree = inner.tree_mut(page.collective_id)?;
        tree.validate_upsert(&page)?;
        let stored = Arc::make_mut(tree).apply_upsert(page, now_millis());

        inner.owners.insert(stored.id, stored.collective_id);
        self.next_page.fetch_max(next_id, Ordering::Relaxed);

        debug!(
            collective_id = %stored.collective_id,
            page_id = %stored.id,
            version = stored.version,
            "upserted page"
        );
        Ok(stored)
    }

    /// Replace a page's content, bump its version and swap its backlink
    /// edges in one step.
    pub fn set_content(&self, page_id: PageId, content: impl Into<String>) -> Result<Page> {
        let mut inner = self.write()?;
        let collective_id = inner.owner_of(page_id)?;
        let tree = inner.tree_mut(collective_id)?;
        let stored = Arc::make_mut(tree).set_content(page_id, content.into(), now_millis())?;

        debug!(%collective_id, %page_id, version = stored.version, "set page content");
        Ok(stored)
    }

    /// Remove a page without subpages. The root page cannot be removed.
    pub fn remove_page(&self, page_id: PageId) -> Result<Page> {
        let mut inner = self.write()?;
        let collective_id = inner.owner_of(page_id)?;
        let tree = inner.tree_mut(collective_id)?;
        tree.validate_remove(page_id)?;
        let removed = Arc::make_mut(tree)
            .apply_remove(page_id)
            .ok_or(PagesError::PageNotFound(page_id))?;
        inner.owners.remove(&page_id);

        debug!(%collective_id, %page_id, "removed page");
        Ok(removed)
    }
}

impl Default for PageIndex {
    fn default() -> Self {
        Self::new()
    }
}
