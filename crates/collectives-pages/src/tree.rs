//! The page tree of one collective.
//!
//! A `PageTree` is a value: the index clones it on write and swaps it in,
//! so every method here either reads or mutates a tree nobody else sees.

use std::collections::{BTreeSet, HashMap};

use collectives_core::{
    extract_links, validate_title, Collective, LinkTarget, Page, PageId,
};

use crate::backlinks::BacklinkIndex;
use crate::error::{PagesError, Result};

/// Pages, hierarchy, parsed links and backlinks of one collective.
#[derive(Debug, Clone)]
pub struct PageTree {
    collective: Collective,

    pages: HashMap<PageId, Page>,

    /// parent -> children, ordered by creation.
    children: HashMap<PageId, Vec<PageId>>,

    /// Link targets parsed from each page's current content.
    links: HashMap<PageId, Vec<LinkTarget>>,

    backlinks: BacklinkIndex,

    /// Logical clock, ticked once per write.
    clock: u64,

    /// Number of pages ever created, used for `created_seq`.
    created: u64,
}

impl PageTree {
    /// Create a tree holding only the collective's root page.
    pub(crate) fn new(collective: Collective, now: i64) -> Self {
        let mut root = Page::new(
            collective.root_page_id,
            collective.id,
            None,
            collective.title.clone(),
        );
        root.created_seq = 1;
        root.modified_seq = 1;
        root.updated_at = now;

        let mut pages = HashMap::new();
        pages.insert(root.id, root);

        Self {
            collective,
            pages,
            children: HashMap::new(),
            links: HashMap::new(),
            backlinks: BacklinkIndex::new(),
            clock: 1,
            created: 1,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Reads
    // ─────────────────────────────────────────────────────────────────────────

    pub fn collective(&self) -> &Collective {
        &self.collective
    }

    pub fn root(&self) -> Option<&Page> {
        self.pages.get(&self.collective.root_page_id)
    }

    pub fn page(&self, id: PageId) -> Option<&Page> {
        self.pages.get(&id)
    }

    pub fn contains(&self, id: PageId) -> bool {
        self.pages.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    /// Direct children in creation order.
    pub fn children_of(&self, id: PageId) -> &[PageId] {
        self.children.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn backlinks(&self) -> &BacklinkIndex {
        &self.backlinks
    }

    /// Page ids in tree order: preorder, siblings by creation.
    pub fn tree_order(&self) -> Vec<PageId> {
        let mut order = Vec::with_capacity(self.pages.len());
        let mut stack = vec![self.collective.root_page_id];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children_of(id).iter().rev());
        }
        order
    }

    /// Titles from below the root down to the page. Empty for the root.
    pub fn path_of(&self, id: PageId) -> Option<Vec<String>> {
        let mut path = Vec::new();
        let mut current = self.pages.get(&id)?;
        while let Some(parent) = current.parent_id {
            path.push(current.title.clone());
            current = self.pages.get(&parent)?;
        }
        path.reverse();
        Some(path)
    }

    /// Pages linking to `id`: most recently modified first, then by id.
    pub fn backlinks_of(&self, id: PageId) -> Vec<Page> {
        let mut sources: Vec<&Page> = self
            .backlinks
            .sources_of(id)
            .filter_map(|source| self.pages.get(&source))
            .collect();
        sources.sort_by(|a, b| {
            b.modified_seq
                .cmp(&a.modified_seq)
                .then_with(|| a.id.cmp(&b.id))
        });
        sources.into_iter().cloned().collect()
    }

    /// Pages `id` links to, by id.
    pub fn forward_links_of(&self, id: PageId) -> Vec<Page> {
        self.backlinks
            .targets_of(id)
            .filter_map(|target| self.pages.get(&target))
            .cloned()
            .collect()
    }

    /// Resolve a link found in `source`'s content to a page of this tree.
    pub fn resolve(&self, source: PageId, target: &LinkTarget) -> Option<PageId> {
        match target {
            LinkTarget::PageId(id) => self.pages.contains_key(id).then_some(*id),
            LinkTarget::Absolute { collective, path } => {
                if collective != &self.collective.title {
                    return None;
                }
                self.walk(self.collective.root_page_id, path)
            }
            LinkTarget::Relative { up, path } => {
                let page = self.pages.get(&source)?;
                let mut base = page.parent_id.unwrap_or(page.id);
                for _ in 0..*up {
                    base = self.pages.get(&base)?.parent_id?;
                }
                self.walk(base, path)
            }
            LinkTarget::Title(title) => self.find_by_title(title),
        }
    }

    fn walk(&self, from: PageId, path: &[String]) -> Option<PageId> {
        let mut current = from;
        for segment in path {
            let children = self.children_of(current);
            current = children
                .iter()
                .find(|id| self.pages.get(*id).is_some_and(|p| &p.title == segment))
                .or_else(|| {
                    children.iter().find(|id| {
                        self.pages
                            .get(*id)
                            .is_some_and(|p| p.title.to_lowercase() == segment.to_lowercase())
                    })
                })
                .copied()?;
        }
        Some(current)
    }

    fn find_by_title(&self, title: &str) -> Option<PageId> {
        let wanted = title.to_lowercase();
        self.tree_order().into_iter().find(|id| {
            self.pages
                .get(id)
                .is_some_and(|p| p.title.to_lowercase() == wanted)
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────

    /// Check that `page` can be inserted or updated without breaking the
    /// tree. Nothing is modified.
    pub(crate) fn validate_upsert(&self, page: &Page) -> Result<()> {
        if page.collective_id != self.collective.id {
            return Err(PagesError::InvalidPage(format!(
                "page {} belongs to collective {}, not {}",
                page.id, page.collective_id, self.collective.id
            )));
        }
        validate_title(&page.title)?;

        let is_root = page.id == self.collective.root_page_id;
        if is_root {
            if page.parent_id.is_some() {
                return Err(PagesError::InvalidPage("the root page cannot be moved".into()));
            }
            return Ok(());
        }

        let parent = page.parent_id.ok_or_else(|| {
            PagesError::InvalidPage("collective already has a root page".into())
        })?;
        if !self.pages.contains_key(&parent) {
            return Err(PagesError::ParentNotFound(parent));
        }

        // Walk up from the new parent; meeting the page itself means a cycle
        let mut cursor = Some(parent);
        while let Some(id) = cursor {
            if id == page.id {
                return Err(PagesError::CycleDetected {
                    page: page.id,
                    parent,
                });
            }
            cursor = self.pages.get(&id).and_then(|p| p.parent_id);
        }

        let taken = self.children_of(parent).iter().any(|sibling| {
            *sibling != page.id
                && self
                    .pages
                    .get(sibling)
                    .is_some_and(|p| p.title == page.title)
        });
        if taken {
            return Err(PagesError::DuplicateTitle(page.title.clone()));
        }

        Ok(())
    }

    /// Insert or update a validated page and return the stored version.
    pub(crate) fn apply_upsert(&mut self, mut page: Page, now: i64) -> Page {
        self.clock += 1;

        let previous = self
            .pages
            .get(&page.id)
            .map(|p| (p.parent_id, p.title.clone(), p.content.clone(), p.version, p.created_seq));

        let (structural, content_changed) = match previous {
            Some((old_parent, old_title, old_content, old_version, created_seq)) => {
                let content_changed = old_content != page.content;
                page.created_seq = created_seq;
                page.version = if content_changed { old_version + 1 } else { old_version };

                if old_parent != page.parent_id {
                    if let Some(old_parent) = old_parent {
                        self.detach(old_parent, page.id);
                    }
                    if let Some(new_parent) = page.parent_id {
                        self.attach(new_parent, page.id, created_seq);
                    }
                }

                (old_parent != page.parent_id || old_title != page.title, content_changed)
            }
            None => {
                self.created += 1;
                page.created_seq = self.created;
                page.version = u64::from(!page.content.is_empty());
                if let Some(parent) = page.parent_id {
                    self.attach(parent, page.id, page.created_seq);
                }
                (true, true)
            }
        };

        page.modified_seq = self.clock;
        page.updated_at = now;

        if page.id == self.collective.root_page_id {
            self.collective.title = page.title.clone();
        }
        if content_changed {
            self.links.insert(page.id, extract_links(&page.content));
        }

        let id = page.id;
        self.pages.insert(id, page.clone());

        if structural {
            self.reindex_all();
        } else if content_changed {
            self.reindex_page(id);
        }

        page
    }

    /// Replace a page's content and its outgoing edges.
    pub(crate) fn set_content(&mut self, id: PageId, content: String, now: i64) -> Result<Page> {
        if !self.pages.contains_key(&id) {
            return Err(PagesError::PageNotFound(id));
        }
        self.clock += 1;
        let clock = self.clock;
        let links = extract_links(&content);

        let page = self
            .pages
            .get_mut(&id)
            .ok_or(PagesError::PageNotFound(id))?;
        page.content = content;
        page.version += 1;
        page.modified_seq = clock;
        page.updated_at = now;
        let updated = page.clone();

        self.links.insert(id, links);
        self.reindex_page(id);

        Ok(updated)
    }

    /// Check that a page can be removed.
    pub(crate) fn validate_remove(&self, id: PageId) -> Result<()> {
        if !self.pages.contains_key(&id) {
            return Err(PagesError::PageNotFound(id));
        }
        if id == self.collective.root_page_id {
            return Err(PagesError::InvalidPage("the root page cannot be removed".into()));
        }
        if !self.children_of(id).is_empty() {
            return Err(PagesError::InvalidPage(format!("page {} has subpages", id)));
        }
        Ok(())
    }

    /// Remove a validated leaf page.
    pub(crate) fn apply_remove(&mut self, id: PageId) -> Option<Page> {
        let page = self.pages.remove(&id)?;
        self.clock += 1;
        if let Some(parent) = page.parent_id {
            self.detach(parent, id);
        }
        self.children.remove(&id);
        self.links.remove(&id);
        self.backlinks.remove_page(id);
        self.reindex_all();
        Some(page)
    }

    fn attach(&mut self, parent: PageId, id: PageId, created_seq: u64) {
        let pages = &self.pages;
        let siblings = self.children.entry(parent).or_default();
        let position = siblings
            .iter()
            .position(|s| pages.get(s).is_some_and(|p| p.created_seq > created_seq))
            .unwrap_or(siblings.len());
        siblings.insert(position, id);
    }

    fn detach(&mut self, parent: PageId, id: PageId) {
        if let Some(siblings) = self.children.get_mut(&parent) {
            siblings.retain(|s| *s != id);
            if siblings.is_empty() {
                self.children.remove(&parent);
            }
        }
    }

    fn reindex_page(&mut self, id: PageId) {
        let targets: BTreeSet<PageId> = self
            .links
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|target| self.resolve(id, target))
            .collect();
        self.backlinks.replace_source(id, targets);
    }

    fn reindex_all(&mut self) {
        let sources: Vec<PageId> = self.links.keys().copied().collect();
        for source in sources {
            self.reindex_page(source);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use collectives_core::CollectiveId;

    fn garden() -> PageTree {
        PageTree::new(
            Collective {
                id: CollectiveId(1),
                title: "Our Garden".into(),
                root_page_id: PageId(1),
            },
            0,
        )
    }

    fn add(tree: &mut PageTree, id: u64, parent: u64, title: &str) -> Page {
        let page = Page::new(PageId(id), CollectiveId(1), Some(PageId(parent)), title);
        tree.validate_upsert(&page).unwrap();
        tree.apply_upsert(page, 0)
    }

    #[test]
    fn test_tree_order_follows_creation() {
        let mut tree = garden();
        add(&mut tree, 2, 1, "Day 1");
        add(&mut tree, 3, 1, "Day 2");
        add(&mut tree, 4, 2, "Morning");

        let order = tree.tree_order();
        assert_eq!(order, vec![PageId(1), PageId(2), PageId(4), PageId(3)]);
        assert_eq!(tree.path_of(PageId(4)).unwrap(), vec!["Day 1", "Morning"]);
    }

    #[test]
    fn test_reparent_keeps_creation_order() {
        let mut tree = garden();
        add(&mut tree, 2, 1, "A");
        add(&mut tree, 3, 1, "B");
        add(&mut tree, 4, 2, "C");

        // Move C to the root, it was created after A and B
        let mut moved = tree.page(PageId(4)).unwrap().clone();
        moved.parent_id = Some(PageId(1));
        tree.validate_upsert(&moved).unwrap();
        tree.apply_upsert(moved, 0);

        assert_eq!(tree.children_of(PageId(1)), &[PageId(2), PageId(3), PageId(4)]);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut tree = garden();
        add(&mut tree, 2, 1, "A");
        add(&mut tree, 3, 2, "B");

        let mut a = tree.page(PageId(2)).unwrap().clone();
        a.parent_id = Some(PageId(3));
        assert!(matches!(
            tree.validate_upsert(&a),
            Err(PagesError::CycleDetected { .. })
        ));

        a.parent_id = Some(PageId(2));
        assert!(matches!(
            tree.validate_upsert(&a),
            Err(PagesError::CycleDetected { .. })
        ));
    }

    #[test]
    fn test_second_root_and_duplicate_titles_rejected() {
        let mut tree = garden();
        add(&mut tree, 2, 1, "A");

        let orphan = Page::new(PageId(9), CollectiveId(1), None, "Orphan");
        assert!(matches!(tree.validate_upsert(&orphan), Err(PagesError::InvalidPage(_))));

        let twin = Page::new(PageId(10), CollectiveId(1), Some(PageId(1)), "A");
        assert!(matches!(tree.validate_upsert(&twin), Err(PagesError::DuplicateTitle(_))));
    }

    #[test]
    fn test_link_resolution() {
        let mut tree = garden();
        add(&mut tree, 2, 1, "Day 1");
        add(&mut tree, 3, 1, "Day 2");
        add(&mut tree, 4, 3, "Notes");

        let abs = LinkTarget::Absolute {
            collective: "Our Garden".into(),
            path: vec!["Day 1".into()],
        };
        assert_eq!(tree.resolve(PageId(3), &abs), Some(PageId(2)));

        let other = LinkTarget::Absolute {
            collective: "Elsewhere".into(),
            path: vec!["Day 1".into()],
        };
        assert_eq!(tree.resolve(PageId(3), &other), None);

        let sibling = LinkTarget::Relative {
            up: 0,
            path: vec!["Day 1".into()],
        };
        assert_eq!(tree.resolve(PageId(3), &sibling), Some(PageId(2)));

        let up = LinkTarget::Relative {
            up: 1,
            path: vec!["Day 1".into()],
        };
        assert_eq!(tree.resolve(PageId(4), &up), Some(PageId(2)));

        assert_eq!(
            tree.resolve(PageId(2), &LinkTarget::Title("notes".into())),
            Some(PageId(4))
        );
        assert_eq!(tree.resolve(PageId(2), &LinkTarget::PageId(PageId(99))), None);
    }

    #[test]
    fn test_link_to_later_page_resolves_on_creation() {
        let mut tree = garden();
        add(&mut tree, 2, 1, "Day 2");
        tree.set_content(PageId(2), "[[Day 1]]".into(), 0).unwrap();
        assert_eq!(tree.backlinks().edge_count(), 0);

        add(&mut tree, 3, 1, "Day 1");
        assert!(tree.backlinks().contains(PageId(2), PageId(3)));
    }

    #[test]
    fn test_remove_page() {
        let mut tree = garden();
        add(&mut tree, 2, 1, "A");
        add(&mut tree, 3, 2, "B");
        tree.set_content(PageId(1), "[[B]]".into(), 0).unwrap();

        assert!(tree.validate_remove(PageId(2)).is_err());
        assert!(tree.validate_remove(PageId(1)).is_err());
        tree.validate_remove(PageId(3)).unwrap();
        tree.apply_remove(PageId(3));

        assert!(!tree.contains(PageId(3)));
        assert_eq!(tree.backlinks().edge_count(), 0);
        assert!(tree.children_of(PageId(2)).is_empty());
    }
}
