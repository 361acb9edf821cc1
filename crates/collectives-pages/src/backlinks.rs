//! Backlink index: resolved page-to-page references in both directions.

use std::collections::{BTreeSet, HashMap};

use collectives_core::PageId;

/// Edges `(source, target)` of one collective, indexed both ways.
#[derive(Debug, Clone, Default)]
pub struct BacklinkIndex {
    /// source -> pages it links to.
    outgoing: HashMap<PageId, BTreeSet<PageId>>,

    /// target -> pages linking to it.
    incoming: HashMap<PageId, BTreeSet<PageId>>,
}

impl BacklinkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every edge contributed by `source` with edges to `targets`.
    ///
    /// Self references are dropped.
    pub fn replace_source(&mut self, source: PageId, targets: BTreeSet<PageId>) {
        self.clear_source(source);

        let targets: BTreeSet<PageId> = targets.into_iter().filter(|t| *t != source).collect();
        for target in &targets {
            self.incoming.entry(*target).or_default().insert(source);
        }
        if !targets.is_empty() {
            self.outgoing.insert(source, targets);
        }
    }

    /// Drop a page from the index, as source and as target.
    pub fn remove_page(&mut self, page: PageId) {
        self.clear_source(page);

        if let Some(sources) = self.incoming.remove(&page) {
            for source in sources {
                if let Some(targets) = self.outgoing.get_mut(&source) {
                    targets.remove(&page);
                    if targets.is_empty() {
                        self.outgoing.remove(&source);
                    }
                }
            }
        }
    }

    /// Pages linking to `target`, by id.
    pub fn sources_of(&self, target: PageId) -> impl Iterator<Item = PageId> + '_ {
        self.incoming.get(&target).into_iter().flatten().copied()
    }

    /// Pages `source` links to, by id.
    pub fn targets_of(&self, source: PageId) -> impl Iterator<Item = PageId> + '_ {
        self.outgoing.get(&source).into_iter().flatten().copied()
    }

    pub fn contains(&self, source: PageId, target: PageId) -> bool {
        self.outgoing
            .get(&source)
            .is_some_and(|targets| targets.contains(&target))
    }

    /// Total number of edges.
    pub fn edge_count(&self) -> usize {
        self.outgoing.values().map(BTreeSet::len).sum()
    }

    fn clear_source(&mut self, source: PageId) {
        if let Some(old) = self.outgoing.remove(&source) {
            for target in old {
                if let Some(sources) = self.incoming.get_mut(&target) {
                    sources.remove(&source);
                    if sources.is_empty() {
                        self.incoming.remove(&target);
                    }
                }
            }
        }
    }
}
