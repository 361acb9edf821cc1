//! # Collectives Pages
//!
//! The page tree of every collective, the backlink index derived from page
//! content, and title search.
//!
//! ## Overview
//!
//! [`PageIndex`] owns one [`PageTree`] per collective. Each tree is held
//! behind an `Arc` and replaced copy-on-write, so a reader that took a
//! snapshot keeps seeing one consistent version while a writer prepares the
//! next one. Writes validate first and mutate second: a rejected write leaves
//! the tree untouched.
//!
//! ## Backlinks
//!
//! Content is parsed into link targets when it is written. The targets are
//! resolved against the tree and the page's edges in the [`BacklinkIndex`]
//! are replaced in the same step. Structural changes (new pages, renames,
//! moves, removals) re-resolve the cached targets of every page, so links to
//! a page that appears later start counting as soon as it exists.
//!
//! ## Search
//!
//! [`PageIndex::search`] walks a snapshot lazily in tree order: ancestors
//! before descendants, siblings in creation order.

pub mod backlinks;
pub mod error;
pub mod index;
pub mod search;
pub mod tree;

pub use backlinks::BacklinkIndex;
pub use error::{PagesError, Result};
pub use index::PageIndex;
pub use search::{SearchMode, SearchResults};
pub use tree::PageTree;
