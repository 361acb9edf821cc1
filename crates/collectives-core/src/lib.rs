//! # Collectives Core
//!
//! Pure primitives for collectives: identifiers, pages, share grants,
//! link extraction and outline extraction.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`CollectiveId`], [`PageId`], [`MemberId`] - Strong identifiers
//! - [`ShareToken`] - Opaque, unguessable share link token
//! - [`ShareGrant`] - Binds a token to a collective and a [`ShareTier`]
//! - [`Collective`], [`Page`] - The page tree model
//!
//! ## Parsing
//!
//! - [`links`] extracts link targets from page content for the backlink index
//! - [`outline`] extracts the heading structure used for tables of contents

pub mod error;
pub mod links;
pub mod outline;
pub mod page;
pub mod share;
pub mod types;

pub use error::{CoreError, Result};
pub use links::{extract_links, LinkTarget};
pub use outline::{extract_outline, OutlineItem};
pub use page::{validate_title, Collective, Page};
pub use share::{ShareGrant, ShareTier, ShareToken};
pub use types::{now_millis, CollectiveId, MemberId, PageId};
