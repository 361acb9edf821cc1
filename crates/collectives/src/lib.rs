//! # Collectives
//!
//! Share links, permission gating and the page/backlink index for
//! collectives: named trees of pages that members can open to the public
//! through a single share link.
//!
//! ## Overview
//!
//! - **Share links**: a collective has zero or one active link. New links
//!   are read-only; members can switch them to editable and back, or delete
//!   them. A deleted token is never valid again.
//! - **Permission gate**: every request is checked for `Read`, `Write` or
//!   `ManageShare`. Members may do everything; link holders may read, and
//!   write if the link is editable. Managing the link is for members only.
//! - **Pages**: a tree per collective with backlinks kept current on every
//!   write, heading outlines and a page filter.
//! - **Edit sessions**: opening one needs write access, and so does every
//!   write through it.
//!
//! Denials never reach a client as such. At the [`api`] boundary a missing
//! collective, a revoked link and an insufficient tier all become the same
//! `404 {"error": "not_found"}`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use collectives::{Collectives, CollectivesConfig, ShareTier};
//! use collectives::core::MemberId;
//! use collectives::perms::{RequestContext, SessionAuthenticator, StaticMemberDirectory};
//! use collectives::store::SqliteTokenStore;
//!
//! async fn example() -> collectives::Result<()> {
//!     let auth = Arc::new(SessionAuthenticator::new());
//!     auth.login("session-1", MemberId::new("bob"))?;
//!     let directory = Arc::new(StaticMemberDirectory::new());
//!
//!     let app = Collectives::new(
//!         SqliteTokenStore::open("shares.db")?,
//!         auth,
//!         directory.clone(),
//!         CollectivesConfig::default(),
//!     )?;
//!
//!     let collective = app.create_collective("Share me")?;
//!     directory.add_member(collective.id, MemberId::new("bob"))?;
//!
//!     let bob = RequestContext::with_session("session-1");
//!     let share = app.create_share(&bob, collective.id).await?;
//!     println!("share link: {}", share.url);
//!
//!     app.update_share_tier(&bob, collective.id, ShareTier::Edit).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `collectives::core` - identifiers, pages, share tokens, link parsing
//! - `collectives::store` - token storage (memory and SQLite)
//! - `collectives::perms` - the permission gate and auth collaborators
//! - `collectives::pages` - page tree, backlinks and search

pub mod api;
pub mod collectives;
pub mod config;
pub mod error;
pub mod locks;
pub mod sessions;
pub mod share;

// Re-export component crates
pub use collectives_core as core;
pub use collectives_pages as pages;
pub use collectives_perms as perms;
pub use collectives_store as store;

pub use api::{handle, Method, Request, Response};
pub use crate::collectives::{Collectives, PageUpdate, SharedCollective, WELCOME_CONTENT};
pub use config::CollectivesConfig;
pub use error::{ApiError, CollectivesError, Result};
pub use locks::CollectiveLocks;
pub use sessions::{EditSession, EditSessions, SessionId};
pub use share::{Share, ShareService};

pub use collectives_core::{
    Collective, CollectiveId, MemberId, OutlineItem, Page, PageId, ShareTier, ShareToken,
};
pub use collectives_pages::SearchMode;
