//! # Collectives Store
//!
//! Durable mapping of opaque share tokens to share grants.
//!
//! ## Overview
//!
//! The store abstracts grant persistence behind the [`TokenStore`] trait so
//! that the permission gate and the share service are storage-agnostic. The
//! primary implementation is [`SqliteTokenStore`], with [`MemoryTokenStore`]
//! for tests and ephemeral deployments.
//!
//! ## Key Types
//!
//! - [`TokenStore`] - The async trait for all grant storage operations
//! - [`TokenStoreExt`] - Lookup by the hex form presented in share URLs
//! - [`SqliteTokenStore`] - SQLite-based persistent storage
//! - [`MemoryTokenStore`] - In-memory storage
//!
//! ## Usage
//!
//! ```rust,no_run
//! use collectives_core::{now_millis, CollectiveId, ShareGrant, ShareToken};
//! use collectives_store::{SqliteTokenStore, TokenStore};
//!
//! async fn example() {
//!     let store = SqliteTokenStore::open("shares.db").unwrap();
//!
//!     let token = ShareToken::generate();
//!     let grant = ShareGrant::new(token, CollectiveId(1), now_millis());
//!     store.put(&token, &grant).await.unwrap();
//!
//!     assert!(store.get(&token).await.unwrap().is_some());
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **No enumeration**: tokens can only be looked up, never listed
//! - **Uniform absence**: unknown, deleted and malformed tokens all resolve to `None`
//! - **One grant per collective**: a second token for the same collective is a `Conflict`
//! - **No reuse**: deleted tokens are retired by digest and rejected by `put`

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryTokenStore;
pub use sqlite::SqliteTokenStore;
pub use traits::{TokenStore, TokenStoreExt};
