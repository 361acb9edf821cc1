//! # Collectives Testkit
//!
//! Testing utilities for collectives.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fixtures**: a ready [`Collectives`](collectives::Collectives) service
//!   with a logged-in member, and the seeded "Share me" and "Our Garden"
//!   collectives
//! - **Link vectors**: markdown snippets with the link targets they must
//!   parse to
//! - **Generators**: proptest strategies for tokens, tiers, page trees and
//!   share operation sequences
//!
//! ## Test Fixtures
//!
//! ```rust
//! use collectives_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let garden = fixture.our_garden();
//! assert_eq!(garden.collective.title, "Our Garden");
//! ```
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use collectives_testkit::generators::share_ops;
//!
//! proptest! {
//!     #[test]
//!     fn at_most_one_share(ops in share_ops(16)) {
//!         // apply ops, check the invariant
//!     }
//! }
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{OurGarden, TestFixture, DAY_2_CONTENT, MEMBER, MEMBER_SESSION};
pub use generators::{link_sets, share_ops, share_tier, share_token, tree_shape, ShareOp};
pub use vectors::{all_vectors, verify_all_vectors, LinkVector};
