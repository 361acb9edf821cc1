//! Proptest generators for property-based testing.

use proptest::prelude::*;

use collectives_core::{ShareTier, ShareToken};

/// Generate a random ShareToken.
pub fn share_token() -> impl Strategy<Value = ShareToken> {
    any::<[u8; 32]>().prop_map(ShareToken::from_bytes)
}

/// Generate a ShareTier.
pub fn share_tier() -> impl Strategy<Value = ShareTier> {
    prop_oneof![Just(ShareTier::ReadOnly), Just(ShareTier::Edit)]
}

/// Generate the shape of a page tree with up to `max_pages` pages below the
/// root.
///
/// Element `i` picks the parent of page `i` among the root (0) and pages
/// `0..i` (1-based), so every shape is a valid tree.
pub fn tree_shape(max_pages: usize) -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(any::<prop::sample::Index>(), 0..=max_pages).prop_map(|picks| {
        picks
            .iter()
            .enumerate()
            .map(|(i, pick)| pick.index(i + 1))
            .collect()
    })
}

/// A share management call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareOp {
    Create,
    Update(ShareTier),
    Delete,
}

/// Generate a sequence of share management calls.
pub fn share_ops(max_len: usize) -> impl Strategy<Value = Vec<ShareOp>> {
    let op = prop_oneof![
        Just(ShareOp::Create),
        share_tier().prop_map(ShareOp::Update),
        Just(ShareOp::Delete),
    ];
    prop::collection::vec(op, 0..=max_len)
}

/// Generate link sets: for each of `pages` pages, the pages it links to.
pub fn link_sets(pages: usize) -> impl Strategy<Value = Vec<Vec<usize>>> {
    prop::collection::vec(
        prop::collection::vec(0..pages.max(1), 0..=pages),
        pages,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn test_tree_shape_parents_precede_children(shape in tree_shape(32)) {
            for (i, parent) in shape.iter().enumerate() {
                prop_assert!(*parent <= i);
            }
        }

        #[test]
        fn test_share_tokens_differ(a in share_token(), b in share_token()) {
            prop_assume!(a.as_bytes() != b.as_bytes());
            prop_assert_ne!(a.digest(), b.digest());
        }

        #[test]
        fn test_link_sets_in_range(sets in link_sets(6)) {
            prop_assert_eq!(sets.len(), 6);
            for targets in sets {
                prop_assert!(targets.iter().all(|t| *t < 6));
            }
        }
    }
}
