//! Property tests for the share lifecycle and the page index.

use std::collections::BTreeSet;

use proptest::prelude::*;

use collectives::pages::{PageIndex, PagesError};
use collectives::{CollectivesError, PageId, ShareTier, ShareToken};
use collectives_testkit::{link_sets, share_ops, tree_shape, ShareOp, TestFixture};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// Build a collective shaped like `shape`. Index 0 is the root; page `i + 1`
/// hangs under `shape[i]`.
fn build_tree(index: &PageIndex, shape: &[usize]) -> Vec<PageId> {
    let collective = index.create_collective("Garden").unwrap();
    let mut ids = vec![collective.root_page_id];
    for (i, parent) in shape.iter().enumerate() {
        let page = index
            .create_page(collective.id, ids[*parent], &format!("P{}", i + 1), "")
            .unwrap();
        ids.push(page.id);
    }
    ids
}

fn is_descendant(shape: &[usize], page: usize, ancestor: usize) -> bool {
    let mut current = page;
    loop {
        if current == ancestor {
            return true;
        }
        if current == 0 {
            return false;
        }
        current = shape[current - 1];
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn test_share_ops_keep_one_grant(ops in share_ops(12)) {
        runtime().block_on(async {
            let fixture = TestFixture::new();
            let c = fixture.share_me().id;
            let member = fixture.member();

            let mut active: Option<(ShareToken, ShareTier)> = None;
            let mut retired: Vec<ShareToken> = Vec::new();

            for op in ops {
                match op {
                    ShareOp::Create => {
                        let result = fixture.app.create_share(&member, c).await;
                        if active.is_some() {
                            prop_assert!(matches!(
                                result,
                                Err(CollectivesError::AlreadyShared(_))
                            ));
                        } else {
                            let share = result.unwrap();
                            prop_assert_eq!(share.tier, ShareTier::ReadOnly);
                            prop_assert!(!retired.contains(&share.token));
                            active = Some((share.token, share.tier));
                        }
                    }
                    ShareOp::Update(tier) => {
                        let result = fixture.app.update_share_tier(&member, c, tier).await;
                        match &mut active {
                            Some((token, current)) => {
                                let share = result.unwrap();
                                prop_assert_eq!(&share.token, &*token);
                                prop_assert_eq!(share.tier, tier);
                                *current = tier;
                            }
                            None => prop_assert!(matches!(
                                result,
                                Err(CollectivesError::NoActiveShare(_))
                            )),
                        }
                    }
                    ShareOp::Delete => {
                        let result = fixture.app.delete_share(&member, c).await;
                        match active.take() {
                            Some((token, _)) => {
                                result.unwrap();
                                retired.push(token);
                            }
                            None => prop_assert!(matches!(
                                result,
                                Err(CollectivesError::NoActiveShare(_))
                            )),
                        }
                    }
                }

                // The store agrees with the model
                let share = fixture.app.get_share(&member, c).await;
                match &active {
                    Some((token, tier)) => {
                        let share = share.unwrap();
                        prop_assert_eq!(&share.token, token);
                        prop_assert_eq!(share.tier, *tier);
                    }
                    None => prop_assert!(share.is_err()),
                }

                // Retired tokens open nothing
                for token in &retired {
                    let visitor = fixture.visitor(token);
                    prop_assert!(matches!(
                        fixture.app.pages_of(&visitor, c).await,
                        Err(CollectivesError::AuthorizationDenied)
                    ));
                }
            }
            Ok(())
        })?;
    }

    #[test]
    fn test_backlinks_match_links(
        shape in tree_shape(8),
        links in link_sets(9),
    ) {
        let index = PageIndex::new();
        let ids = build_tree(&index, &shape);
        let count = ids.len();

        // Page i links to every page j in links[i] by title
        for (i, targets) in links.iter().enumerate().take(count) {
            let content: String = targets
                .iter()
                .filter(|j| **j < count)
                .map(|j| format!("[[{}]] ", title(*j)))
                .collect();
            index.set_content(ids[i], content).unwrap();
        }

        for j in 0..count {
            let expected: BTreeSet<PageId> = links
                .iter()
                .enumerate()
                .take(count)
                .filter(|(i, targets)| *i != j && targets.contains(&j))
                .map(|(i, _)| ids[i])
                .collect();
            let actual: BTreeSet<PageId> = index
                .backlinks_of(ids[j])
                .unwrap()
                .into_iter()
                .map(|p| p.id)
                .collect();
            prop_assert_eq!(actual, expected);
        }

        // Clearing every page clears every backlink
        for id in &ids {
            index.set_content(*id, "").unwrap();
        }
        for id in &ids {
            prop_assert!(index.backlinks_of(*id).unwrap().is_empty());
        }
    }

    #[test]
    fn test_cycle_rejection_leaves_tree_unchanged(
        shape in tree_shape(10),
        page in any::<prop::sample::Index>(),
        target in any::<prop::sample::Index>(),
    ) {
        prop_assume!(!shape.is_empty());
        let index = PageIndex::new();
        let ids = build_tree(&index, &shape);
        let collective = index.collective_of(ids[0]).unwrap();

        // A non-root page and one of its own descendants (or itself)
        let moved = 1 + page.index(shape.len());
        let descendants: Vec<usize> = (1..ids.len())
            .filter(|d| is_descendant(&shape, *d, moved))
            .collect();
        let under = descendants[target.index(descendants.len())];

        let before = index.pages_of(collective).unwrap();
        let mut page = index.page(ids[moved]).unwrap();
        page.parent_id = Some(ids[under]);

        let result = index.upsert_page(page);
        let is_cycle = matches!(result, Err(PagesError::CycleDetected { .. }));
        prop_assert!(is_cycle, "expected a cycle, got {:?}", result);
        prop_assert_eq!(index.pages_of(collective).unwrap(), before);
    }
}

fn title(i: usize) -> String {
    if i == 0 {
        "Garden".to_string()
    } else {
        format!("P{}", i)
    }
}
