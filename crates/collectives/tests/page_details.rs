//! Page details over the "Our Garden" collective: backlinks, outlines and
//! the page filter, read through both member and share link credentials.

use serde_json::json;

use collectives::{handle, CollectivesConfig, PageUpdate, Request, SearchMode, ShareTier};
use collectives_testkit::{TestFixture, DAY_2_CONTENT};

#[tokio::test]
async fn test_backlinks_follow_content() {
    let fixture = TestFixture::new();
    let garden = fixture.our_garden();
    let c = garden.collective.id;
    let member = fixture.member();

    let backlinks = fixture
        .app
        .backlinks_of(&member, c, garden.day1.id)
        .await
        .unwrap();
    let titles: Vec<_> = backlinks.iter().map(|p| p.title.as_str()).collect();
    assert_eq!(titles, vec!["Day 2"]);

    let forward = fixture
        .app
        .forward_links_of(&member, c, garden.day2.id)
        .await
        .unwrap();
    assert_eq!(forward.len(), 1);
    assert_eq!(forward[0].id, garden.day1.id);

    // Dropping the link drops the backlink on the same write
    fixture
        .app
        .update_page(
            &member,
            c,
            garden.day2.id,
            PageUpdate {
                content: Some("No links any more.".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(fixture
        .app
        .backlinks_of(&member, c, garden.day1.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_renamed_page_loses_backlinks() {
    let fixture = TestFixture::new();
    let garden = fixture.our_garden();
    let c = garden.collective.id;
    let member = fixture.member();

    // Link by title from the table of contents
    fixture
        .app
        .update_page(
            &member,
            c,
            garden.table_of_contents.id,
            PageUpdate {
                content: Some("## Second-Level Heading\n\n[[Day 1]]".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let titles: Vec<_> = fixture
        .app
        .backlinks_of(&member, c, garden.day1.id)
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.title)
        .collect();
    // Most recently modified first
    assert_eq!(titles, vec!["TableOfContents", "Day 2"]);

    // After the rename neither the path link nor the title link resolves
    fixture
        .app
        .update_page(
            &member,
            c,
            garden.day1.id,
            PageUpdate {
                title: Some("First Day".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(fixture
        .app
        .backlinks_of(&member, c, garden.day1.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_details_through_share_link() {
    let fixture = TestFixture::new();
    let garden = fixture.our_garden();
    let c = garden.collective.id;
    let share = fixture
        .app
        .create_share(&fixture.member(), c)
        .await
        .unwrap();
    let visitor = fixture.visitor(&share.token);

    let response = handle(
        &fixture.app,
        Request::get(format!(
            "/p/collectives/{}/pages/{}/backlinks",
            c, garden.day1.id
        ))
        .with_context(visitor.clone()),
    )
    .await;
    assert_eq!(response.status, 200);
    assert_eq!(response.body[0]["title"], "Day 2");
    assert_eq!(response.body[0]["content"], DAY_2_CONTENT);

    let response = handle(
        &fixture.app,
        Request::get(format!(
            "/p/collectives/{}/pages/{}/outline",
            c, garden.table_of_contents.id
        ))
        .with_context(visitor),
    )
    .await;
    assert_eq!(response.status, 200);
    assert_eq!(
        response.body,
        json!([{
            "level": 2,
            "depth": 0,
            "text": "Second-Level Heading",
            "anchor": "h-second-level-heading"
        }])
    );
}

#[tokio::test]
async fn test_title_filter_in_tree_order() {
    let fixture = TestFixture::with_config(CollectivesConfig {
        search_mode: SearchMode::Title,
        ..Default::default()
    });
    let garden = fixture.our_garden();
    let c = garden.collective.id;
    let root = garden.collective.root_page_id;

    let share = fixture
        .app
        .create_share(&fixture.member(), c)
        .await
        .unwrap();
    fixture
        .app
        .update_share_tier(&fixture.member(), c, ShareTier::Edit)
        .await
        .unwrap();
    let visitor = fixture.visitor(&share.token);

    // Created out of tree order: "Another Page" sits after "Day 1"'s subtree
    fixture
        .app
        .create_page(&visitor, c, root, "Another Page", "")
        .await
        .unwrap();
    fixture
        .app
        .create_page(&visitor, c, garden.day1.id, "First page", "")
        .await
        .unwrap();

    let titles: Vec<_> = fixture
        .app
        .search(&visitor, c, "page")
        .await
        .unwrap()
        .map(|p| p.title)
        .collect();
    assert_eq!(titles, vec!["First page", "Another Page"]);

    // Members see the same result
    let member_titles: Vec<_> = fixture
        .app
        .search(&fixture.member(), c, "PAGE")
        .await
        .unwrap()
        .map(|p| p.title)
        .collect();
    assert_eq!(member_titles, titles);

    assert_eq!(fixture.app.search(&visitor, c, "").await.unwrap().count(), 0);
}

#[tokio::test]
async fn test_remove_page_rules() {
    let fixture = TestFixture::new();
    let garden = fixture.our_garden();
    let c = garden.collective.id;
    let member = fixture.member();

    let child = fixture.seed_page(&garden.collective, garden.day1.id, "Morning", "");

    // Pages with subpages stay
    let response = handle(
        &fixture.app,
        Request::delete(format!("/collectives/{}/pages/{}", c, garden.day1.id))
            .with_context(member.clone()),
    )
    .await;
    assert_eq!(response.status, 400);

    let response = handle(
        &fixture.app,
        Request::delete(format!("/collectives/{}/pages/{}", c, child.id))
            .with_context(member.clone()),
    )
    .await;
    assert_eq!(response.status, 200);

    // Removing "Day 2" removes its link to "Day 1"
    fixture.app.remove_page(&member, c, garden.day2.id).await.unwrap();
    assert!(fixture
        .app
        .backlinks_of(&member, c, garden.day1.id)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_move_into_own_subtree_is_rejected() {
    let fixture = TestFixture::new();
    let garden = fixture.our_garden();
    let c = garden.collective.id;
    let child = fixture.seed_page(&garden.collective, garden.day1.id, "Morning", "");

    let before = fixture.app.index().pages_of(c).unwrap();
    let response = handle(
        &fixture.app,
        Request::put(format!("/collectives/{}/pages/{}", c, garden.day1.id))
            .with_context(fixture.member())
            .with_body(json!({ "parent_id": child.id })),
    )
    .await;
    assert_eq!(response.status, 422);
    assert_eq!(response.body, json!({ "error": "cycle_detected" }));
    assert_eq!(fixture.app.index().pages_of(c).unwrap(), before);
}
