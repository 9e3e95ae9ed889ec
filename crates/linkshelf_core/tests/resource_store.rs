use linkshelf_core::db::open_db_in_memory;
use linkshelf_core::{
    Resource, ResourceMeta, ResourceQuery, ResourceStore, SearchPattern, SqliteResourceStore,
    VoteKind,
};

fn store() -> SqliteResourceStore {
    SqliteResourceStore::try_new(open_db_in_memory().unwrap()).unwrap()
}

fn resource(link: &str, title: &str, description: &str) -> Resource {
    Resource::new(
        link,
        "alice",
        ResourceMeta {
            title: title.to_string(),
            description: description.to_string(),
            image: "http://example.com/img.png".to_string(),
        },
    )
}

fn links(resources: &[Resource]) -> Vec<&str> {
    resources.iter().map(|item| item.link.as_str()).collect()
}

fn literal(key: &str) -> SearchPattern {
    SearchPattern::from_escaped(regex::escape(key)).unwrap()
}

#[tokio::test]
async fn insert_and_find_roundtrip() {
    let store = store();
    let created = resource("http://example.com/a", "A", "d");
    store.insert(&created).await.unwrap();

    let found = store.find(&ResourceQuery::all()).await.unwrap();
    assert_eq!(found, vec![created]);
}

#[tokio::test]
async fn find_orders_newest_first_and_breaks_ties_by_insertion() {
    let store = store();
    let mut older = resource("http://example.com/old", "old", "");
    older.created_at = 1_000;
    let mut tie_first = resource("http://example.com/tie-1", "tie 1", "");
    tie_first.created_at = 2_000;
    let mut tie_second = resource("http://example.com/tie-2", "tie 2", "");
    tie_second.created_at = 2_000;

    store.insert(&tie_first).await.unwrap();
    store.insert(&older).await.unwrap();
    store.insert(&tie_second).await.unwrap();

    let found = store.find(&ResourceQuery::all()).await.unwrap();
    assert_eq!(
        links(&found),
        vec![
            "http://example.com/tie-2",
            "http://example.com/tie-1",
            "http://example.com/old"
        ]
    );
}

#[tokio::test]
async fn window_applies_skip_and_limit() {
    let store = store();
    for index in 0..5 {
        let mut item = resource(&format!("http://example.com/{index}"), "", "");
        item.created_at = 1_000 + index;
        store.insert(&item).await.unwrap();
    }

    let page = store
        .find(&ResourceQuery::all().window(2, 2))
        .await
        .unwrap();
    assert_eq!(
        links(&page),
        vec!["http://example.com/2", "http://example.com/1"]
    );

    let past_end = store
        .find(&ResourceQuery::all().window(10, 2))
        .await
        .unwrap();
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn pattern_matches_any_of_link_title_description() {
    let store = store();
    store
        .insert(&resource("http://example.com/by-link", "x", "y"))
        .await
        .unwrap();
    store
        .insert(&resource("http://other.org/1", "needle in title", ""))
        .await
        .unwrap();
    store
        .insert(&resource("http://other.org/2", "", "a needle here"))
        .await
        .unwrap();
    store
        .insert(&resource("http://other.org/3", "nothing", "at all"))
        .await
        .unwrap();

    let by_title_or_description = store
        .find(&ResourceQuery::matching(literal("needle")))
        .await
        .unwrap();
    assert_eq!(
        links(&by_title_or_description),
        vec!["http://other.org/2", "http://other.org/1"]
    );

    let by_link = store
        .find(&ResourceQuery::matching(literal("by-link")))
        .await
        .unwrap();
    assert_eq!(links(&by_link), vec!["http://example.com/by-link"]);
}

#[tokio::test]
async fn pattern_metacharacters_are_literal() {
    let store = store();
    store
        .insert(&resource("http://example.com/a", "plain", "text"))
        .await
        .unwrap();
    store
        .insert(&resource("http://example.com/b", "regex .* inside", ""))
        .await
        .unwrap();

    let found = store
        .find(&ResourceQuery::matching(literal(".*")))
        .await
        .unwrap();
    assert_eq!(links(&found), vec!["http://example.com/b"]);

    let none = store
        .find(&ResourceQuery::matching(literal("(a|b)")))
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn set_link_and_set_author_touch_only_target_field() {
    let store = store();
    let original = resource("http://example.com/a", "A", "d");
    store.insert(&original).await.unwrap();
    store
        .push_vote("http://example.com/a", VoteKind::Up, "u1")
        .await
        .unwrap();

    assert_eq!(
        store
            .set_link("http://example.com/a", "http://example.com/b")
            .await
            .unwrap(),
        1
    );
    assert_eq!(
        store.set_author("http://example.com/b", "bob").await.unwrap(),
        1
    );

    let found = store.find(&ResourceQuery::all()).await.unwrap();
    assert_eq!(found.len(), 1);
    let updated = &found[0];
    assert_eq!(updated.id, original.id);
    assert_eq!(updated.link, "http://example.com/b");
    assert_eq!(updated.author, "bob");
    assert_eq!(updated.meta, original.meta);
    assert_eq!(updated.created_at, original.created_at);
    assert_eq!(updated.upvotes, vec!["u1".to_string()]);
}

#[tokio::test]
async fn mutations_on_unknown_link_affect_nothing() {
    let store = store();
    assert_eq!(store.set_link("http://nope", "http://x").await.unwrap(), 0);
    assert_eq!(store.set_author("http://nope", "bob").await.unwrap(), 0);
    assert_eq!(
        store
            .push_vote("http://nope", VoteKind::Down, "u1")
            .await
            .unwrap(),
        0
    );
    assert_eq!(store.delete("http://nope").await.unwrap(), 0);
}

#[tokio::test]
async fn votes_append_in_order_and_keep_duplicates() {
    let store = store();
    store
        .insert(&resource("http://example.com/a", "A", ""))
        .await
        .unwrap();

    for (kind, user) in [
        (VoteKind::Up, "u1"),
        (VoteKind::Down, "u2"),
        (VoteKind::Up, "u3"),
        (VoteKind::Up, "u1"),
    ] {
        store
            .push_vote("http://example.com/a", kind, user)
            .await
            .unwrap();
    }

    let found = store.find(&ResourceQuery::all()).await.unwrap();
    assert_eq!(found[0].upvotes, vec!["u1", "u3", "u1"]);
    assert_eq!(found[0].downvotes, vec!["u2"]);
}

#[tokio::test]
async fn delete_removes_resource_and_its_votes() {
    let store = store();
    store
        .insert(&resource("http://example.com/a", "A", ""))
        .await
        .unwrap();
    store
        .push_vote("http://example.com/a", VoteKind::Up, "u1")
        .await
        .unwrap();

    assert_eq!(store.delete("http://example.com/a").await.unwrap(), 1);
    assert_eq!(store.count().await.unwrap(), 0);

    store
        .insert(&resource("http://example.com/a", "again", ""))
        .await
        .unwrap();
    let found = store.find(&ResourceQuery::all()).await.unwrap();
    assert!(found[0].upvotes.is_empty());
}

#[tokio::test]
async fn insert_persists_preloaded_votes() {
    let store = store();
    let mut item = resource("http://example.com/imported", "", "");
    item.upvotes = vec!["u1".to_string(), "u2".to_string()];
    item.downvotes = vec!["u3".to_string()];
    store.insert(&item).await.unwrap();

    let found = store.find(&ResourceQuery::all()).await.unwrap();
    assert_eq!(found, vec![item]);
}

#[tokio::test]
async fn duplicate_link_is_rejected_by_the_store() {
    let store = store();
    store
        .insert(&resource("http://example.com/a", "A", ""))
        .await
        .unwrap();

    let err = store
        .insert(&resource("http://example.com/a", "B", ""))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("UNIQUE"));
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_votes_all_land() {
    let store = store();
    store
        .insert(&resource("http://example.com/a", "A", ""))
        .await
        .unwrap();

    let tasks: Vec<_> = (0..8)
        .map(|index| {
            let store = store.clone();
            tokio::spawn(async move {
                store
                    .push_vote("http://example.com/a", VoteKind::Up, &format!("u{index}"))
                    .await
            })
        })
        .collect();
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), 1);
    }

    let found = store.find(&ResourceQuery::all()).await.unwrap();
    assert_eq!(found[0].upvotes.len(), 8);
}

#[tokio::test]
async fn votes_stay_with_their_resource_across_large_listings() {
    let store = store();
    for index in 0..600_i64 {
        let mut item = resource(&format!("http://example.com/{index}"), "", "");
        item.created_at = index;
        if index % 3 == 0 {
            item.upvotes = vec![format!("up-{index}")];
        }
        if index % 5 == 0 {
            item.downvotes = vec![format!("down-{index}"), format!("down-{index}")];
        }
        store.insert(&item).await.unwrap();
    }

    let found = store.find(&ResourceQuery::all()).await.unwrap();
    assert_eq!(found.len(), 600);
    for item in &found {
        let index = item.created_at;
        assert_eq!(item.link, format!("http://example.com/{index}"));
        let expected_up = if index % 3 == 0 {
            vec![format!("up-{index}")]
        } else {
            Vec::new()
        };
        let expected_down = if index % 5 == 0 {
            vec![format!("down-{index}"), format!("down-{index}")]
        } else {
            Vec::new()
        };
        assert_eq!(item.upvotes, expected_up, "upvotes of {index}");
        assert_eq!(item.downvotes, expected_down, "downvotes of {index}");
    }

    let page = store
        .find(&ResourceQuery::all().window(297, 3))
        .await
        .unwrap();
    assert_eq!(
        links(&page),
        vec![
            "http://example.com/302",
            "http://example.com/301",
            "http://example.com/300"
        ]
    );
    assert_eq!(page[2].upvotes, vec!["up-300"]);
    assert_eq!(page[2].downvotes, vec!["down-300", "down-300"]);
}
