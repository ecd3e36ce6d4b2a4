//! LibSQL storage integration tests

mod common;

use common::create_test_store;
use second_brain::{
    BrainError, ConnectionMode, ItemFilter, ItemId, ItemType, ItemUpdate, KnowledgeStore,
    LibsqlStore, NewItem,
};

#[tokio::test]
async fn test_init_schema_is_idempotent() {
    let (store, _dir) = create_test_store().await;
    store.create_item(NewItem::new("t", "c", ItemType::Note)).await.unwrap();

    store.init_schema().await.unwrap();
    store.init_schema().await.unwrap();

    assert_eq!(store.count_items().await.unwrap(), 1);
}

#[tokio::test]
async fn test_create_and_get_roundtrip() {
    let (store, _dir) = create_test_store().await;

    let created = store
        .create_item(
            NewItem::new("Rust ownership", "Borrowing rules", ItemType::Insight)
                .with_tags(["Rust", "memory"])
                .with_source_url("https://doc.rust-lang.org"),
        )
        .await
        .unwrap();

    assert_eq!(created.created_at, created.updated_at);

    let fetched = store.get_item(&created.id).await.unwrap().unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.tags, vec!["rust", "memory"]);
    assert_eq!(fetched.source_url.as_deref(), Some("https://doc.rust-lang.org"));
}

#[tokio::test]
async fn test_get_missing_returns_none() {
    let (store, _dir) = create_test_store().await;
    assert!(store.get_item(&ItemId::from("nope")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_newest_first_with_insertion_tiebreak() {
    let (store, _dir) = create_test_store().await;
    for title in ["first", "second", "third"] {
        store.create_item(NewItem::new(title, "body", ItemType::Note)).await.unwrap();
    }

    let titles: Vec<_> = store
        .list_items(&ItemFilter::default())
        .await
        .unwrap()
        .into_iter()
        .map(|i| i.title)
        .collect();
    assert_eq!(titles, vec!["third", "second", "first"]);

    let limited = store.list_items(&ItemFilter::recent(2)).await.unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].title, "third");
}

#[tokio::test]
async fn test_list_filters_are_conjunctive() {
    let (store, _dir) = create_test_store().await;
    store
        .create_item(
            NewItem::new("Tokio runtime", "async executor", ItemType::Note)
                .with_tags(["rust", "async"]),
        )
        .await
        .unwrap();
    store
        .create_item(
            NewItem::new("Axum", "web framework on tokio", ItemType::Link)
                .with_tags(["rust", "web"]),
        )
        .await
        .unwrap();
    store
        .create_item(NewItem::new("Trust", "interpersonal", ItemType::Note).with_tags(["life"]))
        .await
        .unwrap();

    let rust = store
        .list_items(&ItemFilter {
            tag: Some("rust".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(rust.len(), 2);
    assert!(rust.iter().all(|i| i.tags.contains(&"rust".to_string())));

    let notes_about_tokio = store
        .list_items(&ItemFilter {
            item_type: Some(ItemType::Note),
            search: Some("TOKIO".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(notes_about_tokio.len(), 1);
    assert_eq!(notes_about_tokio[0].title, "Tokio runtime");

    let links_tagged_life = store
        .list_items(&ItemFilter {
            item_type: Some(ItemType::Link),
            tag: Some("life".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(links_tagged_life.is_empty());
}

#[tokio::test]
async fn test_tag_filter_matches_whole_tags_only() {
    let (store, _dir) = create_test_store().await;
    store
        .create_item(NewItem::new("a", "b", ItemType::Note).with_tags(["rustacean"]))
        .await
        .unwrap();

    let found = store
        .list_items(&ItemFilter {
            tag: Some("rust".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert!(found.is_empty());
}

#[tokio::test]
async fn test_search_treats_wildcards_literally() {
    let (store, _dir) = create_test_store().await;
    store.create_item(NewItem::new("Discount", "50% off", ItemType::Note)).await.unwrap();
    store.create_item(NewItem::new("Score", "500 points", ItemType::Note)).await.unwrap();
    store.create_item(NewItem::new("snake_case", "naming", ItemType::Note)).await.unwrap();
    store.create_item(NewItem::new("snakeXcase", "naming", ItemType::Note)).await.unwrap();

    let percent = store
        .list_items(&ItemFilter {
            search: Some("50%".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(percent.len(), 1);
    assert_eq!(percent[0].title, "Discount");

    let underscore = store
        .list_items(&ItemFilter {
            search: Some("snake_".into()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(underscore.len(), 1);
    assert_eq!(underscore[0].title, "snake_case");
}

#[tokio::test]
async fn test_search_folds_non_ascii_case() {
    let (store, _dir) = create_test_store().await;
    let created = store
        .create_item(NewItem::new("Über Rust", "Grüße aus ÖSTERREICH", ItemType::Note))
        .await
        .unwrap();
    store.create_item(NewItem::new("Unrelated", "plain", ItemType::Note)).await.unwrap();

    let search = |needle: &str| ItemFilter {
        search: Some(needle.into()),
        ..Default::default()
    };

    let by_title = store.list_items(&search("über")).await.unwrap();
    assert_eq!(by_title.len(), 1);
    assert_eq!(by_title[0].title, "Über Rust");

    let by_content = store.list_items(&search("österreich")).await.unwrap();
    assert_eq!(by_content.len(), 1);
    assert_eq!(store.list_items(&search("GRÜSSE")).await.unwrap().len(), 0);
    assert_eq!(store.list_items(&search("GRÜßE")).await.unwrap().len(), 1);

    // Renames keep the search copy in step
    store
        .update_item(
            &created.id,
            ItemUpdate {
                title: Some("Ärger".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(store.list_items(&search("über")).await.unwrap().is_empty());
    assert_eq!(store.list_items(&search("äRGER")).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_init_schema_backfills_search_columns() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.db").to_string_lossy().into_owned();

    // Table as created before the lowercased search columns existed
    {
        let db = libsql::Builder::new_local(&path).build().await.unwrap();
        let conn = db.connect().unwrap();
        conn.execute_batch(
            "CREATE TABLE knowledge_items (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                content TEXT NOT NULL,
                type TEXT NOT NULL,
                source_url TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                summary TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );
            INSERT INTO knowledge_items VALUES ('legacy-1', 'Élan Vital', 'Bergson', 'NOTE',
                NULL, '[]', NULL, '2024-01-01T00:00:00.000000Z', '2024-01-01T00:00:00.000000Z');",
        )
        .await
        .unwrap();
    }

    let store = LibsqlStore::open_initialized(ConnectionMode::Local(path)).await.unwrap();
    let found = store
        .list_items(&ItemFilter {
            search: Some("élan".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, ItemId::from("legacy-1"));
}

#[tokio::test]
async fn test_partial_update_changes_only_supplied_fields() {
    let (store, _dir) = create_test_store().await;
    let created = store
        .create_item(
            NewItem::new("Original", "Body", ItemType::Note)
                .with_tags(["keep"])
                .with_source_url("https://example.com"),
        )
        .await
        .unwrap();

    let updated = store
        .update_item(
            &created.id,
            ItemUpdate {
                title: Some("Renamed".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.content, "Body");
    assert_eq!(updated.item_type, ItemType::Note);
    assert_eq!(updated.tags, vec!["keep"]);
    assert_eq!(updated.source_url.as_deref(), Some("https://example.com"));
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);
}

#[tokio::test]
async fn test_update_clears_nullable_fields_and_always_advances() {
    let (store, _dir) = create_test_store().await;
    let mut item = NewItem::new("t", "c", ItemType::Link).with_source_url("https://x.dev");
    item.summary = Some("old summary".into());
    let created = store.create_item(item).await.unwrap();

    let cleared = store
        .update_item(
            &created.id,
            ItemUpdate {
                source_url: Some(None),
                summary: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.source_url.is_none());
    assert!(cleared.summary.is_none());

    let touched = store.update_item(&created.id, ItemUpdate::default()).await.unwrap();
    assert!(touched.updated_at > cleared.updated_at);
    assert!(cleared.updated_at > created.updated_at);
}

#[tokio::test]
async fn test_update_missing_is_not_found() {
    let (store, _dir) = create_test_store().await;
    let err = store
        .update_item(
            &ItemId::from("ghost"),
            ItemUpdate {
                title: Some("x".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BrainError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (store, _dir) = create_test_store().await;
    let created = store.create_item(NewItem::new("t", "c", ItemType::Note)).await.unwrap();

    assert!(store.delete_item(&created.id).await.unwrap());
    assert!(!store.delete_item(&created.id).await.unwrap());
    assert!(!store.delete_item(&ItemId::from("never-existed")).await.unwrap());
    assert!(store.get_item(&created.id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_distinct_tags_sorted() {
    let (store, _dir) = create_test_store().await;
    store
        .create_item(NewItem::new("a", "a", ItemType::Note).with_tags(["web", "rust"]))
        .await
        .unwrap();
    store
        .create_item(NewItem::new("b", "b", ItemType::Note).with_tags(["async", "rust"]))
        .await
        .unwrap();
    store.create_item(NewItem::new("c", "c", ItemType::Note)).await.unwrap();

    assert_eq!(store.list_tags().await.unwrap(), vec!["async", "rust", "web"]);
    assert_eq!(store.count_items().await.unwrap(), 3);
}
