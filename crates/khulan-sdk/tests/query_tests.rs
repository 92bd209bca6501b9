//! Integration tests for the query facade

mod common;

use common::{fixture, Fixture};
use khulan_core::{CacheKey, EntityKind};
use khulan_sdk::{ModelCollection, Query, QueryResult};
use serde_json::json;

async fn indexed() -> Fixture {
    let f = fixture().await;
    f.khulan.indexer().reindex_all(2).await.unwrap();
    f
}

#[tokio::test]
async fn test_tag_filter_matches_list_elements() {
    let f = indexed().await;
    let query = f.khulan.query();

    let punk = query
        .find_json(&json!({"tags[,]": "Punk", "language": "en"}))
        .await
        .unwrap();
    let mut ids = punk.ids();
    ids.sort();
    assert_eq!(ids, vec!["betterharder", "fasterstronger"]);
    assert!(matches!(punk, ModelCollection::Pages(_)));

    let daft = query
        .find_json(&json!({"tags[,]": "Daft", "language": "en"}))
        .await
        .unwrap();
    assert_eq!(daft.ids(), vec!["betterharder"]);
}

#[tokio::test]
async fn test_entities_matching_in_every_language_are_returned_once() {
    let f = indexed().await;

    let punk = f
        .khulan
        .query()
        .find_json(&json!({"tags[,]": "Punk"}))
        .await
        .unwrap();

    let mut ids = punk.ids();
    ids.sort();
    assert_eq!(ids, vec!["betterharder", "fasterstronger"]);
}

#[tokio::test]
async fn test_find_one_by_any_identifier() {
    let f = indexed().await;
    let query = f.khulan.query();

    let by_id = query.find_one("fasterstronger").await.unwrap().unwrap();
    assert_eq!(by_id.id(), "fasterstronger");

    let by_uuid = query.find_one("aaa111").await.unwrap().unwrap();
    assert_eq!(by_uuid.id(), "betterharder");

    let by_email = query.find_one("thomas@example.com").await.unwrap().unwrap();
    assert_eq!(by_email.kind(), EntityKind::User);

    let key = CacheKey::derive("betterharder/cover.jpg", Some("de"));
    let by_key = query.find_one(key.as_str()).await.unwrap().unwrap();
    assert_eq!(by_key.kind(), EntityKind::File);

    assert!(query.find_one("nothing-here").await.unwrap().is_none());
}

#[tokio::test]
async fn test_cached_find_one_wraps_entity() {
    let f = indexed().await;

    let page = f.khulan.find_one("aaa111").await.unwrap().unwrap();
    let content = page.content(Some("en")).await.unwrap();
    assert_eq!(content["title"], khulan_core::Value::from("Harder Better"));
}

#[tokio::test]
async fn test_mixed_and_homogeneous_results() {
    let f = indexed().await;
    let query = f.khulan.query();

    let mixed = query
        .find_json(&json!({"language": "de", "modelType": {"$in": ["page", "user"]}}))
        .await
        .unwrap();
    assert!(matches!(mixed, ModelCollection::Mixed(_)));
    assert_eq!(mixed.len(), 4);

    let files = query
        .find_json(&json!({"modelType": "file", "language": "en"}))
        .await
        .unwrap();
    assert_eq!(files.kind(), Some(EntityKind::File));
    assert_eq!(files.ids(), vec!["betterharder/cover.jpg"]);

    let none = query.find_json(&json!({"template": "missing"})).await.unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_listed_pages_by_date() {
    let f = indexed().await;

    let published = f
        .khulan
        .query()
        .find_json(&json!({
            "$and": [
                {"status": "listed"},
                {"language": "en"},
                {"published{}": {"$lt": {"$date": "2010-01-01T00:00:00.000Z"}}}
            ]
        }))
        .await
        .unwrap();
    assert_eq!(published.ids(), vec!["betterharder"]);
}

#[tokio::test]
async fn test_unresolvable_documents_are_skipped() {
    let f = indexed().await;
    tokio::fs::remove_dir_all(f.path("content/2_fasterstronger"))
        .await
        .unwrap();

    let punk = f
        .khulan
        .query()
        .find_json(&json!({"tags[,]": "Punk", "language": "en"}))
        .await
        .unwrap();
    assert_eq!(punk.ids(), vec!["betterharder"]);
}

#[tokio::test]
async fn test_query_entry_point() {
    let f = indexed().await;
    let query = f.khulan.query();

    match query.query(Query::Collection).await.unwrap() {
        QueryResult::Collection(collection) => assert_eq!(collection.name(), "khulan"),
        _ => panic!("expected the raw collection"),
    }

    match query.query(Query::Key("abc123".to_string())).await.unwrap() {
        QueryResult::Entity(Some(user)) => assert_eq!(user.kind(), EntityKind::User),
        _ => panic!("expected a user"),
    }

    match query
        .query(Query::Filter(json!({"slug": "about"})))
        .await
        .unwrap()
    {
        QueryResult::Models(models) => assert_eq!(models.ids(), vec!["about"]),
        _ => panic!("expected models"),
    }

    assert!(query
        .query(Query::Filter(json!({"slug": {"$regex": "a.*"}})))
        .await
        .is_err());
}
