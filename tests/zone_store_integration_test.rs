//! Integration tests for the zone store and registry.
//!
//! Exercises contiguous iter prefixes, last-writer-wins flush semantics,
//! ownership monotonicity, and range-query latest-only behavior, against a
//! real (temp-dir) SQLite file.

use serde_json::json;
use zonevault::registry::{RegistryError, ZoneRegistry};
use zonevault::store::entity::Entity;

fn entity(index: i64, iter: i64, x: i64, y: i64, owner: &str) -> Entity {
    Entity {
        index: Some(index),
        iter,
        uuid: format!("uuid-{index}"),
        state: if iter == 0 { 1 } else { 2 },
        name: "Void".into(),
        description: "Genesis".into(),
        position_x: x,
        position_y: y,
        position_z: 0,
        aesthetics: json!({"bar": [], "glyphs": []}),
        ownership: Some(owner.to_string()),
        minted: true,
        timestamp: 0,
        exists: true,
    }
}

#[tokio::test]
async fn iters_form_a_contiguous_prefix_after_flush() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ZoneRegistry::open(dir.path(), &[0], 2, 64, 3600.0, 100)
        .await
        .unwrap();
    let store = registry.get(0).unwrap();

    for iter in 0..5 {
        store.set(&entity(1, iter, 3, 5, "alice")).await.unwrap();
    }
    store.flush().await.unwrap();

    let stack = store.get_iters_of_one(1).await.unwrap();
    let iters: Vec<i64> = stack.iter().map(|e| e.iter).collect();
    assert_eq!(iters, vec![0, 1, 2, 3, 4]);

    registry.shutdown().await;
}

#[tokio::test]
async fn last_write_wins_on_flush_for_the_same_row() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ZoneRegistry::open(dir.path(), &[0], 2, 64, 3600.0, 100)
        .await
        .unwrap();
    let store = registry.get(0).unwrap();

    let mut first = entity(2, 0, 1, 1, "alice");
    first.name = "first".into();
    store.set(&first).await.unwrap();

    let mut second = entity(2, 0, 1, 1, "alice");
    second.name = "second".into();
    store.set(&second).await.unwrap();

    store.flush().await.unwrap();

    let row = store.get(2, Some(0)).await.unwrap().unwrap();
    assert_eq!(row.name, "second");

    registry.shutdown().await;
}

#[tokio::test]
async fn range_query_returns_only_the_latest_iter_per_index() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ZoneRegistry::open(dir.path(), &[0], 2, 64, 3600.0, 100)
        .await
        .unwrap();
    let store = registry.get(0).unwrap();

    store.set(&entity(3, 0, 7, 7, "bob")).await.unwrap();
    store.set(&entity(3, 1, 7, 7, "bob")).await.unwrap();
    store.set(&entity(3, 2, 7, 7, "bob")).await.unwrap();
    store.flush().await.unwrap();

    let rows = store.range_query(7, 7, 7, 7, 10).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].iter, 2);

    registry.shutdown().await;
}

#[tokio::test]
async fn unflushed_writes_are_visible_to_get_but_not_range_query() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ZoneRegistry::open(dir.path(), &[0], 2, 64, 3600.0, 100)
        .await
        .unwrap();
    let store = registry.get(0).unwrap();

    store.set(&entity(4, 0, 9, 9, "carl")).await.unwrap();

    assert!(store.get(4, Some(0)).await.unwrap().is_some());
    let rows = store.range_query(9, 9, 9, 9, 10).await.unwrap();
    assert!(rows.is_empty(), "range_query must not see the write queue");

    registry.shutdown().await;
}

#[tokio::test]
async fn unknown_zone_is_a_400_class_error() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ZoneRegistry::open(dir.path(), &[0, 1], 2, 64, 3600.0, 100)
        .await
        .unwrap();

    assert!(matches!(registry.get(42), Err(RegistryError::UnknownZone(42))));
    registry.shutdown().await;
}

#[tokio::test]
async fn index_allocator_never_repeats_under_concurrent_load() {
    let dir = tempfile::tempdir().unwrap();
    let registry = ZoneRegistry::open(dir.path(), &[0], 4, 64, 3600.0, 100)
        .await
        .unwrap();
    let store = registry.get(0).unwrap().clone();

    let mut handles = Vec::new();
    for _ in 0..20 {
        let store = store.clone();
        handles.push(tokio::spawn(async move { store.allocate_index().await.unwrap() }));
    }
    let mut indices = Vec::new();
    for handle in handles {
        indices.push(handle.await.unwrap());
    }
    indices.sort_unstable();
    indices.dedup();
    assert_eq!(indices.len(), 20, "allocate_index must never hand out duplicates");

    registry.shutdown().await;
}
