use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::errors::TransportError;
use crate::fields::FieldValue;
use crate::store::Store;
use crate::test_utils::enable_logger;
use crate::test_utils::field_map;

#[tokio::test]
async fn test_read_returns_none_for_unknown_namespace() {
    let store = Store::new();
    assert!(store.read("limits").await.is_none());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_replace_then_read_returns_exact_map() {
    enable_logger();
    let store = Store::new();
    let fields = field_map(&[("max", FieldValue::Int(100)), ("on", FieldValue::Bool(true))]);

    store.replace("limits", fields.clone()).await;

    assert_eq!(store.read("limits").await, Some(fields));
    assert_eq!(store.len().await, 1);
    assert!(store.contains("limits").await);
}

#[tokio::test]
async fn test_read_hands_out_copies() {
    let store = Store::new();
    store.replace("limits", field_map(&[("max", FieldValue::Int(1))])).await;

    let mut copy = store.read("limits").await.unwrap();
    copy.insert("max".to_string(), FieldValue::Int(999));

    assert_eq!(
        store.read("limits").await.unwrap().get("max"),
        Some(&FieldValue::Int(1))
    );
}

#[tokio::test]
async fn test_upsert_merges_into_existing_namespace() {
    let store = Store::new();
    store.replace("limits", field_map(&[("max", FieldValue::Int(100))])).await;

    store.upsert("limits", "window", FieldValue::Str("hour".to_string())).await;

    let fields = store.read("limits").await.unwrap();
    assert_eq!(fields.get("max"), Some(&FieldValue::Int(100)));
    assert_eq!(fields.get("window"), Some(&FieldValue::Str("hour".to_string())));
}

#[tokio::test]
async fn test_upsert_creates_namespace_when_absent() {
    let store = Store::new();
    store.upsert("flags", "dark_mode", FieldValue::Bool(true)).await;
    assert_eq!(
        store.read("flags").await.unwrap().get("dark_mode"),
        Some(&FieldValue::Bool(true))
    );
}

#[tokio::test]
async fn test_read_or_else_skips_fetch_on_hit() {
    let store = Store::new();
    let cached = field_map(&[("max", FieldValue::Int(7))]);
    store.replace("limits", cached.clone()).await;

    let fields = store
        .read_or_else("limits", || async { panic!("fetch must not run on a hit") })
        .await
        .unwrap();

    assert_eq!(fields, cached);
}

#[tokio::test]
async fn test_read_or_else_fetches_without_inserting() {
    let store = Store::new();
    let remote = field_map(&[("max", FieldValue::Int(5))]);

    let fetched = {
        let remote = remote.clone();
        store.read_or_else("limits", move || async move { Ok(remote) }).await.unwrap()
    };

    assert_eq!(fetched, remote);
    assert!(!store.contains("limits").await);
}

#[tokio::test]
async fn test_replace_with_keeps_value_when_hook_fails() {
    let store = Store::new();
    let fields = field_map(&[("max", FieldValue::Int(200))]);

    let result = store
        .replace_with("limits", fields.clone(), || async {
            Err(TransportError::SubscriptionClosed.into())
        })
        .await;

    assert!(result.is_err());
    // The local write stays visible; only the remote half failed.
    assert_eq!(store.read("limits").await, Some(fields));
}

#[tokio::test]
async fn test_upsert_with_runs_hook_inside_critical_section() {
    let store = Store::new();
    let ran = Arc::new(AtomicBool::new(false));

    let hook_ran = ran.clone();
    store
        .upsert_with("limits", "max", FieldValue::Int(3), move || async move {
            hook_ran.store(true, Ordering::SeqCst);
            Ok(())
        })
        .await
        .unwrap();

    assert!(ran.load(Ordering::SeqCst));
    assert_eq!(
        store.read("limits").await.unwrap().get("max"),
        Some(&FieldValue::Int(3))
    );
}

#[tokio::test]
async fn test_replace_all_with_installs_whole_image() {
    let store = Store::new();
    store.replace("stale", field_map(&[("gone", FieldValue::Bool(true))])).await;

    let mut all = HashMap::new();
    all.insert("limits".to_string(), field_map(&[("max", FieldValue::Int(1))]));
    all.insert("flags".to_string(), field_map(&[]));

    store.replace_all_with(move || async move { Ok(all) }).await.unwrap();

    assert_eq!(store.len().await, 2);
    assert!(!store.contains("stale").await);
    assert!(store.contains("limits").await);
    assert!(store.contains("flags").await);
}

#[tokio::test]
async fn test_replace_all_with_rolls_back_on_failure() {
    let store = Store::new();
    let before = field_map(&[("max", FieldValue::Int(1))]);
    store.replace("limits", before.clone()).await;

    let result = store
        .replace_all_with(|| async { Err(TransportError::SubscriptionClosed.into()) })
        .await;

    assert!(result.is_err());
    assert_eq!(store.read("limits").await, Some(before));
}

#[tokio::test]
async fn test_concurrent_upserts_lose_no_field() {
    let store = Arc::new(Store::new());

    let a = {
        let store = store.clone();
        tokio::spawn(async move {
            for i in 0..50 {
                store.upsert("limits", "a", FieldValue::Int(i)).await;
            }
        })
    };
    let b = {
        let store = store.clone();
        tokio::spawn(async move {
            for i in 0..50 {
                store.upsert("limits", "b", FieldValue::Int(i)).await;
            }
        })
    };

    a.await.unwrap();
    b.await.unwrap();

    let fields = store.read("limits").await.unwrap();
    assert_eq!(fields.get("a"), Some(&FieldValue::Int(49)));
    assert_eq!(fields.get("b"), Some(&FieldValue::Int(49)));
}
