use super::*;

#[tokio::test]
async fn test_get_missing_key_returns_none() {
    let cache = InMemoryTokenCache::default();

    assert_eq!(cache.get("missing").await.unwrap(), None);
}

#[tokio::test]
async fn test_set_then_get_returns_value() {
    let cache = InMemoryTokenCache::default();

    cache.set("key", b"value".to_vec()).await.unwrap();

    assert_eq!(cache.get("key").await.unwrap(), Some(b"value".to_vec()));
}

#[tokio::test]
async fn test_set_replaces_previous_value() {
    let cache = InMemoryTokenCache::default();

    cache.set("key", b"old".to_vec()).await.unwrap();
    cache.set("key", b"new".to_vec()).await.unwrap();

    assert_eq!(cache.get("key").await.unwrap(), Some(b"new".to_vec()));
    assert_eq!(cache.len().await, 1);
}

#[tokio::test]
async fn test_delete_removes_entry() {
    let cache = InMemoryTokenCache::default();
    cache.set("key", b"value".to_vec()).await.unwrap();

    cache.delete("key").await.unwrap();

    assert_eq!(cache.get("key").await.unwrap(), None);
    assert!(cache.is_empty().await);
}

#[tokio::test(start_paused = true)]
async fn test_entries_expire_after_ttl() {
    let cache = InMemoryTokenCache::new(Duration::from_secs(60));
    cache.set("key", b"value".to_vec()).await.unwrap();

    tokio::time::advance(Duration::from_secs(59)).await;
    assert!(cache.get("key").await.unwrap().is_some());

    tokio::time::advance(Duration::from_secs(2)).await;
    assert_eq!(cache.get("key").await.unwrap(), None);
    assert!(cache.is_empty().await, "expired entry should be evicted");
}

#[test]
fn test_default_ttl_is_fifty_five_minutes() {
    assert_eq!(InMemoryTokenCache::default().ttl(), Duration::from_secs(3300));
}

#[tokio::test(start_paused = true)]
async fn test_set_evicts_expired_entries_of_other_keys() {
    let cache = InMemoryTokenCache::new(Duration::from_secs(60));
    cache.set("never-read-again", b"old".to_vec()).await.unwrap();

    tokio::time::advance(Duration::from_secs(61)).await;
    cache.set("fresh", b"new".to_vec()).await.unwrap();

    assert_eq!(cache.len().await, 1);
    assert_eq!(cache.get("fresh").await.unwrap(), Some(b"new".to_vec()));
}

#[tokio::test(start_paused = true)]
async fn test_set_keeps_live_entries_of_other_keys() {
    let cache = InMemoryTokenCache::new(Duration::from_secs(60));
    cache.set("first", b"one".to_vec()).await.unwrap();

    tokio::time::advance(Duration::from_secs(30)).await;
    cache.set("second", b"two".to_vec()).await.unwrap();

    assert_eq!(cache.len().await, 2);
    assert_eq!(cache.get("first").await.unwrap(), Some(b"one".to_vec()));
}
