// src/middleware/cache.rs
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::storage::{CacheBackend, CacheError};

/// JSON compute-or-fetch layer over a [`CacheBackend`].
///
/// Cache trouble never reaches the caller: a failing backend degrades to
/// calling the loader directly, and an unreadable payload counts as a miss.
#[derive(Clone)]
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
}

impl CacheService {
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Returns the cached value for `key`, or runs `loader` once and stores
    /// its result for `ttl`. Errors from `loader` are returned unchanged.
    pub async fn get_or_compute<T, E, F, Fut>(&self, key: &str, ttl: Duration, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match self.backend.get(key).await {
            Ok(Some(cached)) => match serde_json::from_str::<T>(&cached) {
                Ok(value) => {
                    tracing::debug!(key, "cache hit");
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "discarding malformed cache entry");
                }
            },
            Ok(None) => {
                tracing::debug!(key, "cache miss");
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed, serving uncached");
                return loader().await;
            }
        }

        let value = loader().await?;

        if let Err(e) = self.store(key, &value, ttl).await {
            tracing::warn!(key, error = %e, "cache write failed");
        }

        Ok(value)
    }

    pub async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.backend.delete(key).await
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<(), CacheError> {
        let payload = serde_json::to_string(value)?;
        self.backend.set(key, &payload, Some(ttl)).await
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::storage::InMemoryBackend;
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Backend whose every call fails the way an unreachable Redis would.
    pub(crate) struct BrokenBackend;

    fn unreachable_error() -> CacheError {
        CacheError::Redis(redis::RedisError::from((
            redis::ErrorKind::IoError,
            "connection refused",
        )))
    }

    #[async_trait]
    impl CacheBackend for BrokenBackend {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(unreachable_error())
        }
        async fn set(&self, _key: &str, _value: &str, _ttl: Option<Duration>) -> Result<(), CacheError> {
            Err(unreachable_error())
        }
        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(unreachable_error())
        }
        async fn increment_score(&self, _set_key: &str, _amount: f64, _member: &str) -> Result<f64, CacheError> {
            Err(unreachable_error())
        }
        async fn range_descending(
            &self,
            _set_key: &str,
            _start: isize,
            _end: isize,
        ) -> Result<Vec<(String, f64)>, CacheError> {
            Err(unreachable_error())
        }
        async fn expire(&self, _key: &str, _ttl: Duration) -> Result<(), CacheError> {
            Err(unreachable_error())
        }
        async fn ping(&self) -> Result<bool, CacheError> {
            Err(unreachable_error())
        }
        fn name(&self) -> &'static str {
            "broken"
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Payload {
        a: i32,
    }

    const TTL: Duration = Duration::from_secs(60);

    #[tokio::test]
    async fn test_second_call_is_served_from_cache() {
        let cache = CacheService::new(Arc::new(InMemoryBackend::new()));
        let calls = AtomicUsize::new(0);

        let load = || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Infallible>(Payload { a: 1 })
        };

        let first = cache.get_or_compute("k", TTL, load).await.unwrap();
        let second = cache
            .get_or_compute("k", TTL, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(Payload { a: 2 })
            })
            .await
            .unwrap();

        assert_eq!(first, Payload { a: 1 });
        assert_eq!(second, Payload { a: 1 });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_broken_backend_still_returns_loader_value() {
        let cache = CacheService::new(Arc::new(BrokenBackend));
        let calls = AtomicUsize::new(0);

        let value = cache
            .get_or_compute("k", TTL, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Infallible>(Payload { a: 1 })
            })
            .await
            .unwrap();

        assert_eq!(value, Payload { a: 1 });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_malformed_entry_is_recomputed() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.set("k", "{not json", None).await.unwrap();
        let cache = CacheService::new(backend.clone());

        let value = cache
            .get_or_compute("k", TTL, || async { Ok::<_, Infallible>(Payload { a: 7 }) })
            .await
            .unwrap();

        assert_eq!(value, Payload { a: 7 });
        assert_eq!(backend.get("k").await.unwrap(), Some(r#"{"a":7}"#.to_string()));
    }

    #[tokio::test]
    async fn test_loader_error_is_not_cached() {
        let backend = Arc::new(InMemoryBackend::new());
        let cache = CacheService::new(backend.clone());

        let result: Result<Payload, &str> = cache.get_or_compute("k", TTL, || async { Err("db down") }).await;

        assert_eq!(result, Err("db down"));
        assert_eq!(backend.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_non_ascii_text_survives_round_trip() {
        let backend = Arc::new(InMemoryBackend::new());
        let cache = CacheService::new(backend.clone());
        let name = "컴퓨터과학과".to_string();

        let stored = cache
            .get_or_compute("major", TTL, || async { Ok::<_, Infallible>(name.clone()) })
            .await
            .unwrap();
        let raw = backend.get("major").await.unwrap().unwrap();
        let cached: String = cache
            .get_or_compute("major", TTL, || async { Ok::<_, Infallible>(String::new()) })
            .await
            .unwrap();

        assert_eq!(stored, name);
        assert!(raw.contains("컴퓨터과학과"));
        assert_eq!(cached, name);
    }

    #[tokio::test]
    async fn test_delete_invalidates() {
        let cache = CacheService::new(Arc::new(InMemoryBackend::new()));
        cache
            .get_or_compute("k", TTL, || async { Ok::<_, Infallible>(1) })
            .await
            .unwrap();
        cache.delete("k").await.unwrap();

        let value = cache
            .get_or_compute("k", TTL, || async { Ok::<_, Infallible>(2) })
            .await
            .unwrap();
        assert_eq!(value, 2);
    }
}
