// src/storage/mod.rs
pub mod memory;
pub mod redis;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

pub use memory::InMemoryBackend;
pub use self::redis::RedisBackend;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Key-value and ranked-set operations shared by every cache backend.
///
/// Ranked-set ranges follow Redis `ZREVRANGE` indexing: `end` is inclusive
/// and a negative `end` counts from the back (`-1` is the last member).
#[async_trait]
pub trait CacheBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    async fn set_with_expiry(&self, key: &str, ttl: Duration, value: &str) -> Result<(), CacheError> {
        self.set(key, value, Some(ttl)).await
    }

    /// Adds `amount` to `member` in the ranked set and returns the new score.
    async fn increment_score(&self, set_key: &str, amount: f64, member: &str) -> Result<f64, CacheError>;

    async fn range_descending(
        &self,
        set_key: &str,
        start: isize,
        end: isize,
    ) -> Result<Vec<(String, f64)>, CacheError>;

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError>;

    async fn ping(&self) -> Result<bool, CacheError>;

    fn name(&self) -> &'static str;
}
