// src/storage/redis.rs
use async_trait::async_trait;
use redis::{aio::ConnectionManager, AsyncCommands, Client};
use std::time::Duration;

use super::{CacheBackend, CacheError};

/// Redis-backed cache. Every call maps onto a single Redis command and
/// connection failures are returned to the caller untouched.
#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    pub async fn connect(redis_url: &str) -> Result<Self, CacheError> {
        let client = Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;

        Ok(Self { conn })
    }
}

// Redis TTLs are whole seconds; never round a short TTL down to "no expiry".
fn ttl_secs(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl CacheBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        match ttl {
            Some(ttl) => {
                let _: () = conn.set_ex(key, value, ttl_secs(ttl)).await?;
            }
            None => {
                let _: () = conn.set(key, value).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: i64 = conn.del(key).await?;
        Ok(())
    }

    async fn set_with_expiry(&self, key: &str, ttl: Duration, value: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set_ex(key, value, ttl_secs(ttl)).await?;
        Ok(())
    }

    async fn increment_score(&self, set_key: &str, amount: f64, member: &str) -> Result<f64, CacheError> {
        let mut conn = self.conn.clone();
        let score: f64 = conn.zincr(set_key, member, amount).await?;
        Ok(score)
    }

    async fn range_descending(
        &self,
        set_key: &str,
        start: isize,
        end: isize,
    ) -> Result<Vec<(String, f64)>, CacheError> {
        let mut conn = self.conn.clone();
        let members: Vec<(String, f64)> = conn.zrevrange_withscores(set_key, start, end).await?;
        Ok(members)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: bool = conn.expire(key, ttl_secs(ttl) as i64).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(pong == "PONG")
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
