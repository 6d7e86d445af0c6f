// src/storage/memory.rs
use async_trait::async_trait;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use super::{CacheBackend, CacheError};

/// Process-local fallback used when Redis is not configured or unreachable.
///
/// Expiry is lazy: nothing sweeps in the background, a key is evicted the
/// next time an operation touches it after its deadline. Scalar values and
/// ranked sets share one expiry table, so `expire` on a ranked set drops all
/// of its members at once.
#[derive(Default)]
pub struct InMemoryBackend {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    values: HashMap<String, String>,
    ranked_sets: HashMap<String, HashMap<String, f64>>,
    expiries: HashMap<String, Instant>,
}

impl Inner {
    /// Evicts `key` if its deadline has passed. Returns true when evicted.
    fn evict_if_expired(&mut self, key: &str, now: Instant) -> bool {
        match self.expiries.get(key) {
            Some(deadline) if now >= *deadline => {
                self.remove(key);
                true
            }
            _ => false,
        }
    }

    fn remove(&mut self, key: &str) {
        self.values.remove(key);
        self.ranked_sets.remove(key);
        self.expiries.remove(key);
    }

    fn key_exists(&self, key: &str) -> bool {
        self.values.contains_key(key) || self.ranked_sets.contains_key(key)
    }
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Resolves a Redis-style inclusive `[start, end]` range against `len`.
fn resolve_range(len: usize, start: isize, end: isize) -> Option<(usize, usize)> {
    let len = len as isize;
    let start = if start < 0 { (len + start).max(0) } else { start };
    let end = if end < 0 { len + end } else { end.min(len - 1) };

    if len == 0 || start > end || start >= len {
        return None;
    }
    Some((start as usize, end as usize))
}

#[async_trait]
impl CacheBackend for InMemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut inner = self.inner.lock().await;
        if inner.evict_if_expired(key, Instant::now()) {
            return Ok(None);
        }
        Ok(inner.values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<(), CacheError> {
        let mut inner = self.inner.lock().await;
        inner.ranked_sets.remove(key);
        inner.values.insert(key.to_string(), value.to_string());
        match ttl {
            Some(ttl) => {
                inner.expiries.insert(key.to_string(), Instant::now() + ttl);
            }
            None => {
                inner.expiries.remove(key);
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.inner.lock().await.remove(key);
        Ok(())
    }

    async fn increment_score(&self, set_key: &str, amount: f64, member: &str) -> Result<f64, CacheError> {
        let mut inner = self.inner.lock().await;
        inner.evict_if_expired(set_key, Instant::now());
        inner.values.remove(set_key);

        let score = inner
            .ranked_sets
            .entry(set_key.to_string())
            .or_default()
            .entry(member.to_string())
            .or_insert(0.0);
        *score += amount;
        Ok(*score)
    }

    async fn range_descending(
        &self,
        set_key: &str,
        start: isize,
        end: isize,
    ) -> Result<Vec<(String, f64)>, CacheError> {
        let mut inner = self.inner.lock().await;
        if inner.evict_if_expired(set_key, Instant::now()) {
            return Ok(Vec::new());
        }
        let Some(set) = inner.ranked_sets.get(set_key) else {
            return Ok(Vec::new());
        };

        let mut members: Vec<(String, f64)> = set.iter().map(|(m, s)| (m.clone(), *s)).collect();
        // Same order as ZREVRANGE: score descending, ties by member descending.
        members.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.0.cmp(&a.0))
        });

        Ok(match resolve_range(members.len(), start, end) {
            Some((from, to)) => members[from..=to].to_vec(),
            None => Vec::new(),
        })
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut inner = self.inner.lock().await;
        let now = Instant::now();
        if inner.evict_if_expired(key, now) || !inner.key_exists(key) {
            return Ok(());
        }
        inner.expiries.insert(key.to_string(), now + ttl);
        Ok(())
    }

    async fn ping(&self) -> Result<bool, CacheError> {
        Ok(true)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
