// src/services/trending.rs
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::models::{RankChange, TrendingItem};
use crate::storage::{CacheBackend, CacheError};

const WINDOW_KEY_PREFIX: &str = "trending:window:v1";
const RESPONSE_KEY_PREFIX: &str = "trending:cached:v1";
/// How deep into the previous window we look when assigning previous ranks.
const PREVIOUS_RANK_DEPTH: isize = 50;

#[derive(Debug, Clone)]
pub struct TrendingConfig {
    /// Bucket length; the previous bucket is the one right before the current.
    pub window: Duration,
    pub response_ttl: Duration,
    pub max_limit: usize,
    pub min_query_len: usize,
    pub max_query_len: usize,
    pub log_timeout: Duration,
}

impl Default for TrendingConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(3600),
            response_ttl: Duration::from_secs(120),
            max_limit: 20,
            min_query_len: 2,
            max_query_len: 50,
            log_timeout: Duration::from_millis(500),
        }
    }
}

/// Tracks search popularity in hourly ranked sets and reports the top
/// queries together with how their rank moved since the previous window.
#[derive(Clone)]
pub struct TrendingService {
    backend: Arc<dyn CacheBackend>,
    config: TrendingConfig,
}

impl TrendingService {
    pub fn new(backend: Arc<dyn CacheBackend>, config: TrendingConfig) -> Self {
        Self { backend, config }
    }

    fn bucket_id(&self, at: DateTime<Utc>) -> i64 {
        let window = self.config.window.as_secs().max(1) as i64;
        at.timestamp().div_euclid(window)
    }

    fn window_key(bucket: i64) -> String {
        format!("{}:{}", WINDOW_KEY_PREFIX, bucket)
    }

    fn response_key(limit: usize) -> String {
        format!("{}:limit={}", RESPONSE_KEY_PREFIX, limit)
    }

    /// Trimmed, lowercased query, or `None` when it is too short or too long to count.
    pub fn normalize(&self, query: &str) -> Option<String> {
        let normalized = query.trim().to_lowercase();
        let len = normalized.chars().count();
        if len < self.config.min_query_len || len > self.config.max_query_len {
            return None;
        }
        Some(normalized)
    }

    pub fn clamp_limit(&self, limit: usize) -> usize {
        limit.clamp(1, self.config.max_limit)
    }

    /// Counts one search for `query`. Failures are logged and dropped.
    pub async fn log_search(&self, query: &str) {
        if let Err(e) = self.try_log_search_at(query, Utc::now()).await {
            warn!(error = %e, "failed to record search for trending");
        }
    }

    /// Records the search on a detached task so the caller never waits on it.
    pub fn spawn_log_search(&self, query: String) {
        let service = self.clone();
        tokio::spawn(async move {
            let timeout = service.config.log_timeout;
            if tokio::time::timeout(timeout, service.log_search(&query)).await.is_err() {
                warn!(?timeout, "recording search for trending timed out");
            }
        });
    }

    pub async fn try_log_search_at(&self, query: &str, at: DateTime<Utc>) -> Result<bool, CacheError> {
        let Some(normalized) = self.normalize(query) else {
            debug!(query, "ignoring search outside trending length bounds");
            return Ok(false);
        };

        let key = Self::window_key(self.bucket_id(at));
        self.backend.increment_score(&key, 1.0, &normalized).await?;
        // Keep the bucket alive long enough to serve as "previous" next window.
        self.backend.expire(&key, self.config.window * 2).await?;
        Ok(true)
    }

    /// Top searches for the current window. Never fails: an unavailable
    /// backend yields an empty list.
    pub async fn get_trending(&self, limit: usize) -> Vec<TrendingItem> {
        match self.try_get_trending_at(limit, Utc::now()).await {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "failed to load trending searches");
                Vec::new()
            }
        }
    }

    pub async fn try_get_trending_at(
        &self,
        limit: usize,
        at: DateTime<Utc>,
    ) -> Result<Vec<TrendingItem>, CacheError> {
        let limit = self.clamp_limit(limit);
        let cache_key = Self::response_key(limit);

        match self.backend.get(&cache_key).await {
            Ok(Some(cached)) => match serde_json::from_str(&cached) {
                Ok(items) => return Ok(items),
                Err(e) => warn!(error = %e, "discarding malformed trending cache entry"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "trending response cache read failed"),
        }

        let bucket = self.bucket_id(at);
        let current = self
            .backend
            .range_descending(&Self::window_key(bucket), 0, limit as isize - 1)
            .await?;
        if current.is_empty() {
            return Ok(Vec::new());
        }

        let previous = self
            .backend
            .range_descending(&Self::window_key(bucket - 1), 0, PREVIOUS_RANK_DEPTH - 1)
            .await?;
        let previous_ranks: HashMap<String, usize> = previous
            .into_iter()
            .enumerate()
            .map(|(idx, (name, _))| (name, idx + 1))
            .collect();

        let items: Vec<TrendingItem> = current
            .into_iter()
            .enumerate()
            .map(|(idx, (name, _))| {
                let rank = idx + 1;
                let (change, change_amount) = rank_change(previous_ranks.get(&name).copied(), rank);
                TrendingItem {
                    rank,
                    name,
                    change,
                    change_amount,
                }
            })
            .collect();

        if let Err(e) = self.store_response(&cache_key, &items).await {
            warn!(error = %e, "trending response cache write failed");
        }

        Ok(items)
    }

    async fn store_response(&self, cache_key: &str, items: &[TrendingItem]) -> Result<(), CacheError> {
        let payload = serde_json::to_string(items)?;
        self.backend
            .set_with_expiry(cache_key, self.config.response_ttl, &payload)
            .await
    }
}

fn rank_change(previous: Option<usize>, current: usize) -> (RankChange, usize) {
    match previous {
        None => (RankChange::New, 0),
        Some(prev) if prev > current => (RankChange::Up, prev - current),
        Some(prev) if prev < current => (RankChange::Down, current - prev),
        Some(_) => (RankChange::Same, 0),
    }
}
