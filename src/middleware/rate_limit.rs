// src/middleware/rate_limit.rs
use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::AppState;

/// Fixed-window request counter keyed by client.
pub struct RateLimiter {
    requests: RwLock<HashMap<String, RateLimitEntry>>,
    max_requests: usize,
    window: Duration,
}

struct RateLimitEntry {
    count: usize,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window_secs: u64) -> Self {
        Self {
            requests: RwLock::new(HashMap::new()),
            max_requests,
            window: Duration::from_secs(window_secs),
        }
    }

    /// Counts one request for `key`; `false` once the window's budget is spent.
    pub async fn check(&self, key: &str) -> bool {
        let mut requests = self.requests.write().await;
        let now = Instant::now();

        // Drop stale windows so the map does not grow with every client seen.
        requests.retain(|_, entry| now.duration_since(entry.window_start) <= self.window);

        let entry = requests.entry(key.to_string()).or_insert(RateLimitEntry {
            count: 0,
            window_start: now,
        });

        if entry.count >= self.max_requests {
            return false;
        }

        entry.count += 1;
        true
    }
}

/// Client identity as seen behind a reverse proxy.
fn client_id(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim())
        .filter(|ip| !ip.is_empty());

    if let Some(ip) = forwarded {
        return ip.to_string();
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|ip| ip.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Limits write endpoints per client.
pub async fn write_rate_limit(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let client = client_id(request.headers());

    if !state.rate_limiter.check(&client).await {
        tracing::warn!(client = %client, path = %request.uri().path(), "write rate limit exceeded");
        return Err(AppError::RateLimited);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiting() {
        let limiter = RateLimiter::new(5, 60);

        for _ in 0..5 {
            assert!(limiter.check("test_client").await);
        }

        assert!(!limiter.check("test_client").await);
        assert!(limiter.check("other_client").await);
    }

    #[tokio::test]
    async fn test_window_reset() {
        let limiter = RateLimiter::new(2, 1);

        assert!(limiter.check("test").await);
        assert!(limiter.check("test").await);
        assert!(!limiter.check("test").await);

        tokio::time::sleep(Duration::from_millis(1100)).await;

        assert!(limiter.check("test").await);
    }

    #[test]
    fn test_client_id_prefers_first_forwarded_address() {
        let mut headers = HeaderMap::new();
        assert_eq!(client_id(&headers), "unknown");

        headers.insert("x-real-ip", "10.0.0.2".parse().unwrap());
        assert_eq!(client_id(&headers), "10.0.0.2");

        headers.insert("x-forwarded-for", "203.0.113.7, 10.0.0.1".parse().unwrap());
        assert_eq!(client_id(&headers), "203.0.113.7");
    }
}
