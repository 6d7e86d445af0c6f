// src/config.rs
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::services::access::AccessPolicy;
use crate::services::trending::TrendingConfig;

const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const MAJORS_CACHE_TTL_SECS: u64 = 3600;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub redis_url: Option<String>,
    pub jwt_secret: String,
    pub full_access_review_count: i64,
    pub new_user_grace_days: i64,
    pub cache_default_ttl: Duration,
    pub majors_cache_ttl: Duration,
    pub trending_window: Duration,
    pub trending_response_ttl: Duration,
    pub trending_max_limit: usize,
    pub write_rate_limit: usize,
    pub write_rate_window_secs: u64,
    pub enable_hsts: bool,
}

fn env_or<T: FromStr>(key: &str, default: &str) -> Result<T, Box<dyn std::error::Error>>
where
    T::Err: std::error::Error + 'static,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse::<T>()
        .map_err(|e| format!("invalid {}={:?}: {}", key, raw, e).into())
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET environment variable must be set")?;
        if jwt_secret.len() < 32 {
            return Err("JWT_SECRET must be at least 32 characters long".into());
        }

        let redis_url = std::env::var("REDIS_URL")
            .ok()
            .filter(|url| !url.trim().is_empty());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://course_review.db?mode=rwc".to_string()),
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_or("PORT", "8000")?,
            redis_url,
            jwt_secret,
            full_access_review_count: env_or("FULL_ACCESS_REVIEW_COUNT", "3")?,
            new_user_grace_days: env_or("NEW_USER_GRACE_DAYS", "3")?,
            cache_default_ttl: Duration::from_secs(env_or(
                "CACHE_DEFAULT_TTL_SECS",
                &DEFAULT_CACHE_TTL_SECS.to_string(),
            )?),
            majors_cache_ttl: Duration::from_secs(MAJORS_CACHE_TTL_SECS),
            trending_window: Duration::from_secs(env_or("TRENDING_WINDOW_SECS", "3600")?),
            trending_response_ttl: Duration::from_secs(env_or("TRENDING_RESPONSE_TTL_SECS", "120")?),
            trending_max_limit: env_or("TRENDING_MAX_LIMIT", "20")?,
            write_rate_limit: env_or("WRITE_RATE_LIMIT", "10")?,
            write_rate_window_secs: 60,
            enable_hsts: std::env::var("ENABLE_HSTS").unwrap_or_default() == "true",
        })
    }

    pub fn server_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    pub fn access_policy(&self) -> AccessPolicy {
        AccessPolicy::new(
            self.full_access_review_count,
            chrono::Duration::days(self.new_user_grace_days),
        )
    }

    pub fn trending(&self) -> TrendingConfig {
        TrendingConfig {
            window: self.trending_window,
            response_ttl: self.trending_response_ttl,
            max_limit: self.trending_max_limit.max(1),
            ..TrendingConfig::default()
        }
    }
}

#[cfg(test)]
impl Config {
    /// Defaults without touching the process environment.
    pub fn for_tests() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            redis_url: None,
            jwt_secret: "test_secret_key_minimum_32_characters_long_12345".to_string(),
            full_access_review_count: 3,
            new_user_grace_days: 3,
            cache_default_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            majors_cache_ttl: Duration::from_secs(MAJORS_CACHE_TTL_SECS),
            trending_window: Duration::from_secs(3600),
            trending_response_ttl: Duration::from_secs(120),
            trending_max_limit: 20,
            write_rate_limit: 10,
            write_rate_window_secs: 60,
            enable_hsts: false,
        }
    }
}
