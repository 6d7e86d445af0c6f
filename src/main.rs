// src/main.rs
mod auth;
mod config;
mod db;
mod error;
mod handlers;
mod middleware;
mod models;
mod routes;
mod services;
mod storage;

use crate::config::Config;
use crate::db::Database;
use crate::middleware::cache::CacheService;
use crate::middleware::rate_limit::RateLimiter;
use crate::routes::create_router;
use crate::services::course::CourseService;
use crate::services::major::MajorService;
use crate::services::review::ReviewService;
use crate::services::trending::TrendingService;
use crate::storage::{CacheBackend, InMemoryBackend, RedisBackend};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub cache: CacheService,
    pub trending: TrendingService,
    pub courses: CourseService,
    pub majors: MajorService,
    pub reviews: ReviewService,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    /// Wires every service onto one cache backend.
    pub fn new(db: Database, config: Config, backend: Arc<dyn CacheBackend>) -> Self {
        let cache = CacheService::new(backend.clone());

        Self {
            trending: TrendingService::new(backend, config.trending()),
            courses: CourseService::new(
                Arc::new(db.clone()),
                cache.clone(),
                config.access_policy(),
                config.cache_default_ttl,
            ),
            majors: MajorService::new(db.clone(), cache.clone(), config.majors_cache_ttl),
            reviews: ReviewService::new(db.clone()),
            rate_limiter: RateLimiter::new(config.write_rate_limit, config.write_rate_window_secs),
            cache,
            db,
            config,
        }
    }
}

/// Redis when configured and reachable, otherwise one process-wide in-memory store.
async fn select_cache_backend(config: &Config) -> Arc<dyn CacheBackend> {
    if let Some(url) = &config.redis_url {
        match RedisBackend::connect(url).await {
            Ok(backend) if matches!(backend.ping().await, Ok(true)) => {
                tracing::info!("Using Redis cache backend");
                return Arc::new(backend);
            }
            Ok(_) => tracing::warn!("Redis did not answer PING, falling back to in-memory cache"),
            Err(e) => tracing::warn!(error = %e, "Redis unavailable, falling back to in-memory cache"),
        }
    } else {
        tracing::info!("REDIS_URL not set, using in-memory cache backend");
    }

    Arc::new(InMemoryBackend::new())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_line_number(true)
        .init();

    let config = Config::from_env()?;

    tracing::info!("Connecting to database: {}", config.database_url);
    let db = Database::new(&config.database_url).await?;

    tracing::info!("Running database migrations...");
    db.migrate().await?;

    let backend = select_cache_backend(&config).await;
    let addr = config.server_addr()?;

    if config.enable_hsts {
        tracing::info!("HSTS enabled");
    }

    let state = Arc::new(AppState::new(db, config, backend));
    let app = create_router(state);

    tracing::info!("Course review API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
