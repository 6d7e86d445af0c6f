// src/services/major.rs
use std::time::Duration;

use crate::db::Database;
use crate::middleware::cache::CacheService;
use crate::models::Major;

const MAJORS_CACHE_KEY: &str = "majors:all:v1";

pub struct MajorService {
    db: Database,
    cache: CacheService,
    ttl: Duration,
}

impl MajorService {
    pub fn new(db: Database, cache: CacheService, ttl: Duration) -> Self {
        Self { db, cache, ttl }
    }

    pub async fn list_majors(&self) -> Result<Vec<Major>, sqlx::Error> {
        self.cache
            .get_or_compute(MAJORS_CACHE_KEY, self.ttl, || self.db.list_majors())
            .await
    }
}
