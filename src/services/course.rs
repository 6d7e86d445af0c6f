// src/services/course.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::middleware::cache::CacheService;
use crate::models::{CourseDetail, CourseListQuery, CourseStats, CourseSummary, Major, Review, SortMode, Viewer};
use crate::services::access::AccessPolicy;

/// Read queries the course service needs from the database.
#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Non-archived courses with aggregates over visible reviews.
    async fn course_list_with_stats(
        &self,
        major_id: Option<i64>,
        q: Option<&str>,
        sort: SortMode,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CourseSummary>, sqlx::Error>;

    async fn course_detail_with_stats(&self, course_id: i64) -> Result<Option<CourseStats>, sqlx::Error>;

    /// Visible reviews, newest first, each with its tags.
    async fn visible_reviews_for_course(&self, course_id: i64) -> Result<Vec<Review>, sqlx::Error>;
}

pub struct CourseService {
    store: Arc<dyn CourseStore>,
    cache: CacheService,
    policy: AccessPolicy,
    list_ttl: Duration,
}

pub fn list_cache_key(major_id: Option<i64>, sort: SortMode, limit: i64, offset: i64) -> String {
    let major = major_id
        .map(|id| id.to_string())
        .unwrap_or_else(|| "all".to_string());
    format!(
        "courses:list:v1:major={}:sort={}:limit={}:offset={}",
        major,
        sort.as_str(),
        limit,
        offset
    )
}

impl CourseService {
    pub fn new(store: Arc<dyn CourseStore>, cache: CacheService, policy: AccessPolicy, list_ttl: Duration) -> Self {
        Self {
            store,
            cache,
            policy,
            list_ttl,
        }
    }

    /// Course listing. Plain listings are memoized per (major, sort, limit,
    /// offset); free-text searches always go to the store.
    pub async fn list_courses(
        &self,
        query: &CourseListQuery,
        viewer: Option<&Viewer>,
    ) -> Result<Vec<CourseSummary>, sqlx::Error> {
        tracing::debug!(
            viewer = viewer.map(|v| v.id),
            sort = query.sort.as_str(),
            "listing courses"
        );

        if let Some(q) = query.search_text() {
            return self
                .store
                .course_list_with_stats(query.major_id, Some(q), query.sort, query.limit, query.offset)
                .await;
        }

        let key = list_cache_key(query.major_id, query.sort, query.limit, query.offset);
        self.cache
            .get_or_compute(&key, self.list_ttl, || {
                self.store
                    .course_list_with_stats(query.major_id, None, query.sort, query.limit, query.offset)
            })
            .await
    }

    pub async fn get_course_detail(
        &self,
        course_id: i64,
        viewer: Option<&Viewer>,
    ) -> Result<Option<CourseDetail>, sqlx::Error> {
        self.get_course_detail_at(course_id, viewer, Utc::now()).await
    }

    pub async fn get_course_detail_at(
        &self,
        course_id: i64,
        viewer: Option<&Viewer>,
        now: DateTime<Utc>,
    ) -> Result<Option<CourseDetail>, sqlx::Error> {
        let Some(stats) = self.store.course_detail_with_stats(course_id).await? else {
            return Ok(None);
        };

        let full_access = self.policy.can_view_full_detail(viewer, now);

        let mut detail = CourseDetail {
            id: stats.id,
            course_code: stats.course_code,
            name: stats.name,
            is_archived: stats.is_archived,
            major: Major {
                id: stats.major_id,
                name: stats.major_name,
                department: stats.major_department,
            },
            review_count: stats.review_count,
            avg_rating: None,
            avg_difficulty: None,
            avg_workload: None,
            full_access,
            reviews: Vec::new(),
        };

        if full_access {
            detail.avg_rating = stats.avg_rating;
            detail.avg_difficulty = stats.avg_difficulty;
            detail.avg_workload = stats.avg_workload;
            detail.reviews = self.store.visible_reviews_for_course(course_id).await?;
        }

        Ok(Some(detail))
    }
}
