// src/handlers/api.rs
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::auth::{AuthViewer, OptionalViewer};
use crate::error::AppError;
use crate::models::*;
use crate::AppState;

// Course endpoints
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    OptionalViewer(viewer): OptionalViewer,
    Query(query): Query<CourseListQuery>,
) -> Result<Json<Vec<CourseSummary>>, AppError> {
    if !(1..=COURSE_LIST_MAX_LIMIT).contains(&query.limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            COURSE_LIST_MAX_LIMIT
        )));
    }
    if query.offset < 0 {
        return Err(AppError::Validation("offset must not be negative".to_string()));
    }

    let courses = state.courses.list_courses(&query, viewer.as_ref()).await?;
    Ok(Json(courses))
}

pub async fn get_course(
    State(state): State<Arc<AppState>>,
    OptionalViewer(viewer): OptionalViewer,
    Path(course_id): Path<i64>,
) -> Result<Json<CourseDetail>, AppError> {
    state
        .courses
        .get_course_detail(course_id, viewer.as_ref())
        .await?
        .map(Json)
        .ok_or(AppError::NotFound("Course not found"))
}

pub async fn get_eval_summary(
    State(state): State<Arc<AppState>>,
    AuthViewer(_viewer): AuthViewer,
    Path(course_id): Path<i64>,
) -> Result<Json<CourseEvalSummary>, AppError> {
    if !state.db.course_exists(course_id).await? {
        return Err(AppError::NotFound("Course not found"));
    }

    Ok(Json(state.db.course_eval_summary(course_id).await?))
}

pub async fn create_review(
    State(state): State<Arc<AppState>>,
    AuthViewer(author): AuthViewer,
    Path(course_id): Path<i64>,
    Json(payload): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<Review>), AppError> {
    let review = state.reviews.create_review(course_id, &author, payload).await?;
    Ok((StatusCode::CREATED, Json(review)))
}

// Search endpoints
pub async fn search_courses(
    State(state): State<Arc<AppState>>,
    AuthViewer(_viewer): AuthViewer,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<SearchResult>>, AppError> {
    let len = query.q.chars().count();
    if !(SEARCH_QUERY_MIN_LEN..=SEARCH_QUERY_MAX_LEN).contains(&len) {
        return Err(AppError::Validation(format!(
            "q must be between {} and {} characters",
            SEARCH_QUERY_MIN_LEN, SEARCH_QUERY_MAX_LEN
        )));
    }
    if !(1..=SEARCH_MAX_LIMIT).contains(&query.limit) {
        return Err(AppError::Validation(format!(
            "limit must be between 1 and {}",
            SEARCH_MAX_LIMIT
        )));
    }

    state.trending.spawn_log_search(query.q.clone());

    let results = state.db.search_courses(&query.q, query.limit).await?;
    Ok(Json(results))
}

pub async fn trending(
    State(state): State<Arc<AppState>>,
    Query(query): Query<TrendingQuery>,
) -> Json<Vec<TrendingItem>> {
    Json(state.trending.get_trending(query.limit).await)
}

// Reference data
pub async fn list_majors(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Major>>, AppError> {
    Ok(Json(state.majors.list_majors().await?))
}

pub async fn list_tags(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Tag>>, AppError> {
    Ok(Json(state.db.list_tags().await?))
}
