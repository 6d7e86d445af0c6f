// src/services/review.rs
use chrono::Utc;
use thiserror::Error;
use tracing::info;
use validator::{Validate, ValidationErrors};

use crate::db::Database;
use crate::models::{CreateReviewRequest, Review, Viewer};

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("invalid review: {0}")]
    Invalid(#[from] ValidationErrors),

    #[error("course not found")]
    CourseNotFound,

    #[error("you have already reviewed this course")]
    DuplicateReview,

    #[error("one or more tags not found")]
    TagNotFound,

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub struct ReviewService {
    db: Database,
}

impl ReviewService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create_review(
        &self,
        course_id: i64,
        author: &Viewer,
        mut request: CreateReviewRequest,
    ) -> Result<Review, ReviewError> {
        request.validate()?;
        request.tag_ids.sort_unstable();
        request.tag_ids.dedup();

        if !self.db.course_exists(course_id).await? {
            return Err(ReviewError::CourseNotFound);
        }
        if self.db.has_review(author.id, course_id).await? {
            return Err(ReviewError::DuplicateReview);
        }
        if !request.tag_ids.is_empty() {
            let tags = self.db.get_tags_by_ids(&request.tag_ids).await?;
            if tags.len() != request.tag_ids.len() {
                return Err(ReviewError::TagNotFound);
            }
        }

        let review_id = self
            .db
            .create_review(author.id, course_id, &request, Utc::now())
            .await
            .map_err(|e| {
                // Lost a race with a concurrent submission for the same course.
                let duplicate = e
                    .as_database_error()
                    .is_some_and(|db_err| db_err.is_unique_violation());
                if duplicate {
                    ReviewError::DuplicateReview
                } else {
                    ReviewError::Database(e)
                }
            })?;

        info!(review_id, course_id, user_id = author.id, "review created");

        self.db
            .get_review(review_id)
            .await?
            .ok_or(ReviewError::Database(sqlx::Error::RowNotFound))
    }
}
