// src/db.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::collections::HashMap;

use crate::models::*;
use crate::services::course::CourseStore;

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect(database_url)
            .await?;
        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    pub async fn ping(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    // User operations
    pub async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>(
            "SELECT id, email, is_verified, is_deleted, review_count, created_at
             FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    // Catalogue
    pub async fn list_majors(&self) -> Result<Vec<Major>, sqlx::Error> {
        sqlx::query_as::<_, Major>(
            "SELECT id, name, department FROM majors WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn list_tags(&self) -> Result<Vec<Tag>, sqlx::Error> {
        sqlx::query_as::<_, Tag>("SELECT id, name, tag_type FROM tags ORDER BY tag_type, name")
            .fetch_all(&self.pool)
            .await
    }

    pub async fn get_tags_by_ids(&self, tag_ids: &[i64]) -> Result<Vec<Tag>, sqlx::Error> {
        if tag_ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = tag_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT id, name, tag_type FROM tags WHERE id IN ({}) ORDER BY tag_type, name",
            placeholders
        );

        let mut query = sqlx::query_as::<_, Tag>(&sql);
        for id in tag_ids {
            query = query.bind(id);
        }
        query.fetch_all(&self.pool).await
    }

    pub async fn course_exists(&self, course_id: i64) -> Result<bool, sqlx::Error> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM courses WHERE id = ?")
            .bind(course_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    pub async fn search_courses(&self, q: &str, limit: i64) -> Result<Vec<SearchResult>, sqlx::Error> {
        sqlx::query_as::<_, SearchResult>(
            "SELECT c.id, c.course_code, c.name, m.name AS major_name
             FROM courses c
             JOIN majors m ON m.id = c.major_id
             WHERE c.is_archived = 0 AND c.name LIKE '%' || ? || '%'
             ORDER BY c.name
             LIMIT ?",
        )
        .bind(q)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    /// Evaluation-method tag tallies over the course's visible reviews.
    pub async fn course_eval_summary(&self, course_id: i64) -> Result<CourseEvalSummary, sqlx::Error> {
        let counts = sqlx::query_as::<_, EvalTagCounts>(
            "SELECT
                COALESCE(SUM(CASE WHEN t.name = ? THEN 1 ELSE 0 END), 0) AS final_exam,
                COALESCE(SUM(CASE WHEN t.name = ? THEN 1 ELSE 0 END), 0) AS final_assignment,
                COALESCE(SUM(CASE WHEN t.name = ? THEN 1 ELSE 0 END), 0) AS midterm,
                COALESCE(SUM(CASE WHEN t.name = ? THEN 1 ELSE 0 END), 0) AS attendance
             FROM reviews r
             LEFT JOIN review_tags rt ON rt.review_id = r.id
             LEFT JOIN tags t ON t.id = rt.tag_id
             WHERE r.course_id = ? AND r.is_hidden = 0",
        )
        .bind(TAG_FINAL_EXAM)
        .bind(TAG_FINAL_ASSIGNMENT)
        .bind(TAG_MIDTERM_ASSIGNMENT)
        .bind(TAG_ATTENDANCE_ASSIGNMENT)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(counts.into())
    }

    // Reviews
    pub async fn has_review(&self, user_id: i64, course_id: i64) -> Result<bool, sqlx::Error> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE user_id = ? AND course_id = ?")
                .bind(user_id)
                .bind(course_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    /// Inserts a review with its tags and bumps the author's review count,
    /// all in one transaction.
    pub async fn create_review(
        &self,
        user_id: i64,
        course_id: i64,
        review: &CreateReviewRequest,
        created_at: DateTime<Utc>,
    ) -> Result<i64, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO reviews
                (course_id, user_id, year, semester, rating_overall, difficulty, workload, text, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(course_id)
        .bind(user_id)
        .bind(review.year)
        .bind(review.semester)
        .bind(review.rating_overall)
        .bind(review.difficulty)
        .bind(review.workload)
        .bind(&review.text)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;
        let review_id = result.last_insert_rowid();

        for tag_id in &review.tag_ids {
            sqlx::query(
                "INSERT INTO review_tags (review_id, tag_id) VALUES (?, ?)
                 ON CONFLICT(review_id, tag_id) DO NOTHING",
            )
            .bind(review_id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE users SET review_count = review_count + 1 WHERE id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(review_id)
    }

    pub async fn get_review(&self, review_id: i64) -> Result<Option<Review>, sqlx::Error> {
        let review = sqlx::query_as::<_, Review>(
            "SELECT id, course_id, year, semester, rating_overall, difficulty, workload, text, created_at
             FROM reviews WHERE id = ?",
        )
        .bind(review_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(mut review) = review else {
            return Ok(None);
        };
        review.tags = sqlx::query_as::<_, Tag>(
            "SELECT t.id, t.name, t.tag_type
             FROM review_tags rt JOIN tags t ON t.id = rt.tag_id
             WHERE rt.review_id = ?
             ORDER BY t.tag_type, t.name",
        )
        .bind(review_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(review))
    }

    async fn visible_review_tags(&self, course_id: i64) -> Result<HashMap<i64, Vec<Tag>>, sqlx::Error> {
        let rows = sqlx::query(
            "SELECT rt.review_id, t.id, t.name, t.tag_type
             FROM review_tags rt
             JOIN tags t ON t.id = rt.tag_id
             JOIN reviews r ON r.id = rt.review_id
             WHERE r.course_id = ? AND r.is_hidden = 0
             ORDER BY t.tag_type, t.name",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
        for row in rows {
            let review_id: i64 = row.try_get("review_id")?;
            tags.entry(review_id).or_default().push(Tag {
                id: row.try_get("id")?,
                name: row.try_get("name")?,
                tag_type: row.try_get("tag_type")?,
            });
        }
        Ok(tags)
    }
}

fn order_clause(sort: SortMode) -> &'static str {
    match sort {
        SortMode::TopRated => "rs.avg_rating DESC NULLS LAST, c.id",
        SortMode::MostReviewed => "review_count DESC, c.id",
        SortMode::Latest => "rs.latest_review DESC NULLS LAST, c.id",
    }
}

#[async_trait]
impl CourseStore for Database {
    async fn course_list_with_stats(
        &self,
        major_id: Option<i64>,
        q: Option<&str>,
        sort: SortMode,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CourseSummary>, sqlx::Error> {
        let sql = format!(
            "WITH rs AS (
                SELECT course_id,
                       AVG(rating_overall) AS avg_rating,
                       AVG(difficulty) AS avg_difficulty,
                       AVG(workload) AS avg_workload,
                       COUNT(id) AS review_count,
                       MAX(created_at) AS latest_review
                FROM reviews
                WHERE is_hidden = 0
                GROUP BY course_id
             )
             SELECT c.id, c.course_code, c.name, m.name AS major_name,
                    ROUND(rs.avg_rating, 2) AS avg_rating,
                    ROUND(rs.avg_difficulty, 2) AS avg_difficulty,
                    ROUND(rs.avg_workload, 2) AS avg_workload,
                    COALESCE(rs.review_count, 0) AS review_count
             FROM courses c
             JOIN majors m ON m.id = c.major_id
             LEFT JOIN rs ON rs.course_id = c.id
             WHERE c.is_archived = 0
               AND (? IS NULL OR c.major_id = ?)
               AND (? IS NULL OR c.name LIKE '%' || ? || '%')
             ORDER BY {}
             LIMIT ? OFFSET ?",
            order_clause(sort)
        );

        sqlx::query_as::<_, CourseSummary>(&sql)
            .bind(major_id)
            .bind(major_id)
            .bind(q)
            .bind(q)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
    }

    async fn course_detail_with_stats(&self, course_id: i64) -> Result<Option<CourseStats>, sqlx::Error> {
        sqlx::query_as::<_, CourseStats>(
            "SELECT c.id, c.course_code, c.name, c.is_archived,
                    m.id AS major_id, m.name AS major_name, m.department AS major_department,
                    ROUND(AVG(r.rating_overall), 2) AS avg_rating,
                    ROUND(AVG(r.difficulty), 2) AS avg_difficulty,
                    ROUND(AVG(r.workload), 2) AS avg_workload,
                    COUNT(r.id) AS review_count
             FROM courses c
             JOIN majors m ON m.id = c.major_id
             LEFT JOIN reviews r ON r.course_id = c.id AND r.is_hidden = 0
             WHERE c.id = ?
             GROUP BY c.id",
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn visible_reviews_for_course(&self, course_id: i64) -> Result<Vec<Review>, sqlx::Error> {
        let mut reviews = sqlx::query_as::<_, Review>(
            "SELECT id, course_id, year, semester, rating_overall, difficulty, workload, text, created_at
             FROM reviews
             WHERE course_id = ? AND is_hidden = 0
             ORDER BY created_at DESC, id DESC",
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        let mut tags = self.visible_review_tags(course_id).await?;
        for review in &mut reviews {
            review.tags = tags.remove(&review.id).unwrap_or_default();
        }
        Ok(reviews)
    }
}
