// src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const COURSE_LIST_DEFAULT_LIMIT: i64 = 20;
pub const COURSE_LIST_MAX_LIMIT: i64 = 100;
pub const SEARCH_DEFAULT_LIMIT: i64 = 20;
pub const SEARCH_MAX_LIMIT: i64 = 50;
pub const SEARCH_QUERY_MIN_LEN: usize = 2;
pub const SEARCH_QUERY_MAX_LEN: usize = 100;
pub const TRENDING_DEFAULT_LIMIT: usize = 10;

// Database models
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub is_verified: bool,
    pub is_deleted: bool,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
}

/// The person reading course data, as far as access decisions care.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewer {
    pub id: i64,
    pub is_verified: bool,
    pub review_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<User> for Viewer {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            is_verified: user.is_verified,
            review_count: user.review_count,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Major {
    pub id: i64,
    pub name: String,
    pub department: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub tag_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    TopRated,
    MostReviewed,
    Latest,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::TopRated => "top_rated",
            SortMode::MostReviewed => "most_reviewed",
            SortMode::Latest => "latest",
        }
    }
}

// Request/Response types
#[derive(Debug, Clone, Deserialize)]
pub struct CourseListQuery {
    pub major_id: Option<i64>,
    pub q: Option<String>,
    #[serde(default)]
    pub sort: SortMode,
    #[serde(default = "default_course_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_course_limit() -> i64 {
    COURSE_LIST_DEFAULT_LIMIT
}

impl Default for CourseListQuery {
    fn default() -> Self {
        Self {
            major_id: None,
            q: None,
            sort: SortMode::default(),
            limit: COURSE_LIST_DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl CourseListQuery {
    /// The free-text filter, if it has any content.
    pub fn search_text(&self) -> Option<&str> {
        self.q.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CourseSummary {
    pub id: i64,
    pub course_code: String,
    pub name: String,
    pub major_name: String,
    pub avg_rating: Option<f64>,
    pub avg_difficulty: Option<f64>,
    pub avg_workload: Option<f64>,
    pub review_count: i64,
}

/// A course row joined with its major and aggregate statistics.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct CourseStats {
    pub id: i64,
    pub course_code: String,
    pub name: String,
    pub is_archived: bool,
    pub major_id: i64,
    pub major_name: String,
    pub major_department: String,
    pub avg_rating: Option<f64>,
    pub avg_difficulty: Option<f64>,
    pub avg_workload: Option<f64>,
    pub review_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Review {
    pub id: i64,
    pub course_id: i64,
    pub year: i64,
    pub semester: i64,
    pub rating_overall: i64,
    pub difficulty: i64,
    pub workload: i64,
    pub text: String,
    pub created_at: DateTime<Utc>,
    #[sqlx(skip)]
    pub tags: Vec<Tag>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CourseDetail {
    pub id: i64,
    pub course_code: String,
    pub name: String,
    pub is_archived: bool,
    pub major: Major,
    pub review_count: i64,
    pub avg_rating: Option<f64>,
    pub avg_difficulty: Option<f64>,
    pub avg_workload: Option<f64>,
    /// False when the viewer only gets the redacted view.
    pub full_access: bool,
    pub reviews: Vec<Review>,
}

// Evaluation-method tags counted by the course evaluation summary.
pub const TAG_FINAL_EXAM: &str = "기말시험";
pub const TAG_FINAL_ASSIGNMENT: &str = "기말과제물";
pub const TAG_MIDTERM_ASSIGNMENT: &str = "중간과제물";
pub const TAG_ATTENDANCE_ASSIGNMENT: &str = "출석수업과제";
/// A midterm/attendance tag must appear on more than this many reviews to count.
pub const EVAL_TAG_THRESHOLD: i64 = 3;

/// Tag tallies over a course's visible reviews.
#[derive(Debug, Clone, Copy, Default, PartialEq, sqlx::FromRow)]
pub struct EvalTagCounts {
    pub final_exam: i64,
    pub final_assignment: i64,
    pub midterm: i64,
    pub attendance: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseEvalSummary {
    /// Dominant final evaluation tag, if any review mentions one.
    pub final_type: Option<String>,
    pub has_midterm: bool,
    pub has_attendance: bool,
}

impl From<EvalTagCounts> for CourseEvalSummary {
    fn from(counts: EvalTagCounts) -> Self {
        // An exam wins only with a strict majority; ties go to the assignment.
        let final_type = if counts.final_exam > counts.final_assignment {
            Some(TAG_FINAL_EXAM)
        } else if counts.final_assignment > 0 {
            Some(TAG_FINAL_ASSIGNMENT)
        } else {
            None
        };

        Self {
            final_type: final_type.map(str::to_string),
            has_midterm: counts.midterm > EVAL_TAG_THRESHOLD,
            has_attendance: counts.attendance > EVAL_TAG_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct SearchResult {
    pub id: i64,
    pub course_code: String,
    pub name: String,
    pub major_name: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

fn default_search_limit() -> i64 {
    SEARCH_DEFAULT_LIMIT
}

#[derive(Debug, Deserialize)]
pub struct TrendingQuery {
    #[serde(default = "default_trending_limit")]
    pub limit: usize,
}

fn default_trending_limit() -> usize {
    TRENDING_DEFAULT_LIMIT
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankChange {
    Up,
    Down,
    Same,
    New,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingItem {
    pub rank: usize,
    pub name: String,
    pub change: RankChange,
    #[serde(rename = "changeAmount")]
    pub change_amount: usize,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateReviewRequest {
    #[validate(range(min = 2000, max = 2100))]
    pub year: i64,
    #[validate(range(min = 1, max = 2))]
    pub semester: i64,
    #[validate(range(min = 1, max = 5))]
    pub rating_overall: i64,
    #[validate(range(min = 1, max = 5))]
    pub difficulty: i64,
    #[validate(range(min = 1, max = 5))]
    pub workload: i64,
    #[validate(length(min = 10, max = 2000))]
    pub text: String,
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(final_exam: i64, final_assignment: i64, midterm: i64, attendance: i64) -> EvalTagCounts {
        EvalTagCounts {
            final_exam,
            final_assignment,
            midterm,
            attendance,
        }
    }

    #[test]
    fn test_eval_summary_final_type() {
        assert_eq!(CourseEvalSummary::from(counts(0, 0, 0, 0)).final_type, None);
        assert_eq!(
            CourseEvalSummary::from(counts(2, 0, 0, 0)).final_type.as_deref(),
            Some(TAG_FINAL_EXAM)
        );
        assert_eq!(
            CourseEvalSummary::from(counts(1, 3, 0, 0)).final_type.as_deref(),
            Some(TAG_FINAL_ASSIGNMENT)
        );
        assert_eq!(
            CourseEvalSummary::from(counts(2, 2, 0, 0)).final_type.as_deref(),
            Some(TAG_FINAL_ASSIGNMENT)
        );
    }

    #[test]
    fn test_eval_summary_threshold_is_exclusive() {
        let at_threshold = CourseEvalSummary::from(counts(0, 0, 3, 3));
        let above = CourseEvalSummary::from(counts(0, 0, 4, 4));

        assert!(!at_threshold.has_midterm);
        assert!(!at_threshold.has_attendance);
        assert!(above.has_midterm);
        assert!(above.has_attendance);
    }
}
