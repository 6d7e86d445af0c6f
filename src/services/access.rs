// src/services/access.rs
use chrono::{DateTime, Duration, Utc};

use crate::models::Viewer;

pub const REQUIRED_REVIEWS_FOR_FULL_ACCESS: i64 = 3;
pub const NEW_USER_GRACE_PERIOD_DAYS: i64 = 3;

/// Decides who may see course aggregates and review text.
///
/// Anonymous viewers never may. Signed-in viewers may once they have written
/// `required_reviews` reviews, or while their account is younger than
/// `grace_period`.
#[derive(Debug, Clone, Copy)]
pub struct AccessPolicy {
    required_reviews: i64,
    grace_period: Duration,
}

impl Default for AccessPolicy {
    fn default() -> Self {
        Self::new(
            REQUIRED_REVIEWS_FOR_FULL_ACCESS,
            Duration::days(NEW_USER_GRACE_PERIOD_DAYS),
        )
    }
}

impl AccessPolicy {
    pub fn new(required_reviews: i64, grace_period: Duration) -> Self {
        Self {
            required_reviews,
            grace_period,
        }
    }

    pub fn can_view_full_detail(&self, viewer: Option<&Viewer>, now: DateTime<Utc>) -> bool {
        let Some(viewer) = viewer else {
            return false;
        };
        if viewer.review_count >= self.required_reviews {
            return true;
        }
        now < viewer.created_at + self.grace_period
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap()
    }

    fn viewer(review_count: i64, age: Duration) -> Viewer {
        Viewer {
            id: 1,
            is_verified: true,
            review_count,
            created_at: now() - age,
        }
    }

    #[test]
    fn test_anonymous_is_gated() {
        assert!(!AccessPolicy::default().can_view_full_detail(None, now()));
    }

    #[test]
    fn test_enough_reviews_unlocks_regardless_of_age() {
        let policy = AccessPolicy::default();
        for count in [3, 4, 50] {
            for age in [Duration::zero(), Duration::days(10), Duration::days(3650)] {
                assert!(policy.can_view_full_detail(Some(&viewer(count, age)), now()));
            }
        }
    }

    #[test]
    fn test_old_account_with_few_reviews_is_gated() {
        let policy = AccessPolicy::default();
        for count in 0..3 {
            assert!(!policy.can_view_full_detail(Some(&viewer(count, Duration::days(10))), now()));
            assert!(!policy.can_view_full_detail(Some(&viewer(count, Duration::days(3))), now()));
        }
    }

    #[test]
    fn test_new_account_is_inside_grace_period() {
        let policy = AccessPolicy::default();
        for count in 0..3 {
            assert!(policy.can_view_full_detail(Some(&viewer(count, Duration::hours(1))), now()));
            assert!(policy.can_view_full_detail(
                Some(&viewer(count, Duration::days(3) - Duration::seconds(1))),
                now()
            ));
        }
    }

    #[test]
    fn test_custom_thresholds() {
        let policy = AccessPolicy::new(1, Duration::zero());
        assert!(!policy.can_view_full_detail(Some(&viewer(0, Duration::zero())), now()));
        assert!(policy.can_view_full_detail(Some(&viewer(1, Duration::days(400))), now()));
    }

    #[test]
    fn test_policy_does_not_touch_viewer() {
        let v = viewer(1, Duration::days(1));
        let before = v.clone();
        AccessPolicy::default().can_view_full_detail(Some(&v), now());
        assert_eq!(v, before);
    }
}
