use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::entities::{coupons::CouponEntity, courses::CourseEntity};

/// Coupon codes are stored trimmed and upper-cased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CouponRejection {
    #[error("coupon is not active")]
    Inactive,
    #[error("coupon is not valid yet")]
    NotYetValid,
    #[error("coupon has expired")]
    Expired,
    #[error("coupon usage limit has been reached")]
    UsageLimitReached,
    #[error("you have already used this coupon")]
    PerUserLimitReached,
    #[error("coupon does not apply to this course")]
    NotApplicable,
}

impl CouponRejection {
    /// Limits are a conflict with existing usage; everything else is a bad request.
    pub fn is_limit(&self) -> bool {
        matches!(
            self,
            CouponRejection::UsageLimitReached | CouponRejection::PerUserLimitReached
        )
    }
}

pub fn validate_coupon_for_user(
    coupon: &CouponEntity,
    course: &CourseEntity,
    user_usage_count: i64,
    now: DateTime<Utc>,
) -> Result<(), CouponRejection> {
    if !coupon.is_active {
        return Err(CouponRejection::Inactive);
    }
    if now < coupon.valid_from {
        return Err(CouponRejection::NotYetValid);
    }
    if coupon.valid_until.is_some_and(|until| now > until) {
        return Err(CouponRejection::Expired);
    }
    if coupon
        .usage_limit
        .is_some_and(|limit| coupon.usage_count >= limit)
    {
        return Err(CouponRejection::UsageLimitReached);
    }
    if coupon.course_id.is_some_and(|scope| scope != course.id) {
        return Err(CouponRejection::NotApplicable);
    }
    if let Some(instructor_scope) = coupon.instructor_id {
        if course.instructor_id != Some(instructor_scope) {
            return Err(CouponRejection::NotApplicable);
        }
    }
    if user_usage_count >= i64::from(coupon.per_user_limit.max(1)) {
        return Err(CouponRejection::PerUserLimitReached);
    }

    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValidateCouponModel {
    pub course_id: Uuid,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CouponPreviewDto {
    pub valid: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discount_amount: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_amount: Option<i64>,
}

impl CouponPreviewDto {
    pub fn rejected(code: String, message: impl Into<String>) -> Self {
        Self {
            valid: false,
            code,
            message: message.into(),
            original_amount: None,
            discount_amount: None,
            final_amount: None,
        }
    }
}
