use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::{coupon_usages::NewCouponUsageEntity, coupons::CouponEntity};

#[automock]
#[async_trait]
pub trait CouponRepository {
    /// Case-insensitive lookup on the normalized code.
    async fn find_by_code(&self, code: &str) -> Result<Option<CouponEntity>>;

    async fn count_usages_by_user(&self, coupon_id: Uuid, user_id: Uuid) -> Result<i64>;

    /// Inserts the usage row and bumps `usage_count` atomically.
    /// Returns `false` (and increments nothing) when a usage for the same transaction already exists.
    async fn record_usage(&self, usage: NewCouponUsageEntity) -> Result<bool>;
}
