use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::coupon_usages;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = coupon_usages)]
pub struct CouponUsageEntity {
    pub id: Uuid,
    pub coupon_id: Uuid,
    pub user_id: Uuid,
    pub transaction_id: Option<Uuid>,
    pub discount_applied: i64,
    pub used_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = coupon_usages)]
pub struct InsertCouponUsageEntity {
    pub coupon_id: Uuid,
    pub user_id: Uuid,
    pub transaction_id: Option<Uuid>,
    pub discount_applied: i64,
    pub used_at: DateTime<Utc>,
}

pub type NewCouponUsageEntity = InsertCouponUsageEntity;
