use anyhow::Result;
use async_trait::async_trait;
use diesel::{
    Connection, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper,
    dsl::count_star, insert_into, update,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{coupon_usages, coupons},
    },
};
use domain::{
    entities::{coupon_usages::NewCouponUsageEntity, coupons::CouponEntity},
    repositories::coupons::CouponRepository,
    value_objects::coupons::normalize_code,
};

pub struct CouponPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CouponPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl CouponRepository for CouponPostgres {
    async fn find_by_code(&self, code: &str) -> Result<Option<CouponEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let coupon = coupons::table
            .filter(coupons::code.eq(normalize_code(code)))
            .select(CouponEntity::as_select())
            .first::<CouponEntity>(&mut conn)
            .optional()?;

        Ok(coupon)
    }

    async fn count_usages_by_user(&self, coupon_id: Uuid, user_id: Uuid) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let used = coupon_usages::table
            .filter(coupon_usages::coupon_id.eq(coupon_id))
            .filter(coupon_usages::user_id.eq(user_id))
            .select(count_star())
            .get_result::<i64>(&mut conn)?;

        Ok(used)
    }

    async fn record_usage(&self, usage: NewCouponUsageEntity) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let recorded = conn.transaction::<bool, anyhow::Error, _>(|conn| {
            // `transaction_id` is UNIQUE; NULLs (free checkouts) never conflict.
            let inserted = insert_into(coupon_usages::table)
                .values(&usage)
                .on_conflict(coupon_usages::transaction_id)
                .do_nothing()
                .execute(conn)?;

            if inserted == 0 {
                return Ok(false);
            }

            update(coupons::table.filter(coupons::id.eq(usage.coupon_id)))
                .set(coupons::usage_count.eq(coupons::usage_count + 1))
                .execute(conn)?;

            Ok(true)
        })?;

        Ok(recorded)
    }
}
