use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{
    ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper, insert_into,
    update,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::transactions},
};
use domain::{
    entities::transactions::{
        GatewaySessionChangeset, NewTransactionEntity, TransactionCallbackChangeset,
        TransactionEntity,
    },
    repositories::transactions::TransactionRepository,
    value_objects::enums::transaction_statuses::TransactionStatus,
};

pub struct TransactionPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl TransactionPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl TransactionRepository for TransactionPostgres {
    async fn create(&self, transaction: NewTransactionEntity) -> Result<TransactionEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = insert_into(transactions::table)
            .values(&transaction)
            .returning(TransactionEntity::as_returning())
            .get_result::<TransactionEntity>(&mut conn)?;

        Ok(row)
    }

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<TransactionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = transactions::table
            .filter(transactions::order_id.eq(order_id))
            .select(TransactionEntity::as_select())
            .first::<TransactionEntity>(&mut conn)
            .optional()?;

        Ok(row)
    }

    async fn find_by_id(&self, transaction_id: Uuid) -> Result<Option<TransactionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let row = transactions::table
            .find(transaction_id)
            .select(TransactionEntity::as_select())
            .first::<TransactionEntity>(&mut conn)
            .optional()?;

        Ok(row)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let rows = transactions::table
            .filter(transactions::user_id.eq(user_id))
            .order(transactions::created_at.desc())
            .limit(limit)
            .offset(offset)
            .select(TransactionEntity::as_select())
            .load::<TransactionEntity>(&mut conn)?;

        Ok(rows)
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let total = transactions::table
            .filter(transactions::user_id.eq(user_id))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(total)
    }

    async fn update_gateway_session(
        &self,
        transaction_id: Uuid,
        session: GatewaySessionChangeset,
    ) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(transactions::table)
            .filter(transactions::id.eq(transaction_id))
            .set(&session)
            .execute(&mut conn)?;

        Ok(())
    }

    async fn update_status(&self, transaction_id: Uuid, status: TransactionStatus) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(transactions::table)
            .filter(transactions::id.eq(transaction_id))
            .set((
                transactions::status.eq(status.as_str()),
                transactions::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn apply_callback(
        &self,
        order_id: &str,
        expected_current: TransactionStatus,
        changes: TransactionCallbackChangeset,
    ) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(transactions::table)
            .filter(transactions::order_id.eq(order_id))
            .filter(transactions::status.eq(expected_current.as_str()))
            .set(&changes)
            .execute(&mut conn)?;

        Ok(affected == 1)
    }

    async fn cancel_pending_by_user_and_course(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let affected = update(transactions::table)
            .filter(transactions::user_id.eq(user_id))
            .filter(transactions::course_id.eq(course_id))
            .filter(transactions::status.eq(TransactionStatus::Pending.as_str()))
            .set((
                transactions::status.eq(TransactionStatus::Cancel.as_str()),
                transactions::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;

        Ok(affected)
    }
}
