use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::transactions::{
        GatewaySessionChangeset, NewTransactionEntity, TransactionCallbackChangeset,
        TransactionEntity,
    },
    value_objects::enums::transaction_statuses::TransactionStatus,
};

#[automock]
#[async_trait]
pub trait TransactionRepository {
    async fn create(&self, transaction: NewTransactionEntity) -> Result<TransactionEntity>;

    async fn find_by_order_id(&self, order_id: &str) -> Result<Option<TransactionEntity>>;

    async fn find_by_id(&self, transaction_id: Uuid) -> Result<Option<TransactionEntity>>;

    /// Newest first.
    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<TransactionEntity>>;

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64>;

    async fn update_gateway_session(
        &self,
        transaction_id: Uuid,
        session: GatewaySessionChangeset,
    ) -> Result<()>;

    async fn update_status(&self, transaction_id: Uuid, status: TransactionStatus) -> Result<()>;

    /// Compare-and-set: applies `changes` only while the row is still `expected_current`.
    /// Returns `false` when another writer moved the row first.
    async fn apply_callback(
        &self,
        order_id: &str,
        expected_current: TransactionStatus,
        changes: TransactionCallbackChangeset,
    ) -> Result<bool>;

    /// Marks every `pending` row of the pair as `cancel`; returns the number of rows touched.
    async fn cancel_pending_by_user_and_course(
        &self,
        user_id: Uuid,
        course_id: Uuid,
    ) -> Result<usize>;
}
