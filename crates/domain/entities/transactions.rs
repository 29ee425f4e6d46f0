use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::transactions;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = transactions)]
pub struct TransactionEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Option<Uuid>,
    pub order_id: String,
    pub amount: i64,
    pub original_amount: Option<i64>,
    pub discount_amount: Option<i64>,
    pub currency: String,
    pub status: String,
    pub gateway: String,
    pub gateway_reference: Option<String>,
    pub payment_type: Option<String>,
    pub fraud_status: Option<String>,
    pub snap_token: Option<String>,
    pub payment_url: Option<String>,
    pub coupon_id: Option<Uuid>,
    pub transaction_time: Option<DateTime<Utc>>,
    pub settlement_time: Option<DateTime<Utc>>,
    pub expired_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = transactions)]
pub struct InsertTransactionEntity {
    pub user_id: Uuid,
    pub course_id: Option<Uuid>,
    pub order_id: String,
    pub amount: i64,
    pub original_amount: Option<i64>,
    pub discount_amount: Option<i64>,
    pub currency: String,
    pub status: String,
    pub gateway: String,
    pub coupon_id: Option<Uuid>,
}

// NewTransactionEntity is the application-facing alias for inserting rows into `transactions`.
pub type NewTransactionEntity = InsertTransactionEntity;

/// Columns written when a verified gateway notification moves the row forward.
/// `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = transactions)]
pub struct TransactionCallbackChangeset {
    pub status: String,
    pub gateway_reference: Option<String>,
    pub payment_type: Option<String>,
    pub fraud_status: Option<String>,
    pub transaction_time: Option<DateTime<Utc>>,
    pub settlement_time: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = transactions)]
pub struct GatewaySessionChangeset {
    pub snap_token: Option<String>,
    pub payment_url: Option<String>,
    pub expired_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
