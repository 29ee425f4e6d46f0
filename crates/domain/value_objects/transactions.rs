use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::enums::transaction_statuses::TransactionStatus;

/// Result of an idempotent enrollment insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentOutcome {
    Created,
    AlreadyEnrolled,
}

/// Public view of a transaction, safe to expose without authentication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionStatusDto {
    pub order_id: String,
    pub status: TransactionStatus,
    pub amount: i64,
    pub currency: String,
    pub course_name: Option<String>,
    pub course_slug: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionCourseDto {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
}

/// One row of a user's own purchase history.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionHistoryItemDto {
    pub id: Uuid,
    pub order_id: String,
    pub status: TransactionStatus,
    pub amount: i64,
    pub original_amount: Option<i64>,
    pub discount_amount: Option<i64>,
    pub currency: String,
    pub gateway: String,
    pub payment_type: Option<String>,
    pub payment_url: Option<String>,
    pub course: Option<TransactionCourseDto>,
    pub settlement_time: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionHistoryDto {
    pub transactions: Vec<TransactionHistoryItemDto>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}
