use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockall::automock;
use thiserror::Error;

use crate::{
    domain::value_objects::enums::{
        gateway_kinds::GatewayKind, transaction_statuses::TransactionStatus,
    },
    payments::callback_fields::CallbackFields,
};

/// Snap tokens and Duitku references both stay payable for a day.
pub const PAYMENT_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq)]
pub struct CreateTransactionRequest {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: Option<String>,
    pub item_id: String,
    pub item_name: String,
    pub item_category: String,
    pub payment_method: Option<String>,
    pub callback_url: Option<String>,
    pub return_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CreatedTransaction {
    pub order_id: String,
    /// Snap token for Gateway A, merchant reference for Gateway B.
    pub token: String,
    pub payment_url: String,
    pub expires_at: DateTime<Utc>,
}

/// Canonical, signature-verified view of a gateway notification or status poll.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationResult {
    pub order_id: String,
    pub gateway_reference: Option<String>,
    pub native_status: String,
    pub status: TransactionStatus,
    pub payment_type: Option<String>,
    pub fraud_status: Option<String>,
    pub gross_amount: Option<i64>,
    pub transaction_time: Option<DateTime<Utc>>,
    pub settlement_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaymentMethodOption {
    pub code: String,
    pub name: String,
    pub image_url: Option<String>,
    pub total_fee: i64,
}

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("invalid signature for order {order_id}")]
    InvalidSignature { order_id: String },
    #[error("malformed notification: {0}")]
    MalformedPayload(String),
    #[error("unknown gateway status: {0}")]
    UnknownStatus(String),
    #[error("gateway rejected request: {0}")]
    Upstream(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn kind(&self) -> GatewayKind;

    /// Public key handed to the browser SDK, when the gateway has one.
    fn client_key(&self) -> Option<String>;

    fn is_production(&self) -> bool;

    async fn create_transaction(
        &self,
        request: CreateTransactionRequest,
    ) -> GatewayResult<CreatedTransaction>;

    /// Pure check over the raw callback fields; missing fields fail closed.
    fn verify_signature(&self, fields: &CallbackFields) -> bool;

    /// Parses, verifies and maps a raw notification body. Nothing is returned unless the signature holds.
    fn handle_notification(&self, raw: &[u8]) -> GatewayResult<NotificationResult>;

    async fn get_transaction_status(&self, order_id: &str) -> GatewayResult<NotificationResult>;

    async fn list_payment_methods(&self, amount: i64) -> GatewayResult<Vec<PaymentMethodOption>>;
}
