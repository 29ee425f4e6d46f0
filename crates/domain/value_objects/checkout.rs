use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutModel {
    pub course_id: Uuid,
    #[serde(default)]
    pub coupon_code: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub return_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutDto {
    pub is_free: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snap_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expired_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub original_amount: i64,
    pub discount_amount: i64,
    pub final_amount: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckoutConfigDto {
    pub enabled: bool,
    pub provider: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_key: Option<String>,
    pub is_production: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentMethodDto {
    pub payment_method: String,
    pub payment_name: String,
    pub payment_image: Option<String>,
    pub total_fee: i64,
}
