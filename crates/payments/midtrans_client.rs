use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::{
    domain::value_objects::enums::gateway_kinds::GatewayKind,
    payments::{
        callback_fields::{
            CallbackFields, coerce_amount, optional, parse_gateway_time, parse_json, required,
        },
        gateway::{
            CreateTransactionRequest, CreatedTransaction, GatewayError, GatewayResult,
            NotificationResult, PAYMENT_WINDOW_HOURS, PaymentGateway, PaymentMethodOption,
        },
        signatures::{constant_time_eq, midtrans_signature},
        status_mapper::map_midtrans_status,
    },
};

const SNAP_SANDBOX_URL: &str = "https://app.sandbox.midtrans.com/snap/v1/transactions";
const SNAP_PRODUCTION_URL: &str = "https://app.midtrans.com/snap/v1/transactions";
const API_SANDBOX_URL: &str = "https://api.sandbox.midtrans.com/v2";
const API_PRODUCTION_URL: &str = "https://api.midtrans.com/v2";
const ITEM_NAME_MAX_CHARS: usize = 50;

#[derive(Debug, Clone)]
pub struct MidtransConfig {
    pub server_key: String,
    pub client_key: String,
    pub is_production: bool,
    pub timeout: Duration,
}

/// Snap checkout client (Gateway A).
pub struct MidtransClient {
    http: reqwest::Client,
    server_key: String,
    client_key: String,
    is_production: bool,
    snap_url: String,
    api_url: String,
}

#[derive(Debug, Serialize)]
struct SnapRequest<'a> {
    transaction_details: SnapTransactionDetails<'a>,
    customer_details: SnapCustomerDetails<'a>,
    item_details: Vec<SnapItemDetails>,
    #[serde(skip_serializing_if = "Option::is_none")]
    callbacks: Option<SnapCallbacks<'a>>,
}

#[derive(Debug, Serialize)]
struct SnapTransactionDetails<'a> {
    order_id: &'a str,
    gross_amount: i64,
}

#[derive(Debug, Serialize)]
struct SnapCustomerDetails<'a> {
    first_name: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct SnapItemDetails {
    id: String,
    price: i64,
    quantity: i64,
    name: String,
    category: String,
}

#[derive(Debug, Serialize)]
struct SnapCallbacks<'a> {
    finish: &'a str,
    unfinish: &'a str,
    error: &'a str,
}

#[derive(Debug, Deserialize)]
struct SnapResponse {
    #[serde(default)]
    token: String,
    #[serde(default)]
    redirect_url: String,
    #[serde(default)]
    error_messages: Vec<String>,
}

impl MidtransClient {
    pub fn new(config: MidtransConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        let (snap_url, api_url) = if config.is_production {
            (SNAP_PRODUCTION_URL, API_PRODUCTION_URL)
        } else {
            (SNAP_SANDBOX_URL, API_SANDBOX_URL)
        };

        Ok(Self {
            http,
            server_key: config.server_key,
            client_key: config.client_key,
            is_production: config.is_production,
            snap_url: snap_url.to_string(),
            api_url: api_url.to_string(),
        })
    }

    async fn ensure_success(
        resp: reqwest::Response,
        context: &str,
    ) -> GatewayResult<reqwest::Response> {
        if resp.status().is_success() {
            return Ok(resp);
        }

        let status = resp.status();
        let body = match resp.text().await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => "<empty response body>".to_string(),
            Err(err) => format!("<failed to read response body: {err}>"),
        };

        error!(
            status = %status,
            response_body = %body,
            context = %context,
            "midtrans: api request failed"
        );

        Err(GatewayError::Upstream(format!(
            "midtrans {context} failed with status {status}"
        )))
    }

    /// Builds the canonical result from already trusted fields.
    fn result_from_fields(fields: &CallbackFields) -> GatewayResult<NotificationResult> {
        let order_id = required(fields, "order_id")?.to_string();
        let native_status = required(fields, "transaction_status")?.to_string();
        let fraud_status = optional(fields, "fraud_status");
        let status = map_midtrans_status(&native_status, fraud_status.as_deref())?;

        Ok(NotificationResult {
            order_id,
            gateway_reference: optional(fields, "transaction_id"),
            native_status,
            status,
            payment_type: optional(fields, "payment_type"),
            fraud_status,
            gross_amount: fields.get("gross_amount").and_then(|raw| coerce_amount(raw)),
            transaction_time: fields
                .get("transaction_time")
                .and_then(|raw| parse_gateway_time(raw)),
            settlement_time: fields
                .get("settlement_time")
                .and_then(|raw| parse_gateway_time(raw)),
        })
    }
}

#[async_trait]
impl PaymentGateway for MidtransClient {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Midtrans
    }

    fn client_key(&self) -> Option<String> {
        Some(self.client_key.clone()).filter(|key| !key.is_empty())
    }

    fn is_production(&self) -> bool {
        self.is_production
    }

    async fn create_transaction(
        &self,
        request: CreateTransactionRequest,
    ) -> GatewayResult<CreatedTransaction> {
        let callbacks = request.return_url.as_deref().map(|url| SnapCallbacks {
            finish: url,
            unfinish: url,
            error: url,
        });

        let payload = SnapRequest {
            transaction_details: SnapTransactionDetails {
                order_id: &request.order_id,
                gross_amount: request.amount,
            },
            customer_details: SnapCustomerDetails {
                first_name: &request.customer_name,
                email: &request.customer_email,
                phone: request.customer_phone.as_deref(),
            },
            item_details: vec![SnapItemDetails {
                id: request.item_id.clone(),
                price: request.amount,
                quantity: 1,
                name: request.item_name.chars().take(ITEM_NAME_MAX_CHARS).collect(),
                category: request.item_category.clone(),
            }],
            callbacks,
        };

        info!(
            order_id = %request.order_id,
            amount = request.amount,
            "midtrans: creating snap transaction"
        );

        let resp = self
            .http
            .post(&self.snap_url)
            .basic_auth(&self.server_key, Some(""))
            .json(&payload)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create snap transaction").await?;

        let parsed: SnapResponse = resp.json().await?;
        if !parsed.error_messages.is_empty() {
            return Err(GatewayError::Upstream(parsed.error_messages.join("; ")));
        }
        if parsed.token.is_empty() {
            return Err(GatewayError::Upstream(
                "snap response did not include a token".to_string(),
            ));
        }

        Ok(CreatedTransaction {
            order_id: request.order_id,
            token: parsed.token,
            payment_url: parsed.redirect_url,
            expires_at: Utc::now() + ChronoDuration::hours(PAYMENT_WINDOW_HOURS),
        })
    }

    fn verify_signature(&self, fields: &CallbackFields) -> bool {
        if self.server_key.is_empty() {
            return false;
        }

        let (Ok(order_id), Ok(status_code), Ok(gross_amount), Ok(received)) = (
            required(fields, "order_id"),
            required(fields, "status_code"),
            required(fields, "gross_amount"),
            required(fields, "signature_key"),
        ) else {
            return false;
        };

        let expected = midtrans_signature(order_id, status_code, gross_amount, &self.server_key);
        constant_time_eq(&expected, received)
    }

    fn handle_notification(&self, raw: &[u8]) -> GatewayResult<NotificationResult> {
        let fields = parse_json(raw)?;

        if !self.verify_signature(&fields) {
            let order_id = optional(&fields, "order_id").unwrap_or_default();
            let status_code = optional(&fields, "status_code").unwrap_or_default();
            let gross_amount = optional(&fields, "gross_amount").unwrap_or_default();
            let expected = if self.server_key.is_empty() {
                String::new()
            } else {
                midtrans_signature(&order_id, &status_code, &gross_amount, &self.server_key)
            };
            warn!(
                %order_id,
                %status_code,
                %gross_amount,
                received_signature = ?optional(&fields, "signature_key"),
                computed_signature = %expected,
                "midtrans: notification signature mismatch"
            );
            return Err(GatewayError::InvalidSignature { order_id });
        }

        Self::result_from_fields(&fields)
    }

    async fn get_transaction_status(&self, order_id: &str) -> GatewayResult<NotificationResult> {
        let resp = self
            .http
            .get(format!("{}/{}/status", self.api_url, order_id))
            .basic_auth(&self.server_key, Some(""))
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "get transaction status").await?;

        let body = resp.bytes().await?;
        let fields = parse_json(&body)?;

        // The status API answers HTTP 200 with its own status_code in the body.
        match optional(&fields, "status_code").as_deref() {
            Some("200") | Some("201") | Some("202") | Some("407") => {}
            other => {
                let message = optional(&fields, "status_message").unwrap_or_default();
                warn!(
                    %order_id,
                    status_code = ?other,
                    status_message = %message,
                    "midtrans: status query rejected"
                );
                return Err(GatewayError::Upstream(format!(
                    "status query for {order_id} returned {}: {message}",
                    other.unwrap_or("no status code")
                )));
            }
        }

        Self::result_from_fields(&fields)
    }

    async fn list_payment_methods(&self, _amount: i64) -> GatewayResult<Vec<PaymentMethodOption>> {
        // Snap renders its own method picker.
        Ok(Vec::new())
    }
}
