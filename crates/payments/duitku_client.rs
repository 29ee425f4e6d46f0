use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::{
    domain::value_objects::enums::gateway_kinds::GatewayKind,
    payments::{
        callback_fields::{
            CallbackFields, coerce_amount, format_gateway_time, optional, parse_json_or_form,
            required,
        },
        gateway::{
            CreateTransactionRequest, CreatedTransaction, GatewayError, GatewayResult,
            NotificationResult, PAYMENT_WINDOW_HOURS, PaymentGateway, PaymentMethodOption,
        },
        signatures::{
            constant_time_eq, duitku_callback_signature, duitku_inquiry_signature,
            duitku_payment_method_signature, duitku_status_signature,
        },
        status_mapper::map_duitku_code,
    },
};

const SANDBOX_URL: &str = "https://sandbox.duitku.com/webapi/api/merchant";
const PRODUCTION_URL: &str = "https://passport.duitku.com/webapi/api/merchant";
const DEFAULT_PAYMENT_METHOD: &str = "SQ";
const EXPIRY_PERIOD_MINUTES: i64 = 1440;
const SUCCESS_CODE: &str = "00";

#[derive(Debug, Clone)]
pub struct DuitkuConfig {
    pub merchant_code: String,
    pub merchant_key: String,
    pub is_production: bool,
    pub timeout: Duration,
}

/// Inquiry API client (Gateway B).
pub struct DuitkuClient {
    http: reqwest::Client,
    merchant_code: String,
    merchant_key: String,
    is_production: bool,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InquiryRequest<'a> {
    merchant_code: &'a str,
    payment_amount: i64,
    payment_method: &'a str,
    merchant_order_id: &'a str,
    product_details: &'a str,
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone_number: Option<&'a str>,
    customer_va_name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    callback_url: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    return_url: Option<&'a str>,
    signature: String,
    expiry_period: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InquiryResponse {
    #[serde(default)]
    reference: String,
    #[serde(default)]
    payment_url: String,
    #[serde(default)]
    status_code: String,
    #[serde(default)]
    status_message: String,
    #[serde(default, rename = "Message")]
    message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusRequest<'a> {
    merchant_code: &'a str,
    merchant_order_id: &'a str,
    signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    #[serde(default)]
    merchant_order_id: String,
    #[serde(default)]
    reference: String,
    #[serde(default)]
    amount: Option<Value>,
    #[serde(default)]
    status_code: String,
    #[serde(default)]
    status_message: String,
}

#[derive(Debug, Serialize)]
struct PaymentMethodRequest<'a> {
    merchantcode: &'a str,
    amount: i64,
    datetime: String,
    signature: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentMethodResponse {
    #[serde(default)]
    payment_fee: Vec<PaymentFee>,
    #[serde(default)]
    response_code: String,
    #[serde(default)]
    response_message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PaymentFee {
    payment_method: String,
    payment_name: String,
    #[serde(default)]
    payment_image: Option<String>,
    #[serde(default)]
    total_fee: Option<Value>,
}

fn value_to_amount(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => coerce_amount(&number.to_string()),
        Value::String(text) => coerce_amount(text),
        _ => None,
    }
}

impl DuitkuClient {
    pub fn new(config: DuitkuConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;

        let base_url = if config.is_production {
            PRODUCTION_URL
        } else {
            SANDBOX_URL
        };

        Ok(Self {
            http,
            merchant_code: config.merchant_code,
            merchant_key: config.merchant_key,
            is_production: config.is_production,
            base_url: base_url.to_string(),
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
            "duitku: api request failed"
        );

        Err(GatewayError::Upstream(format!(
            "duitku {context} failed with status {status}"
        )))
    }

    fn callback_amount(fields: &CallbackFields) -> GatewayResult<i64> {
        let raw = required(fields, "amount")?;
        coerce_amount(raw)
            .ok_or_else(|| GatewayError::MalformedPayload(format!("invalid amount `{raw}`")))
    }
}

#[async_trait]
impl PaymentGateway for DuitkuClient {
    fn kind(&self) -> GatewayKind {
        GatewayKind::Duitku
    }

    fn client_key(&self) -> Option<String> {
        None
    }

    fn is_production(&self) -> bool {
        self.is_production
    }

    async fn create_transaction(
        &self,
        request: CreateTransactionRequest,
    ) -> GatewayResult<CreatedTransaction> {
        let payment_method = request
            .payment_method
            .as_deref()
            .filter(|method| !method.trim().is_empty())
            .unwrap_or(DEFAULT_PAYMENT_METHOD);

        let payload = InquiryRequest {
            merchant_code: &self.merchant_code,
            payment_amount: request.amount,
            payment_method,
            merchant_order_id: &request.order_id,
            product_details: &request.item_name,
            email: &request.customer_email,
            phone_number: request.customer_phone.as_deref(),
            customer_va_name: &request.customer_name,
            callback_url: request.callback_url.as_deref(),
            return_url: request.return_url.as_deref(),
            signature: duitku_inquiry_signature(
                &self.merchant_code,
                &request.order_id,
                request.amount,
                &self.merchant_key,
            ),
            expiry_period: EXPIRY_PERIOD_MINUTES,
        };

        info!(
            order_id = %request.order_id,
            amount = request.amount,
            payment_method,
            "duitku: creating inquiry"
        );

        let resp = self
            .http
            .post(format!("{}/v2/inquiry", self.base_url))
            .json(&payload)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "create inquiry").await?;

        let parsed: InquiryResponse = resp.json().await?;
        if !parsed.message.is_empty() {
            return Err(GatewayError::Upstream(parsed.message));
        }
        if !parsed.status_code.is_empty() && parsed.status_code != SUCCESS_CODE {
            return Err(GatewayError::Upstream(format!(
                "inquiry returned {}: {}",
                parsed.status_code, parsed.status_message
            )));
        }

        Ok(CreatedTransaction {
            order_id: request.order_id,
            token: parsed.reference,
            payment_url: parsed.payment_url,
            expires_at: Utc::now() + ChronoDuration::hours(PAYMENT_WINDOW_HOURS),
        })
    }

    fn verify_signature(&self, fields: &CallbackFields) -> bool {
        if self.merchant_key.is_empty() {
            return false;
        }

        let (Ok(amount), Ok(order_id), Ok(received)) = (
            Self::callback_amount(fields),
            required(fields, "merchantOrderId"),
            required(fields, "signature"),
        ) else {
            return false;
        };

        let expected =
            duitku_callback_signature(&self.merchant_code, amount, order_id, &self.merchant_key);
        constant_time_eq(&expected, received)
    }

    fn handle_notification(&self, raw: &[u8]) -> GatewayResult<NotificationResult> {
        let fields = parse_json_or_form(raw)?;

        if !self.verify_signature(&fields) {
            let order_id = optional(&fields, "merchantOrderId").unwrap_or_default();
            let amount = Self::callback_amount(&fields).unwrap_or_default();
            let expected = if self.merchant_key.is_empty() {
                String::new()
            } else {
                duitku_callback_signature(&self.merchant_code, amount, &order_id, &self.merchant_key)
            };
            warn!(
                %order_id,
                amount,
                merchant_code = %self.merchant_code,
                received_signature = ?optional(&fields, "signature"),
                computed_signature = %expected,
                "duitku: callback signature mismatch"
            );
            return Err(GatewayError::InvalidSignature { order_id });
        }

        let result_code = required(&fields, "resultCode")?.to_string();
        let status = map_duitku_code(&result_code);

        Ok(NotificationResult {
            order_id: required(&fields, "merchantOrderId")?.to_string(),
            gateway_reference: optional(&fields, "reference"),
            native_status: result_code,
            status,
            payment_type: optional(&fields, "paymentCode"),
            fraud_status: None,
            gross_amount: Some(Self::callback_amount(&fields)?),
            transaction_time: None,
            settlement_time: status.is_success().then(Utc::now),
        })
    }

    async fn get_transaction_status(&self, order_id: &str) -> GatewayResult<NotificationResult> {
        let payload = StatusRequest {
            merchant_code: &self.merchant_code,
            merchant_order_id: order_id,
            signature: duitku_status_signature(&self.merchant_code, order_id, &self.merchant_key),
        };

        let resp = self
            .http
            .post(format!("{}/transactionStatus", self.base_url))
            .json(&payload)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "transaction status").await?;

        let parsed: StatusResponse = resp.json().await?;
        if parsed.status_code.is_empty() {
            return Err(GatewayError::Upstream(format!(
                "status query for {order_id} returned no status code: {}",
                parsed.status_message
            )));
        }

        let status = map_duitku_code(&parsed.status_code);
        let order_id = if parsed.merchant_order_id.is_empty() {
            order_id.to_string()
        } else {
            parsed.merchant_order_id
        };

        Ok(NotificationResult {
            order_id,
            gateway_reference: Some(parsed.reference).filter(|r| !r.is_empty()),
            native_status: parsed.status_code,
            status,
            payment_type: None,
            fraud_status: None,
            gross_amount: parsed.amount.as_ref().and_then(value_to_amount),
            transaction_time: None,
            settlement_time: status.is_success().then(Utc::now),
        })
    }

    async fn list_payment_methods(&self, amount: i64) -> GatewayResult<Vec<PaymentMethodOption>> {
        let datetime = format_gateway_time(Utc::now());
        let payload = PaymentMethodRequest {
            merchantcode: &self.merchant_code,
            amount,
            signature: duitku_payment_method_signature(
                &self.merchant_code,
                amount,
                &datetime,
                &self.merchant_key,
            ),
            datetime,
        };

        let resp = self
            .http
            .post(format!("{}/paymentmethod/getpaymentmethod", self.base_url))
            .json(&payload)
            .send()
            .await?;
        let resp = Self::ensure_success(resp, "list payment methods").await?;

        let parsed: PaymentMethodResponse = resp.json().await?;
        if parsed.response_code != SUCCESS_CODE {
            return Err(GatewayError::Upstream(format!(
                "payment method listing returned {}: {}",
                parsed.response_code, parsed.response_message
            )));
        }

        Ok(parsed
            .payment_fee
            .into_iter()
            .map(|fee| PaymentMethodOption {
                code: fee.payment_method,
                name: fee.payment_name,
                image_url: fee.payment_image,
                total_fee: fee.total_fee.as_ref().and_then(value_to_amount).unwrap_or(0),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::enums::transaction_statuses::TransactionStatus;
    use serde_json::json;

    fn client_with_key(key: &str) -> DuitkuClient {
        DuitkuClient::new(DuitkuConfig {
            merchant_code: "M1".to_string(),
            merchant_key: key.to_string(),
            is_production: false,
            timeout: Duration::from_secs(30),
        })
        .expect("client builds")
    }

    #[test]
    fn json_callback_with_numeric_amount_verifies() {
        let body = json!({
            "merchantCode": "M1",
            "amount": 10000,
            "merchantOrderId": "ORD1",
            "productDetail": "Rust for Backends",
            "paymentCode": "SP",
            "resultCode": "00",
            "reference": "DS1234",
            "signature": "6b2f33ae9e6461de0a23a440ffbd08c8",
        });

        let result = client_with_key("K")
            .handle_notification(body.to_string().as_bytes())
            .expect("valid callback");

        assert_eq!(result.order_id, "ORD1");
        assert_eq!(result.status, TransactionStatus::Settlement);
        assert_eq!(result.gross_amount, Some(10000));
        assert_eq!(result.gateway_reference.as_deref(), Some("DS1234"));
        assert_eq!(result.payment_type.as_deref(), Some("SP"));
        assert!(result.settlement_time.is_some());
    }

    #[test]
    fn form_callback_with_decimal_amount_verifies() {
        let body = "merchantCode=M1&amount=10000.00&merchantOrderId=ORD1&resultCode=01\
                    &reference=DS1234&signature=6b2f33ae9e6461de0a23a440ffbd08c8";

        let result = client_with_key("K")
            .handle_notification(body.as_bytes())
            .expect("valid callback");

        assert_eq!(result.status, TransactionStatus::Pending);
        assert_eq!(result.settlement_time, None);
    }

    #[test]
    fn failed_result_code_maps_to_failure() {
        let body = "merchantCode=M1&amount=10000&merchantOrderId=ORD1&resultCode=02\
                    &signature=6b2f33ae9e6461de0a23a440ffbd08c8";

        let result = client_with_key("K")
            .handle_notification(body.as_bytes())
            .unwrap();

        assert_eq!(result.status, TransactionStatus::Failure);
    }

    #[test]
    fn wrong_key_is_rejected() {
        let body = "merchantCode=M1&amount=10000&merchantOrderId=ORD1&resultCode=00\
                    &signature=6b2f33ae9e6461de0a23a440ffbd08c8";

        let err = client_with_key("other")
            .handle_notification(body.as_bytes())
            .unwrap_err();

        assert!(matches!(err, GatewayError::InvalidSignature { order_id } if order_id == "ORD1"));
    }

    #[test]
    fn inquiry_signature_is_not_accepted_for_callbacks() {
        let body = "merchantCode=M1&amount=10000&merchantOrderId=ORD1&resultCode=00\
                    &signature=d3ed3532ae78f2d32cc3e308f88ec29e";

        assert!(client_with_key("K")
            .handle_notification(body.as_bytes())
            .is_err());
    }

    #[test]
    fn missing_amount_fails_closed() {
        let mut fields = CallbackFields::new();
        fields.insert("merchantOrderId".to_string(), "ORD1".to_string());
        fields.insert(
            "signature".to_string(),
            "6b2f33ae9e6461de0a23a440ffbd08c8".to_string(),
        );

        assert!(!client_with_key("K").verify_signature(&fields));
        assert!(!client_with_key("").verify_signature(&fields));
    }

    #[test]
    fn fee_values_accept_strings_and_numbers() {
        assert_eq!(value_to_amount(&json!("2500")), Some(2500));
        assert_eq!(value_to_amount(&json!(4000)), Some(4000));
        assert_eq!(value_to_amount(&json!(null)), None);
    }
}
