use super::notifier::{NotificationProvider, PaymentSuccessNotice};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Form-posting WhatsApp gateway (`api_key`, `tujuan`, `pesan`).
pub struct WhatsAppProvider {
    gateway_url: Url,
    api_key: String,
    client: Client,
}

impl WhatsAppProvider {
    pub fn new(gateway_url: Url, api_key: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            gateway_url,
            api_key,
            client,
        })
    }

    fn format_message(notice: &PaymentSuccessNotice) -> String {
        format!(
            "Hi {name}, your payment for *{course}* has been received.\n\
             Order: {order}\n\
             Amount: {currency} {amount}\n\n\
             Start learning at {url}",
            name = notice.customer_name,
            course = notice.course_title,
            order = notice.order_id,
            currency = notice.currency,
            amount = notice.amount,
            url = notice.lms_url,
        )
    }
}

/// Gateway expects `62…` without a plus sign; local `08…` numbers are rewritten.
pub fn normalize_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }

    let normalized = if let Some(rest) = digits.strip_prefix('0') {
        format!("62{rest}")
    } else if digits.starts_with("62") {
        digits
    } else {
        format!("62{digits}")
    };

    Some(normalized)
}

#[async_trait]
impl NotificationProvider for WhatsAppProvider {
    async fn send(&self, notice: &PaymentSuccessNotice) -> Result<()> {
        let phone = notice
            .phone
            .as_deref()
            .and_then(normalize_phone)
            .ok_or_else(|| anyhow!("customer has no usable phone number"))?;

        let form = [
            ("api_key", self.api_key.clone()),
            ("tujuan", phone),
            ("pesan", Self::format_message(notice)),
        ];

        let resp = self
            .client
            .post(self.gateway_url.clone())
            .form(&form)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(anyhow!("whatsapp gateway returned {status}: {body}"));
        }

        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "whatsapp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_indonesian_numbers() {
        assert_eq!(normalize_phone("0812-3456-7890").as_deref(), Some("6281234567890"));
        assert_eq!(normalize_phone("+62 812 3456 7890").as_deref(), Some("6281234567890"));
        assert_eq!(normalize_phone("6281234567890").as_deref(), Some("6281234567890"));
        assert_eq!(normalize_phone("81234567890").as_deref(), Some("6281234567890"));
        assert_eq!(normalize_phone(" - ").as_deref(), None);
    }

    #[test]
    fn message_mentions_course_and_order() {
        let notice = PaymentSuccessNotice {
            order_id: "LMS-1a2b3c4d-12345".to_string(),
            phone: None,
            customer_name: "Sari".to_string(),
            course_title: "Rust for Backends".to_string(),
            amount: 280_000,
            currency: "IDR".to_string(),
            lms_url: "https://lms.example.com".to_string(),
        };

        let message = WhatsAppProvider::format_message(&notice);
        assert!(message.contains("Rust for Backends"));
        assert!(message.contains("LMS-1a2b3c4d-12345"));
        assert!(message.contains("IDR 280000"));
    }
}
