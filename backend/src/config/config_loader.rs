use std::time::Duration;

use anyhow::{Context, Result};
use checkout_core::payments::factory::PaymentGatewaySettings;

use super::config_model::{
    BackendServer, Database, DotEnvyConfig, Duitku, Internal, Midtrans, Notification, Payment,
    UserSecret,
};

const DEFAULT_GATEWAY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";

pub fn load() -> Result<DotEnvyConfig> {
    dotenvy::dotenv().ok();

    let backend_server = BackendServer {
        port: required("SERVER_PORT_BACKEND")?
            .parse()
            .context("SERVER_PORT_BACKEND is invalid")?,
        body_limit: required("SERVER_BODY_LIMIT")?
            .parse()
            .context("SERVER_BODY_LIMIT is invalid")?,
        timeout: required("SERVER_TIMEOUT")?
            .parse()
            .context("SERVER_TIMEOUT is invalid")?,
    };

    let database = Database {
        url: required("DATABASE_URL")?,
    };

    let payment = Payment {
        enabled: optional("PAYMENT_ENABLED")
            .map(|raw| parse_bool(&raw))
            .unwrap_or(false),
        provider: optional("PAYMENT_PROVIDER")
            .unwrap_or_else(|| "midtrans".to_string())
            .parse()
            .context("PAYMENT_PROVIDER is invalid")?,
        callback_base_url: optional("PAYMENT_CALLBACK_BASE_URL"),
        gateway_timeout_secs: match optional("GATEWAY_TIMEOUT_SECS") {
            Some(raw) => raw.parse().context("GATEWAY_TIMEOUT_SECS is invalid")?,
            None => DEFAULT_GATEWAY_TIMEOUT_SECS,
        },
        midtrans: Midtrans {
            server_key: optional("MIDTRANS_SERVER_KEY").unwrap_or_default(),
            client_key: optional("MIDTRANS_CLIENT_KEY").unwrap_or_default(),
            is_production: optional("MIDTRANS_IS_PRODUCTION")
                .map(|raw| parse_bool(&raw))
                .unwrap_or(false),
        },
        duitku: Duitku {
            merchant_code: optional("DUITKU_MERCHANT_CODE").unwrap_or_default(),
            merchant_key: optional("DUITKU_MERCHANT_KEY").unwrap_or_default(),
            is_production: optional("DUITKU_IS_PRODUCTION")
                .map(|raw| parse_bool(&raw))
                .unwrap_or(false),
        },
    };

    let notification = Notification {
        whatsapp_url: optional("WA_GATEWAY_URL"),
        whatsapp_api_key: optional("WA_GATEWAY_API_KEY"),
        frontend_url: optional("FRONTEND_URL").unwrap_or_else(|| DEFAULT_FRONTEND_URL.to_string()),
    };

    let internal = Internal {
        api_key: optional("INTERNAL_API_KEY"),
    };

    Ok(DotEnvyConfig {
        backend_server,
        database,
        payment,
        notification,
        internal,
    })
}

pub fn get_user_secret() -> Result<UserSecret> {
    dotenvy::dotenv().ok();

    Ok(UserSecret {
        secret: required("JWT_USER_SECRET")?,
    })
}

impl Payment {
    pub fn gateway_settings(&self) -> PaymentGatewaySettings {
        PaymentGatewaySettings {
            provider: self.provider,
            timeout: Duration::from_secs(self.gateway_timeout_secs),
            midtrans_server_key: self.midtrans.server_key.clone(),
            midtrans_client_key: self.midtrans.client_key.clone(),
            midtrans_is_production: self.midtrans.is_production,
            duitku_merchant_code: self.duitku.merchant_code.clone(),
            duitku_merchant_key: self.duitku.merchant_key.clone(),
            duitku_is_production: self.duitku.is_production,
        }
    }

    /// Where the active gateway should deliver notifications for new orders.
    pub fn callback_url(&self) -> Option<String> {
        self.callback_base_url.as_ref().map(|base| {
            format!(
                "{}/api/v1/webhooks/{}",
                base.trim_end_matches('/'),
                self.provider
            )
        })
    }
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("{key} is invalid"))
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "t" | "yes" | "y" | "on"
    )
}
