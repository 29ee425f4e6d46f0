use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tracing::{info, warn};

use crate::{
    domain::value_objects::enums::gateway_kinds::GatewayKind,
    payments::{
        duitku_client::{DuitkuClient, DuitkuConfig},
        gateway::PaymentGateway,
        midtrans_client::{MidtransClient, MidtransConfig},
    },
};

#[derive(Debug, Clone)]
pub struct PaymentGatewaySettings {
    pub provider: GatewayKind,
    pub timeout: Duration,
    pub midtrans_server_key: String,
    pub midtrans_client_key: String,
    pub midtrans_is_production: bool,
    pub duitku_merchant_code: String,
    pub duitku_merchant_key: String,
    pub duitku_is_production: bool,
}

/// Builds the single gateway this process talks to. Chosen once at startup.
pub fn build_active_gateway(settings: &PaymentGatewaySettings) -> Result<Arc<dyn PaymentGateway>> {
    let gateway: Arc<dyn PaymentGateway> = match settings.provider {
        GatewayKind::Midtrans => {
            if settings.midtrans_server_key.is_empty() {
                warn!("payments: MIDTRANS_SERVER_KEY is empty; every notification will be rejected");
            }
            Arc::new(MidtransClient::new(MidtransConfig {
                server_key: settings.midtrans_server_key.clone(),
                client_key: settings.midtrans_client_key.clone(),
                is_production: settings.midtrans_is_production,
                timeout: settings.timeout,
            })?)
        }
        GatewayKind::Duitku => {
            if settings.duitku_merchant_key.is_empty() {
                warn!("payments: DUITKU_MERCHANT_KEY is empty; every callback will be rejected");
            }
            Arc::new(DuitkuClient::new(DuitkuConfig {
                merchant_code: settings.duitku_merchant_code.clone(),
                merchant_key: settings.duitku_merchant_key.clone(),
                is_production: settings.duitku_is_production,
                timeout: settings.timeout,
            })?)
        }
    };

    info!(
        provider = %gateway.kind(),
        is_production = gateway.is_production(),
        "payments: active gateway selected"
    );

    Ok(gateway)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: GatewayKind) -> PaymentGatewaySettings {
        PaymentGatewaySettings {
            provider,
            timeout: Duration::from_secs(30),
            midtrans_server_key: "server".to_string(),
            midtrans_client_key: "client".to_string(),
            midtrans_is_production: false,
            duitku_merchant_code: "M1".to_string(),
            duitku_merchant_key: "K".to_string(),
            duitku_is_production: true,
        }
    }

    #[test]
    fn builds_configured_provider() {
        let midtrans = build_active_gateway(&settings(GatewayKind::Midtrans)).unwrap();
        assert_eq!(midtrans.kind(), GatewayKind::Midtrans);
        assert_eq!(midtrans.client_key().as_deref(), Some("client"));
        assert!(!midtrans.is_production());

        let duitku = build_active_gateway(&settings(GatewayKind::Duitku)).unwrap();
        assert_eq!(duitku.kind(), GatewayKind::Duitku);
        assert_eq!(duitku.client_key(), None);
        assert!(duitku.is_production());
    }
}
