use anyhow::{Context, Result};
use backend::axum_http::http_serve;
use backend::config::{config_loader, config_model::DotEnvyConfig};
use checkout_core::infra::db::postgres::postgres_connection;
use checkout_core::infra::notifications::{NotificationProvider, Notifier, whatsapp::WhatsAppProvider};
use checkout_core::payments::factory::build_active_gateway;
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        error!("Backend exited with error: {:#}", error);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    checkout_core::observability::init_observability("backend")?;

    let dotenvy_env = config_loader::load()?;
    info!("ENV has been loaded");

    let postgres_pool = postgres_connection::establish_connection(&dotenvy_env.database.url)?;
    info!("Postgres connection has been established");

    let gateway = build_active_gateway(&dotenvy_env.payment.gateway_settings())?;
    info!(provider = %gateway.kind(), "Payment gateway has been configured");

    let notifier = Notifier::new(notification_providers(&dotenvy_env)?);

    http_serve::start(
        Arc::new(dotenvy_env),
        Arc::new(postgres_pool),
        gateway,
        notifier,
    )
    .await?;

    Ok(())
}

fn notification_providers(config: &DotEnvyConfig) -> Result<Vec<Arc<dyn NotificationProvider>>> {
    let mut providers: Vec<Arc<dyn NotificationProvider>> = Vec::new();

    match (
        config.notification.whatsapp_url.as_deref(),
        config.notification.whatsapp_api_key.clone(),
    ) {
        (Some(raw_url), Some(api_key)) => {
            let url = raw_url.parse::<url::Url>().context("WA_GATEWAY_URL is invalid")?;
            let provider = WhatsAppProvider::new(
                url,
                api_key,
                Duration::from_secs(config.payment.gateway_timeout_secs),
            )?;
            providers.push(Arc::new(provider));
            info!("WhatsApp notifications are enabled");
        }
        _ => warn!("WA_GATEWAY_URL or WA_GATEWAY_API_KEY is not set; payment notices are disabled"),
    }

    Ok(providers)
}
