use crate::{
    axum_http::{default_routers, routers},
    config::config_model::DotEnvyConfig,
    usecases::checkout::CheckoutSettings,
};
use anyhow::Result;
use axum::{
    Router,
    http::{
        Method,
        header::{AUTHORIZATION, CONTENT_TYPE, HeaderName},
    },
    routing::get,
};
use checkout_core::{
    infra::{db::postgres::postgres_connection::PgPoolSquad, notifications::Notifier},
    payments::gateway::PaymentGateway,
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

pub async fn start(
    config: Arc<DotEnvyConfig>,
    db_pool: Arc<PgPoolSquad>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Notifier,
) -> Result<()> {
    let frontend_url = config.notification.frontend_url.trim_end_matches('/').to_string();

    let checkout_usecase = routers::checkout::build_usecase(
        Arc::clone(&db_pool),
        Arc::clone(&gateway),
        CheckoutSettings {
            enabled: config.payment.enabled,
            callback_url: config.payment.callback_url(),
            default_return_url: Some(format!("{frontend_url}/payment/finish")),
        },
    );
    let payment_webhook_usecase = routers::payment_webhooks::build_usecase(
        Arc::clone(&db_pool),
        Arc::clone(&gateway),
        notifier,
        frontend_url,
    );
    let transaction_status_usecase =
        routers::transaction_status::build_usecase(Arc::clone(&db_pool));

    let mut app = Router::new()
        .fallback(default_routers::not_found)
        .nest(
            "/api/v1/checkout",
            routers::checkout::routes(Arc::clone(&checkout_usecase)),
        )
        .nest(
            "/api/v1/coupons",
            routers::checkout::coupon_routes(Arc::clone(&checkout_usecase)),
        )
        .nest(
            "/api/v1/webhooks",
            routers::payment_webhooks::routes(Arc::clone(&payment_webhook_usecase)),
        )
        .nest(
            "/api/v1/transaction-status",
            routers::transaction_status::routes(Arc::clone(&transaction_status_usecase)),
        )
        .nest(
            "/api/v1/my/transactions",
            routers::transaction_status::history_routes(transaction_status_usecase),
        )
        .route("/api/v1/health-check", get(default_routers::health_check));

    match config.internal.api_key.clone() {
        Some(api_key) => {
            app = app.nest(
                "/api/v1/internal/payments",
                routers::internal_payments::routes(Arc::clone(&payment_webhook_usecase), api_key),
            );
        }
        None => warn!("INTERNAL_API_KEY is not set; internal payment routes are disabled"),
    }

    let app = app
        .layer(TimeoutLayer::new(Duration::from_secs(
            config.backend_server.timeout,
        )))
        .layer(RequestBodyLimitLayer::new(
            (config.backend_server.body_limit * 1024 * 1024).try_into()?,
        ))
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([
                    AUTHORIZATION,
                    CONTENT_TYPE,
                    HeaderName::from_static(routers::internal_payments::INTERNAL_API_KEY_HEADER),
                ])
                .allow_origin(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.backend_server.port));
    let listener = TcpListener::bind(addr).await?;

    info!(
        port = config.backend_server.port,
        provider = %gateway.kind(),
        payments_enabled = config.payment.enabled,
        "Server is running"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "Failed to install CTRL+C signal handler");
            std::future::pending::<()>().await;
        }
    };

    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received ctrl+C signal"),
        _ = terminate => info!("Received terminate signal"),
    }
}
