use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::post,
};
use checkout_core::{
    domain::{
        repositories::{
            coupons::CouponRepository, courses::CourseRepository,
            enrollments::EnrollmentRepository, transactions::TransactionRepository,
            users::UserRepository,
        },
        value_objects::enums::gateway_kinds::GatewayKind,
    },
    infra::{
        db::{
            postgres::postgres_connection::PgPoolSquad,
            repositories::{
                coupons::CouponPostgres, courses::CoursePostgres,
                enrollments::EnrollmentPostgres, transactions::TransactionPostgres,
                users::UserPostgres,
            },
        },
        notifications::Notifier,
    },
    payments::gateway::PaymentGateway,
};
use serde_json::json;

use crate::{
    axum_http::error_responses::AppError,
    usecases::payment_webhook::PaymentWebhookUseCase,
};

pub type PgPaymentWebhookUseCase = PaymentWebhookUseCase<
    TransactionPostgres,
    CouponPostgres,
    CoursePostgres,
    UserPostgres,
    EnrollmentPostgres,
>;

pub fn build_usecase(
    db_pool: Arc<PgPoolSquad>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Notifier,
    lms_url: String,
) -> Arc<PgPaymentWebhookUseCase> {
    Arc::new(PaymentWebhookUseCase::new(
        Arc::new(TransactionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(CouponPostgres::new(Arc::clone(&db_pool))),
        Arc::new(CoursePostgres::new(Arc::clone(&db_pool))),
        Arc::new(UserPostgres::new(Arc::clone(&db_pool))),
        Arc::new(EnrollmentPostgres::new(Arc::clone(&db_pool))),
        gateway,
        notifier,
        lms_url,
    ))
}

pub fn routes<T, Cp, Co, U, E>(
    payment_webhook_usecase: Arc<PaymentWebhookUseCase<T, Cp, Co, U, E>>,
) -> Router
where
    T: TransactionRepository + Send + Sync + 'static,
    Cp: CouponRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/midtrans", post(midtrans_notification::<T, Cp, Co, U, E>))
        .route("/duitku", post(duitku_callback::<T, Cp, Co, U, E>))
        .with_state(payment_webhook_usecase)
}

pub async fn midtrans_notification<T, Cp, Co, U, E>(
    State(payment_webhook_usecase): State<Arc<PaymentWebhookUseCase<T, Cp, Co, U, E>>>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError>
where
    T: TransactionRepository + Send + Sync + 'static,
    Cp: CouponRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    payment_webhook_usecase
        .handle_notification(GatewayKind::Midtrans, &body)
        .await?;

    Ok((StatusCode::OK, Json(json!({ "status": "ok" }))))
}

/// Duitku only treats a plain `SUCCESS` body as acknowledged.
pub async fn duitku_callback<T, Cp, Co, U, E>(
    State(payment_webhook_usecase): State<Arc<PaymentWebhookUseCase<T, Cp, Co, U, E>>>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError>
where
    T: TransactionRepository + Send + Sync + 'static,
    Cp: CouponRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    payment_webhook_usecase
        .handle_notification(GatewayKind::Duitku, &body)
        .await?;

    Ok((StatusCode::OK, "SUCCESS"))
}
