use std::sync::Arc;

use axum::{
    Json, Router,
    body::Body,
    extract::{Path, State},
    http::{Request, StatusCode},
    middleware::{Next, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::post,
};
use checkout_core::{
    domain::{
        repositories::{
            coupons::CouponRepository, courses::CourseRepository,
            enrollments::EnrollmentRepository, transactions::TransactionRepository,
            users::UserRepository,
        },
        value_objects::enums::transaction_statuses::TransactionStatus,
    },
    payments::signatures::constant_time_eq,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{
    axum_http::error_responses::AppError,
    usecases::payment_webhook::{PaymentWebhookUseCase, SettlementOutcome},
};

pub const INTERNAL_API_KEY_HEADER: &str = "x-internal-api-key";

pub fn routes<T, Cp, Co, U, E>(
    payment_webhook_usecase: Arc<PaymentWebhookUseCase<T, Cp, Co, U, E>>,
    api_key: String,
) -> Router
where
    T: TransactionRepository + Send + Sync + 'static,
    Cp: CouponRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/simulate", post(simulate::<T, Cp, Co, U, E>))
        .route("/:order_id/reconcile", post(reconcile::<T, Cp, Co, U, E>))
        .with_state(payment_webhook_usecase)
        .layer(from_fn_with_state(api_key, require_internal_api_key))
}

pub async fn require_internal_api_key(
    State(expected): State<String>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let provided = request
        .headers()
        .get(INTERNAL_API_KEY_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if expected.is_empty() || !constant_time_eq(provided, &expected) {
        warn!(path = %request.uri().path(), "internal_payments: rejected request without a valid key");
        return AppError::Unauthorized.into_response();
    }

    next.run(request).await
}

#[derive(Debug, Deserialize)]
pub struct SimulatePaymentModel {
    pub order_id: String,
}

#[derive(Debug, Serialize)]
pub struct SettlementDto {
    pub order_id: String,
    pub status: TransactionStatus,
    pub changed: bool,
}

impl SettlementDto {
    fn new(order_id: String, outcome: SettlementOutcome) -> Self {
        Self {
            order_id,
            status: outcome.status(),
            changed: matches!(outcome, SettlementOutcome::Applied { .. }),
        }
    }
}

pub async fn simulate<T, Cp, Co, U, E>(
    State(payment_webhook_usecase): State<Arc<PaymentWebhookUseCase<T, Cp, Co, U, E>>>,
    Json(simulate_payment_model): Json<SimulatePaymentModel>,
) -> Result<impl IntoResponse, AppError>
where
    T: TransactionRepository + Send + Sync + 'static,
    Cp: CouponRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    let order_id = simulate_payment_model.order_id;
    let outcome = payment_webhook_usecase
        .simulate_payment_success(&order_id)
        .await?;

    Ok((StatusCode::OK, Json(SettlementDto::new(order_id, outcome))))
}

pub async fn reconcile<T, Cp, Co, U, E>(
    State(payment_webhook_usecase): State<Arc<PaymentWebhookUseCase<T, Cp, Co, U, E>>>,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    T: TransactionRepository + Send + Sync + 'static,
    Cp: CouponRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    let outcome = payment_webhook_usecase.reconcile(&order_id).await?;

    Ok((StatusCode::OK, Json(SettlementDto::new(order_id, outcome))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::routing::get;
    use tower::ServiceExt;

    fn guarded() -> Router {
        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(from_fn_with_state(
                "internal-secret".to_string(),
                require_internal_api_key,
            ))
    }

    #[tokio::test]
    async fn rejects_missing_or_wrong_key() {
        let missing = guarded()
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let wrong = guarded()
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header(INTERNAL_API_KEY_HEADER, "guess")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn accepts_matching_key() {
        let response = guarded()
            .oneshot(
                Request::builder()
                    .uri("/ping")
                    .header(INTERNAL_API_KEY_HEADER, "internal-secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
