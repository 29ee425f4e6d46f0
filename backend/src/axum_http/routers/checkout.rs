use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::{get, post},
};
use checkout_core::{
    domain::{
        repositories::{
            coupons::CouponRepository, courses::CourseRepository,
            enrollments::EnrollmentRepository, transactions::TransactionRepository,
            users::UserRepository,
        },
        value_objects::{checkout::CheckoutModel, coupons::ValidateCouponModel},
    },
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{
            coupons::CouponPostgres, courses::CoursePostgres, enrollments::EnrollmentPostgres,
            transactions::TransactionPostgres, users::UserPostgres,
        },
    },
    payments::gateway::PaymentGateway,
};
use serde::Deserialize;

use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    usecases::checkout::{CheckoutSettings, CheckoutUseCase},
};

pub type PgCheckoutUseCase =
    CheckoutUseCase<TransactionPostgres, CouponPostgres, CoursePostgres, UserPostgres, EnrollmentPostgres>;

pub fn build_usecase(
    db_pool: Arc<PgPoolSquad>,
    gateway: Arc<dyn PaymentGateway>,
    settings: CheckoutSettings,
) -> Arc<PgCheckoutUseCase> {
    Arc::new(CheckoutUseCase::new(
        Arc::new(TransactionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(CouponPostgres::new(Arc::clone(&db_pool))),
        Arc::new(CoursePostgres::new(Arc::clone(&db_pool))),
        Arc::new(UserPostgres::new(Arc::clone(&db_pool))),
        Arc::new(EnrollmentPostgres::new(Arc::clone(&db_pool))),
        gateway,
        settings,
    ))
}

pub fn routes<T, Cp, Co, U, E>(checkout_usecase: Arc<CheckoutUseCase<T, Cp, Co, U, E>>) -> Router
where
    T: TransactionRepository + Send + Sync + 'static,
    Cp: CouponRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", post(checkout::<T, Cp, Co, U, E>))
        .route("/config", get(checkout_config::<T, Cp, Co, U, E>))
        .route("/payment-methods", get(payment_methods::<T, Cp, Co, U, E>))
        .with_state(checkout_usecase)
}

pub fn coupon_routes<T, Cp, Co, U, E>(
    checkout_usecase: Arc<CheckoutUseCase<T, Cp, Co, U, E>>,
) -> Router
where
    T: TransactionRepository + Send + Sync + 'static,
    Cp: CouponRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/validate", post(validate_coupon::<T, Cp, Co, U, E>))
        .with_state(checkout_usecase)
}

#[derive(Debug, Deserialize)]
pub struct PaymentMethodsQuery {
    pub amount: i64,
}

pub async fn checkout<T, Cp, Co, U, E>(
    State(checkout_usecase): State<Arc<CheckoutUseCase<T, Cp, Co, U, E>>>,
    auth: AuthUser,
    Json(checkout_model): Json<CheckoutModel>,
) -> Result<impl IntoResponse, AppError>
where
    T: TransactionRepository + Send + Sync + 'static,
    Cp: CouponRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    let checkout = checkout_usecase
        .checkout(auth.user_id, checkout_model)
        .await?;

    Ok(Json(checkout))
}

pub async fn checkout_config<T, Cp, Co, U, E>(
    State(checkout_usecase): State<Arc<CheckoutUseCase<T, Cp, Co, U, E>>>,
) -> impl IntoResponse
where
    T: TransactionRepository + Send + Sync + 'static,
    Cp: CouponRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    Json(checkout_usecase.checkout_config())
}

pub async fn payment_methods<T, Cp, Co, U, E>(
    State(checkout_usecase): State<Arc<CheckoutUseCase<T, Cp, Co, U, E>>>,
    Query(query): Query<PaymentMethodsQuery>,
) -> Result<impl IntoResponse, AppError>
where
    T: TransactionRepository + Send + Sync + 'static,
    Cp: CouponRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    let methods = checkout_usecase.list_payment_methods(query.amount).await?;

    Ok(Json(methods))
}

pub async fn validate_coupon<T, Cp, Co, U, E>(
    State(checkout_usecase): State<Arc<CheckoutUseCase<T, Cp, Co, U, E>>>,
    auth: AuthUser,
    Json(validate_coupon_model): Json<ValidateCouponModel>,
) -> Result<impl IntoResponse, AppError>
where
    T: TransactionRepository + Send + Sync + 'static,
    Cp: CouponRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    let preview = checkout_usecase
        .preview_coupon(auth.user_id, validate_coupon_model)
        .await?;

    Ok(Json(preview))
}
