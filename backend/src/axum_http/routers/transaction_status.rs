use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
};
use checkout_core::{
    domain::repositories::{courses::CourseRepository, transactions::TransactionRepository},
    infra::db::{
        postgres::postgres_connection::PgPoolSquad,
        repositories::{courses::CoursePostgres, transactions::TransactionPostgres},
    },
};
use serde::Deserialize;

use crate::{
    auth::AuthUser,
    axum_http::error_responses::AppError,
    usecases::transaction_status::TransactionStatusUseCase,
};

pub type PgTransactionStatusUseCase = TransactionStatusUseCase<TransactionPostgres, CoursePostgres>;

pub fn build_usecase(db_pool: Arc<PgPoolSquad>) -> Arc<PgTransactionStatusUseCase> {
    Arc::new(TransactionStatusUseCase::new(
        Arc::new(TransactionPostgres::new(Arc::clone(&db_pool))),
        Arc::new(CoursePostgres::new(Arc::clone(&db_pool))),
    ))
}

pub fn routes<T, Co>(transaction_status_usecase: Arc<TransactionStatusUseCase<T, Co>>) -> Router
where
    T: TransactionRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/:order_id", get(get_status::<T, Co>))
        .with_state(transaction_status_usecase)
}

pub fn history_routes<T, Co>(
    transaction_status_usecase: Arc<TransactionStatusUseCase<T, Co>>,
) -> Router
where
    T: TransactionRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
{
    Router::new()
        .route("/", get(list_my_transactions::<T, Co>))
        .with_state(transaction_status_usecase)
}

#[derive(Debug, Default, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

pub async fn get_status<T, Co>(
    State(transaction_status_usecase): State<Arc<TransactionStatusUseCase<T, Co>>>,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, AppError>
where
    T: TransactionRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
{
    let status = transaction_status_usecase.get_status(&order_id).await?;

    Ok(Json(status))
}

pub async fn list_my_transactions<T, Co>(
    State(transaction_status_usecase): State<Arc<TransactionStatusUseCase<T, Co>>>,
    auth: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError>
where
    T: TransactionRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
{
    let history = transaction_status_usecase
        .list_user_transactions(auth.user_id, query.limit, query.offset)
        .await?;

    Ok(Json(history))
}
