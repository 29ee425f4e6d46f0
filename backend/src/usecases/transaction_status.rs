use std::sync::Arc;

use checkout_core::domain::{
    entities::courses::CourseEntity,
    repositories::{courses::CourseRepository, transactions::TransactionRepository},
    value_objects::{
        enums::transaction_statuses::TransactionStatus,
        transactions::{
            TransactionCourseDto, TransactionHistoryDto, TransactionHistoryItemDto,
            TransactionStatusDto,
        },
    },
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

pub const DEFAULT_HISTORY_LIMIT: i64 = 20;
pub const MAX_HISTORY_LIMIT: i64 = 100;

#[derive(Debug, Error)]
pub enum TransactionStatusError {
    #[error("transaction not found")]
    NotFound,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl TransactionStatusError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        match self {
            TransactionStatusError::NotFound => axum::http::StatusCode::NOT_FOUND,
            TransactionStatusError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, TransactionStatusError>;

pub struct TransactionStatusUseCase<T, Co>
where
    T: TransactionRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
{
    transaction_repo: Arc<T>,
    course_repo: Arc<Co>,
}

impl<T, Co> TransactionStatusUseCase<T, Co>
where
    T: TransactionRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
{
    pub fn new(transaction_repo: Arc<T>, course_repo: Arc<Co>) -> Self {
        Self {
            transaction_repo,
            course_repo,
        }
    }

    pub async fn get_status(&self, order_id: &str) -> UseCaseResult<TransactionStatusDto> {
        let transaction = self
            .transaction_repo
            .find_by_order_id(order_id)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "transaction_status: failed to load transaction");
                TransactionStatusError::Internal(err)
            })?
            .ok_or(TransactionStatusError::NotFound)?;

        let status: TransactionStatus = transaction.status.parse()?;
        let course = self.course_for(&transaction.order_id, transaction.course_id).await;

        info!(%order_id, %status, "transaction_status: status served");

        Ok(TransactionStatusDto {
            order_id: transaction.order_id,
            status,
            amount: transaction.amount,
            currency: transaction.currency,
            course_name: course.as_ref().map(|course| course.title.clone()),
            course_slug: course.map(|course| course.slug),
            created_at: transaction.created_at,
        })
    }

    /// Paged purchase history of one user, newest first.
    pub async fn list_user_transactions(
        &self,
        user_id: Uuid,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> UseCaseResult<TransactionHistoryDto> {
        let limit = limit
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .min(MAX_HISTORY_LIMIT);
        let offset = offset.unwrap_or(0).max(0);

        let rows = self
            .transaction_repo
            .list_by_user(user_id, limit, offset)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "transaction_status: failed to list transactions");
                TransactionStatusError::Internal(err)
            })?;

        let total = match self.transaction_repo.count_by_user(user_id).await {
            Ok(total) => total,
            Err(err) => {
                warn!(%user_id, db_error = ?err, "transaction_status: failed to count transactions");
                offset + rows.len() as i64
            }
        };

        let mut transactions = Vec::with_capacity(rows.len());
        for transaction in rows {
            let status: TransactionStatus = transaction.status.parse()?;
            let course = self
                .course_for(&transaction.order_id, transaction.course_id)
                .await
                .map(|course| TransactionCourseDto {
                    id: course.id,
                    title: course.title,
                    slug: course.slug,
                });

            transactions.push(TransactionHistoryItemDto {
                id: transaction.id,
                order_id: transaction.order_id,
                status,
                amount: transaction.amount,
                original_amount: transaction.original_amount,
                discount_amount: transaction.discount_amount,
                currency: transaction.currency,
                gateway: transaction.gateway,
                payment_type: transaction.payment_type,
                payment_url: transaction.payment_url,
                course,
                settlement_time: transaction.settlement_time,
                created_at: transaction.created_at,
            });
        }

        info!(%user_id, count = transactions.len(), total, "transaction_status: history served");

        Ok(TransactionHistoryDto {
            transactions,
            total,
            limit,
            offset,
        })
    }

    // The course lookup only decorates the response.
    async fn course_for(&self, order_id: &str, course_id: Option<Uuid>) -> Option<CourseEntity> {
        let course_id = course_id?;
        match self.course_repo.find_by_id(course_id).await {
            Ok(course) => course,
            Err(err) => {
                warn!(%order_id, %course_id, db_error = ?err, "transaction_status: failed to load course");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use checkout_core::domain::{
        entities::{courses::CourseEntity, transactions::TransactionEntity},
        repositories::{courses::MockCourseRepository, transactions::MockTransactionRepository},
    };
    use mockall::predicate::eq;

    fn sample_transaction(course_id: Option<Uuid>) -> TransactionEntity {
        let now = Utc::now();
        TransactionEntity {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            course_id,
            order_id: "LMS-0a1b2c3d-777".to_string(),
            amount: 150_000,
            original_amount: None,
            discount_amount: None,
            currency: "IDR".to_string(),
            status: "settlement".to_string(),
            gateway: "duitku".to_string(),
            gateway_reference: Some("DS1234".to_string()),
            payment_type: Some("VC".to_string()),
            fraud_status: None,
            snap_token: None,
            payment_url: None,
            coupon_id: None,
            transaction_time: None,
            settlement_time: Some(now),
            expired_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn returns_status_with_course_name() {
        let course_id = Uuid::new_v4();
        let transaction = sample_transaction(Some(course_id));

        let mut transactions = MockTransactionRepository::new();
        transactions
            .expect_find_by_order_id()
            .withf(|order_id| order_id == "LMS-0a1b2c3d-777")
            .returning(move |_| Ok(Some(transaction.clone())));
        let mut courses = MockCourseRepository::new();
        courses
            .expect_find_by_id()
            .with(eq(course_id))
            .returning(|id| {
                Ok(Some(CourseEntity {
                    id,
                    title: "Rust for Backends".to_string(),
                    slug: "rust-for-backends".to_string(),
                    price: 150_000,
                    discount_price: None,
                    discount_valid_until: None,
                    currency: "IDR".to_string(),
                    instructor_id: None,
                }))
            });

        let dto = TransactionStatusUseCase::new(Arc::new(transactions), Arc::new(courses))
            .get_status("LMS-0a1b2c3d-777")
            .await
            .unwrap();

        assert_eq!(dto.status, TransactionStatus::Settlement);
        assert_eq!(dto.amount, 150_000);
        assert_eq!(dto.course_name.as_deref(), Some("Rust for Backends"));
        assert_eq!(dto.course_slug.as_deref(), Some("rust-for-backends"));
    }

    #[tokio::test]
    async fn course_lookup_failure_still_returns_status() {
        let transaction = sample_transaction(Some(Uuid::new_v4()));
        let mut transactions = MockTransactionRepository::new();
        transactions
            .expect_find_by_order_id()
            .returning(move |_| Ok(Some(transaction.clone())));
        let mut courses = MockCourseRepository::new();
        courses
            .expect_find_by_id()
            .returning(|_| Err(anyhow::anyhow!("pool timed out")));

        let dto = TransactionStatusUseCase::new(Arc::new(transactions), Arc::new(courses))
            .get_status("LMS-0a1b2c3d-777")
            .await
            .unwrap();

        assert_eq!(dto.course_name, None);
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let mut transactions = MockTransactionRepository::new();
        transactions.expect_find_by_order_id().returning(|_| Ok(None));

        let err = TransactionStatusUseCase::new(
            Arc::new(transactions),
            Arc::new(MockCourseRepository::new()),
        )
        .get_status("LMS-missing-1")
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn lists_user_history_with_courses() {
        let user_id = Uuid::new_v4();
        let course_id = Uuid::new_v4();
        let mut paid = sample_transaction(Some(course_id));
        paid.user_id = user_id;
        let mut expired = sample_transaction(None);
        expired.user_id = user_id;
        expired.order_id = "LMS-0a1b2c3d-778".to_string();
        expired.status = "expire".to_string();

        let mut transactions = MockTransactionRepository::new();
        transactions
            .expect_list_by_user()
            .with(eq(user_id), eq(20), eq(0))
            .times(1)
            .returning(move |_, _, _| Ok(vec![paid.clone(), expired.clone()]));
        transactions
            .expect_count_by_user()
            .with(eq(user_id))
            .returning(|_| Ok(2));
        let mut courses = MockCourseRepository::new();
        courses
            .expect_find_by_id()
            .with(eq(course_id))
            .times(1)
            .returning(|id| {
                Ok(Some(CourseEntity {
                    id,
                    title: "Rust for Backends".to_string(),
                    slug: "rust-for-backends".to_string(),
                    price: 150_000,
                    discount_price: None,
                    discount_valid_until: None,
                    currency: "IDR".to_string(),
                    instructor_id: None,
                }))
            });

        let history = TransactionStatusUseCase::new(Arc::new(transactions), Arc::new(courses))
            .list_user_transactions(user_id, None, None)
            .await
            .unwrap();

        assert_eq!(history.total, 2);
        assert_eq!(history.limit, 20);
        assert_eq!(history.offset, 0);
        assert_eq!(history.transactions.len(), 2);
        assert_eq!(history.transactions[0].status, TransactionStatus::Settlement);
        assert_eq!(
            history.transactions[0].course.as_ref().map(|course| course.slug.as_str()),
            Some("rust-for-backends")
        );
        assert_eq!(history.transactions[1].status, TransactionStatus::Expire);
        assert_eq!(history.transactions[1].course, None);
    }

    #[tokio::test]
    async fn history_paging_is_clamped() {
        let mut transactions = MockTransactionRepository::new();
        transactions
            .expect_list_by_user()
            .with(mockall::predicate::always(), eq(MAX_HISTORY_LIMIT), eq(0))
            .times(1)
            .returning(|_, _, _| Ok(Vec::new()));
        transactions.expect_count_by_user().returning(|_| Ok(0));

        let history = TransactionStatusUseCase::new(
            Arc::new(transactions),
            Arc::new(MockCourseRepository::new()),
        )
        .list_user_transactions(Uuid::new_v4(), Some(5_000), Some(-3))
        .await
        .unwrap();

        assert_eq!(history.limit, MAX_HISTORY_LIMIT);
        assert_eq!(history.offset, 0);
        assert!(history.transactions.is_empty());
    }

    #[tokio::test]
    async fn history_list_failure_is_internal() {
        let mut transactions = MockTransactionRepository::new();
        transactions
            .expect_list_by_user()
            .returning(|_, _, _| Err(anyhow::anyhow!("pool timed out")));
        transactions.expect_count_by_user().times(0);

        let err = TransactionStatusUseCase::new(
            Arc::new(transactions),
            Arc::new(MockCourseRepository::new()),
        )
        .list_user_transactions(Uuid::new_v4(), Some(10), Some(0))
        .await
        .unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
    }
}
