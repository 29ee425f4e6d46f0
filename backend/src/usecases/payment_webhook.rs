use std::sync::Arc;

use chrono::Utc;
use checkout_core::{
    domain::{
        entities::{
            coupon_usages::NewCouponUsageEntity, enrollments::NewEnrollmentEntity,
            transactions::{TransactionCallbackChangeset, TransactionEntity},
        },
        repositories::{
            coupons::CouponRepository, courses::CourseRepository,
            enrollments::EnrollmentRepository, transactions::TransactionRepository,
            users::UserRepository,
        },
        value_objects::{
            enums::{gateway_kinds::GatewayKind, transaction_statuses::TransactionStatus},
            transactions::EnrollmentOutcome,
        },
    },
    infra::notifications::{Notifier, PaymentSuccessNotice},
    payments::gateway::{GatewayError, NotificationResult, PaymentGateway},
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum WebhookError {
    #[error("payment provider {0} is not configured")]
    ProviderNotConfigured(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("invalid notification payload: {0}")]
    InvalidPayload(String),
    #[error("transaction not found")]
    TransactionNotFound,
    #[error("notified amount does not match the transaction")]
    AmountMismatch,
    #[error("transaction is already {0}")]
    InvalidTransition(TransactionStatus),
    #[error("payment gateway error: {0}")]
    Gateway(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl WebhookError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            WebhookError::ProviderNotConfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
            WebhookError::InvalidSignature => StatusCode::UNAUTHORIZED,
            WebhookError::InvalidPayload(_) | WebhookError::AmountMismatch => {
                StatusCode::BAD_REQUEST
            }
            WebhookError::TransactionNotFound => StatusCode::NOT_FOUND,
            WebhookError::InvalidTransition(_) => StatusCode::CONFLICT,
            WebhookError::Gateway(_) => StatusCode::BAD_GATEWAY,
            WebhookError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<GatewayError> for WebhookError {
    fn from(err: GatewayError) -> Self {
        match err {
            GatewayError::InvalidSignature { .. } => WebhookError::InvalidSignature,
            GatewayError::MalformedPayload(reason) => WebhookError::InvalidPayload(reason),
            GatewayError::UnknownStatus(status) => {
                WebhookError::InvalidPayload(format!("unknown status {status}"))
            }
            other => WebhookError::Gateway(other.to_string()),
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, WebhookError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlementOutcome {
    Applied {
        previous: TransactionStatus,
        current: TransactionStatus,
    },
    /// Same status delivered again; nothing written.
    Unchanged(TransactionStatus),
    /// Backward or otherwise disallowed move; the stored status wins.
    Ignored {
        current: TransactionStatus,
        attempted: TransactionStatus,
    },
}

impl SettlementOutcome {
    pub fn status(&self) -> TransactionStatus {
        match self {
            SettlementOutcome::Applied { current, .. }
            | SettlementOutcome::Unchanged(current)
            | SettlementOutcome::Ignored { current, .. } => *current,
        }
    }
}

pub struct PaymentWebhookUseCase<T, Cp, Co, U, E>
where
    T: TransactionRepository + Send + Sync + 'static,
    Cp: CouponRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    transaction_repo: Arc<T>,
    coupon_repo: Arc<Cp>,
    course_repo: Arc<Co>,
    user_repo: Arc<U>,
    enrollment_repo: Arc<E>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Notifier,
    lms_url: String,
}

impl<T, Cp, Co, U, E> PaymentWebhookUseCase<T, Cp, Co, U, E>
where
    T: TransactionRepository + Send + Sync + 'static,
    Cp: CouponRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        transaction_repo: Arc<T>,
        coupon_repo: Arc<Cp>,
        course_repo: Arc<Co>,
        user_repo: Arc<U>,
        enrollment_repo: Arc<E>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Notifier,
        lms_url: String,
    ) -> Self {
        Self {
            transaction_repo,
            coupon_repo,
            course_repo,
            user_repo,
            enrollment_repo,
            gateway,
            notifier,
            lms_url,
        }
    }

    /// Entry point for gateway callbacks. `raw` is the untouched request body.
    pub async fn handle_notification(
        &self,
        provider: GatewayKind,
        raw: &[u8],
    ) -> UseCaseResult<SettlementOutcome> {
        if provider != self.gateway.kind() {
            warn!(
                %provider,
                active = %self.gateway.kind(),
                "payment_webhook: callback for inactive provider"
            );
            return Err(WebhookError::ProviderNotConfigured(provider.to_string()));
        }

        let notification = self.gateway.handle_notification(raw).map_err(|err| {
            warn!(%provider, error = %err, "payment_webhook: notification rejected");
            WebhookError::from(err)
        })?;

        info!(
            %provider,
            order_id = %notification.order_id,
            native_status = %notification.native_status,
            status = %notification.status,
            "payment_webhook: notification verified"
        );

        self.settle(notification).await
    }

    /// Marks a pending transaction as paid without a gateway round trip.
    pub async fn simulate_payment_success(&self, order_id: &str) -> UseCaseResult<SettlementOutcome> {
        let transaction = self.load_transaction(order_id).await?;
        let current = Self::stored_status(&transaction)?;

        if current.is_success() || !current.can_transition_to(TransactionStatus::Settlement) {
            warn!(%order_id, %current, "payment_webhook: simulation rejected");
            return Err(WebhookError::InvalidTransition(current));
        }

        let now = Utc::now();
        info!(%order_id, "payment_webhook: simulating settlement");

        self.settle(NotificationResult {
            order_id: transaction.order_id.clone(),
            gateway_reference: None,
            native_status: TransactionStatus::Settlement.to_string(),
            status: TransactionStatus::Settlement,
            payment_type: Some("simulation".to_string()),
            fraud_status: None,
            gross_amount: Some(transaction.amount),
            transaction_time: Some(now),
            settlement_time: Some(now),
        })
        .await
    }

    /// Polls the gateway for the authoritative status and applies it.
    pub async fn reconcile(&self, order_id: &str) -> UseCaseResult<SettlementOutcome> {
        self.load_transaction(order_id).await?;

        let notification = self
            .gateway
            .get_transaction_status(order_id)
            .await
            .map_err(|err| {
                error!(%order_id, error = ?err, "payment_webhook: status poll failed");
                match err {
                    // A garbled poll response is the gateway's fault, not the caller's.
                    bad @ (GatewayError::MalformedPayload(_) | GatewayError::UnknownStatus(_)) => {
                        WebhookError::Gateway(bad.to_string())
                    }
                    other => WebhookError::from(other),
                }
            })?;

        info!(
            %order_id,
            native_status = %notification.native_status,
            status = %notification.status,
            "payment_webhook: reconcile fetched gateway status"
        );

        self.settle(notification).await
    }

    async fn settle(&self, notification: NotificationResult) -> UseCaseResult<SettlementOutcome> {
        let order_id = notification.order_id.as_str();
        let transaction = self.load_transaction(order_id).await?;

        if let Some(gross_amount) = notification.gross_amount {
            if gross_amount != transaction.amount {
                error!(
                    %order_id,
                    expected = transaction.amount,
                    received = gross_amount,
                    "payment_webhook: amount mismatch"
                );
                return Err(WebhookError::AmountMismatch);
            }
        }

        let current = Self::stored_status(&transaction)?;
        let next = notification.status;

        if current == next {
            info!(%order_id, status = %current, "payment_webhook: duplicate notification");
            // Fulfilment is idempotent; a retry after a failed fulfilment completes it here.
            if current.is_success() {
                self.complete_purchase(&transaction).await?;
            }
            return Ok(SettlementOutcome::Unchanged(current));
        }

        if !current.can_transition_to(next) {
            warn!(
                %order_id,
                %current,
                attempted = %next,
                "payment_webhook: transition not allowed; ignoring"
            );
            return Ok(SettlementOutcome::Ignored {
                current,
                attempted: next,
            });
        }

        let changes = TransactionCallbackChangeset {
            status: next.to_string(),
            gateway_reference: notification.gateway_reference.clone(),
            payment_type: notification.payment_type.clone(),
            fraud_status: notification.fraud_status.clone(),
            transaction_time: notification.transaction_time,
            settlement_time: notification.settlement_time,
            updated_at: Utc::now(),
        };

        let applied = self
            .transaction_repo
            .apply_callback(order_id, current, changes)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "payment_webhook: failed to update transaction");
                WebhookError::Internal(err)
            })?;

        if !applied {
            // Another callback moved the row first and owns the side effects.
            let latest = self
                .transaction_repo
                .find_by_id(transaction.id)
                .await
                .map_err(WebhookError::Internal)?
                .ok_or(WebhookError::TransactionNotFound)?;
            let latest_status = Self::stored_status(&latest)?;
            info!(
                %order_id,
                attempted = %next,
                current = %latest_status,
                "payment_webhook: lost update race"
            );
            if latest_status.is_success() {
                self.complete_purchase(&latest).await?;
            }
            return Ok(SettlementOutcome::Unchanged(latest_status));
        }

        info!(%order_id, previous = %current, current = %next, "payment_webhook: status updated");

        if next.is_success() {
            self.complete_purchase(&transaction).await?;
        }

        Ok(SettlementOutcome::Applied {
            previous: current,
            current: next,
        })
    }

    async fn complete_purchase(&self, transaction: &TransactionEntity) -> UseCaseResult<()> {
        let order_id = transaction.order_id.as_str();
        let Some(course_id) = transaction.course_id else {
            info!(%order_id, "payment_webhook: transaction has no course; nothing to fulfil");
            return Ok(());
        };
        let user_id = transaction.user_id;
        let now = Utc::now();

        let already_enrolled = self
            .enrollment_repo
            .is_enrolled(user_id, course_id)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "payment_webhook: failed to check enrollment");
                WebhookError::Internal(err)
            })?;

        let outcome = if already_enrolled {
            EnrollmentOutcome::AlreadyEnrolled
        } else {
            self.enrollment_repo
                .enroll(NewEnrollmentEntity {
                    user_id,
                    course_id,
                    transaction_id: Some(transaction.id),
                    enrolled_at: now,
                })
                .await
                .map_err(|err| {
                    error!(%order_id, db_error = ?err, "payment_webhook: failed to enroll");
                    WebhookError::Internal(err)
                })?
        };

        if let Some(coupon_id) = transaction.coupon_id {
            let recorded = self
                .coupon_repo
                .record_usage(NewCouponUsageEntity {
                    coupon_id,
                    user_id,
                    transaction_id: Some(transaction.id),
                    discount_applied: transaction.discount_amount.unwrap_or(0),
                    used_at: now,
                })
                .await
                .map_err(|err| {
                    error!(%order_id, %coupon_id, db_error = ?err, "payment_webhook: failed to record coupon usage");
                    WebhookError::Internal(err)
                })?;
            if !recorded {
                info!(%order_id, %coupon_id, "payment_webhook: coupon usage already recorded");
            }
        }

        match outcome {
            EnrollmentOutcome::Created => {
                info!(%order_id, %user_id, %course_id, "payment_webhook: enrollment created");
                self.queue_notice(transaction, user_id, course_id).await;
            }
            EnrollmentOutcome::AlreadyEnrolled => {
                info!(%order_id, %user_id, %course_id, "payment_webhook: already enrolled");
            }
        }

        Ok(())
    }

    async fn queue_notice(&self, transaction: &TransactionEntity, user_id: Uuid, course_id: Uuid) {
        let order_id = transaction.order_id.as_str();

        let user = match self.user_repo.find_by_id(user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                warn!(%order_id, %user_id, "payment_webhook: user missing; skipping notice");
                return;
            }
            Err(err) => {
                warn!(%order_id, db_error = ?err, "payment_webhook: failed to load user for notice");
                return;
            }
        };

        let course_title = match self.course_repo.find_by_id(course_id).await {
            Ok(Some(course)) => course.title,
            Ok(None) => String::new(),
            Err(err) => {
                warn!(%order_id, db_error = ?err, "payment_webhook: failed to load course for notice");
                String::new()
            }
        };

        self.notifier.try_notify(PaymentSuccessNotice {
            order_id: transaction.order_id.clone(),
            phone: user.phone,
            customer_name: user.full_name,
            course_title,
            amount: transaction.amount,
            currency: transaction.currency.clone(),
            lms_url: self.lms_url.clone(),
        });
    }

    async fn load_transaction(&self, order_id: &str) -> UseCaseResult<TransactionEntity> {
        self.transaction_repo
            .find_by_order_id(order_id)
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "payment_webhook: failed to load transaction");
                WebhookError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%order_id, "payment_webhook: transaction not found");
                WebhookError::TransactionNotFound
            })
    }

    fn stored_status(transaction: &TransactionEntity) -> UseCaseResult<TransactionStatus> {
        transaction.status.parse::<TransactionStatus>().map_err(|err| {
            error!(
                order_id = %transaction.order_id,
                status = %transaction.status,
                "payment_webhook: stored status is not recognised"
            );
            WebhookError::Internal(err)
        })
    }
}
