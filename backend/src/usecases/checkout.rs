use std::sync::Arc;

use chrono::{DateTime, Utc};
use checkout_core::{
    domain::{
        entities::{
            coupon_usages::NewCouponUsageEntity, coupons::CouponEntity, courses::CourseEntity,
            enrollments::NewEnrollmentEntity,
            transactions::{GatewaySessionChangeset, NewTransactionEntity},
            users::UserEntity,
        },
        repositories::{
            coupons::CouponRepository, courses::CourseRepository,
            enrollments::EnrollmentRepository, transactions::TransactionRepository,
            users::UserRepository,
        },
        value_objects::{
            checkout::{CheckoutConfigDto, CheckoutDto, CheckoutModel, PaymentMethodDto},
            coupons::{
                CouponPreviewDto, CouponRejection, ValidateCouponModel, normalize_code,
                validate_coupon_for_user,
            },
            enums::transaction_statuses::TransactionStatus,
            pricing::{CouponTerms, CourseDiscount, PriceBreakdown, compute_final_price},
        },
    },
    payments::gateway::{CreateTransactionRequest, PaymentGateway},
};
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

const DEFAULT_CURRENCY: &str = "IDR";
const ITEM_CATEGORY: &str = "course";

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("payments are currently disabled")]
    PaymentsDisabled,
    #[error("course not found")]
    CourseNotFound,
    #[error("user not found")]
    UserNotFound,
    #[error("you are already enrolled in this course")]
    AlreadyEnrolled,
    #[error("coupon not found")]
    CouponNotFound,
    #[error("{0}")]
    CouponRejected(CouponRejection),
    #[error("amount must be greater than zero")]
    InvalidAmount,
    #[error("payment gateway error: {0}")]
    Gateway(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl CheckoutError {
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            CheckoutError::PaymentsDisabled => StatusCode::SERVICE_UNAVAILABLE,
            CheckoutError::CourseNotFound
            | CheckoutError::UserNotFound
            | CheckoutError::CouponNotFound => StatusCode::NOT_FOUND,
            CheckoutError::AlreadyEnrolled => StatusCode::CONFLICT,
            CheckoutError::CouponRejected(rejection) if rejection.is_limit() => {
                StatusCode::CONFLICT
            }
            CheckoutError::CouponRejected(_) | CheckoutError::InvalidAmount => {
                StatusCode::BAD_REQUEST
            }
            CheckoutError::Gateway(_) => StatusCode::BAD_GATEWAY,
            CheckoutError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type UseCaseResult<T> = std::result::Result<T, CheckoutError>;

#[derive(Debug, Clone, Default)]
pub struct CheckoutSettings {
    pub enabled: bool,
    pub callback_url: Option<String>,
    pub default_return_url: Option<String>,
}

/// `LMS-<8 hex>-<millis mod 100000>`; unique per attempt, never reused.
pub fn generate_order_id(now: DateTime<Utc>) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("LMS-{}-{}", &id[..8], now.timestamp_millis().rem_euclid(100_000))
}

pub struct CheckoutUseCase<T, Cp, Co, U, E>
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
    settings: CheckoutSettings,
}

impl<T, Cp, Co, U, E> CheckoutUseCase<T, Cp, Co, U, E>
where
    T: TransactionRepository + Send + Sync + 'static,
    Cp: CouponRepository + Send + Sync + 'static,
    Co: CourseRepository + Send + Sync + 'static,
    U: UserRepository + Send + Sync + 'static,
    E: EnrollmentRepository + Send + Sync + 'static,
{
    pub fn new(
        transaction_repo: Arc<T>,
        coupon_repo: Arc<Cp>,
        course_repo: Arc<Co>,
        user_repo: Arc<U>,
        enrollment_repo: Arc<E>,
        gateway: Arc<dyn PaymentGateway>,
        settings: CheckoutSettings,
    ) -> Self {
        Self {
            transaction_repo,
            coupon_repo,
            course_repo,
            user_repo,
            enrollment_repo,
            gateway,
            settings,
        }
    }

    pub fn checkout_config(&self) -> CheckoutConfigDto {
        CheckoutConfigDto {
            enabled: self.settings.enabled,
            provider: self.gateway.kind().to_string(),
            client_key: self.gateway.client_key(),
            is_production: self.gateway.is_production(),
        }
    }

    pub async fn list_payment_methods(&self, amount: i64) -> UseCaseResult<Vec<PaymentMethodDto>> {
        if !self.settings.enabled {
            return Err(CheckoutError::PaymentsDisabled);
        }
        if amount <= 0 {
            return Err(CheckoutError::InvalidAmount);
        }

        let methods = self
            .gateway
            .list_payment_methods(amount)
            .await
            .map_err(|err| {
                error!(
                    provider = %self.gateway.kind(),
                    amount,
                    error = ?err,
                    "checkout: failed to list payment methods"
                );
                CheckoutError::Gateway(err.to_string())
            })?;

        Ok(methods
            .into_iter()
            .map(|method| PaymentMethodDto {
                payment_method: method.code,
                payment_name: method.name,
                payment_image: method.image_url,
                total_fee: method.total_fee,
            })
            .collect())
    }

    pub async fn preview_coupon(
        &self,
        user_id: Uuid,
        model: ValidateCouponModel,
    ) -> UseCaseResult<CouponPreviewDto> {
        let code = normalize_code(&model.code);
        info!(%user_id, course_id = %model.course_id, %code, "checkout: coupon preview requested");

        let course = self.load_course(model.course_id).await?;
        let now = Utc::now();

        let coupon = match self.resolve_coupon(user_id, &course, &code, now).await {
            Ok(coupon) => coupon,
            Err(CheckoutError::CouponNotFound) => {
                return Ok(CouponPreviewDto::rejected(code, "coupon not found"));
            }
            Err(CheckoutError::CouponRejected(rejection)) => {
                return Ok(CouponPreviewDto::rejected(code, rejection.to_string()));
            }
            Err(err) => return Err(err),
        };

        let breakdown = Self::price(&course, Some(&coupon), now)?;

        Ok(CouponPreviewDto {
            valid: true,
            code,
            message: "coupon applied".to_string(),
            original_amount: Some(breakdown.original),
            discount_amount: Some(breakdown.total_discount),
            final_amount: Some(breakdown.final_price),
        })
    }

    pub async fn checkout(&self, user_id: Uuid, model: CheckoutModel) -> UseCaseResult<CheckoutDto> {
        let course_id = model.course_id;
        info!(
            %user_id,
            %course_id,
            coupon_code = ?model.coupon_code,
            "checkout: requested"
        );

        if !self.settings.enabled {
            warn!(%user_id, %course_id, "checkout: rejected because payments are disabled");
            return Err(CheckoutError::PaymentsDisabled);
        }

        let course = self.load_course(course_id).await?;

        let enrolled = self
            .enrollment_repo
            .is_enrolled(user_id, course_id)
            .await
            .map_err(|err| {
                error!(%user_id, %course_id, db_error = ?err, "checkout: failed to check enrollment");
                CheckoutError::Internal(err)
            })?;
        if enrolled {
            warn!(
                %user_id,
                %course_id,
                status = CheckoutError::AlreadyEnrolled.status_code().as_u16(),
                "checkout: user already enrolled"
            );
            return Err(CheckoutError::AlreadyEnrolled);
        }

        let user = self.load_user(user_id).await?;
        let now = Utc::now();

        if course.price <= 0 {
            info!(%user_id, %course_id, "checkout: free course, enrolling directly");
            let breakdown = compute_final_price(0, None, None, now);
            return self.complete_free_checkout(&user, &course, None, breakdown).await;
        }

        let coupon = match model
            .coupon_code
            .as_deref()
            .map(normalize_code)
            .filter(|code| !code.is_empty())
        {
            Some(code) => Some(self.resolve_coupon(user_id, &course, &code, now).await?),
            None => None,
        };

        let breakdown = Self::price(&course, coupon.as_ref(), now)?;
        info!(
            %user_id,
            %course_id,
            original = breakdown.original,
            discount = breakdown.total_discount,
            final_price = breakdown.final_price,
            "checkout: price computed"
        );

        if breakdown.is_free() {
            return self
                .complete_free_checkout(&user, &course, coupon.as_ref(), breakdown)
                .await;
        }

        // Best-effort: a stale pending row must not block a fresh attempt.
        match self
            .transaction_repo
            .cancel_pending_by_user_and_course(user_id, course_id)
            .await
        {
            Ok(0) => {}
            Ok(cancelled) => info!(%user_id, %course_id, cancelled, "checkout: cancelled stale pending transactions"),
            Err(err) => warn!(
                %user_id,
                %course_id,
                db_error = ?err,
                "checkout: failed to cancel stale pending transactions; continuing"
            ),
        }

        let order_id = generate_order_id(now);
        let (original_amount, discount_amount) = breakdown
            .recorded_amounts()
            .map_or((None, None), |(original, discount)| (Some(original), Some(discount)));
        let currency = if course.currency.trim().is_empty() {
            DEFAULT_CURRENCY.to_string()
        } else {
            course.currency.clone()
        };

        let transaction = self
            .transaction_repo
            .create(NewTransactionEntity {
                user_id,
                course_id: Some(course_id),
                order_id: order_id.clone(),
                amount: breakdown.final_price,
                original_amount,
                discount_amount,
                currency: currency.clone(),
                status: TransactionStatus::Pending.to_string(),
                gateway: self.gateway.kind().to_string(),
                coupon_id: coupon.as_ref().map(|coupon| coupon.id),
            })
            .await
            .map_err(|err| {
                error!(%user_id, %order_id, db_error = ?err, "checkout: failed to create transaction");
                CheckoutError::Internal(err)
            })?;

        let request = CreateTransactionRequest {
            order_id: order_id.clone(),
            amount: breakdown.final_price,
            currency,
            customer_name: user.full_name.clone(),
            customer_email: user.email.clone(),
            customer_phone: user.phone.clone(),
            item_id: course.id.to_string(),
            item_name: course.title.clone(),
            item_category: ITEM_CATEGORY.to_string(),
            payment_method: model.payment_method.clone(),
            callback_url: self.settings.callback_url.clone(),
            return_url: model
                .return_url
                .clone()
                .or_else(|| self.settings.default_return_url.clone()),
        };

        let created = match self.gateway.create_transaction(request).await {
            Ok(created) => created,
            Err(err) => {
                error!(
                    %user_id,
                    %order_id,
                    provider = %self.gateway.kind(),
                    error = ?err,
                    "checkout: gateway rejected transaction"
                );
                if let Err(db_err) = self
                    .transaction_repo
                    .update_status(transaction.id, TransactionStatus::Failure)
                    .await
                {
                    error!(%order_id, db_error = ?db_err, "checkout: failed to mark transaction as failure");
                }
                return Err(CheckoutError::Gateway(err.to_string()));
            }
        };

        self.transaction_repo
            .update_gateway_session(
                transaction.id,
                GatewaySessionChangeset {
                    snap_token: Some(created.token.clone()),
                    payment_url: Some(created.payment_url.clone()),
                    expired_at: Some(created.expires_at),
                    updated_at: Utc::now(),
                },
            )
            .await
            .map_err(|err| {
                error!(%order_id, db_error = ?err, "checkout: failed to store gateway session");
                CheckoutError::Internal(err)
            })?;

        info!(
            %user_id,
            %order_id,
            transaction_id = %transaction.id,
            amount = breakdown.final_price,
            "checkout: pending transaction created"
        );

        Ok(CheckoutDto {
            is_free: false,
            transaction_id: Some(transaction.id),
            order_id: Some(order_id),
            snap_token: Some(created.token),
            payment_url: Some(created.payment_url),
            client_key: self.gateway.client_key(),
            expired_at: Some(created.expires_at),
            message: None,
            original_amount: breakdown.original,
            discount_amount: breakdown.total_discount,
            final_amount: breakdown.final_price,
        })
    }

    fn price(
        course: &CourseEntity,
        coupon: Option<&CouponEntity>,
        now: DateTime<Utc>,
    ) -> UseCaseResult<PriceBreakdown> {
        let terms = coupon.map(CouponTerms::from_coupon).transpose()?;
        Ok(compute_final_price(
            course.price,
            CourseDiscount::from_course(course).as_ref(),
            terms.as_ref(),
            now,
        ))
    }

    async fn load_course(&self, course_id: Uuid) -> UseCaseResult<CourseEntity> {
        self.course_repo
            .find_by_id(course_id)
            .await
            .map_err(|err| {
                error!(%course_id, db_error = ?err, "checkout: failed to load course");
                CheckoutError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%course_id, "checkout: course not found");
                CheckoutError::CourseNotFound
            })
    }

    async fn load_user(&self, user_id: Uuid) -> UseCaseResult<UserEntity> {
        self.user_repo
            .find_by_id(user_id)
            .await
            .map_err(|err| {
                error!(%user_id, db_error = ?err, "checkout: failed to load user");
                CheckoutError::Internal(err)
            })?
            .ok_or(CheckoutError::UserNotFound)
    }

    async fn resolve_coupon(
        &self,
        user_id: Uuid,
        course: &CourseEntity,
        code: &str,
        now: DateTime<Utc>,
    ) -> UseCaseResult<CouponEntity> {
        let coupon = self
            .coupon_repo
            .find_by_code(code)
            .await
            .map_err(|err| {
                error!(%code, db_error = ?err, "checkout: failed to load coupon");
                CheckoutError::Internal(err)
            })?
            .ok_or_else(|| {
                warn!(%user_id, %code, "checkout: coupon not found");
                CheckoutError::CouponNotFound
            })?;

        let used = self
            .coupon_repo
            .count_usages_by_user(coupon.id, user_id)
            .await
            .map_err(|err| {
                error!(%code, %user_id, db_error = ?err, "checkout: failed to count coupon usage");
                CheckoutError::Internal(err)
            })?;

        validate_coupon_for_user(&coupon, course, used, now).map_err(|rejection| {
            warn!(%user_id, %code, reason = %rejection, "checkout: coupon rejected");
            CheckoutError::CouponRejected(rejection)
        })?;

        Ok(coupon)
    }

    async fn complete_free_checkout(
        &self,
        user: &UserEntity,
        course: &CourseEntity,
        coupon: Option<&CouponEntity>,
        breakdown: PriceBreakdown,
    ) -> UseCaseResult<CheckoutDto> {
        let now = Utc::now();

        self.enrollment_repo
            .enroll(NewEnrollmentEntity {
                user_id: user.id,
                course_id: course.id,
                transaction_id: None,
                enrolled_at: now,
            })
            .await
            .map_err(|err| {
                error!(user_id = %user.id, course_id = %course.id, db_error = ?err, "checkout: failed to enroll");
                CheckoutError::Internal(err)
            })?;

        if let Some(coupon) = coupon {
            self.coupon_repo
                .record_usage(NewCouponUsageEntity {
                    coupon_id: coupon.id,
                    user_id: user.id,
                    transaction_id: None,
                    discount_applied: breakdown.total_discount,
                    used_at: now,
                })
                .await
                .map_err(|err| {
                    error!(coupon_id = %coupon.id, user_id = %user.id, db_error = ?err, "checkout: failed to record coupon usage");
                    CheckoutError::Internal(err)
                })?;
        }

        info!(user_id = %user.id, course_id = %course.id, "checkout: enrolled without payment");

        Ok(CheckoutDto {
            is_free: true,
            transaction_id: None,
            order_id: None,
            snap_token: None,
            payment_url: None,
            client_key: None,
            expired_at: None,
            message: Some("enrolled successfully".to_string()),
            original_amount: breakdown.original,
            discount_amount: breakdown.total_discount,
            final_amount: breakdown.final_price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use checkout_core::{
        domain::{
            entities::transactions::TransactionEntity,
            repositories::{
                coupons::MockCouponRepository, courses::MockCourseRepository,
                enrollments::MockEnrollmentRepository, transactions::MockTransactionRepository,
                users::MockUserRepository,
            },
            value_objects::{
                enums::gateway_kinds::GatewayKind, transactions::EnrollmentOutcome,
            },
        },
        payments::gateway::{CreatedTransaction, GatewayError, MockPaymentGateway},
    };
    use mockall::predicate::eq;
    use std::sync::Mutex;

    struct Mocks {
        transactions: MockTransactionRepository,
        coupons: MockCouponRepository,
        courses: MockCourseRepository,
        users: MockUserRepository,
        enrollments: MockEnrollmentRepository,
        gateway: MockPaymentGateway,
    }

    impl Mocks {
        fn new() -> Self {
            let mut gateway = MockPaymentGateway::new();
            gateway.expect_kind().return_const(GatewayKind::Midtrans);
            gateway
                .expect_client_key()
                .returning(|| Some("client-key".to_string()));
            gateway.expect_is_production().return_const(false);

            Self {
                transactions: MockTransactionRepository::new(),
                coupons: MockCouponRepository::new(),
                courses: MockCourseRepository::new(),
                users: MockUserRepository::new(),
                enrollments: MockEnrollmentRepository::new(),
                gateway,
            }
        }

        fn with_course_and_user(mut self, course: CourseEntity, user: UserEntity) -> Self {
            let course_id = course.id;
            let user_id = user.id;
            self.courses
                .expect_find_by_id()
                .with(eq(course_id))
                .returning(move |_| Ok(Some(course.clone())));
            self.users
                .expect_find_by_id()
                .with(eq(user_id))
                .returning(move |_| Ok(Some(user.clone())));
            self.enrollments
                .expect_is_enrolled()
                .with(eq(user_id), eq(course_id))
                .returning(|_, _| Ok(false));
            self
        }

        fn into_usecase(
            self,
            enabled: bool,
        ) -> CheckoutUseCase<
            MockTransactionRepository,
            MockCouponRepository,
            MockCourseRepository,
            MockUserRepository,
            MockEnrollmentRepository,
        > {
            CheckoutUseCase::new(
                Arc::new(self.transactions),
                Arc::new(self.coupons),
                Arc::new(self.courses),
                Arc::new(self.users),
                Arc::new(self.enrollments),
                Arc::new(self.gateway),
                CheckoutSettings {
                    enabled,
                    callback_url: Some("https://api.example.com/api/v1/webhooks/midtrans".to_string()),
                    default_return_url: Some("https://lms.example.com/payment/finish".to_string()),
                },
            )
        }
    }

    fn sample_course(price: i64, discount_price: Option<i64>) -> CourseEntity {
        CourseEntity {
            id: Uuid::new_v4(),
            title: "Rust for Backends".to_string(),
            slug: "rust-for-backends".to_string(),
            price,
            discount_price,
            discount_valid_until: discount_price.map(|_| Utc::now() + Duration::days(3)),
            currency: "IDR".to_string(),
            instructor_id: None,
        }
    }

    fn sample_user() -> UserEntity {
        UserEntity {
            id: Uuid::new_v4(),
            full_name: "Sari Wulandari".to_string(),
            email: "sari@example.com".to_string(),
            phone: Some("081234567890".to_string()),
        }
    }

    fn sample_coupon(discount_type: &str, value: i64, max_discount: Option<i64>) -> CouponEntity {
        let now = Utc::now();
        CouponEntity {
            id: Uuid::new_v4(),
            code: "SAVE10".to_string(),
            discount_type: discount_type.to_string(),
            discount_value: value,
            max_discount,
            course_id: None,
            instructor_id: None,
            usage_limit: Some(50),
            per_user_limit: 1,
            usage_count: 3,
            valid_from: now - Duration::days(1),
            valid_until: Some(now + Duration::days(1)),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn row_from(new: &NewTransactionEntity) -> TransactionEntity {
        let now = Utc::now();
        TransactionEntity {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            course_id: new.course_id,
            order_id: new.order_id.clone(),
            amount: new.amount,
            original_amount: new.original_amount,
            discount_amount: new.discount_amount,
            currency: new.currency.clone(),
            status: new.status.clone(),
            gateway: new.gateway.clone(),
            gateway_reference: None,
            payment_type: None,
            fraud_status: None,
            snap_token: None,
            payment_url: None,
            coupon_id: new.coupon_id,
            transaction_time: None,
            settlement_time: None,
            expired_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn created_for(request: &CreateTransactionRequest) -> CreatedTransaction {
        CreatedTransaction {
            order_id: request.order_id.clone(),
            token: "snap-token".to_string(),
            payment_url: "https://app.sandbox.midtrans.com/snap/v2/vtweb/snap-token".to_string(),
            expires_at: Utc::now() + Duration::hours(24),
        }
    }

    #[test]
    fn order_ids_follow_the_lms_format() {
        let now = Utc::now();
        let order_id = generate_order_id(now);
        let parts: Vec<&str> = order_id.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "LMS");
        assert_eq!(parts[1].len(), 8);
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            parts[2].parse::<i64>().unwrap(),
            now.timestamp_millis() % 100_000
        );
        assert_ne!(order_id, generate_order_id(now));
    }

    #[tokio::test]
    async fn paid_checkout_with_sale_and_coupon_creates_pending_transaction() {
        let course = sample_course(500_000, Some(300_000));
        let user = sample_user();
        let coupon = sample_coupon("percentage", 10, Some(20_000));
        let (course_id, user_id, coupon_id) = (course.id, user.id, coupon.id);

        let mut mocks = Mocks::new().with_course_and_user(course, user);
        mocks
            .coupons
            .expect_find_by_code()
            .withf(|code| code == "SAVE10")
            .returning(move |_| Ok(Some(coupon.clone())));
        mocks
            .coupons
            .expect_count_usages_by_user()
            .with(eq(coupon_id), eq(user_id))
            .returning(|_, _| Ok(0));
        mocks
            .transactions
            .expect_cancel_pending_by_user_and_course()
            .with(eq(user_id), eq(course_id))
            .times(1)
            .returning(|_, _| Ok(0));
        mocks
            .transactions
            .expect_create()
            .withf(move |new| {
                new.amount == 280_000
                    && new.original_amount == Some(500_000)
                    && new.discount_amount == Some(220_000)
                    && new.coupon_id == Some(coupon_id)
                    && new.status == "pending"
                    && new.gateway == "midtrans"
                    && new.currency == "IDR"
            })
            .times(1)
            .returning(|new| Ok(row_from(&new)));
        mocks
            .gateway
            .expect_create_transaction()
            .withf(|request| {
                request.amount == 280_000
                    && request.customer_email == "sari@example.com"
                    && request.return_url.as_deref() == Some("https://lms.example.com/payment/finish")
            })
            .times(1)
            .returning(|request| Ok(created_for(&request)));
        mocks
            .transactions
            .expect_update_gateway_session()
            .withf(|_, session| session.snap_token.as_deref() == Some("snap-token"))
            .times(1)
            .returning(|_, _| Ok(()));

        let usecase = mocks.into_usecase(true);
        let dto = usecase
            .checkout(
                user_id,
                CheckoutModel {
                    course_id,
                    coupon_code: Some(" save10 ".to_string()),
                    payment_method: None,
                    return_url: None,
                },
            )
            .await
            .expect("checkout should succeed");

        assert!(!dto.is_free);
        assert_eq!(dto.final_amount, 280_000);
        assert_eq!(dto.discount_amount, 220_000);
        assert_eq!(dto.snap_token.as_deref(), Some("snap-token"));
        assert_eq!(dto.client_key.as_deref(), Some("client-key"));
        assert!(dto.order_id.unwrap().starts_with("LMS-"));
    }

    #[tokio::test]
    async fn retry_after_expiry_cancels_old_pending_and_uses_new_order_id() {
        let course = sample_course(150_000, None);
        let user = sample_user();
        let (course_id, user_id) = (course.id, user.id);
        let stale_order_id = "LMS-deadbeef-4242".to_string();
        let seen_order_ids = Arc::new(Mutex::new(Vec::<String>::new()));

        let mut mocks = Mocks::new().with_course_and_user(course, user);
        mocks
            .transactions
            .expect_cancel_pending_by_user_and_course()
            .with(eq(user_id), eq(course_id))
            .times(1)
            .returning(|_, _| Ok(1));
        let recorder = Arc::clone(&seen_order_ids);
        mocks
            .transactions
            .expect_create()
            .times(1)
            .returning(move |new| {
                recorder.lock().unwrap().push(new.order_id.clone());
                assert_eq!(new.original_amount, None);
                assert_eq!(new.discount_amount, None);
                Ok(row_from(&new))
            });
        mocks
            .gateway
            .expect_create_transaction()
            .times(1)
            .returning(|request| Ok(created_for(&request)));
        mocks
            .transactions
            .expect_update_gateway_session()
            .returning(|_, _| Ok(()));

        let dto = mocks
            .into_usecase(true)
            .checkout(
                user_id,
                CheckoutModel {
                    course_id,
                    coupon_code: None,
                    payment_method: None,
                    return_url: None,
                },
            )
            .await
            .unwrap();

        let seen = seen_order_ids.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_ne!(seen[0], stale_order_id);
        assert_eq!(dto.order_id.as_deref(), Some(seen[0].as_str()));
        assert_eq!(dto.final_amount, 150_000);
    }

    #[tokio::test]
    async fn stale_cancel_failure_does_not_block_checkout() {
        let course = sample_course(150_000, None);
        let user = sample_user();
        let (course_id, user_id) = (course.id, user.id);

        let mut mocks = Mocks::new().with_course_and_user(course, user);
        mocks
            .transactions
            .expect_cancel_pending_by_user_and_course()
            .returning(|_, _| Err(anyhow::anyhow!("connection reset")));
        mocks
            .transactions
            .expect_create()
            .times(1)
            .returning(|new| Ok(row_from(&new)));
        mocks
            .gateway
            .expect_create_transaction()
            .returning(|request| Ok(created_for(&request)));
        mocks
            .transactions
            .expect_update_gateway_session()
            .returning(|_, _| Ok(()));

        let result = mocks
            .into_usecase(true)
            .checkout(
                user_id,
                CheckoutModel {
                    course_id,
                    coupon_code: None,
                    payment_method: None,
                    return_url: None,
                },
            )
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn gateway_failure_marks_transaction_failed() {
        let course = sample_course(150_000, None);
        let user = sample_user();
        let (course_id, user_id) = (course.id, user.id);
        let created_id = Arc::new(Mutex::new(None::<Uuid>));

        let mut mocks = Mocks::new().with_course_and_user(course, user);
        mocks
            .transactions
            .expect_cancel_pending_by_user_and_course()
            .returning(|_, _| Ok(0));
        let recorder = Arc::clone(&created_id);
        mocks.transactions.expect_create().returning(move |new| {
            let row = row_from(&new);
            *recorder.lock().unwrap() = Some(row.id);
            Ok(row)
        });
        mocks
            .gateway
            .expect_create_transaction()
            .returning(|_| Err(GatewayError::Upstream("transaction_details.gross_amount is required".to_string())));
        let expected_id = Arc::clone(&created_id);
        mocks
            .transactions
            .expect_update_status()
            .withf(move |id, status| {
                Some(*id) == *expected_id.lock().unwrap() && *status == TransactionStatus::Failure
            })
            .times(1)
            .returning(|_, _| Ok(()));
        mocks.transactions.expect_update_gateway_session().times(0);

        let err = mocks
            .into_usecase(true)
            .checkout(
                user_id,
                CheckoutModel {
                    course_id,
                    coupon_code: None,
                    payment_method: None,
                    return_url: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::Gateway(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn full_discount_coupon_enrolls_without_gateway() {
        let course = sample_course(200_000, None);
        let user = sample_user();
        let coupon = sample_coupon("fixed", 250_000, None);
        let (course_id, user_id, coupon_id) = (course.id, user.id, coupon.id);

        let mut mocks = Mocks::new().with_course_and_user(course, user);
        mocks
            .coupons
            .expect_find_by_code()
            .returning(move |_| Ok(Some(coupon.clone())));
        mocks
            .coupons
            .expect_count_usages_by_user()
            .returning(|_, _| Ok(0));
        mocks
            .enrollments
            .expect_enroll()
            .withf(move |enrollment| {
                enrollment.user_id == user_id
                    && enrollment.course_id == course_id
                    && enrollment.transaction_id.is_none()
            })
            .times(1)
            .returning(|_| Ok(EnrollmentOutcome::Created));
        mocks
            .coupons
            .expect_record_usage()
            .withf(move |usage| {
                usage.coupon_id == coupon_id
                    && usage.transaction_id.is_none()
                    && usage.discount_applied == 200_000
            })
            .times(1)
            .returning(|_| Ok(true));
        mocks.transactions.expect_create().times(0);
        mocks.gateway.expect_create_transaction().times(0);

        let dto = mocks
            .into_usecase(true)
            .checkout(
                user_id,
                CheckoutModel {
                    course_id,
                    coupon_code: Some("SAVE10".to_string()),
                    payment_method: None,
                    return_url: None,
                },
            )
            .await
            .unwrap();

        assert!(dto.is_free);
        assert_eq!(dto.final_amount, 0);
        assert_eq!(dto.original_amount, 200_000);
        assert_eq!(dto.transaction_id, None);
    }

    #[tokio::test]
    async fn already_enrolled_user_gets_conflict() {
        let course = sample_course(200_000, None);
        let course_id = course.id;
        let user_id = Uuid::new_v4();

        let mut mocks = Mocks::new();
        mocks
            .courses
            .expect_find_by_id()
            .returning(move |_| Ok(Some(course.clone())));
        mocks
            .enrollments
            .expect_is_enrolled()
            .returning(|_, _| Ok(true));
        mocks.transactions.expect_create().times(0);

        let err = mocks
            .into_usecase(true)
            .checkout(
                user_id,
                CheckoutModel {
                    course_id,
                    coupon_code: None,
                    payment_method: None,
                    return_url: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::AlreadyEnrolled));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn unknown_course_is_not_found() {
        let mut mocks = Mocks::new();
        mocks.courses.expect_find_by_id().returning(|_| Ok(None));

        let err = mocks
            .into_usecase(true)
            .checkout(
                Uuid::new_v4(),
                CheckoutModel {
                    course_id: Uuid::new_v4(),
                    coupon_code: None,
                    payment_method: None,
                    return_url: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CheckoutError::CourseNotFound));
    }

    #[tokio::test]
    async fn disabled_payments_reject_checkout() {
        let err = Mocks::new()
            .into_usecase(false)
            .checkout(
                Uuid::new_v4(),
                CheckoutModel {
                    course_id: Uuid::new_v4(),
                    coupon_code: None,
                    payment_method: None,
                    return_url: None,
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.status_code(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn exhausted_coupon_is_a_conflict() {
        let course = sample_course(200_000, None);
        let user = sample_user();
        let mut coupon = sample_coupon("percentage", 10, None);
        coupon.usage_count = 50;
        let (course_id, user_id) = (course.id, user.id);

        let mut mocks = Mocks::new().with_course_and_user(course, user);
        mocks
            .coupons
            .expect_find_by_code()
            .returning(move |_| Ok(Some(coupon.clone())));
        mocks
            .coupons
            .expect_count_usages_by_user()
            .returning(|_, _| Ok(0));
        mocks.transactions.expect_create().times(0);

        let err = mocks
            .into_usecase(true)
            .checkout(
                user_id,
                CheckoutModel {
                    course_id,
                    coupon_code: Some("SAVE10".to_string()),
                    payment_method: None,
                    return_url: None,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            CheckoutError::CouponRejected(CouponRejection::UsageLimitReached)
        ));
        assert_eq!(err.status_code(), axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn coupon_preview_reports_breakdown_or_reason() {
        let course = sample_course(500_000, Some(300_000));
        let coupon = sample_coupon("percentage", 10, Some(20_000));
        let course_id = course.id;
        let user_id = Uuid::new_v4();

        let mut mocks = Mocks::new();
        mocks
            .courses
            .expect_find_by_id()
            .returning(move |_| Ok(Some(course.clone())));
        mocks
            .coupons
            .expect_find_by_code()
            .withf(|code| code == "SAVE10")
            .returning(move |_| Ok(Some(coupon.clone())));
        mocks
            .coupons
            .expect_find_by_code()
            .withf(|code| code == "NOPE")
            .returning(|_| Ok(None));
        mocks
            .coupons
            .expect_count_usages_by_user()
            .returning(|_, _| Ok(0));

        let usecase = mocks.into_usecase(true);

        let valid = usecase
            .preview_coupon(
                user_id,
                ValidateCouponModel {
                    course_id,
                    code: "save10".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(valid.valid);
        assert_eq!(valid.final_amount, Some(280_000));

        let missing = usecase
            .preview_coupon(
                user_id,
                ValidateCouponModel {
                    course_id,
                    code: "nope".to_string(),
                },
            )
            .await
            .unwrap();
        assert!(!missing.valid);
        assert_eq!(missing.message, "coupon not found");
    }

    #[tokio::test]
    async fn checkout_config_reflects_active_gateway() {
        let config = Mocks::new().into_usecase(true).checkout_config();

        assert!(config.enabled);
        assert_eq!(config.provider, "midtrans");
        assert_eq!(config.client_key.as_deref(), Some("client-key"));
        assert!(!config.is_production);
    }

    #[tokio::test]
    async fn payment_methods_require_positive_amount() {
        let usecase = Mocks::new().into_usecase(true);
        assert!(matches!(
            usecase.list_payment_methods(0).await,
            Err(CheckoutError::InvalidAmount)
        ));
    }
}
