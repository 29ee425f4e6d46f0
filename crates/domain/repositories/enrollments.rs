use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::{
    entities::enrollments::NewEnrollmentEntity,
    value_objects::transactions::EnrollmentOutcome,
};

#[automock]
#[async_trait]
pub trait EnrollmentRepository {
    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> Result<bool>;

    /// A unique `(user_id, course_id)` violation resolves to `AlreadyEnrolled`.
    async fn enroll(&self, enrollment: NewEnrollmentEntity) -> Result<EnrollmentOutcome>;
}
