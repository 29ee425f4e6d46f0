use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::courses::CourseEntity;

#[automock]
#[async_trait]
pub trait CourseRepository {
    async fn find_by_id(&self, course_id: Uuid) -> Result<Option<CourseEntity>>;
}
