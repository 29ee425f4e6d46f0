use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::enrollments;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = enrollments)]
pub struct EnrollmentEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub transaction_id: Option<Uuid>,
    pub enrolled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = enrollments)]
pub struct InsertEnrollmentEntity {
    pub user_id: Uuid,
    pub course_id: Uuid,
    pub transaction_id: Option<Uuid>,
    pub enrolled_at: DateTime<Utc>,
}

pub type NewEnrollmentEntity = InsertEnrollmentEntity;
