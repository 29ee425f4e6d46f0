use anyhow::Result;
use async_trait::async_trait;
use diesel::{ExpressionMethods, QueryDsl, RunQueryDsl, dsl::exists, insert_into, select};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{postgres_connection::PgPoolSquad, schema::enrollments},
};
use domain::{
    entities::enrollments::NewEnrollmentEntity,
    repositories::enrollments::EnrollmentRepository,
    value_objects::transactions::EnrollmentOutcome,
};

pub struct EnrollmentPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl EnrollmentPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl EnrollmentRepository for EnrollmentPostgres {
    async fn is_enrolled(&self, user_id: Uuid, course_id: Uuid) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let enrolled = select(exists(
            enrollments::table
                .filter(enrollments::user_id.eq(user_id))
                .filter(enrollments::course_id.eq(course_id)),
        ))
        .get_result::<bool>(&mut conn)?;

        Ok(enrolled)
    }

    async fn enroll(&self, enrollment: NewEnrollmentEntity) -> Result<EnrollmentOutcome> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let inserted = insert_into(enrollments::table)
            .values(&enrollment)
            .on_conflict((enrollments::user_id, enrollments::course_id))
            .do_nothing()
            .execute(&mut conn)?;

        if inserted == 0 {
            Ok(EnrollmentOutcome::AlreadyEnrolled)
        } else {
            Ok(EnrollmentOutcome::Created)
        }
    }
}
