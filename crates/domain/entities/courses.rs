use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::courses;

/// Read-only view of a course; only the columns checkout prices against.
#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = courses)]
pub struct CourseEntity {
    pub id: Uuid,
    pub title: String,
    pub slug: String,
    pub price: i64,
    pub discount_price: Option<i64>,
    pub discount_valid_until: Option<DateTime<Utc>>,
    pub currency: String,
    pub instructor_id: Option<Uuid>,
}
