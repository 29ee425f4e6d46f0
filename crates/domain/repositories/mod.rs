pub mod coupons;
pub mod courses;
pub mod enrollments;
pub mod transactions;
pub mod users;
