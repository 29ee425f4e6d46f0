pub mod discount_types;
pub mod gateway_kinds;
pub mod transaction_statuses;
