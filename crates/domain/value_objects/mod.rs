pub mod checkout;
pub mod coupons;
pub mod enums;
pub mod pricing;
pub mod transactions;
