pub mod checkout;
pub mod internal_payments;
pub mod payment_webhooks;
pub mod transaction_status;
