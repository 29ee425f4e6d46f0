pub mod checkout;
pub mod payment_webhook;
pub mod transaction_status;
