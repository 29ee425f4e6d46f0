mod notifier;
pub mod whatsapp;

pub use notifier::{MockNotificationProvider, NotificationProvider, Notifier, PaymentSuccessNotice};
