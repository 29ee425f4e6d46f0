use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

const QUEUE_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq)]
pub struct PaymentSuccessNotice {
    pub order_id: String,
    pub phone: Option<String>,
    pub customer_name: String,
    pub course_title: String,
    pub amount: i64,
    pub currency: String,
    pub lms_url: String,
}

#[automock]
#[async_trait]
pub trait NotificationProvider: Send + Sync {
    async fn send(&self, notice: &PaymentSuccessNotice) -> Result<()>;
    fn provider_name(&self) -> &'static str;
}

/// Fire-and-forget queue: callers never wait on delivery, failures are only logged.
#[derive(Clone)]
pub struct Notifier {
    tx: mpsc::Sender<PaymentSuccessNotice>,
}

impl Notifier {
    /// Spawns the drain task, so it must be called inside a tokio runtime.
    pub fn new(providers: Vec<Arc<dyn NotificationProvider>>) -> Self {
        let (tx, mut rx) = mpsc::channel::<PaymentSuccessNotice>(QUEUE_CAPACITY);

        tokio::spawn(async move {
            while let Some(notice) = rx.recv().await {
                for provider in &providers {
                    match provider.send(&notice).await {
                        Ok(()) => info!(
                            provider = provider.provider_name(),
                            order_id = %notice.order_id,
                            "notifications: payment success delivered"
                        ),
                        Err(error) => warn!(
                            provider = provider.provider_name(),
                            order_id = %notice.order_id,
                            error = %error,
                            "notifications: provider failed"
                        ),
                    }
                }
            }
        });

        Self { tx }
    }

    pub fn try_notify(&self, notice: PaymentSuccessNotice) {
        match self.tx.try_send(notice) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(notice)) => {
                warn!(order_id = %notice.order_id, "notifications: queue full; dropping notice");
            }
            Err(mpsc::error::TrySendError::Closed(notice)) => {
                warn!(order_id = %notice.order_id, "notifications: queue closed; dropping notice");
            }
        }
    }
}
