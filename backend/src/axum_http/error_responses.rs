use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::usecases::{
    checkout::CheckoutError, payment_webhook::WebhookError,
    transaction_status::TransactionStatusError,
};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Status { status, message } => (status, message),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            code: status.as_u16(),
            message,
        });

        (status, body).into_response()
    }
}

// 5xx details stay in the logs.
fn from_status(status: StatusCode, message: String) -> AppError {
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        AppError::Internal(anyhow::anyhow!(message))
    } else if status == StatusCode::BAD_GATEWAY {
        AppError::Status {
            status,
            message: "Payment gateway error".to_string(),
        }
    } else {
        AppError::Status { status, message }
    }
}

impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        from_status(err.status_code(), err.to_string())
    }
}

impl From<WebhookError> for AppError {
    fn from(err: WebhookError) -> Self {
        from_status(err.status_code(), err.to_string())
    }
}

impl From<TransactionStatusError> for AppError {
    fn from(err: TransactionStatusError) -> Self {
        from_status(err.status_code(), err.to_string())
    }
}
