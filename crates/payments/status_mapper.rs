use crate::{
    domain::value_objects::enums::transaction_statuses::TransactionStatus,
    payments::gateway::{GatewayError, GatewayResult},
};

/// Gateway A vocabulary. A card `capture` only counts as settled once fraud screening accepts it.
pub fn map_midtrans_status(
    transaction_status: &str,
    fraud_status: Option<&str>,
) -> GatewayResult<TransactionStatus> {
    let status = match transaction_status.trim() {
        "capture" => match fraud_status.map(str::trim) {
            Some("accept") => TransactionStatus::Settlement,
            _ => TransactionStatus::Capture,
        },
        "settlement" => TransactionStatus::Settlement,
        "pending" => TransactionStatus::Pending,
        "deny" => TransactionStatus::Deny,
        "cancel" => TransactionStatus::Cancel,
        "expire" => TransactionStatus::Expire,
        "failure" => TransactionStatus::Failure,
        "refund" => TransactionStatus::Refund,
        "partial_refund" => TransactionStatus::PartialRefund,
        other => return Err(GatewayError::UnknownStatus(other.to_string())),
    };

    Ok(status)
}

/// Gateway B result codes (callback `resultCode`, status `statusCode`).
pub fn map_duitku_code(code: &str) -> TransactionStatus {
    match code.trim() {
        "00" => TransactionStatus::Settlement,
        "01" => TransactionStatus::Pending,
        _ => TransactionStatus::Failure,
    }
}
