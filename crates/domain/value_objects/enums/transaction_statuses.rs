use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Canonical lifecycle of a ledger transaction, independent of the gateway that produced it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Settlement,
    Capture,
    Deny,
    Cancel,
    Expire,
    Failure,
    Refund,
    PartialRefund,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Settlement => "settlement",
            TransactionStatus::Capture => "capture",
            TransactionStatus::Deny => "deny",
            TransactionStatus::Cancel => "cancel",
            TransactionStatus::Expire => "expire",
            TransactionStatus::Failure => "failure",
            TransactionStatus::Refund => "refund",
            TransactionStatus::PartialRefund => "partial_refund",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Settlement | TransactionStatus::Capture
        )
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, TransactionStatus::Pending)
    }

    pub fn is_failed(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Deny
                | TransactionStatus::Cancel
                | TransactionStatus::Expire
                | TransactionStatus::Failure
        )
    }

    /// No further transition is accepted from a terminal status.
    pub fn is_terminal(&self) -> bool {
        self.is_failed() || matches!(self, TransactionStatus::Refund)
    }

    /// Forward-only transition table. Re-applying the current status is not a transition.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        use TransactionStatus::*;

        match (self, next) {
            (Pending, Settlement | Capture | Deny | Cancel | Expire | Failure) => true,
            (Capture, Settlement | Deny | Cancel | Failure) => true,
            (Settlement, Refund | PartialRefund) => true,
            (PartialRefund, Refund | PartialRefund) => true,
            _ => false,
        }
    }
}

impl Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "pending" => Ok(TransactionStatus::Pending),
            "settlement" => Ok(TransactionStatus::Settlement),
            "capture" => Ok(TransactionStatus::Capture),
            "deny" => Ok(TransactionStatus::Deny),
            "cancel" => Ok(TransactionStatus::Cancel),
            "expire" => Ok(TransactionStatus::Expire),
            "failure" => Ok(TransactionStatus::Failure),
            "refund" => Ok(TransactionStatus::Refund),
            "partial_refund" => Ok(TransactionStatus::PartialRefund),
            other => Err(anyhow::anyhow!("unknown transaction status: {other}")),
        }
    }
}
