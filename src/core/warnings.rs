use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a transaction was left out of the analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    ZeroAmount,
    MalformedAmount,
}

/// Run-level warnings emitted while assembling a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Warning {
    /// Transaction matched CGT vocabulary but its amount could not be used.
    ExcludedTransaction {
        transaction_id: String,
        reason: ExclusionReason,
    },
    /// Rate provider was unavailable; the statutory default was used.
    RateFallback { error: String },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::ExcludedTransaction {
                transaction_id,
                reason: ExclusionReason::ZeroAmount,
            } => write!(f, "transaction {transaction_id} excluded: amount is zero"),
            Warning::ExcludedTransaction {
                transaction_id,
                reason: ExclusionReason::MalformedAmount,
            } => write!(f, "transaction {transaction_id} excluded: amount is missing or malformed"),
            Warning::RateFallback { error } => {
                write!(f, "discount rate provider unavailable ({error}); default rate used")
            }
        }
    }
}
