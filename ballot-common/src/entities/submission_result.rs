use alloy_primitives::Address;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;

use crate::entities::ErrorKind;

/// Terminal status of a vote submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// The operation receipt, or the reconciliation query, confirmed the vote.
    Confirmed,

    /// The nullifier was already spent before this client could submit: the vote is recorded.
    AlreadyUsed,

    /// The operation was included but reverted.
    Failed,

    /// The outcome could not be established, the vote may have been recorded.
    Unconfirmed,
}

impl SubmissionStatus {
    /// Returns `true` if the vote of the credential is known to be recorded on-chain.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Confirmed | Self::AlreadyUsed)
    }

    /// Category of the status if it is not a nominal confirmation.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Confirmed => None,
            Self::AlreadyUsed => Some(ErrorKind::AlreadyUsed),
            Self::Failed => Some(ErrorKind::Backend),
            Self::Unconfirmed => Some(ErrorKind::AmbiguousOutcome),
        }
    }
}

/// Persisted outcome of a vote submission, the idempotency record of a credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionResult {
    /// Hash of the sponsored operation, absent if nothing was submitted
    pub operation_hash: Option<String>,

    /// Terminal status
    pub status: SubmissionStatus,

    /// Receipt details, revert reason or error message
    pub details: Option<String>,

    /// Hash of the transaction that included the operation, if known
    pub transaction_hash: Option<String>,

    /// Address of the disposable smart account that submitted the vote
    pub smart_account_address: Option<Address>,

    /// Date of the outcome
    pub recorded_at: DateTime<Utc>,
}

impl SubmissionResult {
    /// SubmissionResult factory, dated now
    pub fn new(
        operation_hash: Option<String>,
        status: SubmissionStatus,
        smart_account_address: Option<Address>,
    ) -> Self {
        Self {
            operation_hash,
            status,
            details: None,
            transaction_hash: None,
            smart_account_address,
            recorded_at: Utc::now(),
        }
    }

    /// Set the details of the outcome
    pub fn with_details<T: Into<String>>(mut self, details: T) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Set the hash of the including transaction
    pub fn with_transaction_hash(mut self, transaction_hash: Option<String>) -> Self {
        self.transaction_hash = transaction_hash;
        self
    }

    /// Returns `true` if the vote is known to be recorded on-chain.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
