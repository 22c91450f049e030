//! Submission of a vote proof as a sponsored operation, up to a persisted terminal result.
//!
//! The [VoteSubmissionStateMachine] drives a single submission. The [VoteSubmitter] runs it
//! under a per voter guard so that a proof is never submitted twice concurrently.

mod backend;
mod error;
mod session;
mod state_machine;
mod submitter;

pub use backend::{OperationHandle, OperationReceipt, SponsoredAccount, SponsoredAccountProvider};
pub use error::SubmissionError;
pub use session::SponsoredSession;
pub use state_machine::{SubmissionState, VoteSubmissionStateMachine};
pub use submitter::VoteSubmitter;

#[cfg(test)]
pub use backend::{MockSponsoredAccount, MockSponsoredAccountProvider};

use std::time::Duration;

/// Durations bounding the waits of a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionSettings {
    /// Maximum wait for the receipt of a submitted operation
    pub receipt_timeout: Duration,

    /// Pause before querying the nullifier status once the receipt wait failed
    pub reconciliation_grace: Duration,

    /// Maximum duration of a nullifier status query
    pub reconciliation_query_timeout: Duration,
}

impl Default for SubmissionSettings {
    fn default() -> Self {
        Self {
            receipt_timeout: Duration::from_secs(120),
            reconciliation_grace: Duration::from_secs(5),
            reconciliation_query_timeout: Duration::from_secs(10),
        }
    }
}
