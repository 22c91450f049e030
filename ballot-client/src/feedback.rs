//! Long running steps of a vote (proving, waiting for the operation receipt) can take minutes.
//!
//! Register [FeedbackReceiver]s on the [BallotClientBuilder][crate::BallotClientBuilder] to be
//! notified of their progress.

use async_trait::async_trait;
use slog::{info, warn, Logger};
use std::sync::{Arc, RwLock};
use uuid::Uuid;

use ballot_common::entities::SubmissionStatus;

/// Event that can be reported by a [FeedbackReceiver].
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum VoteEvent {
    /// A proof generation has started
    ProofGenerationStarted {
        /// Voter identity, as `contract/voter`
        voter: String,
        /// Number of registration leaves used to rebuild the tree
        leaf_count: usize,
    },
    /// A proof has been generated and stored
    ProofGenerated {
        /// Voter identity, as `contract/voter`
        voter: String,
        /// Public nullifier hash bound to the proof
        nullifier_hash: String,
    },
    /// A stored proof was found, no proof was generated
    StoredProofReused {
        /// Voter identity, as `contract/voter`
        voter: String,
    },
    /// The sponsored operation carrying the vote has been submitted
    OperationSubmitted {
        /// Unique identifier used to track this specific submission
        submission_id: String,
        /// Hash of the sponsored operation
        operation_hash: String,
        /// Address of the disposable smart account
        smart_account: String,
    },
    /// Waiting for the receipt of the operation
    AwaitingConfirmation {
        /// Unique identifier used to track this specific submission
        submission_id: String,
        /// Maximum duration of the wait, in milliseconds
        timeout_ms: u64,
    },
    /// The receipt could not be obtained, the nullifier status is being queried
    ReconciliationStarted {
        /// Unique identifier used to track this specific submission
        submission_id: String,
        /// Why the receipt could not be obtained
        reason: String,
    },
    /// The submission reached a terminal state
    SubmissionCompleted {
        /// Unique identifier used to track this specific submission
        submission_id: String,
        /// Terminal status
        status: SubmissionStatus,
    },
}

impl VoteEvent {
    /// Generate a random unique identifier to identify a submission
    pub fn new_submission_id() -> String {
        Uuid::new_v4().to_string()
    }
}

/// A sender of [VoteEvent].
///
/// It uses Arc internally so it can be cloned at will.
#[derive(Clone)]
pub struct FeedbackSender {
    receivers: Vec<Arc<dyn FeedbackReceiver>>,
}

impl FeedbackSender {
    /// Create a new [FeedbackSender].
    pub fn new(receivers: &[Arc<dyn FeedbackReceiver>]) -> FeedbackSender {
        Self {
            receivers: receivers.to_vec(),
        }
    }

    /// Send the given event to the known receivers.
    pub async fn send_event(&self, event: VoteEvent) {
        for receiver in &self.receivers {
            receiver.handle_event(event.clone()).await;
        }
    }
}

/// A receiver of [VoteEvent].
#[async_trait]
pub trait FeedbackReceiver: Sync + Send {
    /// Callback called by a [FeedbackSender] when it need to send an [event][VoteEvent].
    async fn handle_event(&self, event: VoteEvent);
}

/// A [FeedbackReceiver] that write the event it receives in a [slog logger][Logger].
pub struct SlogFeedbackReceiver {
    logger: Logger,
}

impl SlogFeedbackReceiver {
    /// Create a new [SlogFeedbackReceiver].
    pub fn new(logger: Logger) -> SlogFeedbackReceiver {
        Self { logger }
    }
}

#[async_trait]
impl FeedbackReceiver for SlogFeedbackReceiver {
    async fn handle_event(&self, event: VoteEvent) {
        match event {
            VoteEvent::ProofGenerationStarted { voter, leaf_count } => {
                info!(self.logger, "Proof generation started"; "voter" => voter, "leaf_count" => leaf_count);
            }
            VoteEvent::ProofGenerated {
                voter,
                nullifier_hash,
            } => {
                info!(self.logger, "Proof generated"; "voter" => voter, "nullifier_hash" => nullifier_hash);
            }
            VoteEvent::StoredProofReused { voter } => {
                info!(self.logger, "Stored proof reused"; "voter" => voter);
            }
            VoteEvent::OperationSubmitted {
                submission_id,
                operation_hash,
                smart_account,
            } => {
                info!(
                    self.logger, "Vote operation submitted";
                    "submission_id" => submission_id,
                    "operation_hash" => operation_hash,
                    "smart_account" => smart_account,
                );
            }
            VoteEvent::AwaitingConfirmation {
                submission_id,
                timeout_ms,
            } => {
                info!(
                    self.logger, "Waiting for the vote operation receipt ...";
                    "submission_id" => submission_id, "timeout_ms" => timeout_ms
                );
            }
            VoteEvent::ReconciliationStarted {
                submission_id,
                reason,
            } => {
                warn!(
                    self.logger, "No receipt for the vote operation, checking the nullifier status";
                    "submission_id" => submission_id, "reason" => reason
                );
            }
            VoteEvent::SubmissionCompleted {
                submission_id,
                status,
            } => {
                info!(
                    self.logger, "Vote submission completed";
                    "submission_id" => submission_id, "status" => %status
                );
            }
        };
    }
}

/// A [FeedbackReceiver] that stack the events that it receives in a vec.
///
/// Use it only for tests purpose.
pub struct StackFeedbackReceiver {
    stacked_events: RwLock<Vec<VoteEvent>>,
}

impl StackFeedbackReceiver {
    /// Create a new [StackFeedbackReceiver].
    pub fn new() -> StackFeedbackReceiver {
        Self {
            stacked_events: RwLock::new(vec![]),
        }
    }

    /// Returns a copy of the stored stacked events.
    ///
    /// Will crash if it can't access the stored events.
    pub fn stacked_events(&self) -> Vec<VoteEvent> {
        let events = self.stacked_events.read().unwrap();
        events.clone()
    }
}

impl Default for StackFeedbackReceiver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FeedbackReceiver for StackFeedbackReceiver {
    async fn handle_event(&self, event: VoteEvent) {
        let mut events = self.stacked_events.write().unwrap();
        events.push(event);
    }
}
