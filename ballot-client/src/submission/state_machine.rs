use alloy_primitives::{Address, Bytes};
use anyhow::anyhow;
use slog::{debug, info, warn, Logger};
use std::fmt::Display;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};

use ballot_common::entities::{
    CredentialKey, FieldElement, SubmissionResult, SubmissionStatus, VoteProof,
};
use ballot_common::logging::LoggerExtensions;
use ballot_common::StdResult;

use crate::credential_store::CredentialStorer;
use crate::feedback::{FeedbackSender, VoteEvent};
use crate::voting_contract::{VoteCallEncoder, VotingContractReader};

use super::{
    OperationHandle, OperationReceipt, SponsoredSession, SubmissionError, SubmissionSettings,
};

/// Different possible states of a vote submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionState {
    /// Starting state, nothing was sent yet
    Idle,

    /// The disposable sponsored account of the session is available
    AccountReady {
        /// Address of the smart account
        smart_account: Address,
    },

    /// The vote call is encoded and about to be submitted
    Submitting {
        /// Address of the smart account
        smart_account: Address,
        /// Encoded `vote` call
        call_data: Bytes,
    },

    /// The operation was accepted, waiting for its receipt
    AwaitingConfirmation {
        /// Address of the smart account
        smart_account: Address,
        /// Submitted operation
        operation: OperationHandle,
    },

    /// The receipt wait timed out or failed, the outcome is not known
    AmbiguousTimeout {
        /// Address of the smart account
        smart_account: Address,
        /// Submitted operation
        operation: OperationHandle,
        /// Why the receipt could not be obtained
        reason: String,
    },

    /// The nullifier status is queried to settle the outcome
    Reconciling {
        /// Address of the smart account
        smart_account: Address,
        /// Submitted operation
        operation: OperationHandle,
        /// Why the receipt could not be obtained
        reason: String,
    },

    /// The vote is recorded on-chain
    Confirmed {
        /// Persisted result
        result: SubmissionResult,
    },

    /// The nullifier was already spent, the vote of this credential is recorded
    AlreadyUsed {
        /// Persisted result
        result: SubmissionResult,
    },

    /// The operation was included but reverted
    Failed {
        /// Persisted result
        result: SubmissionResult,
    },

    /// The outcome could not be established, a manual check is advised
    Unconfirmed {
        /// Persisted result
        result: SubmissionResult,
    },
}

impl SubmissionState {
    fn completed(result: SubmissionResult) -> Self {
        match result.status {
            SubmissionStatus::Confirmed => Self::Confirmed { result },
            SubmissionStatus::AlreadyUsed => Self::AlreadyUsed { result },
            SubmissionStatus::Failed => Self::Failed { result },
            SubmissionStatus::Unconfirmed => Self::Unconfirmed { result },
        }
    }

    /// Result of the submission if the state is terminal.
    pub fn result(&self) -> Option<&SubmissionResult> {
        match self {
            Self::Confirmed { result }
            | Self::AlreadyUsed { result }
            | Self::Failed { result }
            | Self::Unconfirmed { result } => Some(result),
            _ => None,
        }
    }

    /// Returns `true` if the state is terminal.
    pub fn is_terminal(&self) -> bool {
        self.result().is_some()
    }

    /// Consume the state, returning its result if it is terminal.
    pub fn into_result(self) -> Option<SubmissionResult> {
        match self {
            Self::Confirmed { result }
            | Self::AlreadyUsed { result }
            | Self::Failed { result }
            | Self::Unconfirmed { result } => Some(result),
            _ => None,
        }
    }
}

impl Display for SubmissionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "Idle"),
            Self::AccountReady { smart_account } => write!(f, "AccountReady - {smart_account}"),
            Self::Submitting { smart_account, .. } => write!(f, "Submitting - {smart_account}"),
            Self::AwaitingConfirmation { operation, .. } => {
                write!(f, "AwaitingConfirmation - {operation}")
            }
            Self::AmbiguousTimeout { operation, .. } => write!(f, "AmbiguousTimeout - {operation}"),
            Self::Reconciling { operation, .. } => write!(f, "Reconciling - {operation}"),
            Self::Confirmed { .. } => write!(f, "Confirmed"),
            Self::AlreadyUsed { .. } => write!(f, "AlreadyUsed"),
            Self::Failed { .. } => write!(f, "Failed"),
            Self::Unconfirmed { .. } => write!(f, "Unconfirmed"),
        }
    }
}

/// Drives a vote proof from [Idle][SubmissionState::Idle] to a persisted terminal state.
///
/// A timed out receipt wait is not taken as a failure: the machine goes through
/// [Reconciling][SubmissionState::Reconciling] and asks the contract if the nullifier was spent.
pub struct VoteSubmissionStateMachine {
    state: Mutex<SubmissionState>,
    submission_id: String,
    key: CredentialKey,
    proof: VoteProof,
    session: Arc<SponsoredSession>,
    contract_reader: Arc<dyn VotingContractReader>,
    credential_store: Arc<dyn CredentialStorer>,
    feedback_sender: FeedbackSender,
    settings: SubmissionSettings,
    logger: Logger,
}

impl VoteSubmissionStateMachine {
    /// Create a new machine in the [Idle][SubmissionState::Idle] state.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: CredentialKey,
        proof: VoteProof,
        session: Arc<SponsoredSession>,
        contract_reader: Arc<dyn VotingContractReader>,
        credential_store: Arc<dyn CredentialStorer>,
        feedback_sender: FeedbackSender,
        settings: SubmissionSettings,
        logger: Logger,
    ) -> Self {
        let submission_id = VoteEvent::new_submission_id();
        let logger = logger
            .new_with_component_name::<Self>()
            .new(slog::o!("submission_id" => submission_id.clone()));

        Self {
            state: Mutex::new(SubmissionState::Idle),
            submission_id,
            key,
            proof,
            session,
            contract_reader,
            credential_store,
            feedback_sender,
            settings,
            logger,
        }
    }

    /// Identifier of this submission, shared by its logs and feedback events.
    pub fn submission_id(&self) -> &str {
        &self.submission_id
    }

    /// Return the current state of the machine.
    pub async fn get_state(&self) -> SubmissionState {
        self.state.lock().await.to_owned()
    }

    /// Cycle the machine until it reaches a terminal state or an error occurs.
    ///
    /// On error the machine keeps its state.
    pub async fn run(&self) -> Result<SubmissionResult, SubmissionError> {
        info!(self.logger, "Launching vote submission"; "voter" => %self.key);

        loop {
            if let Some(result) = self.get_state().await.into_result() {
                return Ok(result);
            }

            self.cycle().await?;
        }
    }

    /// Perform a single transition of the machine.
    pub async fn cycle(&self) -> Result<(), SubmissionError> {
        let mut state = self.state.lock().await;
        debug!(self.logger, "New cycle"; "state" => state.to_string());

        match state.deref() {
            SubmissionState::Idle => {
                *state = self.transition_from_idle().await?;
            }
            SubmissionState::AccountReady { smart_account } => {
                let smart_account = *smart_account;
                *state = self.transition_from_account_ready_to_submitting(smart_account);
            }
            SubmissionState::Submitting {
                smart_account,
                call_data,
            } => {
                let (smart_account, call_data) = (*smart_account, call_data.clone());
                *state = self
                    .transition_from_submitting(smart_account, call_data)
                    .await?;
            }
            SubmissionState::AwaitingConfirmation {
                smart_account,
                operation,
            } => {
                let (smart_account, operation) = (*smart_account, operation.clone());
                *state = self
                    .transition_from_awaiting_confirmation(smart_account, operation)
                    .await?;
            }
            SubmissionState::AmbiguousTimeout {
                smart_account,
                operation,
                reason,
            } => {
                let (smart_account, operation, reason) =
                    (*smart_account, operation.clone(), reason.clone());
                *state = self
                    .transition_from_ambiguous_timeout_to_reconciling(
                        smart_account,
                        operation,
                        reason,
                    )
                    .await;
            }
            SubmissionState::Reconciling {
                smart_account,
                operation,
                reason,
            } => {
                let (smart_account, operation, reason) =
                    (*smart_account, operation.clone(), reason.clone());
                *state = self
                    .transition_from_reconciling(smart_account, operation, &reason)
                    .await?;
            }
            terminal_state => {
                debug!(self.logger, "Terminal state reached, nothing to do"; "state" => %terminal_state);
            }
        }

        Ok(())
    }

    async fn transition_from_idle(&self) -> Result<SubmissionState, SubmissionError> {
        if let Some(result) = self
            .credential_store
            .load_submission_result(&self.key)
            .await?
        {
            warn!(
                self.logger, "A submission result is already recorded, refusing to submit again";
                "status" => %result.status
            );
            return Err(SubmissionError::AlreadySubmitted {
                key: self.key,
                status: result.status,
            });
        }

        match self.query_nullifier_used().await {
            Ok(true) => {
                info!(self.logger, "→ Nullifier already spent, transiting to ALREADY_USED");
                let result = SubmissionResult::new(None, SubmissionStatus::AlreadyUsed, None)
                    .with_details("nullifier already spent before submission");
                return self.complete(result).await;
            }
            Ok(false) => {}
            Err(error) => {
                warn!(
                    self.logger, "Nullifier pre-flight query failed, submitting anyway";
                    "error" => ?error
                );
            }
        }

        let account = self
            .session
            .account()
            .await
            .map_err(SubmissionError::AccountProvisioning)?;
        info!(self.logger, "→ Sponsored account ready, transiting to ACCOUNT_READY"; "smart_account" => %account.address());

        Ok(SubmissionState::AccountReady {
            smart_account: account.address(),
        })
    }

    fn transition_from_account_ready_to_submitting(
        &self,
        smart_account: Address,
    ) -> SubmissionState {
        let call_data = VoteCallEncoder::encode_vote(&self.proof);
        debug!(self.logger, "→ Vote call encoded, transiting to SUBMITTING"; "call_data_length" => call_data.len());

        SubmissionState::Submitting {
            smart_account,
            call_data,
        }
    }

    async fn transition_from_submitting(
        &self,
        smart_account: Address,
        call_data: Bytes,
    ) -> Result<SubmissionState, SubmissionError> {
        let account = self
            .session
            .account()
            .await
            .map_err(SubmissionError::AccountProvisioning)?;

        match account.submit(self.key.contract_address, call_data).await {
            Ok(operation) => {
                info!(
                    self.logger, "→ Operation submitted, transiting to AWAITING_CONFIRMATION";
                    "operation_hash" => %operation, "smart_account" => %smart_account
                );
                self.feedback_sender
                    .send_event(VoteEvent::OperationSubmitted {
                        submission_id: self.submission_id.clone(),
                        operation_hash: operation.hash.clone(),
                        smart_account: smart_account.to_string(),
                    })
                    .await;

                Ok(SubmissionState::AwaitingConfirmation {
                    smart_account,
                    operation,
                })
            }
            Err(error) => {
                warn!(self.logger, "Operation submission failed, checking the nullifier status"; "error" => ?error);
                if let Ok(true) = self.query_nullifier_used().await {
                    let result = SubmissionResult::new(
                        None,
                        SubmissionStatus::AlreadyUsed,
                        Some(smart_account),
                    )
                    .with_details(format!("{error:#}"));
                    return self.complete(result).await;
                }

                Err(SubmissionError::Submit(error))
            }
        }
    }

    async fn transition_from_awaiting_confirmation(
        &self,
        smart_account: Address,
        operation: OperationHandle,
    ) -> Result<SubmissionState, SubmissionError> {
        let receipt_timeout = self.settings.receipt_timeout;
        self.feedback_sender
            .send_event(VoteEvent::AwaitingConfirmation {
                submission_id: self.submission_id.clone(),
                timeout_ms: receipt_timeout.as_millis() as u64,
            })
            .await;

        let account = self
            .session
            .account()
            .await
            .map_err(SubmissionError::AccountProvisioning)?;
        let reason = match timeout(
            receipt_timeout,
            account.wait_for_receipt(&operation, receipt_timeout),
        )
        .await
        {
            Ok(Ok(receipt)) => {
                let result = Self::result_from_receipt(&operation, smart_account, receipt);
                return self.complete(result).await;
            }
            Ok(Err(error)) => format!("receipt wait failed: {error:#}"),
            Err(_) => format!(
                "no receipt after {} ms",
                receipt_timeout.as_millis()
            ),
        };
        warn!(self.logger, "→ Receipt unavailable, transiting to AMBIGUOUS_TIMEOUT"; "reason" => %reason);

        Ok(SubmissionState::AmbiguousTimeout {
            smart_account,
            operation,
            reason,
        })
    }

    async fn transition_from_ambiguous_timeout_to_reconciling(
        &self,
        smart_account: Address,
        operation: OperationHandle,
        reason: String,
    ) -> SubmissionState {
        self.feedback_sender
            .send_event(VoteEvent::ReconciliationStarted {
                submission_id: self.submission_id.clone(),
                reason: reason.clone(),
            })
            .await;
        debug!(
            self.logger, "Waiting before querying the nullifier status";
            "grace_ms" => self.settings.reconciliation_grace.as_millis() as u64
        );
        sleep(self.settings.reconciliation_grace).await;
        info!(self.logger, "→ Transiting to RECONCILING"; "operation_hash" => %operation);

        SubmissionState::Reconciling {
            smart_account,
            operation,
            reason,
        }
    }

    async fn transition_from_reconciling(
        &self,
        smart_account: Address,
        operation: OperationHandle,
        reason: &str,
    ) -> Result<SubmissionState, SubmissionError> {
        let (status, details) = match self.query_nullifier_used().await {
            Ok(true) => (
                SubmissionStatus::Confirmed,
                format!("{reason}, nullifier found spent"),
            ),
            Ok(false) => (
                SubmissionStatus::Unconfirmed,
                format!("{reason}, nullifier not spent yet: manual check advised"),
            ),
            Err(error) => (
                SubmissionStatus::Unconfirmed,
                format!("{reason}, nullifier status unknown ({error:#}): manual check advised"),
            ),
        };
        let result = SubmissionResult::new(Some(operation.hash), status, Some(smart_account))
            .with_details(details);

        self.complete(result).await
    }

    fn result_from_receipt(
        operation: &OperationHandle,
        smart_account: Address,
        receipt: OperationReceipt,
    ) -> SubmissionResult {
        let status = if receipt.success {
            SubmissionStatus::Confirmed
        } else {
            SubmissionStatus::Failed
        };
        let mut result =
            SubmissionResult::new(Some(operation.hash.clone()), status, Some(smart_account))
                .with_transaction_hash(receipt.transaction_hash);
        result.details = receipt.details;

        result
    }

    async fn query_nullifier_used(&self) -> StdResult<bool> {
        query_nullifier_used_within(
            self.contract_reader.as_ref(),
            self.proof.nullifier_hash(),
            self.settings.reconciliation_query_timeout,
        )
        .await
    }

    async fn complete(
        &self,
        result: SubmissionResult,
    ) -> Result<SubmissionState, SubmissionError> {
        self.credential_store
            .save_submission_result(&self.key, &result)
            .await?;
        if result.is_success() {
            if let Err(error) = self
                .credential_store
                .mark_nullifier_spent(&self.proof.nullifier_hash())
                .await
            {
                warn!(self.logger, "Could not record the spent nullifier"; "error" => ?error);
            }
        }
        info!(
            self.logger, "→ Submission completed";
            "status" => %result.status, "operation_hash" => ?result.operation_hash
        );
        self.feedback_sender
            .send_event(VoteEvent::SubmissionCompleted {
                submission_id: self.submission_id.clone(),
                status: result.status,
            })
            .await;

        Ok(SubmissionState::completed(result))
    }
}

/// Query the nullifier status, failing if the contract does not answer within `query_timeout`.
pub(super) async fn query_nullifier_used_within(
    contract_reader: &dyn VotingContractReader,
    nullifier_hash: FieldElement,
    query_timeout: Duration,
) -> StdResult<bool> {
    match timeout(query_timeout, contract_reader.is_nullifier_used(nullifier_hash)).await {
        Ok(used) => used,
        Err(_) => Err(anyhow!(
            "nullifier status query timed out after {} ms",
            query_timeout.as_millis()
        )),
    }
}
