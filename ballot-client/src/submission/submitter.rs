use slog::{info, warn, Logger};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use ballot_common::entities::{CredentialKey, SubmissionResult, SubmissionStatus, VoteProof};
use ballot_common::logging::LoggerExtensions;

use crate::credential_store::CredentialStorer;
use crate::feedback::{FeedbackSender, VoteEvent};
use crate::voting_contract::VotingContractReader;

use super::state_machine::query_nullifier_used_within;
use super::{SponsoredSession, SubmissionError, SubmissionSettings, VoteSubmissionStateMachine};

/// Runs vote submissions, at most one at a time per voter.
///
/// Every operation that reads then writes the submission result of a voter holds the guard of
/// this voter for its whole duration.
pub struct VoteSubmitter {
    session: Arc<SponsoredSession>,
    contract_reader: Arc<dyn VotingContractReader>,
    credential_store: Arc<dyn CredentialStorer>,
    feedback_sender: FeedbackSender,
    settings: SubmissionSettings,
    voter_guards: Mutex<HashMap<CredentialKey, Arc<Mutex<()>>>>,
    logger: Logger,
}

impl VoteSubmitter {
    /// VoteSubmitter factory
    pub fn new(
        session: Arc<SponsoredSession>,
        contract_reader: Arc<dyn VotingContractReader>,
        credential_store: Arc<dyn CredentialStorer>,
        feedback_sender: FeedbackSender,
        settings: SubmissionSettings,
        logger: Logger,
    ) -> Self {
        Self {
            session,
            contract_reader,
            credential_store,
            feedback_sender,
            settings,
            voter_guards: Mutex::new(HashMap::new()),
            logger: logger.new_with_component_name::<Self>(),
        }
    }

    /// Guard of a voter. Guards only referenced by the map belong to no running operation and
    /// are dropped on the way.
    async fn voter_guard(&self, key: &CredentialKey) -> Arc<Mutex<()>> {
        let mut guards = self.voter_guards.lock().await;
        guards.retain(|guarded_key, guard| guarded_key == key || Arc::strong_count(guard) > 1);

        guards.entry(*key).or_default().clone()
    }

    /// Submit the vote proof of a voter and wait for its terminal result.
    ///
    /// Fails with [SubmissionError::AlreadySubmitted] if a result is already recorded for the
    /// voter, in which case the submission backend is not contacted.
    pub async fn submit(
        &self,
        key: CredentialKey,
        proof: &VoteProof,
    ) -> Result<SubmissionResult, SubmissionError> {
        if proof.vote_choice().is_none() {
            return Err(SubmissionError::InvalidProof(format!(
                "vote flag must be 0 or 1, got {}",
                proof.public_inputs.vote
            )));
        }

        let guard = self.voter_guard(&key).await;
        let _voter_lock = guard.lock_owned().await;
        let machine = VoteSubmissionStateMachine::new(
            key,
            proof.clone(),
            self.session.clone(),
            self.contract_reader.clone(),
            self.credential_store.clone(),
            self.feedback_sender.clone(),
            self.settings,
            self.logger.clone(),
        );

        machine.run().await
    }

    /// Settle again an [unconfirmed][SubmissionStatus::Unconfirmed] result of a voter.
    ///
    /// The result is upgraded to [confirmed][SubmissionStatus::Confirmed] if the nullifier is now
    /// found spent. Any other recorded result is returned unchanged.
    pub async fn reconcile(
        &self,
        key: CredentialKey,
    ) -> Result<Option<SubmissionResult>, SubmissionError> {
        let guard = self.voter_guard(&key).await;
        let _voter_lock = guard.lock_owned().await;

        let Some(result) = self.credential_store.load_submission_result(&key).await? else {
            return Ok(None);
        };
        if result.status != SubmissionStatus::Unconfirmed {
            return Ok(Some(result));
        }

        let proof = self
            .credential_store
            .load_proof(&key)
            .await?
            .ok_or(SubmissionError::MissingProof(key))?;
        if !self.is_nullifier_used(&proof).await? {
            info!(self.logger, "Nullifier still not spent, the result stays unconfirmed"; "voter" => %key);
            return Ok(Some(result));
        }

        let confirmed = SubmissionResult {
            status: SubmissionStatus::Confirmed,
            details: Some("nullifier found spent on reconciliation".to_string()),
            recorded_at: chrono::Utc::now(),
            ..result
        };
        self.record(&key, &proof, &confirmed).await?;

        Ok(Some(confirmed))
    }

    /// Check the stored vote of a voter when a session is loaded.
    ///
    /// A stored proof whose nullifier is already spent, with no recorded result, is recorded as
    /// [already used][SubmissionStatus::AlreadyUsed].
    pub async fn check_stored_vote(
        &self,
        key: CredentialKey,
    ) -> Result<Option<SubmissionResult>, SubmissionError> {
        let guard = self.voter_guard(&key).await;
        let _voter_lock = guard.lock_owned().await;

        if let Some(result) = self.credential_store.load_submission_result(&key).await? {
            return Ok(Some(result));
        }
        let Some(proof) = self.credential_store.load_proof(&key).await? else {
            return Ok(None);
        };
        if !self.is_nullifier_used(&proof).await? {
            return Ok(None);
        }

        let result = SubmissionResult::new(None, SubmissionStatus::AlreadyUsed, None)
            .with_details("nullifier of the stored proof already spent");
        self.record(&key, &proof, &result).await?;

        Ok(Some(result))
    }

    async fn is_nullifier_used(&self, proof: &VoteProof) -> Result<bool, SubmissionError> {
        query_nullifier_used_within(
            self.contract_reader.as_ref(),
            proof.nullifier_hash(),
            self.settings.reconciliation_query_timeout,
        )
        .await
        .map_err(SubmissionError::NullifierQuery)
    }

    async fn record(
        &self,
        key: &CredentialKey,
        proof: &VoteProof,
        result: &SubmissionResult,
    ) -> Result<(), SubmissionError> {
        self.credential_store
            .save_submission_result(key, result)
            .await?;
        if let Err(error) = self
            .credential_store
            .mark_nullifier_spent(&proof.nullifier_hash())
            .await
        {
            warn!(self.logger, "Could not record the spent nullifier"; "error" => ?error);
        }
        info!(self.logger, "Submission result recorded"; "voter" => %key, "status" => %result.status);
        self.feedback_sender
            .send_event(VoteEvent::SubmissionCompleted {
                submission_id: VoteEvent::new_submission_id(),
                status: result.status,
            })
            .await;

        Ok(())
    }
}
