use alloy_primitives::Address;
use anyhow::{anyhow, Context};
use slog::{info, o, Logger};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ballot_common::entities::{
    Commitment, CredentialKey, ErrorKind, SubmissionResult, VoteProof,
};
use ballot_common::logging::LoggerExtensions;
use ballot_common::{StdError, StdResult, DEFAULT_CIRCUIT_DEPTH};

use crate::configuration::Configuration;
use crate::credential_store::{CredentialStore, CredentialStorer};
use crate::feedback::{FeedbackReceiver, FeedbackSender, VoteEvent};
use crate::leaf_source::LeafEventSource;
use crate::proof_service::{ProofService, ProofServiceError};
use crate::prover::{CircuitArtifact, ProvingBackend};
use crate::submission::{
    SponsoredAccountProvider, SponsoredSession, SubmissionError, SubmissionSettings,
    VoteSubmitter,
};
use crate::voting_contract::{JsonRpcVotingContractReader, VotingContractReader};

/// Category of an error returned by a [BallotClient], `Backend` if it is not categorized.
pub fn error_kind(error: &StdError) -> ErrorKind {
    error
        .chain()
        .find_map(|cause| {
            cause
                .downcast_ref::<ProofServiceError>()
                .map(ProofServiceError::kind)
                .or_else(|| {
                    cause
                        .downcast_ref::<SubmissionError>()
                        .map(SubmissionError::kind)
                })
        })
        .unwrap_or(ErrorKind::Backend)
}

/// Voting workflow of the voters of a voting contract: proof generation, vote submission and
/// follow-up of the submitted votes.
///
/// Use the [BallotClientBuilder] to instantiate it easily.
pub struct BallotClient {
    contract_address: Address,
    circuit_depth: usize,
    proof_service: Arc<ProofService>,
    leaf_source: Arc<dyn LeafEventSource>,
    contract_reader: Arc<dyn VotingContractReader>,
    credential_store: Arc<dyn CredentialStorer>,
    submitter: Arc<VoteSubmitter>,
    feedback_sender: FeedbackSender,
    logger: Logger,
}

impl BallotClient {
    /// Key of the credential material of a voter on the contract of this client.
    pub fn credential_key(&self, voter: Address) -> CredentialKey {
        CredentialKey::new(self.contract_address, voter)
    }

    /// Store the commitment of a voter, obtained when the voter registered.
    pub async fn save_commitment(&self, voter: Address, commitment: &Commitment) -> StdResult<()> {
        self.credential_store
            .save_commitment(&self.credential_key(voter), commitment)
            .await
            .with_context(|| format!("Could not save the commitment of voter '{voter}'"))?;

        Ok(())
    }

    /// Generate the vote proof of a voter, or return the one already stored for this voter.
    ///
    /// If no commitment is given the stored one is used. A given commitment is stored if none
    /// was. A stored proof bound to another vote choice is never returned.
    pub async fn generate_proof(
        &self,
        voter: Address,
        commitment: Option<Commitment>,
        vote: Option<bool>,
    ) -> StdResult<VoteProof> {
        let vote = vote.ok_or(ProofServiceError::VoteChoiceMissing)?;
        let key = self.credential_key(voter);

        if let Some(proof) = self
            .credential_store
            .load_proof(&key)
            .await
            .with_context(|| format!("Could not load the stored proof of '{key}'"))?
        {
            if proof.vote_choice() != Some(vote) {
                return Err(ProofServiceError::StoredProofVoteMismatch {
                    voter: key.to_string(),
                    requested: vote,
                }
                .into());
            }
            info!(self.logger, "Stored proof found, no proof generated"; "voter" => %key);
            self.feedback_sender
                .send_event(VoteEvent::StoredProofReused {
                    voter: key.to_string(),
                })
                .await;
            return Ok(proof);
        }

        let commitment = self.resolve_commitment(&key, commitment).await?;
        let voter_status = self
            .contract_reader
            .voter_status(voter)
            .await
            .with_context(|| format!("Could not read the status of voter '{voter}'"))?;
        if !voter_status.can_vote() {
            return Err(ProofServiceError::NotEligible {
                voter: voter.to_string(),
                is_registered_voter: voter_status.is_registered_voter,
                has_registered: voter_status.has_registered,
            }
            .into());
        }

        let tree_settings = self
            .contract_reader
            .tree_settings()
            .await
            .with_context(|| "Could not read the commitment tree settings")?;
        let leaf_records = self
            .leaf_source
            .fetch_leaf_records()
            .await
            .with_context(|| "Could not fetch the registration leaf records")?;
        info!(
            self.logger, "Generating vote proof";
            "voter" => %key, "leaf_count" => leaf_records.len(),
            "contract_tree_depth" => tree_settings.depth, "circuit_depth" => self.circuit_depth
        );
        self.feedback_sender
            .send_event(VoteEvent::ProofGenerationStarted {
                voter: key.to_string(),
                leaf_count: leaf_records.len(),
            })
            .await;

        let proof = self
            .proof_service
            .generate(
                tree_settings,
                vote,
                self.circuit_depth,
                &commitment,
                &leaf_records,
            )
            .await?;
        self.credential_store
            .save_proof(&key, &proof)
            .await
            .with_context(|| format!("Could not save the proof of '{key}'"))?;
        self.feedback_sender
            .send_event(VoteEvent::ProofGenerated {
                voter: key.to_string(),
                nullifier_hash: proof.nullifier_hash().to_string(),
            })
            .await;

        Ok(proof)
    }

    async fn resolve_commitment(
        &self,
        key: &CredentialKey,
        commitment: Option<Commitment>,
    ) -> StdResult<Commitment> {
        let stored = self
            .credential_store
            .load_commitment(key)
            .await
            .with_context(|| format!("Could not load the stored commitment of '{key}'"))?;

        match (commitment, stored) {
            (Some(commitment), None) => {
                self.credential_store
                    .save_commitment(key, &commitment)
                    .await
                    .with_context(|| format!("Could not save the commitment of '{key}'"))?;
                Ok(commitment)
            }
            (Some(commitment), Some(_)) => Ok(commitment),
            (None, Some(stored)) => Ok(stored),
            (None, None) => Err(ProofServiceError::MissingCommitment(key.to_string()).into()),
        }
    }

    /// Submit the stored vote proof of a voter and wait for its terminal result.
    pub async fn submit_vote(&self, voter: Address) -> StdResult<SubmissionResult> {
        let key = self.credential_key(voter);
        let proof = self
            .credential_store
            .load_proof(&key)
            .await
            .map_err(SubmissionError::from)?
            .ok_or(SubmissionError::MissingProof(key))?;

        Ok(self.submitter.submit(key, &proof).await?)
    }

    /// Generate, or reuse, the vote proof of a voter then submit it.
    pub async fn vote(
        &self,
        voter: Address,
        commitment: Option<Commitment>,
        vote: Option<bool>,
    ) -> StdResult<SubmissionResult> {
        self.generate_proof(voter, commitment, vote).await?;

        self.submit_vote(voter).await
    }

    /// Settle again the unconfirmed result of a voter, see [VoteSubmitter::reconcile].
    pub async fn reconcile(&self, voter: Address) -> StdResult<Option<SubmissionResult>> {
        Ok(self.submitter.reconcile(self.credential_key(voter)).await?)
    }

    /// Check the stored vote of a voter when a session is loaded, see
    /// [VoteSubmitter::check_stored_vote].
    pub async fn check_stored_vote(&self, voter: Address) -> StdResult<Option<SubmissionResult>> {
        Ok(self
            .submitter
            .check_stored_vote(self.credential_key(voter))
            .await?)
    }

    /// Recorded submission result of a voter.
    pub async fn submission_result(&self, voter: Address) -> StdResult<Option<SubmissionResult>> {
        let key = self.credential_key(voter);

        self.credential_store
            .load_submission_result(&key)
            .await
            .with_context(|| format!("Could not load the submission result of '{key}'"))
    }
}

/// Builder than can be used to create a [BallotClient] easily or with custom dependencies.
pub struct BallotClientBuilder {
    contract_address: Address,
    rpc_endpoint: Option<String>,
    rpc_timeout: Duration,
    circuit_depth: usize,
    submission_settings: SubmissionSettings,
    data_stores_directory: Option<PathBuf>,
    circuit_artifact_path: Option<PathBuf>,
    circuit_artifact: Option<CircuitArtifact>,
    proving_backend: Option<Arc<dyn ProvingBackend>>,
    account_provider: Option<Arc<dyn SponsoredAccountProvider>>,
    leaf_source: Option<Arc<dyn LeafEventSource>>,
    contract_reader: Option<Arc<dyn VotingContractReader>>,
    credential_store: Option<Arc<dyn CredentialStorer>>,
    logger: Option<Logger>,
    feedback_receivers: Vec<Arc<dyn FeedbackReceiver>>,
}

impl BallotClientBuilder {
    /// Construct a new [BallotClientBuilder] for the given voting contract, without any
    /// dependencies set.
    pub fn new(contract_address: Address) -> Self {
        Self {
            contract_address,
            rpc_endpoint: None,
            rpc_timeout: Duration::from_secs(10),
            circuit_depth: DEFAULT_CIRCUIT_DEPTH,
            submission_settings: SubmissionSettings::default(),
            data_stores_directory: None,
            circuit_artifact_path: None,
            circuit_artifact: None,
            proving_backend: None,
            account_provider: None,
            leaf_source: None,
            contract_reader: None,
            credential_store: None,
            logger: None,
            feedback_receivers: vec![],
        }
    }

    /// Construct a new [BallotClientBuilder] from a [Configuration].
    ///
    /// The contract is read through its json-rpc endpoint and the credentials are stored on
    /// disk, unless other implementations are provided.
    pub fn from_configuration(configuration: &Configuration) -> Self {
        let mut builder = Self::new(configuration.contract_address)
            .with_circuit_depth(configuration.circuit_depth)
            .with_submission_settings(configuration.submission_settings());
        builder.rpc_endpoint = Some(configuration.rpc_endpoint.clone());
        builder.rpc_timeout = configuration.rpc_timeout();
        builder.data_stores_directory = Some(configuration.data_stores_directory.clone());
        builder.circuit_artifact_path = Some(configuration.circuit_artifact_path.clone());

        builder
    }

    /// Returns a [BallotClient] that uses the dependencies provided to the [BallotClientBuilder].
    ///
    /// The proving backend, the sponsored account provider and the leaf event source have no
    /// default implementation and must be provided.
    pub fn build(self) -> StdResult<BallotClient> {
        let logger = match self.logger {
            Some(logger) => logger,
            None => Logger::root(slog::Discard, o!()),
        };
        let feedback_sender = FeedbackSender::new(&self.feedback_receivers);

        let proving_backend = self
            .proving_backend
            .ok_or(anyhow!("No proving backend found: you must provide a ProvingBackend implementation"))?;
        let account_provider = self.account_provider.ok_or(anyhow!(
            "No sponsored account provider found: you must provide a SponsoredAccountProvider implementation"
        ))?;
        let leaf_source = self
            .leaf_source
            .ok_or(anyhow!("No leaf event source found: you must provide a LeafEventSource implementation"))?;

        let circuit = match (self.circuit_artifact, self.circuit_artifact_path) {
            (Some(artifact), _) => artifact,
            (None, Some(path)) => CircuitArtifact::from_file(&path)
                .with_context(|| "Building ballot client failed")?,
            (None, None) => {
                return Err(anyhow!(
                    "No circuit artifact found: you must provide a circuit artifact or its path"
                ))
            }
        };

        let contract_reader: Arc<dyn VotingContractReader> = match self.contract_reader {
            None => {
                let endpoint = self.rpc_endpoint.ok_or(anyhow!(
                    "No rpc endpoint found: \
                    You must either provide a rpc endpoint or your own VotingContractReader implementation"
                ))?;
                Arc::new(
                    JsonRpcVotingContractReader::new(
                        &endpoint,
                        self.contract_address,
                        self.rpc_timeout,
                        logger.clone(),
                    )
                    .with_context(|| "Building voting contract reader failed")?,
                )
            }
            Some(reader) => reader,
        };

        let credential_store: Arc<dyn CredentialStorer> = match self.credential_store {
            None => match self.data_stores_directory {
                Some(directory) => Arc::new(
                    CredentialStore::on_disk(&directory)
                        .with_context(|| "Building credential store failed")?,
                ),
                None => Arc::new(CredentialStore::in_memory()?),
            },
            Some(store) => store,
        };

        let proof_service = Arc::new(ProofService::new(
            proving_backend,
            Arc::new(circuit),
            logger.clone(),
        ));
        let session = Arc::new(SponsoredSession::new(account_provider, logger.clone()));
        let submitter = Arc::new(VoteSubmitter::new(
            session,
            contract_reader.clone(),
            credential_store.clone(),
            feedback_sender.clone(),
            self.submission_settings,
            logger.clone(),
        ));

        Ok(BallotClient {
            contract_address: self.contract_address,
            circuit_depth: self.circuit_depth,
            proof_service,
            leaf_source,
            contract_reader,
            credential_store,
            submitter,
            feedback_sender,
            logger: logger.new_with_component_name::<BallotClient>(),
        })
    }

    /// Set the depth of the commitment tree expected by the vote circuit.
    pub fn with_circuit_depth(mut self, circuit_depth: usize) -> Self {
        self.circuit_depth = circuit_depth;
        self
    }

    /// Set the durations bounding the waits of the vote submissions.
    pub fn with_submission_settings(mut self, settings: SubmissionSettings) -> Self {
        self.submission_settings = settings;
        self
    }

    /// Set the compiled vote circuit.
    pub fn with_circuit_artifact(mut self, circuit_artifact: CircuitArtifact) -> Self {
        self.circuit_artifact = Some(circuit_artifact);
        self
    }

    /// Set the [ProvingBackend] that will be used to prove the vote circuit.
    pub fn with_proving_backend(mut self, proving_backend: Arc<dyn ProvingBackend>) -> Self {
        self.proving_backend = Some(proving_backend);
        self
    }

    /// Set the [SponsoredAccountProvider] that will be used to create the disposable account
    /// submitting the votes.
    pub fn with_sponsored_account_provider(
        mut self,
        account_provider: Arc<dyn SponsoredAccountProvider>,
    ) -> Self {
        self.account_provider = Some(account_provider);
        self
    }

    /// Set the [LeafEventSource] that will be used to fetch the registration leaves.
    pub fn with_leaf_event_source(mut self, leaf_source: Arc<dyn LeafEventSource>) -> Self {
        self.leaf_source = Some(leaf_source);
        self
    }

    /// Set the [VotingContractReader] that will be used to read the state of the contract.
    pub fn with_voting_contract_reader(
        mut self,
        contract_reader: Arc<dyn VotingContractReader>,
    ) -> Self {
        self.contract_reader = Some(contract_reader);
        self
    }

    /// Set the [CredentialStorer] that will be used to store the credential material.
    pub fn with_credential_store(mut self, credential_store: Arc<dyn CredentialStorer>) -> Self {
        self.credential_store = Some(credential_store);
        self
    }

    /// Set the [Logger] to use.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Add a [feedback receiver][FeedbackReceiver] to receive [events][VoteEvent] for the long
    /// running steps of a vote (ie: proof generation or receipt wait).
    pub fn add_feedback_receiver(mut self, receiver: Arc<dyn FeedbackReceiver>) -> Self {
        self.feedback_receivers.push(receiver);
        self
    }
}
