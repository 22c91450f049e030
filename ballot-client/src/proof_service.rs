//! Generation of the vote proofs.
//!
//! The commitment tree is rebuilt from the registration leaf log and checked against the
//! root published by the voting contract before the proving backend is called.

use anyhow::anyhow;
use slog::{debug, info, warn, Logger};
use std::sync::Arc;
use thiserror::Error;

use ballot_common::crypto_helper::{CommitmentTreeError, IncrementalCommitmentTree};
use ballot_common::entities::{
    Commitment, ErrorKind, FieldElement, LeafRecord, PublicInputs, TreeSettings, VoteProof,
};
use ballot_common::logging::LoggerExtensions;
use ballot_common::StdError;

use crate::prover::{CircuitArtifact, ProvingBackend};
use crate::witness_builder::{WitnessBuilder, WitnessBuilderError};

/// [ProofService] related errors.
#[derive(Debug, Error)]
pub enum ProofServiceError {
    /// No vote choice was selected.
    #[error("a vote choice must be selected before generating a proof")]
    VoteChoiceMissing,

    /// No commitment was provided nor stored for the voter.
    #[error("no commitment available for voter '{0}'")]
    MissingCommitment(String),

    /// A proof is already stored for the voter, bound to another vote choice.
    #[error("the stored proof of voter '{voter}' is bound to another vote choice than '{requested}'")]
    StoredProofVoteMismatch {
        /// Voter identity, as `contract/voter`
        voter: String,
        /// Requested vote choice
        requested: bool,
    },

    /// The voter is not allowed to vote or did not register its commitment.
    #[error("voter '{voter}' is not eligible: registered voter: {is_registered_voter}, commitment registered: {has_registered}")]
    NotEligible {
        /// Voter address
        voter: String,
        /// The voter is on the allow list
        is_registered_voter: bool,
        /// The voter registered its commitment
        has_registered: bool,
    },

    /// The registration leaf log is incomplete or corrupted.
    #[error("invalid registration leaf log")]
    InvalidLeafLog(#[source] CommitmentTreeError),

    /// The tree rebuilt from the leaf log does not match the contract root.
    #[error("tree mismatch: local root '{local}' differs from contract root '{remote}', found {leaf_count} leaves")]
    RootMismatch {
        /// Root of the locally rebuilt tree
        local: FieldElement,
        /// Authoritative root
        remote: FieldElement,
        /// Number of leaves used to rebuild the tree
        leaf_count: usize,
    },

    /// The commitment index is beyond the registered leaves.
    #[error("commitment index {index} is out of range, the tree has {leaf_count} leaves")]
    IndexOutOfRange {
        /// Commitment index
        index: u64,
        /// Number of leaves in the tree
        leaf_count: usize,
    },

    /// The leaf at the commitment index is not the leaf of the commitment.
    #[error("commitment does not match the registered leaf at index {index}")]
    CommitmentNotInTree {
        /// Commitment index
        index: u64,
    },

    /// The witness could not be built.
    #[error(transparent)]
    Witness(#[from] WitnessBuilderError),

    /// Hashing failed.
    #[error("hashing failed")]
    Hashing(#[source] StdError),

    /// The proving backend failed.
    #[error("proving backend failed")]
    ProvingBackend(#[source] StdError),

    /// The proving backend returned public inputs that are not bound to the witness.
    #[error("proving backend returned unexpected public inputs: expected {expected:?}, got {got:?}")]
    UnexpectedPublicInputs {
        /// Public inputs derived from the witness
        expected: Vec<FieldElement>,
        /// Public inputs returned by the backend
        got: Vec<FieldElement>,
    },
}

impl ProofServiceError {
    /// Category of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::VoteChoiceMissing
            | Self::MissingCommitment(_)
            | Self::StoredProofVoteMismatch { .. }
            | Self::NotEligible { .. }
            | Self::IndexOutOfRange { .. }
            | Self::CommitmentNotInTree { .. }
            | Self::Witness(WitnessBuilderError::ProofTooDeep { .. }) => ErrorKind::Input,
            Self::InvalidLeafLog(_) | Self::RootMismatch { .. } => ErrorKind::Consistency,
            Self::Witness(WitnessBuilderError::NullifierHash(_))
            | Self::Hashing(_)
            | Self::ProvingBackend(_)
            | Self::UnexpectedPublicInputs { .. } => ErrorKind::Backend,
        }
    }
}

/// Generates vote proofs against the authoritative state of the commitment tree.
///
/// It holds no state across calls: the tree is rebuilt from the leaf log every time.
pub struct ProofService {
    prover: Arc<dyn ProvingBackend>,
    circuit: Arc<CircuitArtifact>,
    logger: Logger,
}

impl ProofService {
    /// ProofService factory
    pub fn new(
        prover: Arc<dyn ProvingBackend>,
        circuit: Arc<CircuitArtifact>,
        logger: Logger,
    ) -> Self {
        Self {
            prover,
            circuit,
            logger: logger.new_with_component_name::<Self>(),
        }
    }

    /// Generate the proof that the commitment is a member of the tree described by the
    /// contract `tree_settings` and that its owner votes `vote`.
    ///
    /// The `depth` public input is the depth reported by the contract, the siblings are padded
    /// to `circuit_depth`. The prover is never invoked if the tree rebuilt from `leaf_records`
    /// does not have the authoritative root.
    pub async fn generate(
        &self,
        tree_settings: TreeSettings,
        vote: bool,
        circuit_depth: usize,
        commitment: &Commitment,
        leaf_records: &[LeafRecord],
    ) -> Result<VoteProof, ProofServiceError> {
        let authoritative_root = tree_settings.root;
        let tree =
            IncrementalCommitmentTree::from_leaf_records(leaf_records).map_err(|e| match e {
                CommitmentTreeError::Hash(_) => ProofServiceError::Hashing(anyhow!(e)),
                _ => ProofServiceError::InvalidLeafLog(e),
            })?;

        let local_root = tree.root();
        if local_root != authoritative_root {
            warn!(
                self.logger, "Root mismatch, the leaf log is stale or incomplete";
                "local_root" => %local_root, "remote_root" => %authoritative_root,
                "leaf_count" => tree.leaf_count()
            );
            return Err(ProofServiceError::RootMismatch {
                local: local_root,
                remote: authoritative_root,
                leaf_count: tree.leaf_count(),
            });
        }

        let inclusion_proof =
            tree.prove_inclusion(commitment.index)
                .map_err(|e| match e {
                    CommitmentTreeError::IndexOutOfRange { index, leaf_count } => {
                        ProofServiceError::IndexOutOfRange { index, leaf_count }
                    }
                    _ => ProofServiceError::Hashing(anyhow!(e)),
                })?;
        if inclusion_proof.leaf != commitment.leaf().map_err(ProofServiceError::Hashing)? {
            return Err(ProofServiceError::CommitmentNotInTree {
                index: commitment.index,
            });
        }

        let witness = WitnessBuilder::build(
            commitment,
            vote,
            tree_settings.depth,
            circuit_depth,
            authoritative_root,
            &inclusion_proof,
        )?;
        let expected_public_inputs = PublicInputs {
            nullifier_hash: commitment
                .nullifier_hash()
                .map_err(ProofServiceError::Hashing)?,
            root: authoritative_root,
            vote: FieldElement::from_bool(vote),
            depth: FieldElement::from(tree_settings.depth),
        };

        info!(
            self.logger, "Generating vote proof";
            "leaf_count" => tree.leaf_count(), "tree_depth" => tree_settings.depth,
            "circuit_depth" => circuit_depth
        );
        let raw_proof = self
            .prover
            .prove(&witness, &self.circuit)
            .await
            .map_err(ProofServiceError::ProvingBackend)?;
        debug!(self.logger, "Proof generated"; "proof_size" => raw_proof.proof.len());

        if raw_proof.public_inputs != expected_public_inputs.to_array() {
            return Err(ProofServiceError::UnexpectedPublicInputs {
                expected: expected_public_inputs.to_array().to_vec(),
                got: raw_proof.public_inputs,
            });
        }

        Ok(VoteProof::new(raw_proof.proof, expected_public_inputs))
    }
}
