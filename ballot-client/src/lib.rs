#![warn(missing_docs)]

//! Client side of an anonymous on-chain ballot.
//!
//! A voter proves, without revealing which registration is theirs, that it owns a leaf of the
//! commitment tree of the voting contract, then submits this proof through a disposable
//! sponsored account.
//!
//! Use the [BallotClientBuilder] to get a [BallotClient], it wires:
//! - the [ProofService] that rebuilds the commitment tree from the registration leaves, checks
//!   it against the contract root and proves the vote with a [ProvingBackend],
//! - the [VoteSubmitter] that runs a [VoteSubmissionStateMachine] per submission,
//! - the [CredentialStorer] that keeps the commitment, the proof and the submission result of
//!   each voter.

mod client;
pub mod configuration;
pub mod credential_store;
pub mod feedback;
pub mod leaf_source;
pub mod proof_service;
pub mod prover;
pub mod submission;
pub mod voting_contract;
pub mod witness_builder;

pub use client::{error_kind, BallotClient, BallotClientBuilder};
pub use configuration::{Configuration, DefaultConfiguration};
pub use credential_store::{CredentialStore, CredentialStoreError, CredentialStorer};
pub use leaf_source::{LeafEventSource, StaticLeafEventSource};
pub use proof_service::{ProofService, ProofServiceError};
pub use prover::{CircuitArtifact, ProvingBackend, RawProof};
pub use submission::{
    OperationHandle, OperationReceipt, SponsoredAccount, SponsoredAccountProvider,
    SubmissionError, SubmissionSettings, SubmissionState, VoteSubmissionStateMachine,
    VoteSubmitter,
};
pub use voting_contract::{JsonRpcVotingContractReader, VoteCallEncoder, VotingContractReader};
pub use witness_builder::{WitnessBuilder, WitnessInput};
