//! The entities used by, and exchanged between, the proof generation and the vote submission.

mod commitment;
mod credential_key;
mod error_kind;
mod field_element;
mod leaf_record;
mod submission_result;
mod vote_proof;
mod voting_state;

pub use commitment::{Commitment, CommitmentError};
pub use credential_key::CredentialKey;
pub use error_kind::ErrorKind;
pub use field_element::{FieldElement, FieldElementError};
pub use leaf_record::LeafRecord;
pub use submission_result::{SubmissionResult, SubmissionStatus};
pub use vote_proof::{PublicInputs, VoteProof};
pub use voting_state::{TreeSettings, VoterStatus};

/// Address of an account or a contract on the target chain.
pub use alloy_primitives::Address;
