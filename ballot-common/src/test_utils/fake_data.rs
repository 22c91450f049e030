//! Fake data builders for testing.

use alloy_primitives::Address;

use crate::crypto_helper::IncrementalCommitmentTree;
use crate::entities::{
    Commitment, CredentialKey, FieldElement, LeafRecord, PublicInputs, SubmissionResult,
    SubmissionStatus, TreeSettings, VoteProof,
};

/// Fake voting contract address
pub fn contract_address() -> Address {
    Address::repeat_byte(0xc0)
}

/// Fake voter wallet address
pub fn voter_address() -> Address {
    Address::repeat_byte(0x0e)
}

/// Fake CredentialKey
pub fn credential_key() -> CredentialKey {
    CredentialKey::new(contract_address(), voter_address())
}

/// Fake Commitment, its secrets are derived from its index.
pub fn commitment(index: u64) -> Commitment {
    Commitment::new(
        FieldElement::from(1_000_003 + index * 31),
        FieldElement::from(7_000_001 + index * 17),
        index,
    )
}

/// Fake Commitments with contiguous indexes from 0
pub fn commitments(count: u64) -> Vec<Commitment> {
    (0..count).map(commitment).collect()
}

/// Registration leaf records of the given commitments
pub fn leaf_records(commitments: &[Commitment]) -> Vec<LeafRecord> {
    commitments
        .iter()
        .map(|c| LeafRecord::new(c.index, c.leaf().unwrap()))
        .collect()
}

/// Settings of the tree built from the given leaf records
pub fn tree_settings(leaf_records: &[LeafRecord], depth: u64) -> TreeSettings {
    TreeSettings {
        root: IncrementalCommitmentTree::from_leaf_records(leaf_records)
            .unwrap()
            .root(),
        depth,
    }
}

/// Fake VoteProof bound to the given commitment, root and vote
pub fn vote_proof(commitment: &Commitment, root: FieldElement, vote: bool, depth: u64) -> VoteProof {
    VoteProof::new(
        format!("proof-{}-{vote}", commitment.index).into_bytes(),
        PublicInputs {
            nullifier_hash: commitment.nullifier_hash().unwrap(),
            root,
            vote: FieldElement::from_bool(vote),
            depth: FieldElement::from(depth),
        },
    )
}

/// Fake SubmissionResult with the given status
pub fn submission_result(status: SubmissionStatus) -> SubmissionResult {
    SubmissionResult::new(
        Some(format!("0x{}", "ab".repeat(32))),
        status,
        Some(Address::repeat_byte(0x5a)),
    )
}
