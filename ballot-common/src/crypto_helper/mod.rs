//! Tools to work with the fixed cryptographic scheme of the vote circuit.

mod commitment_tree;
mod poseidon;

pub use commitment_tree::{CommitmentTreeError, IncrementalCommitmentTree, MerkleInclusionProof};
pub use poseidon::{PoseidonHashError, PoseidonHasher};
