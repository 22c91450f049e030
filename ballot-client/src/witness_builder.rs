//! Assembly of the vote circuit inputs.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ballot_common::crypto_helper::MerkleInclusionProof;
use ballot_common::entities::{Commitment, FieldElement};
use ballot_common::StdError;

/// [WitnessBuilder] related errors.
#[derive(Debug, Error)]
pub enum WitnessBuilderError {
    /// The inclusion proof has more levels than the circuit supports.
    #[error("inclusion proof has {siblings} siblings but the circuit depth is {depth}")]
    ProofTooDeep {
        /// Number of siblings of the raw inclusion proof
        siblings: usize,
        /// Configured circuit depth
        depth: usize,
    },

    /// The nullifier hash could not be computed.
    #[error("could not compute the nullifier hash")]
    NullifierHash(#[source] StdError),
}

/// Inputs of the vote circuit, in the representation expected by the proving backend.
///
/// Field elements are canonical base-10 strings. `siblings` always has exactly as many entries
/// as the circuit depth, whatever the current `depth` of the tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitnessInput {
    /// `Poseidon(nullifier)`
    pub nullifier_hash: String,

    /// Credential nullifier
    pub nullifier: String,

    /// Credential secret
    pub secret: String,

    /// Root the membership is proven against
    pub root: String,

    /// Vote choice
    pub vote: bool,

    /// Depth of the commitment tree, as reported by the voting contract
    pub depth: String,

    /// Leaf position of the commitment
    pub index: String,

    /// Inclusion proof siblings, zero padded
    pub siblings: Vec<String>,
}

/// Builds [WitnessInput] from a commitment and its inclusion proof.
pub struct WitnessBuilder;

impl WitnessBuilder {
    /// Build the witness, padding the siblings with zeros up to `circuit_depth`.
    ///
    /// `tree_depth` is the depth the contract reports for its tree, it becomes the `depth`
    /// public input.
    pub fn build(
        commitment: &Commitment,
        vote: bool,
        tree_depth: u64,
        circuit_depth: usize,
        root: FieldElement,
        inclusion_proof: &MerkleInclusionProof,
    ) -> Result<WitnessInput, WitnessBuilderError> {
        let siblings = Self::pad_siblings(&inclusion_proof.siblings, circuit_depth)?;
        let nullifier_hash = commitment
            .nullifier_hash()
            .map_err(WitnessBuilderError::NullifierHash)?;

        Ok(WitnessInput {
            nullifier_hash: nullifier_hash.to_decimal_string(),
            nullifier: commitment.nullifier.to_decimal_string(),
            secret: commitment.secret.to_decimal_string(),
            root: root.to_decimal_string(),
            vote,
            depth: tree_depth.to_string(),
            index: commitment.index.to_string(),
            siblings: siblings
                .iter()
                .map(FieldElement::to_decimal_string)
                .collect(),
        })
    }

    /// Right pad the siblings with the zero element until they are `depth` long.
    pub fn pad_siblings(
        siblings: &[FieldElement],
        depth: usize,
    ) -> Result<Vec<FieldElement>, WitnessBuilderError> {
        if siblings.len() > depth {
            return Err(WitnessBuilderError::ProofTooDeep {
                siblings: siblings.len(),
                depth,
            });
        }

        let mut padded = siblings.to_vec();
        padded.resize(depth, FieldElement::zero());

        Ok(padded)
    }
}
