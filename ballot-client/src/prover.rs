//! Proving backend seam and the circuit artifact it consumes.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

use ballot_common::entities::FieldElement;
use ballot_common::StdResult;

use crate::witness_builder::WitnessInput;

#[cfg(test)]
use mockall::automock;

/// Compiled vote circuit, passed opaquely to the [ProvingBackend].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitArtifact {
    /// Encoded circuit bytecode
    pub bytecode: String,

    /// Circuit interface description
    #[serde(default)]
    pub abi: serde_json::Value,

    /// Version of the compiler that produced the circuit
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noir_version: Option<String>,
}

impl CircuitArtifact {
    /// Load the artifact from its json file.
    pub fn from_file(path: &Path) -> StdResult<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read circuit artifact file: '{}'", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Invalid circuit artifact file: '{}'", path.display()))
    }
}

/// Output of the [ProvingBackend], not yet checked against the witness.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProof {
    /// Opaque proof
    pub proof: Vec<u8>,

    /// Public inputs as reported by the backend
    pub public_inputs: Vec<FieldElement>,
}

/// Zero-knowledge prover of the vote circuit.
///
/// Proving can take several seconds and must not be retried on partial output.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProvingBackend: Sync + Send {
    /// Execute the circuit on the witness and prove it.
    async fn prove(&self, witness: &WitnessInput, circuit: &CircuitArtifact)
        -> StdResult<RawProof>;
}
