use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter};
use thiserror::Error;

use crate::crypto_helper::PoseidonHasher;
use crate::entities::{FieldElement, FieldElementError};
use crate::StdResult;

/// [Commitment] parsing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitmentError {
    /// A credential field was not provided.
    #[error("commitment field '{0}' is missing")]
    MissingField(&'static str),

    /// A credential field could not be read as a field element.
    #[error("commitment field '{field}' is invalid")]
    InvalidField {
        /// Name of the invalid field
        field: &'static str,
        /// Parsing error
        #[source]
        source: FieldElementError,
    },

    /// The leaf index is not a non-negative integer.
    #[error("commitment index '{0}' is not a valid leaf position")]
    InvalidIndex(String),
}

/// Private credential of a voter: the secrets bound to its leaf in the registration tree.
///
/// It is created once at registration time and must never be logged: its [Debug] output
/// only reveals the leaf position.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commitment {
    /// Credential secret whose hash is revealed when voting
    pub nullifier: FieldElement,

    /// Credential secret that never leaves the client
    pub secret: FieldElement,

    /// Position of the registration leaf in the commitment tree
    pub index: u64,
}

impl Commitment {
    /// Commitment factory
    pub fn new(nullifier: FieldElement, secret: FieldElement, index: u64) -> Self {
        Self {
            nullifier,
            secret,
            index,
        }
    }

    /// Build a commitment from user provided values, trimming whitespaces.
    pub fn parse(nullifier: &str, secret: &str, index: &str) -> Result<Self, CommitmentError> {
        let nullifier = Self::parse_field("nullifier", nullifier)?;
        let secret = Self::parse_field("secret", secret)?;
        let index = index.trim();
        if index.is_empty() {
            return Err(CommitmentError::MissingField("index"));
        }
        let index = index
            .parse::<u64>()
            .map_err(|_| CommitmentError::InvalidIndex(index.to_string()))?;

        Ok(Self::new(nullifier, secret, index))
    }

    fn parse_field(field: &'static str, value: &str) -> Result<FieldElement, CommitmentError> {
        if value.trim().is_empty() {
            return Err(CommitmentError::MissingField(field));
        }

        FieldElement::parse(value).map_err(|source| CommitmentError::InvalidField { field, source })
    }

    /// Registration leaf value: `Poseidon(nullifier, secret)`.
    pub fn leaf(&self) -> StdResult<FieldElement> {
        Ok(PoseidonHasher::new()?.hash2(&self.nullifier, &self.secret)?)
    }

    /// Public nullifier hash revealed by the vote: `Poseidon(nullifier)`.
    pub fn nullifier_hash(&self) -> StdResult<FieldElement> {
        Ok(PoseidonHasher::new()?.hash1(&self.nullifier)?)
    }
}

impl Debug for Commitment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Commitment")
            .field("nullifier", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("index", &self.index)
            .finish()
    }
}
