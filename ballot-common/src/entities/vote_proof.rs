use serde::{Deserialize, Serialize};

use crate::entities::FieldElement;

/// Public inputs of the vote circuit.
///
/// Their order is part of the contract interface: `[nullifier_hash, root, vote, depth]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[FieldElement; 4]", into = "[FieldElement; 4]")]
pub struct PublicInputs {
    /// Hash of the credential nullifier
    pub nullifier_hash: FieldElement,

    /// Root of the commitment tree the membership is proven against
    pub root: FieldElement,

    /// Vote flag, `1` for yes and `0` for no
    pub vote: FieldElement,

    /// Depth used by the circuit
    pub depth: FieldElement,
}

impl PublicInputs {
    /// Number of public inputs of the vote circuit.
    pub const COUNT: usize = 4;

    /// Public inputs in the order expected by the contract.
    pub fn to_array(&self) -> [FieldElement; Self::COUNT] {
        [self.nullifier_hash, self.root, self.vote, self.depth]
    }
}

impl From<[FieldElement; 4]> for PublicInputs {
    fn from([nullifier_hash, root, vote, depth]: [FieldElement; 4]) -> Self {
        Self {
            nullifier_hash,
            root,
            vote,
            depth,
        }
    }
}

impl From<PublicInputs> for [FieldElement; 4] {
    fn from(value: PublicInputs) -> Self {
        value.to_array()
    }
}

/// Zero-knowledge proof of membership and nullifier knowledge, ready to be submitted.
///
/// Produced once per commitment and vote, it must not be reused after its nullifier has been
/// marked as used by the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteProof {
    /// Opaque proof produced by the proving backend, passed unmodified to the contract
    #[serde(with = "hex_bytes")]
    pub proof_bytes: Vec<u8>,

    /// Public inputs bound to the proof
    pub public_inputs: PublicInputs,
}

impl VoteProof {
    /// VoteProof factory
    pub fn new(proof_bytes: Vec<u8>, public_inputs: PublicInputs) -> Self {
        Self {
            proof_bytes,
            public_inputs,
        }
    }

    /// Hash of the nullifier that this proof spends.
    pub fn nullifier_hash(&self) -> FieldElement {
        self.public_inputs.nullifier_hash
    }

    /// Vote choice bound to the proof, `None` if the flag is neither `0` nor `1`.
    pub fn vote_choice(&self) -> Option<bool> {
        match self.public_inputs.vote {
            flag if flag == FieldElement::from_bool(true) => Some(true),
            flag if flag.is_zero() => Some(false),
            _ => None,
        }
    }
}

mod hex_bytes {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let value = String::deserialize(deserializer)?;
        let digits = value.strip_prefix("0x").unwrap_or(&value);

        hex::decode(digits).map_err(de::Error::custom)
    }
}
