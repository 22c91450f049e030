use ark_bn254::Fr;
use light_poseidon::{Poseidon, PoseidonError, PoseidonHasher as _};
use thiserror::Error;

use crate::entities::FieldElement;

/// Error raised when the Poseidon permutation can not be set up or applied.
#[derive(Debug, Error)]
#[error("poseidon hashing failed")]
pub struct PoseidonHashError(#[from] PoseidonError);

/// Poseidon hasher over the BN254 scalar field with the circom parameters.
///
/// It is the only hash of the scheme:
/// * `hash1` derives the public nullifier hash,
/// * `hash2` is the two-input compression of the commitment tree and of the registration leaf.
pub struct PoseidonHasher {
    single: Poseidon<Fr>,
    pair: Poseidon<Fr>,
}

impl PoseidonHasher {
    /// PoseidonHasher factory
    pub fn new() -> Result<Self, PoseidonHashError> {
        Ok(Self {
            single: Poseidon::<Fr>::new_circom(1)?,
            pair: Poseidon::<Fr>::new_circom(2)?,
        })
    }

    /// Hash of a single element.
    pub fn hash1(&mut self, value: &FieldElement) -> Result<FieldElement, PoseidonHashError> {
        Ok(self.single.hash(&[value.inner()])?.into())
    }

    /// Hash of an ordered pair of elements.
    pub fn hash2(
        &mut self,
        left: &FieldElement,
        right: &FieldElement,
    ) -> Result<FieldElement, PoseidonHashError> {
        Ok(self.pair.hash(&[left.inner(), right.inner()])?.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn golden_poseidon_hashes() {
        let mut hasher = PoseidonHasher::new().unwrap();

        assert_eq!(
            "18586133768512220936620570745912940619677854269274689475585506675881198879027",
            hasher.hash1(&FieldElement::from(1)).unwrap().to_string()
        );
        assert_eq!(
            "7853200120776062878684798364095072458815029376092732009249414926327459813530",
            hasher
                .hash2(&FieldElement::from(1), &FieldElement::from(2))
                .unwrap()
                .to_string()
        );
    }

    #[test]
    fn pair_compression_is_order_sensitive() {
        let mut hasher = PoseidonHasher::new().unwrap();
        let (a, b) = (FieldElement::from(3), FieldElement::from(4));

        assert_ne!(hasher.hash2(&a, &b).unwrap(), hasher.hash2(&b, &a).unwrap());
    }
}
