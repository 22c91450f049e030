use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField, Zero};
use num_bigint::BigUint;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// [FieldElement] related errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldElementError {
    /// The value is neither a base-10 nor a `0x` prefixed hexadecimal integer.
    #[error("invalid field element representation: '{0}'")]
    InvalidFormat(String),

    /// The value does not fit in the scalar field.
    #[error("value '{0}' is not lower than the field modulus")]
    OutOfRange(String),
}

/// An element of the BN254 scalar field, the native value type of the vote circuit.
///
/// Its canonical textual form is the base-10 representation of the integer, which is the
/// representation expected by the proving backend.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldElement(Fr);

impl FieldElement {
    /// The zero element, used to pad sibling arrays and to mark lifted tree nodes.
    pub fn zero() -> Self {
        Self(Fr::zero())
    }

    /// Returns `true` if the element is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Element for a boolean flag: `1` for `true`, `0` for `false`.
    pub fn from_bool(value: bool) -> Self {
        Self::from(u64::from(value))
    }

    /// Build an element from an unsigned integer, rejecting values above the field modulus.
    pub fn from_biguint(value: &BigUint) -> Result<Self, FieldElementError> {
        if value >= &Self::modulus() {
            return Err(FieldElementError::OutOfRange(value.to_string()));
        }

        Ok(Self(Fr::from_be_bytes_mod_order(&value.to_bytes_be())))
    }

    /// Integer value of the element.
    pub fn to_biguint(&self) -> BigUint {
        BigUint::from_bytes_be(&self.0.into_bigint().to_bytes_be())
    }

    /// Parse a base-10 integer or a `0x` prefixed hexadecimal integer.
    pub fn parse(value: &str) -> Result<Self, FieldElementError> {
        let trimmed = value.trim();
        let parsed = match trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
        {
            Some(hex_digits) if !hex_digits.is_empty() => {
                BigUint::parse_bytes(hex_digits.as_bytes(), 16)
            }
            Some(_) => None,
            None if !trimmed.is_empty() => BigUint::parse_bytes(trimmed.as_bytes(), 10),
            None => None,
        }
        .ok_or_else(|| FieldElementError::InvalidFormat(value.to_string()))?;

        Self::from_biguint(&parsed)
    }

    /// Big-endian 32 bytes representation, as used for `bytes32` contract arguments.
    pub fn to_bytes32(&self) -> [u8; 32] {
        let bytes = self.0.into_bigint().to_bytes_be();
        let mut result = [0u8; 32];
        result[32 - bytes.len()..].copy_from_slice(&bytes);

        result
    }

    /// Build an element from its big-endian 32 bytes representation.
    pub fn from_bytes32(bytes: &[u8; 32]) -> Result<Self, FieldElementError> {
        Self::from_biguint(&BigUint::from_bytes_be(bytes))
    }

    /// `0x` prefixed, zero padded, 64 characters hexadecimal representation.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes32()))
    }

    /// Canonical base-10 representation.
    pub fn to_decimal_string(&self) -> String {
        self.to_biguint().to_string()
    }

    pub(crate) fn inner(&self) -> Fr {
        self.0
    }

    fn modulus() -> BigUint {
        BigUint::from_bytes_be(&Fr::MODULUS.to_bytes_be())
    }
}

impl From<Fr> for FieldElement {
    fn from(value: Fr) -> Self {
        Self(value)
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self(Fr::from(value))
    }
}

impl FromStr for FieldElement {
    type Err = FieldElementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Display for FieldElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_decimal_string())
    }
}

impl Debug for FieldElement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "FieldElement({})", self.to_decimal_string())
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal_string())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(de::Error::custom)
    }
}
