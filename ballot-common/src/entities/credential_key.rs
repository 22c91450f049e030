use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Key of every locally stored credential material: a voter on a given voting contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CredentialKey {
    /// Address of the voting contract
    pub contract_address: Address,

    /// Address of the voter wallet
    pub voter_address: Address,
}

impl CredentialKey {
    /// CredentialKey factory
    pub fn new(contract_address: Address, voter_address: Address) -> Self {
        Self {
            contract_address,
            voter_address,
        }
    }
}

impl Display for CredentialKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.contract_address, self.voter_address)
    }
}
