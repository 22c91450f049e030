use serde::{Deserialize, Serialize};

use crate::entities::FieldElement;

/// Authoritative state of the commitment tree as exposed by the voting contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeSettings {
    /// Current root of the commitment tree
    pub root: FieldElement,

    /// Current depth of the commitment tree
    pub depth: u64,
}

/// Registration state of a voter wallet on the voting contract.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterStatus {
    /// The wallet is allowed to take part in the vote
    pub is_registered_voter: bool,

    /// The wallet already inserted its commitment in the tree
    pub has_registered: bool,
}

impl VoterStatus {
    /// Returns `true` if the wallet owns a leaf of the commitment tree and can prove it.
    pub fn can_vote(&self) -> bool {
        self.is_registered_voter && self.has_registered
    }
}
