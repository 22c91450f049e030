use serde::{Deserialize, Serialize};

use crate::entities::FieldElement;

/// A registration event of the authoritative log: the leaf `value` inserted at position `index`.
///
/// The log transport does not guarantee arrival order, the `index` is the only ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeafRecord {
    /// Position of the leaf in the commitment tree
    pub index: u64,

    /// Value of the leaf
    pub value: FieldElement,
}

impl LeafRecord {
    /// LeafRecord factory
    pub fn new(index: u64, value: FieldElement) -> Self {
        Self { index, value }
    }
}
