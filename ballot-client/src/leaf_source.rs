//! Source of the registration leaves of the commitment tree.

use async_trait::async_trait;

use ballot_common::entities::LeafRecord;
use ballot_common::StdResult;

#[cfg(test)]
use mockall::automock;

/// Fetches the registration events of the voting contract as leaf records.
///
/// Records may come in any order, they are sorted by index before use.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait LeafEventSource: Sync + Send {
    /// Fetch all the registration leaf records known at call time.
    async fn fetch_leaf_records(&self) -> StdResult<Vec<LeafRecord>>;
}

/// [LeafEventSource] serving a fixed list of records, ie: loaded from a local event log dump.
pub struct StaticLeafEventSource {
    records: Vec<LeafRecord>,
}

impl StaticLeafEventSource {
    /// StaticLeafEventSource factory
    pub fn new(records: Vec<LeafRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl LeafEventSource for StaticLeafEventSource {
    async fn fetch_leaf_records(&self) -> StdResult<Vec<LeafRecord>> {
        Ok(self.records.clone())
    }
}
