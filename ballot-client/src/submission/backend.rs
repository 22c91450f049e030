use alloy_primitives::{Address, Bytes};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use ballot_common::StdResult;

#[cfg(test)]
use mockall::automock;

/// Handle of a submitted sponsored operation.
///
/// Obtaining a handle only means that the operation was accepted for inclusion, not that it
/// succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationHandle {
    /// Hash of the operation
    pub hash: String,
}

impl OperationHandle {
    /// OperationHandle factory
    pub fn new<T: Into<String>>(hash: T) -> Self {
        Self { hash: hash.into() }
    }
}

impl Display for OperationHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.hash)
    }
}

/// Terminal receipt of a sponsored operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationReceipt {
    /// The operation was included and its call did not revert
    pub success: bool,

    /// Hash of the transaction that included the operation
    pub transaction_hash: Option<String>,

    /// Revert reason or any detail reported with the receipt
    pub details: Option<String>,
}

/// Disposable signing identity able to submit sponsored operations.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SponsoredAccount: Sync + Send {
    /// Address of the smart account that executes the operations.
    fn address(&self) -> Address;

    /// Submit a sponsored call to `target`, returning as soon as the operation is accepted.
    async fn submit(&self, target: Address, call_data: Bytes) -> StdResult<OperationHandle>;

    /// Wait for the terminal receipt of an operation, at most `timeout`.
    async fn wait_for_receipt(
        &self,
        operation: &OperationHandle,
        timeout: Duration,
    ) -> StdResult<OperationReceipt>;
}

/// Creates disposable sponsored accounts.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SponsoredAccountProvider: Sync + Send {
    /// Generate a disposable signing identity and its sponsored execution client.
    async fn provision(&self) -> StdResult<Arc<dyn SponsoredAccount>>;
}
