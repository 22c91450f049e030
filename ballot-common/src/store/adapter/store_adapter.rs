use async_trait::async_trait;
use thiserror::Error;

use crate::StdError;

/// [StoreAdapter] related errors
#[derive(Debug, Error)]
pub enum AdapterError {
    /// Error raised when the store initialization fails.
    #[error("problem creating the repository")]
    InitializationError(#[source] StdError),

    /// Error raised when the opening of a IO stream fails.
    #[error("problem opening the IO stream")]
    OpeningStreamError(#[source] StdError),

    /// Error raised when the parsing of a IO stream fails.
    #[error("problem parsing the IO stream")]
    ParsingDataError(#[source] StdError),

    /// Error raised if a writing operation fails.
    #[error("problem writing on the adapter")]
    MutationError(#[source] StdError),
}

/// Keyed persistence of records.
///
/// Records are never deleted: credential material outlives every submission attempt.
#[async_trait]
pub trait StoreAdapter: Sync + Send {
    /// The key type
    type Key;

    /// The record type
    type Record;

    /// Store the given `record`, replacing any previous record of the `key`.
    async fn store_record(
        &mut self,
        key: &Self::Key,
        record: &Self::Record,
    ) -> Result<(), AdapterError>;

    /// Get the record stored using the given `key`.
    async fn get_record(&self, key: &Self::Key) -> Result<Option<Self::Record>, AdapterError>;

    /// Check if a record exist for the given `key`.
    async fn record_exists(&self, key: &Self::Key) -> Result<bool, AdapterError>;
}
