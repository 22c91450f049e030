use serde::{Deserialize, Serialize};
use strum::Display;

/// Category of a failed or non nominal outcome of the voting workflow.
///
/// It tells the caller what can be done next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Missing or invalid input provided by the caller, retrying without changing it is useless.
    Input,

    /// The local view of the commitment tree does not match the contract, the event log must be
    /// fetched again before retrying.
    Consistency,

    /// The proving or the submission infrastructure failed, the whole step may be retried.
    Backend,

    /// The vote may have been recorded but it could not be confirmed, a manual check is advised.
    AmbiguousOutcome,

    /// The nullifier was already spent: the vote of this credential is already recorded.
    AlreadyUsed,
}
