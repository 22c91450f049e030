use thiserror::Error;

use ballot_common::entities::{CredentialKey, ErrorKind, SubmissionStatus};
use ballot_common::StdError;

use crate::credential_store::CredentialStoreError;

/// Errors raised while submitting a vote.
///
/// Terminal on-chain outcomes, including the ambiguous one, are not errors: they are returned
/// as a [SubmissionResult][ballot_common::entities::SubmissionResult].
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// A submission result is already recorded for this voter, the proof must not be sent again.
    #[error("a vote submission is already recorded for '{key}' with status '{status}'")]
    AlreadySubmitted {
        /// Voter identity
        key: CredentialKey,
        /// Status of the recorded submission
        status: SubmissionStatus,
    },

    /// The proof is not a valid vote proof.
    #[error("invalid vote proof: {0}")]
    InvalidProof(String),

    /// No stored proof was found for the voter.
    #[error("no vote proof stored for '{0}'")]
    MissingProof(CredentialKey),

    /// The disposable sponsored account could not be provisioned.
    #[error("sponsored account provisioning failed")]
    AccountProvisioning(#[source] StdError),

    /// The sponsored operation could not be submitted and the vote is not recorded.
    #[error("vote operation submission failed")]
    Submit(#[source] StdError),

    /// The nullifier status could not be queried.
    #[error("nullifier status query failed")]
    NullifierQuery(#[source] StdError),

    /// The credential store failed.
    #[error(transparent)]
    Store(#[from] CredentialStoreError),
}

impl SubmissionError {
    /// Category of the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AlreadySubmitted { status, .. } if status.is_success() => ErrorKind::AlreadyUsed,
            Self::AlreadySubmitted { .. } | Self::InvalidProof(_) | Self::MissingProof(_) => {
                ErrorKind::Input
            }
            Self::AccountProvisioning(_)
            | Self::Submit(_)
            | Self::NullifierQuery(_)
            | Self::Store(_) => ErrorKind::Backend,
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::anyhow;

    use ballot_common::test_utils::fake_data;

    use super::*;

    #[test]
    fn refused_resubmission_of_a_recorded_vote_is_already_used() {
        let error = SubmissionError::AlreadySubmitted {
            key: fake_data::credential_key(),
            status: SubmissionStatus::Confirmed,
        };

        assert_eq!(ErrorKind::AlreadyUsed, error.kind());
    }

    #[test]
    fn refused_resubmission_of_an_unrecorded_vote_is_an_input_error() {
        let error = SubmissionError::AlreadySubmitted {
            key: fake_data::credential_key(),
            status: SubmissionStatus::Unconfirmed,
        };

        assert_eq!(ErrorKind::Input, error.kind());
    }

    #[test]
    fn infrastructure_failures_are_backend_errors() {
        assert_eq!(
            ErrorKind::Backend,
            SubmissionError::Submit(anyhow!("bundler unavailable")).kind()
        );
        assert_eq!(
            ErrorKind::Backend,
            SubmissionError::AccountProvisioning(anyhow!("sponsor refused")).kind()
        );
    }
}
