use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::path::Path;
use thiserror::Error;
use tokio::sync::RwLock;

use ballot_common::entities::{
    Commitment, CredentialKey, FieldElement, SubmissionResult, VoteProof,
};
use ballot_common::store::adapter::{
    AdapterError, JsonFileStoreAdapter, MemoryAdapter, StoreAdapter,
};
use ballot_common::StdResult;

#[cfg(test)]
use mockall::automock;

type Adapter<K, V> = Box<dyn StoreAdapter<Key = K, Record = V>>;

/// [CredentialStorer] related errors.
#[derive(Debug, Error)]
pub enum CredentialStoreError {
    /// The underlying adapter failed.
    #[error("credential store adapter error")]
    AdapterError(#[from] AdapterError),
}

/// Durable storage of the credential material of a voter, keyed by contract and voter.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CredentialStorer: Sync + Send {
    /// Save the commitment of a voter.
    async fn save_commitment(
        &self,
        key: &CredentialKey,
        commitment: &Commitment,
    ) -> Result<(), CredentialStoreError>;

    /// Load the commitment of a voter.
    async fn load_commitment(
        &self,
        key: &CredentialKey,
    ) -> Result<Option<Commitment>, CredentialStoreError>;

    /// Check if a commitment is stored for a voter.
    async fn has_commitment(&self, key: &CredentialKey) -> Result<bool, CredentialStoreError>;

    /// Save the vote proof of a voter.
    async fn save_proof(
        &self,
        key: &CredentialKey,
        proof: &VoteProof,
    ) -> Result<(), CredentialStoreError>;

    /// Load the vote proof of a voter.
    async fn load_proof(
        &self,
        key: &CredentialKey,
    ) -> Result<Option<VoteProof>, CredentialStoreError>;

    /// Check if a vote proof is stored for a voter.
    async fn has_proof(&self, key: &CredentialKey) -> Result<bool, CredentialStoreError>;

    /// Save the submission result of a voter.
    async fn save_submission_result(
        &self,
        key: &CredentialKey,
        result: &SubmissionResult,
    ) -> Result<(), CredentialStoreError>;

    /// Load the submission result of a voter.
    async fn load_submission_result(
        &self,
        key: &CredentialKey,
    ) -> Result<Option<SubmissionResult>, CredentialStoreError>;

    /// Check if a submission result is stored for a voter.
    async fn has_submission_result(
        &self,
        key: &CredentialKey,
    ) -> Result<bool, CredentialStoreError>;

    /// Record that a nullifier hash was spent on-chain.
    async fn mark_nullifier_spent(
        &self,
        nullifier_hash: &FieldElement,
    ) -> Result<(), CredentialStoreError>;

    /// Check if a nullifier hash was recorded as spent.
    async fn is_nullifier_spent(
        &self,
        nullifier_hash: &FieldElement,
    ) -> Result<bool, CredentialStoreError>;
}

/// [CredentialStorer] backed by one [StoreAdapter] per kind of record.
pub struct CredentialStore {
    commitments: RwLock<Adapter<CredentialKey, Commitment>>,
    proofs: RwLock<Adapter<CredentialKey, VoteProof>>,
    submission_results: RwLock<Adapter<CredentialKey, SubmissionResult>>,
    spent_nullifiers: RwLock<Adapter<FieldElement, DateTime<Utc>>>,
}

impl CredentialStore {
    /// CredentialStore factory
    pub fn new(
        commitments: Adapter<CredentialKey, Commitment>,
        proofs: Adapter<CredentialKey, VoteProof>,
        submission_results: Adapter<CredentialKey, SubmissionResult>,
        spent_nullifiers: Adapter<FieldElement, DateTime<Utc>>,
    ) -> Self {
        Self {
            commitments: RwLock::new(commitments),
            proofs: RwLock::new(proofs),
            submission_results: RwLock::new(submission_results),
            spent_nullifiers: RwLock::new(spent_nullifiers),
        }
    }

    /// Store that keeps its records in memory only.
    pub fn in_memory() -> StdResult<Self> {
        Ok(Self::new(
            Box::new(MemoryAdapter::<CredentialKey, Commitment>::new(None)?),
            Box::new(MemoryAdapter::<CredentialKey, VoteProof>::new(None)?),
            Box::new(MemoryAdapter::<CredentialKey, SubmissionResult>::new(None)?),
            Box::new(MemoryAdapter::<FieldElement, DateTime<Utc>>::new(None)?),
        ))
    }

    /// Store that writes its records as json files under the given directory.
    pub fn on_disk(directory: &Path) -> StdResult<Self> {
        Ok(Self::new(
            Self::json_adapter(directory, "commitments")?,
            Self::json_adapter(directory, "proofs")?,
            Self::json_adapter(directory, "submission_results")?,
            Self::json_adapter(directory, "spent_nullifiers")?,
        ))
    }

    fn json_adapter<K, V>(directory: &Path, name: &str) -> StdResult<Adapter<K, V>>
    where
        K: Serialize + DeserializeOwned + Sync + Send + 'static,
        V: Serialize + DeserializeOwned + Sync + Send + 'static,
    {
        let adapter = JsonFileStoreAdapter::<K, V>::new(directory.join(name))
            .with_context(|| format!("Could not create the '{name}' credential store"))?;

        Ok(Box::new(adapter))
    }

    async fn save<K: Sync, V: Sync>(
        adapter: &RwLock<Adapter<K, V>>,
        key: &K,
        record: &V,
    ) -> Result<(), CredentialStoreError> {
        adapter.write().await.store_record(key, record).await?;

        Ok(())
    }

    async fn load<K: Sync, V>(
        adapter: &RwLock<Adapter<K, V>>,
        key: &K,
    ) -> Result<Option<V>, CredentialStoreError> {
        Ok(adapter.read().await.get_record(key).await?)
    }

    async fn exists<K: Sync, V>(
        adapter: &RwLock<Adapter<K, V>>,
        key: &K,
    ) -> Result<bool, CredentialStoreError> {
        Ok(adapter.read().await.record_exists(key).await?)
    }
}

#[async_trait]
impl CredentialStorer for CredentialStore {
    async fn save_commitment(
        &self,
        key: &CredentialKey,
        commitment: &Commitment,
    ) -> Result<(), CredentialStoreError> {
        Self::save(&self.commitments, key, commitment).await
    }

    async fn load_commitment(
        &self,
        key: &CredentialKey,
    ) -> Result<Option<Commitment>, CredentialStoreError> {
        Self::load(&self.commitments, key).await
    }

    async fn has_commitment(&self, key: &CredentialKey) -> Result<bool, CredentialStoreError> {
        Self::exists(&self.commitments, key).await
    }

    async fn save_proof(
        &self,
        key: &CredentialKey,
        proof: &VoteProof,
    ) -> Result<(), CredentialStoreError> {
        Self::save(&self.proofs, key, proof).await
    }

    async fn load_proof(
        &self,
        key: &CredentialKey,
    ) -> Result<Option<VoteProof>, CredentialStoreError> {
        Self::load(&self.proofs, key).await
    }

    async fn has_proof(&self, key: &CredentialKey) -> Result<bool, CredentialStoreError> {
        Self::exists(&self.proofs, key).await
    }

    async fn save_submission_result(
        &self,
        key: &CredentialKey,
        result: &SubmissionResult,
    ) -> Result<(), CredentialStoreError> {
        Self::save(&self.submission_results, key, result).await
    }

    async fn load_submission_result(
        &self,
        key: &CredentialKey,
    ) -> Result<Option<SubmissionResult>, CredentialStoreError> {
        Self::load(&self.submission_results, key).await
    }

    async fn has_submission_result(
        &self,
        key: &CredentialKey,
    ) -> Result<bool, CredentialStoreError> {
        Self::exists(&self.submission_results, key).await
    }

    async fn mark_nullifier_spent(
        &self,
        nullifier_hash: &FieldElement,
    ) -> Result<(), CredentialStoreError> {
        if Self::exists(&self.spent_nullifiers, nullifier_hash).await? {
            return Ok(());
        }

        Self::save(&self.spent_nullifiers, nullifier_hash, &Utc::now()).await
    }

    async fn is_nullifier_spent(
        &self,
        nullifier_hash: &FieldElement,
    ) -> Result<bool, CredentialStoreError> {
        Self::exists(&self.spent_nullifiers, nullifier_hash).await
    }
}

#[cfg(test)]
mod tests {
    use ballot_common::entities::{Address, SubmissionStatus};
    use ballot_common::test_utils::{fake_data, TempDir};

    use super::*;

    #[tokio::test]
    async fn empty_store_has_nothing_for_a_voter() {
        let store = CredentialStore::in_memory().unwrap();
        let key = fake_data::credential_key();

        assert!(!store.has_commitment(&key).await.unwrap());
        assert!(!store.has_proof(&key).await.unwrap());
        assert!(!store.has_submission_result(&key).await.unwrap());
        assert_eq!(None, store.load_proof(&key).await.unwrap());
    }

    #[tokio::test]
    async fn records_are_keyed_by_contract_and_voter() {
        let store = CredentialStore::in_memory().unwrap();
        let key = fake_data::credential_key();
        let other_contract_key =
            CredentialKey::new(Address::repeat_byte(0x99), key.voter_address);
        let commitment = fake_data::commitment(4);

        store.save_commitment(&key, &commitment).await.unwrap();

        assert_eq!(
            Some(commitment),
            store.load_commitment(&key).await.unwrap()
        );
        assert!(!store.has_commitment(&other_contract_key).await.unwrap());
    }

    #[tokio::test]
    async fn save_and_load_each_kind_of_record() {
        let store = CredentialStore::in_memory().unwrap();
        let key = fake_data::credential_key();
        let commitment = fake_data::commitment(1);
        let proof = fake_data::vote_proof(&commitment, FieldElement::from(9), true, 16);
        let result = fake_data::submission_result(SubmissionStatus::Confirmed);

        store.save_proof(&key, &proof).await.unwrap();
        store.save_submission_result(&key, &result).await.unwrap();

        assert!(store.has_proof(&key).await.unwrap());
        assert_eq!(Some(proof), store.load_proof(&key).await.unwrap());
        assert!(store.has_submission_result(&key).await.unwrap());
        assert_eq!(
            Some(result),
            store.load_submission_result(&key).await.unwrap()
        );
    }

    #[tokio::test]
    async fn mark_nullifier_spent_keeps_the_first_date() {
        let store = CredentialStore::in_memory().unwrap();
        let nullifier_hash = fake_data::commitment(0).nullifier_hash().unwrap();

        assert!(!store.is_nullifier_spent(&nullifier_hash).await.unwrap());
        store.mark_nullifier_spent(&nullifier_hash).await.unwrap();
        let first_date = store
            .spent_nullifiers
            .read()
            .await
            .get_record(&nullifier_hash)
            .await
            .unwrap();
        store.mark_nullifier_spent(&nullifier_hash).await.unwrap();

        assert!(store.is_nullifier_spent(&nullifier_hash).await.unwrap());
        assert_eq!(
            first_date,
            store
                .spent_nullifiers
                .read()
                .await
                .get_record(&nullifier_hash)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn on_disk_records_survive_a_new_store() {
        let dir = TempDir::create("credential_store", "on_disk_records_survive_a_new_store");
        let key = fake_data::credential_key();
        let commitment = fake_data::commitment(2);
        let proof = fake_data::vote_proof(&commitment, FieldElement::from(5), false, 16);
        let result = fake_data::submission_result(SubmissionStatus::Unconfirmed)
            .with_details("receipt wait timed out");
        {
            let store = CredentialStore::on_disk(&dir).unwrap();
            store.save_commitment(&key, &commitment).await.unwrap();
            store.save_proof(&key, &proof).await.unwrap();
            store.save_submission_result(&key, &result).await.unwrap();
            store
                .mark_nullifier_spent(&proof.nullifier_hash())
                .await
                .unwrap();
        }

        let store = CredentialStore::on_disk(&dir).unwrap();

        assert_eq!(
            Some(commitment),
            store.load_commitment(&key).await.unwrap()
        );
        assert_eq!(Some(proof.clone()), store.load_proof(&key).await.unwrap());
        assert_eq!(
            Some(result),
            store.load_submission_result(&key).await.unwrap()
        );
        assert!(store
            .is_nullifier_spent(&proof.nullifier_hash())
            .await
            .unwrap());
    }
}
