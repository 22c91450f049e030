use std::{
    fs,
    marker::PhantomData,
    path::{Path, PathBuf},
};

use anyhow::Context;
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};

use super::{AdapterError, StoreAdapter};

/// A [StoreAdapter] storing data on disk serialized as json.
///
/// Each record is written as a `<hash>.json` file next to a `<hash>.key` file holding the
/// serialized key, where `<hash>` is the sha256 of the json serialized key.
#[derive(Debug)]
pub struct JsonFileStoreAdapter<K, V> {
    dirpath: PathBuf,
    key: PhantomData<K>,
    value: PhantomData<V>,
}

impl<K, V> JsonFileStoreAdapter<K, V>
where
    K: Serialize + DeserializeOwned,
    V: Serialize + DeserializeOwned,
{
    /// JsonFileStoreAdapter factory
    pub fn new(dirpath: PathBuf) -> Result<Self, AdapterError> {
        if !dirpath.exists() {
            fs::create_dir_all(&dirpath)
                .with_context(|| format!("could not create store directory {dirpath:?}"))
                .map_err(AdapterError::InitializationError)?;
        }

        Ok(Self {
            dirpath,
            key: PhantomData,
            value: PhantomData,
        })
    }

    fn get_hash_from_key(&self, key: &K) -> Result<String, AdapterError> {
        let serialized_key = serde_json::to_vec(key)
            .with_context(|| "could not serialize the store key")
            .map_err(AdapterError::MutationError)?;

        Ok(hex::encode(Sha256::digest(serialized_key)))
    }

    fn get_filename_from_key(&self, key: &K) -> Result<PathBuf, AdapterError> {
        let hash = self.get_hash_from_key(key)?;

        Ok(self.dirpath.join(format!("{hash}.json")))
    }

    // The content is written to a temporary file first so that an interrupted write never
    // leaves a truncated record behind.
    fn write_file(&self, filepath: &Path, content: &str) -> Result<(), AdapterError> {
        let temporary_filepath = filepath.with_extension("tmp");
        fs::write(&temporary_filepath, content)
            .and_then(|_| fs::rename(&temporary_filepath, filepath))
            .with_context(|| format!("could not write file {filepath:?}"))
            .map_err(AdapterError::MutationError)
    }

    fn to_json<T: Serialize>(value: &T) -> Result<String, AdapterError> {
        serde_json::to_string(value)
            .with_context(|| "could not serialize the record")
            .map_err(AdapterError::MutationError)
    }
}

#[async_trait]
impl<K, V> StoreAdapter for JsonFileStoreAdapter<K, V>
where
    K: Serialize + DeserializeOwned + Sync + Send,
    V: Serialize + DeserializeOwned + Sync + Send,
{
    type Key = K;
    type Record = V;

    async fn store_record(
        &mut self,
        key: &Self::Key,
        record: &Self::Record,
    ) -> Result<(), AdapterError> {
        let hash = self.get_hash_from_key(key)?;
        let key_filepath = self.dirpath.join(format!("{hash}.key"));
        if !key_filepath.is_file() {
            self.write_file(&key_filepath, &Self::to_json(key)?)?;
        }

        self.write_file(
            &self.dirpath.join(format!("{hash}.json")),
            &Self::to_json(record)?,
        )
    }

    async fn get_record(&self, key: &Self::Key) -> Result<Option<Self::Record>, AdapterError> {
        if !self.record_exists(key).await? {
            return Ok(None);
        }
        let filepath = self.get_filename_from_key(key)?;
        let value = fs::read_to_string(&filepath)
            .with_context(|| format!("could not read file {filepath:?}"))
            .map_err(AdapterError::OpeningStreamError)?;
        let record: V = serde_json::from_str(&value)
            .with_context(|| format!("could not parse file {filepath:?}"))
            .map_err(AdapterError::ParsingDataError)?;

        Ok(Some(record))
    }

    async fn record_exists(&self, key: &Self::Key) -> Result<bool, AdapterError> {
        Ok(self.get_filename_from_key(key)?.is_file())
    }

}

#[cfg(test)]
mod tests {
    use crate::test_utils::TempDir;

    use super::*;

    fn get_adapter(dir: &Path) -> JsonFileStoreAdapter<u64, String> {
        JsonFileStoreAdapter::new(dir.to_path_buf()).unwrap()
    }

    async fn init_adapter(dir: &Path) -> JsonFileStoreAdapter<u64, String> {
        let mut adapter = get_adapter(dir);
        for (idx, msg) in [(1, "one"), (2, "two"), (3, "three")] {
            adapter.store_record(&idx, &msg.to_string()).await.unwrap();
        }

        adapter
    }

    #[tokio::test]
    async fn create_the_store_directory_if_missing() {
        let dir = TempDir::new("jsonfile_store_adapter", "create_the_store_directory_if_missing")
            .build_path()
            .join("nested");
        let _adapter = get_adapter(&dir);

        assert!(dir.is_dir());
    }

    #[tokio::test]
    async fn check_file_exists() {
        let dir = TempDir::create("jsonfile_store_adapter", "check_file_exists");
        let adapter = init_adapter(&dir).await;

        assert!(adapter.record_exists(&1).await.unwrap());
        assert!(!adapter.record_exists(&4).await.unwrap());
    }

    #[tokio::test]
    async fn check_get_record() {
        let dir = TempDir::create("jsonfile_store_adapter", "check_get_record");
        let adapter = init_adapter(&dir).await;

        assert_eq!(Some("one".to_string()), adapter.get_record(&1).await.unwrap());
        assert_eq!(None, adapter.get_record(&4).await.unwrap());
    }

    #[tokio::test]
    async fn check_update_record() {
        let dir = TempDir::create("jsonfile_store_adapter", "check_update_record");
        let mut adapter = init_adapter(&dir).await;

        adapter
            .store_record(&1, &"just one".to_string())
            .await
            .unwrap();

        assert_eq!(
            Some("just one".to_string()),
            adapter.get_record(&1).await.unwrap()
        );
    }

    #[tokio::test]
    async fn records_survive_a_new_adapter_on_the_same_directory() {
        let dir = TempDir::create(
            "jsonfile_store_adapter",
            "records_survive_a_new_adapter_on_the_same_directory",
        );
        init_adapter(&dir).await;

        let adapter = get_adapter(&dir);

        assert_eq!(
            Some("three".to_string()),
            adapter.get_record(&3).await.unwrap()
        );
    }

    #[tokio::test]
    async fn no_temporary_file_is_left_after_a_write() {
        let dir = TempDir::create(
            "jsonfile_store_adapter",
            "no_temporary_file_is_left_after_a_write",
        );
        init_adapter(&dir).await;

        let leftovers: Vec<_> = fs::read_dir(&dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();

        assert!(leftovers.is_empty(), "temporary files left: {leftovers:?}");
    }

    #[tokio::test]
    async fn corrupted_record_raises_a_parsing_error() {
        let dir = TempDir::create(
            "jsonfile_store_adapter",
            "corrupted_record_raises_a_parsing_error",
        );
        let adapter = init_adapter(&dir).await;
        fs::write(adapter.get_filename_from_key(&2).unwrap(), "{not json").unwrap();

        assert!(matches!(
            adapter.get_record(&2).await,
            Err(AdapterError::ParsingDataError(_))
        ));
    }
}
