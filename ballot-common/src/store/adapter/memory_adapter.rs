use anyhow::anyhow;
use async_trait::async_trait;
use std::{collections::HashMap, hash::Hash};

use super::{AdapterError, StoreAdapter};

/// A [StoreAdapter] that store data in memory.
///
/// Records do not survive the process, it is meant for tests and for sessions that must not
/// leave anything on disk.
pub struct MemoryAdapter<K, V> {
    values: HashMap<K, V>,
}

impl<K, V> MemoryAdapter<K, V>
where
    K: Hash + Eq + Send + Sync + Clone,
    V: Send + Sync + Clone,
{
    /// MemoryAdapter factory
    pub fn new(data: Option<Vec<(K, V)>>) -> Result<Self, AdapterError> {
        let mut values = HashMap::new();

        for (key, record) in data.unwrap_or_default() {
            if values.insert(key, record).is_some() {
                return Err(AdapterError::InitializationError(anyhow!(
                    "duplicate key found"
                )));
            }
        }

        Ok(Self { values })
    }
}

#[async_trait]
impl<K, V> StoreAdapter for MemoryAdapter<K, V>
where
    K: Hash + Eq + Send + Sync + Clone,
    V: Send + Sync + Clone,
{
    type Key = K;
    type Record = V;

    async fn store_record(
        &mut self,
        key: &Self::Key,
        record: &Self::Record,
    ) -> Result<(), AdapterError> {
        self.values.insert(key.clone(), record.clone());

        Ok(())
    }

    async fn get_record(&self, key: &Self::Key) -> Result<Option<Self::Record>, AdapterError> {
        Ok(self.values.get(key).cloned())
    }

    async fn record_exists(&self, key: &Self::Key) -> Result<bool, AdapterError> {
        Ok(self.values.contains_key(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_adapter(nb: u64) -> MemoryAdapter<u64, String> {
        let values = (1..=nb).map(|ix| (ix, format!("value {ix}"))).collect();

        MemoryAdapter::new(Some(values)).unwrap()
    }

    #[tokio::test]
    async fn record_exists_existing_key() {
        let adapter = init_adapter(2);

        assert!(adapter.record_exists(&1).await.unwrap());
    }

    #[tokio::test]
    async fn record_exists_non_existing_key() {
        let adapter = init_adapter(2);

        assert!(!adapter.record_exists(&0).await.unwrap());
    }

    #[tokio::test]
    async fn read_existing_record() {
        let adapter = init_adapter(2);
        let record = adapter.get_record(&2).await.unwrap();

        assert_eq!(Some("value 2".to_string()), record);
    }

    #[tokio::test]
    async fn read_unexisting_record() {
        let adapter = init_adapter(2);
        let record = adapter.get_record(&0).await.unwrap();

        assert!(record.is_none());
    }

    #[tokio::test]
    async fn update_value() {
        let mut adapter = init_adapter(2);
        adapter
            .store_record(&1, &"updated".to_string())
            .await
            .unwrap();

        assert_eq!(
            Some("updated".to_string()),
            adapter.get_record(&1).await.unwrap()
        );
    }

    #[test]
    fn init_with_duplicate_keys_fails() {
        let values = vec![(1, "one".to_string()), (1, "uno".to_string())];

        assert!(matches!(
            MemoryAdapter::new(Some(values)),
            Err(AdapterError::InitializationError(_))
        ));
    }
}
