//! In-memory record store
//!
//! Backs the engine's test doubles and is handy as a throwaway mirror.
//! Same contract as the file-backed store, minus durability.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::store::{RecordStore, Result, StoreError, validate_record};

#[derive(Default)]
pub struct MemStore {
    records: RwLock<HashMap<String, Value>>,
    serial: RwLock<Option<u64>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all stored records, for inspection in tests.
    pub async fn snapshot(&self) -> HashMap<String, Value> {
        self.records.read().await.clone()
    }
}

#[async_trait]
impl RecordStore for MemStore {
    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.records.read().await.contains_key(name))
    }

    async fn get(&self, name: &str) -> Result<Value> {
        self.records
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn put(&self, name: &str, data: &Value) -> Result<()> {
        validate_record(data)?;
        self.records
            .write()
            .await
            .insert(name.to_string(), data.clone());
        Ok(())
    }

    async fn remove(&self, name: &str) -> Result<()> {
        self.records.write().await.remove(name);
        Ok(())
    }

    async fn get_serial(&self) -> Result<u64> {
        self.serial.read().await.ok_or(StoreError::NoSerial)
    }

    async fn set_serial(&self, serial: u64) -> Result<()> {
        *self.serial.write().await = Some(serial);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_basic_lifecycle() {
        let store = MemStore::new();
        assert!(!store.exists("pkg").await.unwrap());

        store.put("pkg", &json!({"v": 1})).await.unwrap();
        assert!(store.exists("pkg").await.unwrap());
        assert_eq!(store.get("pkg").await.unwrap(), json!({"v": 1}));

        store.put("pkg", &json!({"v": 2})).await.unwrap();
        assert_eq!(store.get("pkg").await.unwrap(), json!({"v": 2}));

        store.remove("pkg").await.unwrap();
        assert!(!store.exists("pkg").await.unwrap());
        store.remove("pkg").await.unwrap();
    }

    #[tokio::test]
    async fn test_rejects_non_mapping() {
        let store = MemStore::new();
        let err = store.put("pkg", &json!("scalar")).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
        assert!(!store.exists("pkg").await.unwrap());
    }

    #[tokio::test]
    async fn test_serial() {
        let store = MemStore::new();
        assert!(matches!(
            store.get_serial().await.unwrap_err(),
            StoreError::NoSerial
        ));
        store.set_serial(0).await.unwrap();
        assert_eq!(store.get_serial().await.unwrap(), 0);
        store.set_serial(99).await.unwrap();
        assert_eq!(store.get_serial().await.unwrap(), 99);
    }
}
