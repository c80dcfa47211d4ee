//! Record store abstraction for pkgmirror
//!
//! A record store persists one metadata document per record name plus a
//! single serial counter marking the changelog position the store has
//! fully incorporated.

use async_trait::async_trait;
use serde_json::Value;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    #[error("Serial has not been initialized")]
    NoSerial,

    #[error("Invalid serial: {0}")]
    InvalidSerial(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Persistence contract for metadata records and the serial counter
///
/// Implementations must make `put` and `set_serial` durable before
/// returning. No atomicity is required across calls; the sync engine
/// sequences record writes before the matching serial write so that a
/// crash re-processes an entry rather than skipping it.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Check whether a record exists
    async fn exists(&self, name: &str) -> Result<bool>;

    /// Get a record's document, or `NotFound` if absent
    async fn get(&self, name: &str) -> Result<Value>;

    /// Store a record's document, overwriting any previous one.
    ///
    /// Fails with `InvalidRecord` (leaving prior data untouched) when
    /// `data` is not a JSON object; see [`validate_record`].
    async fn put(&self, name: &str, data: &Value) -> Result<()>;

    /// Delete a record; not an error if the record does not exist
    async fn remove(&self, name: &str) -> Result<()>;

    /// Get the stored serial, or `NoSerial` if never initialized
    async fn get_serial(&self) -> Result<u64>;

    /// Store the serial
    async fn set_serial(&self, serial: u64) -> Result<()>;
}

/// Reject any document that is not a JSON object.
///
/// Called by every store implementation at the top of `put`.
pub fn validate_record(data: &Value) -> Result<()> {
    if data.is_object() {
        Ok(())
    } else {
        Err(StoreError::InvalidRecord(format!(
            "expected a JSON object, got {}: {}",
            json_type_name(data),
            data
        )))
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
