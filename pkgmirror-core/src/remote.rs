//! Remote index client abstraction
//!
//! Contract for querying the remote package index: full enumeration,
//! changelog windows, head serial, and per-record current state.
//! Expected absence of a record is a value (`None`), not an error;
//! transport and protocol failures surface as [`RemoteError`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result type for remote index operations
pub type Result<T> = std::result::Result<T, RemoteError>;

/// Errors reported by a remote index client
#[derive(Debug, thiserror::Error)]
pub enum RemoteError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Remote index returned HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Protocol error: {0}")]
    Protocol(String),
}

/// One remote-reported changelog event.
///
/// Only `name` and `serial` drive synchronization; the remaining fields
/// are carried through for logging and inspection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangelogEntry {
    /// Record name the event applies to.
    pub name: String,
    /// Version string reported by the index.
    pub version: String,
    /// Event timestamp (Unix seconds).
    pub timestamp: i64,
    /// Human-readable action, e.g. "new release".
    pub action: String,
    /// Changelog position of this event.
    pub serial: u64,
}

/// Query contract for the remote package index
#[async_trait]
pub trait RemoteIndexClient: Send + Sync {
    /// Enumerate every record name the index currently has.
    ///
    /// Used only by the full-download bootstrap path.
    async fn list_all_record_names(&self) -> Result<Vec<String>>;

    /// All changelog events with `serial > since`.
    ///
    /// The remote guarantees no ordering; callers must sort by serial
    /// before applying.
    async fn changelog_since(&self, since: u64) -> Result<Vec<ChangelogEntry>>;

    /// The current head serial of the remote changelog
    async fn latest_serial(&self) -> Result<u64>;

    /// Fetch the current authoritative document for `name`.
    ///
    /// `None` means the index reports the record does not exist, which
    /// signals deletion to the caller. Any other failure is an error.
    async fn fetch_current(&self, name: &str) -> Result<Option<Value>>;
}
