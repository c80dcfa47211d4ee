//! Synchronization engine
//!
//! Orchestrates the three ways a mirror converges on the remote index:
//! incremental update (changelog replay), full download (enumerate
//! everything, then replay), and archive bootstrap (seed import, then
//! replay). Holds no state of its own; all persistent state lives in the
//! bound [`RecordStore`].

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, info};

use crate::archive::{ArchiveError, SeedEntry};
use crate::remote::{RemoteError, RemoteIndexClient};
use crate::store::{RecordStore, StoreError};

/// Result type for sync operations
pub type Result<T> = std::result::Result<T, SyncError>;

/// Errors surfaced by a sync operation.
///
/// The engine never retries: the first store, remote, or archive failure
/// aborts the operation, leaving the store at its last committed entry.
/// Re-invoking the operation resumes from there.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// Stateless orchestrator bound to one store and one remote index.
///
/// Safe to construct fresh per operation as long as it is bound to the
/// same store. Exactly one operation is assumed in flight against a
/// given store at a time.
pub struct SyncEngine<'a, S, C> {
    store: &'a S,
    client: &'a C,
}

impl<'a, S, C> SyncEngine<'a, S, C>
where
    S: RecordStore,
    C: RemoteIndexClient,
{
    pub fn new(store: &'a S, client: &'a C) -> Self {
        Self { store, client }
    }

    /// Incremental catch-up from the store's serial to the remote head.
    ///
    /// Changelog entries are deduplicated per name (highest serial wins)
    /// and applied in ascending serial order, committing the serial after
    /// every entry. A crash between a record write and its serial write
    /// re-processes that one entry on the next call; entries committed
    /// before a failure are never re-fetched.
    pub async fn update(&self) -> Result<()> {
        let since = self.store.get_serial().await?;
        debug!("Fetching changelog since serial {}", since);
        let changelog = self.client.changelog_since(since).await?;

        let mut latest: HashMap<String, u64> = HashMap::new();
        for entry in changelog {
            // A remote that ignores the cutoff must not regress the serial.
            if entry.serial <= since {
                continue;
            }
            latest
                .entry(entry.name)
                .and_modify(|serial| *serial = (*serial).max(entry.serial))
                .or_insert(entry.serial);
        }

        info!("{} record(s) to update", latest.len());
        let mut pending: Vec<(String, u64)> = latest.into_iter().collect();
        pending.sort_by_key(|&(_, serial)| serial);

        for (name, serial) in pending {
            self.apply_remote(&name).await?;
            self.store.set_serial(serial).await?;
        }
        Ok(())
    }

    /// Bootstrap by enumerating every record the index has.
    ///
    /// The head serial is captured before enumeration begins; changes
    /// landing during the (potentially long) scan are deliberately left
    /// to the unconditional trailing [`update`](Self::update), which
    /// replays the changelog from that snapshot.
    pub async fn full_download(&self) -> Result<()> {
        let checkpoint = self.client.latest_serial().await?;

        info!("Listing records");
        let names = self.client.list_all_record_names().await?;
        info!("{} records available", names.len());

        for name in &names {
            self.apply_remote(name).await?;
        }
        self.store.set_serial(checkpoint).await?;

        self.update().await
    }

    /// Bootstrap from a seed archive's entry stream.
    ///
    /// Entries may arrive in any order; the serial marker is stored
    /// verbatim regardless of position. A record whose bytes do not
    /// parse is fatal to the whole bootstrap, since the archive is
    /// assumed internally consistent. Ends with an unconditional
    /// [`update`](Self::update) to catch up to the live remote.
    pub async fn bootstrap_from_archive<I>(&self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = std::result::Result<SeedEntry, ArchiveError>>,
    {
        for entry in entries {
            match entry? {
                SeedEntry::Serial(value) => {
                    debug!("Archive serial is {}", value);
                    self.store.set_serial(value).await?;
                }
                SeedEntry::Record { name, raw } => {
                    let data: Value = serde_json::from_slice(&raw)
                        .map_err(|source| ArchiveError::MalformedRecord {
                            name: name.clone(),
                            source,
                        })?;
                    info!("{}: setting metadata from archive", name);
                    self.store.put(&name, &data).await?;
                }
            }
        }
        self.update().await
    }

    /// Fetch one record's current remote state and mirror it: present
    /// overwrites, reported absence deletes.
    async fn apply_remote(&self, name: &str) -> Result<()> {
        match self.client.fetch_current(name).await? {
            Some(data) => {
                info!("{}: updating metadata", name);
                self.store.put(name, &data).await?;
            }
            None => {
                info!("{}: removing metadata", name);
                self.store.remove(name).await?;
            }
        }
        Ok(())
    }
}
