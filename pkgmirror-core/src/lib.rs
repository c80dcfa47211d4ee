//! PkgMirror Core Library
//!
//! Core functionality for pkgmirror including:
//! - Record store abstraction (file-backed and in-memory implementations)
//! - Remote index client abstraction (changelog, enumeration, record fetch)
//! - Sync engine (incremental update, full download, archive bootstrap)
//! - Seed archive importer (bzip2-compressed tar streams)

pub mod archive;
pub mod engine;
pub mod fs_store;
pub mod mem_store;
pub mod remote;
pub mod store;

pub use archive::{ArchiveError, ArchiveImporter, SeedEntry};
pub use engine::{SyncEngine, SyncError};
pub use fs_store::FsStore;
pub use mem_store::MemStore;
pub use remote::{ChangelogEntry, RemoteError, RemoteIndexClient};
pub use store::{RecordStore, StoreError};
