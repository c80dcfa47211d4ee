//! Seed archive importer
//!
//! Decodes a bzip2-compressed tar stream into the entry sequence consumed
//! by the sync engine's bootstrap path. The archive holds one file per
//! record (leaf name percent-encoded) plus a distinguished `serial` entry
//! carrying the changelog position the archive was produced at.
//!
//! Purely a stream-to-sequence transform: single pass, lazy, no
//! persistence or network responsibility.

use bzip2::read::BzDecoder;
use percent_encoding::percent_decode_str;
use std::io::Read;
use std::path::Path;

/// Archive entry name of the serial marker.
const SERIAL_ENTRY: &str = "serial";

/// Result type for archive operations
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Errors that can occur while decoding a seed archive
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed serial entry: {0:?}")]
    MalformedSerial(String),

    #[error("Malformed record document for {name}: {source}")]
    MalformedRecord {
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Undecodable archive entry name: {0}")]
    BadEntryName(String),
}

/// One decoded seed entry
#[derive(Debug, Clone, PartialEq)]
pub enum SeedEntry {
    /// The archive's known changelog position.
    Serial(u64),
    /// One record's raw document bytes (parsed later by the engine).
    Record { name: String, raw: Vec<u8> },
}

/// Streaming importer over a bzip2-compressed tar archive
pub struct ArchiveImporter<R: Read> {
    archive: tar::Archive<BzDecoder<R>>,
}

impl<R: Read> ArchiveImporter<R> {
    /// Wrap a raw (still compressed) archive stream.
    pub fn new(reader: R) -> Self {
        Self {
            archive: tar::Archive::new(BzDecoder::new(reader)),
        }
    }

    /// Iterate the archive's seed entries.
    ///
    /// Non-regular-file entries (directories, links) are skipped. The
    /// iterator is single-pass over the underlying stream and cannot be
    /// restarted.
    pub fn entries(&mut self) -> Result<impl Iterator<Item = Result<SeedEntry>> + '_> {
        let entries = self.archive.entries()?;
        Ok(entries.filter_map(|entry| match entry {
            Err(e) => Some(Err(ArchiveError::Io(e))),
            Ok(mut entry) => match decode_entry(&mut entry) {
                Ok(Some(seed)) => Some(Ok(seed)),
                Ok(None) => None,
                Err(e) => Some(Err(e)),
            },
        }))
    }
}

fn decode_entry<R: Read>(entry: &mut tar::Entry<'_, BzDecoder<R>>) -> Result<Option<SeedEntry>> {
    if !entry.header().entry_type().is_file() {
        return Ok(None);
    }

    let path = entry.path()?.into_owned();
    if path == Path::new(SERIAL_ENTRY) {
        let mut text = String::new();
        entry.read_to_string(&mut text)?;
        let value = text
            .trim()
            .parse::<u64>()
            .map_err(|_| ArchiveError::MalformedSerial(text.trim().to_string()))?;
        return Ok(Some(SeedEntry::Serial(value)));
    }

    // Record name is the percent-decoded leaf component of the entry path.
    let leaf = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| ArchiveError::BadEntryName(path.display().to_string()))?;
    let name = percent_decode_str(leaf)
        .decode_utf8()
        .map_err(|_| ArchiveError::BadEntryName(leaf.to_string()))?
        .into_owned();

    let mut raw = Vec::new();
    entry.read_to_end(&mut raw)?;
    Ok(Some(SeedEntry::Record { name, raw }))
}
