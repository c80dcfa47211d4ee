//! File-backed record store
//!
//! Layout on disk:
//! ```text
//! {root}/
//!   serial                    — decimal serial (text)
//!   {enc(first_char)}/{enc(name)} — one pretty-printed JSON document per record
//! ```
//! `enc` percent-encodes everything but ASCII alphanumerics and `-`,
//! `_`, `.`, so arbitrary record names map to safe path components.
//! Writes go to a `~tmp` sibling and are renamed into place.

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde_json::Value;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::store::{RecordStore, Result, StoreError, validate_record};

/// Characters escaped in on-disk path components (and URL path segments).
const NAME_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.');

/// Percent-encode a record name into a path-safe component.
pub fn escape_name(name: &str) -> String {
    utf8_percent_encode(name, NAME_ESCAPE).to_string()
}

/// One-file-per-record store rooted at a directory.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Shard directory and encoded file name for a record, or `None`
    /// for the empty name (which no record may have).
    fn locate(&self, name: &str) -> Option<(PathBuf, String)> {
        let first = name.chars().next()?;
        let dir = self.root.join(escape_name(&first.to_string()));
        Some((dir, escape_name(name)))
    }

    fn record_path(&self, name: &str) -> Option<PathBuf> {
        self.locate(name).map(|(dir, file)| dir.join(file))
    }

    fn serial_path(&self) -> PathBuf {
        self.root.join("serial")
    }

    /// Write `contents` durably: tmp sibling, then rename into place.
    ///
    /// Callers build `tmp_name` with a raw `~`, which `escape_name`
    /// always encodes, so it can never collide with a sibling record's
    /// encoded filename.
    fn write_atomic(path: &Path, tmp_name: &str, contents: &str) -> Result<()> {
        let tmp = path.with_file_name(tmp_name);
        fs::write(&tmp, contents)?;
        fs::rename(&tmp, path)?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for FsStore {
    async fn exists(&self, name: &str) -> Result<bool> {
        Ok(self
            .record_path(name)
            .map(|path| path.is_file())
            .unwrap_or(false))
    }

    async fn get(&self, name: &str) -> Result<Value> {
        let path = self
            .record_path(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(name.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text).map_err(|e| {
            StoreError::Serialization(format!("stored record {name:?} is unreadable: {e}"))
        })
    }

    async fn put(&self, name: &str, data: &Value) -> Result<()> {
        validate_record(data)?;
        let (dir, file) = self
            .locate(name)
            .ok_or_else(|| StoreError::InvalidRecord("empty record name".to_string()))?;
        let text = serde_json::to_string_pretty(data)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        fs::create_dir_all(&dir)?;
        Self::write_atomic(&dir.join(&file), &format!("{file}~tmp"), &text)
    }

    async fn remove(&self, name: &str) -> Result<()> {
        let Some(path) = self.record_path(name) else {
            return Ok(());
        };
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_serial(&self) -> Result<u64> {
        let text = match fs::read_to_string(self.serial_path()) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(StoreError::NoSerial),
            Err(e) => return Err(e.into()),
        };
        text.trim()
            .parse::<u64>()
            .map_err(|_| StoreError::InvalidSerial(text.trim().to_string()))
    }

    async fn set_serial(&self, serial: u64) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Self::write_atomic(&self.serial_path(), "serial~tmp", &serial.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());

        let data = json!({"info": {"name": "setuptools"}});
        store.put("setuptools", &data).await.unwrap();

        assert!(store.exists("setuptools").await.unwrap());
        assert_eq!(store.get("setuptools").await.unwrap(), data);
        assert!(tmp.path().join("s").join("setuptools").is_file());
    }

    #[tokio::test]
    async fn test_names_needing_escaping() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());

        for name in ["my/pkg", "a b", "zope.interface", "naïve"] {
            let data = json!({"name": name});
            store.put(name, &data).await.unwrap();
            assert!(store.exists(name).await.unwrap(), "{name} missing");
            assert_eq!(store.get(name).await.unwrap(), data);
        }
        // Slash must not have produced a nested directory.
        assert!(tmp.path().join("m").join("my%2Fpkg").is_file());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        let err = store.get("ghost").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound(name) if name == "ghost"));
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());

        store.remove("never-existed").await.unwrap();

        store.put("gone", &json!({})).await.unwrap();
        store.remove("gone").await.unwrap();
        assert!(!store.exists("gone").await.unwrap());
        store.remove("gone").await.unwrap();
    }

    #[tokio::test]
    async fn test_invalid_record_leaves_prior_data() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());

        let original = json!({"v": 1});
        store.put("pkg", &original).await.unwrap();

        let err = store.put("pkg", &json!([1, 2, 3])).await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord(_)));
        assert_eq!(store.get("pkg").await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_serial_roundtrip_and_reopen() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());

        let err = store.get_serial().await.unwrap_err();
        assert!(matches!(err, StoreError::NoSerial));

        store.set_serial(42).await.unwrap();
        assert_eq!(store.get_serial().await.unwrap(), 42);

        let reopened = FsStore::new(tmp.path());
        assert_eq!(reopened.get_serial().await.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_corrupt_serial_is_invalid() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());
        fs::write(tmp.path().join("serial"), "bogus").unwrap();

        let err = store.get_serial().await.unwrap_err();
        assert!(matches!(err, StoreError::InvalidSerial(text) if text == "bogus"));
    }

    #[tokio::test]
    async fn test_tmp_suffix_sibling_record_survives_put() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());

        // "pkg.tmp" is a legitimate record name; writing "pkg" afterwards
        // must not route its temp file over the sibling's file.
        store.put("pkg.tmp", &json!({"keep": true})).await.unwrap();
        store.put("pkg", &json!({"other": 1})).await.unwrap();

        assert_eq!(store.get("pkg.tmp").await.unwrap(), json!({"keep": true}));
        assert_eq!(store.get("pkg").await.unwrap(), json!({"other": 1}));
    }

    #[tokio::test]
    async fn test_record_named_serial_does_not_clash() {
        let tmp = TempDir::new().unwrap();
        let store = FsStore::new(tmp.path());

        store.set_serial(7).await.unwrap();
        store.put("serial", &json!({"v": 1})).await.unwrap();

        assert_eq!(store.get_serial().await.unwrap(), 7);
        assert_eq!(store.get("serial").await.unwrap(), json!({"v": 1}));
    }
}
