//! Ledger persistence: a JSON object on disk behind the session's
//! key-value store interface.

use scalpdesk_core::session::{KeyValueStore, StoreError};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Key-value store backed by one pretty-printed JSON object file.
///
/// The file is read once on open; every write rewrites it through a sibling
/// temp file and a rename, so readers see either the old or the new object.
/// A missing or corrupt file opens as an empty store.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "ignoring corrupt store file");
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn flush(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.entries).map_err(StoreError::Encode)?;
        let tmp = self.temp_path();
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            StoreError::Io(e)
        })?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn set_many(&mut self, entries: &[(&str, &str)]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.entries.insert(key.to_string(), value.to_string());
        }
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("ledger.json"));
        assert!(store.get("anything").unwrap().is_none());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.json");
        let mut store = JsonFileStore::open(&path);
        store.set("k", "[1,2]").unwrap();
        store.set("other", "3").unwrap();
        store.remove("other").unwrap();

        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get("k").unwrap().as_deref(), Some("[1,2]"));
        assert!(reopened.get("other").unwrap().is_none());
    }

    #[test]
    fn batch_write_lands_whole_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, r#"{"scalpdesk_trades":"[]","scalpdesk_balance":"50000.0"}"#).unwrap();

        let mut store = JsonFileStore::open(&path);
        store
            .set_many(&[("scalpdesk_trades", "[1]"), ("scalpdesk_balance", "49970.0")])
            .unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("ledger.json")]);

        let on_disk: BTreeMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(on_disk["scalpdesk_trades"], "[1]");
        assert_eq!(on_disk["scalpdesk_balance"], "49970.0");
    }

    #[test]
    fn failed_rename_reports_error_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory squatting on the target makes the rename fail.
        let blocked = dir.path().join("ledger.json");
        std::fs::create_dir_all(blocked.join("inner")).unwrap();

        let mut store = JsonFileStore::open(&blocked);
        assert!(store.set("k", "2").is_err());
        assert!(!dir.path().join("ledger.json.tmp").exists());
        assert!(blocked.join("inner").is_dir());
    }

    #[test]
    fn corrupt_file_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        std::fs::write(&path, "{ not json").unwrap();
        let store = JsonFileStore::open(&path);
        assert!(store.get("k").unwrap().is_none());
    }
}
