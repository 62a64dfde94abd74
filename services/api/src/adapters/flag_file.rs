//! services/api/src/adapters/flag_file.rs
//!
//! A JSON-file implementation of the `FlagStore` port. The whole store is a single
//! flat object of string values, rewritten atomically on every change.

use access_core::{FlagKey, FlagStore, PortError, PortResult};
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct FileFlagStore {
    path: PathBuf,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl FileFlagStore {
    /// Creates a store backed by `path`. The file is created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> PortResult<Map<String, Value>> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Map::new()),
            Err(e) => return Err(PortError::Storage(e.to_string())),
        };
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) | Err(_) => {
                warn!("Flag store {:?} is corrupted, treating it as empty.", self.path);
                Ok(Map::new())
            }
        }
    }

    fn save(&self, map: &Map<String, Value>) -> PortResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| PortError::Storage(e.to_string()))?;
        }
        let json = serde_json::to_string_pretty(map)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| PortError::Storage(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| PortError::Storage(e.to_string()))
    }

    fn update<F>(&self, change: F) -> PortResult<()>
    where
        F: FnOnce(&mut Map<String, Value>),
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| PortError::Storage(e.to_string()))?;
        let mut map = self.load()?;
        change(&mut map);
        self.save(&map)
    }
}

//=========================================================================================
// `FlagStore` Trait Implementation
//=========================================================================================

impl FlagStore for FileFlagStore {
    fn get(&self, key: FlagKey) -> PortResult<Option<String>> {
        let map = self.load()?;
        match map.get(key.as_str()) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            // Hand-edited files may carry a bare `true`; keep the textual form.
            Some(other) => Ok(Some(other.to_string())),
        }
    }

    fn set(&self, key: FlagKey, value: &str) -> PortResult<()> {
        self.update(|map| {
            map.insert(key.as_str().to_string(), Value::String(value.to_string()));
        })
    }

    fn remove(&self, key: FlagKey) -> PortResult<()> {
        self.update(|map| {
            map.remove(key.as_str());
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn values_survive_a_new_store_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("flags.json");

        let store = FileFlagStore::new(&path);
        assert_eq!(store.path(), path.as_path());
        assert_eq!(store.get(FlagKey::Onboarded).unwrap(), None);
        store.set(FlagKey::Onboarded, "true").unwrap();
        store
            .set(FlagKey::TrialStart, "2026-02-01T00:00:00.000Z")
            .unwrap();

        let reopened = FileFlagStore::new(&path);
        assert_eq!(
            reopened.get(FlagKey::Onboarded).unwrap().as_deref(),
            Some("true")
        );
        assert_eq!(
            reopened.get(FlagKey::TrialStart).unwrap().as_deref(),
            Some("2026-02-01T00:00:00.000Z")
        );
    }

    #[test]
    fn remove_only_touches_its_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileFlagStore::new(dir.path().join("flags.json"));
        store.set(FlagKey::Onboarded, "true").unwrap();
        store.set(FlagKey::TrialStart, "stamp").unwrap();

        store.remove(FlagKey::Onboarded).unwrap();
        assert_eq!(store.get(FlagKey::Onboarded).unwrap(), None);
        assert_eq!(store.get(FlagKey::TrialStart).unwrap().as_deref(), Some("stamp"));
    }

    #[test]
    fn corrupted_file_reads_as_empty_and_is_repaired_on_write() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");
        fs::write(&path, "{not json").unwrap();

        let store = FileFlagStore::new(&path);
        assert_eq!(store.get(FlagKey::Onboarded).unwrap(), None);

        store.set(FlagKey::Onboarded, "true").unwrap();
        assert_eq!(store.get(FlagKey::Onboarded).unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn non_string_values_keep_their_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");
        fs::write(&path, r#"{"onboarded": true}"#).unwrap();

        let store = FileFlagStore::new(&path);
        assert_eq!(store.get(FlagKey::Onboarded).unwrap().as_deref(), Some("true"));
    }
}
