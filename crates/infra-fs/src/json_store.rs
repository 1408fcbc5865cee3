// JSON stores for the block list and the duplicate registry
//
// Both are pretty-printed objects with sorted keys so diffs stay readable.

use crate::atomic::write_atomic;
use jobsieve_core::domain::{BlockList, DuplicateRegistry};
use jobsieve_core::error::{AppError, Result};
use jobsieve_core::port::{BlockListStore, DuplicateRegistryStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

fn load_json<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    if !path.exists() {
        debug!(path = %path.display(), "No file yet, starting empty");
        return Ok(T::default());
    }
    let text = std::fs::read_to_string(path).map_err(|e| AppError::storage(path, e))?;
    if text.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(&text).map_err(|e| AppError::storage(path, e))
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    write_atomic(path, |out| {
        serde_json::to_writer_pretty(&mut *out, value).map_err(|e| e.to_string())?;
        out.write_all(b"\n").map_err(|e| e.to_string())
    })
}

pub struct JsonBlockListStore {
    path: PathBuf,
}

impl JsonBlockListStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl BlockListStore for JsonBlockListStore {
    fn load(&self) -> Result<BlockList> {
        load_json(&self.path)
    }

    fn save(&self, block_list: &BlockList) -> Result<()> {
        save_json(&self.path, block_list)?;
        debug!(path = %self.path.display(), entries = block_list.len(), "Block list written");
        Ok(())
    }
}

pub struct JsonDuplicateRegistryStore {
    path: PathBuf,
}

impl JsonDuplicateRegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DuplicateRegistryStore for JsonDuplicateRegistryStore {
    fn load(&self) -> Result<DuplicateRegistry> {
        load_json(&self.path)
    }

    fn save(&self, registry: &DuplicateRegistry) -> Result<()> {
        save_json(&self.path, registry)?;
        debug!(path = %self.path.display(), entries = registry.len(), "Duplicate registry written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use jobsieve_core::domain::{DuplicateAssociation, JobStatus, MatchType, Record};

    #[test]
    fn test_block_list_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("block_list.json");
        let store = JsonBlockListStore::new(&path);

        let mut rejected = Record::new("z:1", "Dev", "Acme", "z");
        rejected.status = JobStatus::Rejected;
        rejected.post_date = NaiveDate::from_ymd_opt(2024, 2, 3);
        let mut archived = Record::new("a:1", "Ops", "Globex", "a");
        archived.status = JobStatus::Archive;

        let mut block_list = BlockList::new();
        block_list.block(&rejected);
        block_list.block(&archived);
        store.save(&block_list).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.find("\"a:1\"").unwrap() < text.find("\"z:1\"").unwrap());
        assert!(text.contains("\"status\": \"REJECTED\""));
        assert!(text.contains("\"post_date\": \"2024-02-03\""));
        assert_eq!(store.load().unwrap(), block_list);
    }

    #[test]
    fn test_missing_files_load_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(JsonBlockListStore::new(dir.path().join("b.json"))
            .load()
            .unwrap()
            .is_empty());
        assert!(JsonDuplicateRegistryStore::new(dir.path().join("r.json"))
            .load()
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_registry_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDuplicateRegistryStore::new(dir.path().join("registry.json"));
        let mut registry = DuplicateRegistry::new();
        registry.register(&DuplicateAssociation::new("a:1", "b:2", MatchType::ContentMatch));

        store.save(&registry).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.original_of("b:2").unwrap().original_id, "a:1");
    }

    #[test]
    fn test_corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("registry.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = JsonDuplicateRegistryStore::new(&path).load().unwrap_err();
        assert!(matches!(err, AppError::Storage { .. }));
    }
}
