// Bincode ScrapeCache Implementation
// One snapshot file per run date: <folder>/<YYYY-MM-DD>.bin

use crate::atomic::write_atomic;
use chrono::NaiveDate;
use jobsieve_core::domain::{Record, RecordSet};
use jobsieve_core::error::{AppError, Result};
use jobsieve_core::port::ScrapeCache;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, warn};

const SNAPSHOT_VERSION: u32 = 1;
const SNAPSHOT_EXTENSION: &str = "bin";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    run_date: NaiveDate,
    records: Vec<Record>,
}

pub struct BincodeScrapeCache {
    folder: PathBuf,
}

impl BincodeScrapeCache {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    fn read(&self, run_date: NaiveDate) -> Result<RecordSet> {
        let path = self.location(run_date);
        let bytes = std::fs::read(&path).map_err(|e| AppError::storage(&path, e))?;
        let (snapshot, _): (Snapshot, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                .map_err(|e| AppError::storage(&path, e))?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(AppError::storage(
                &path,
                format!("unsupported snapshot version {}", snapshot.version),
            ));
        }
        Ok(snapshot
            .records
            .into_iter()
            .map(|r| (r.key_id.clone(), r))
            .collect())
    }
}

impl ScrapeCache for BincodeScrapeCache {
    fn save(&self, run_date: NaiveDate, records: &RecordSet) -> Result<()> {
        let path = self.location(run_date);
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            run_date,
            records: records.values().cloned().collect(),
        };
        let bytes = bincode::serde::encode_to_vec(&snapshot, bincode::config::standard())
            .map_err(|e| AppError::storage(&path, e))?;
        write_atomic(&path, |out| out.write_all(&bytes).map_err(|e| e.to_string()))?;
        debug!(path = %path.display(), records = records.len(), "Scrape cache snapshot written");
        Ok(())
    }

    fn load(&self, run_date: NaiveDate) -> Result<Option<RecordSet>> {
        if !self.location(run_date).exists() {
            return Ok(None);
        }
        self.read(run_date).map(Some)
    }

    fn load_all(&self) -> Result<Vec<(NaiveDate, RecordSet)>> {
        if !self.folder.exists() {
            return Ok(Vec::new());
        }
        let entries =
            std::fs::read_dir(&self.folder).map_err(|e| AppError::storage(&self.folder, e))?;

        let mut dates = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| AppError::storage(&self.folder, e))?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXTENSION) {
                continue;
            }
            let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
            match NaiveDate::parse_from_str(stem, DATE_FORMAT) {
                Ok(date) => dates.push(date),
                Err(_) => warn!(path = %path.display(), "Ignoring cache file without a date name"),
            }
        }
        dates.sort();

        dates
            .into_iter()
            .map(|date| self.read(date).map(|records| (date, records)))
            .collect()
    }

    fn location(&self, run_date: NaiveDate) -> PathBuf {
        self.folder.join(format!(
            "{}.{SNAPSHOT_EXTENSION}",
            run_date.format(DATE_FORMAT)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobsieve_core::domain::{JobStatus, Locale};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).unwrap()
    }

    fn records(keys: &[&str]) -> RecordSet {
        keys.iter()
            .map(|k| {
                let mut r = Record::new(*k, "Rust Developer", "Acme", "mock");
                r.tags = vec!["rust".into()];
                r.post_date = Some(day(1));
                r.scrape_date = Some(day(2));
                r.locale = Locale::GermanyGerman;
                r.wage = Some("90k".into());
                (r.key_id.clone(), r)
            })
            .collect()
    }

    #[test]
    fn test_snapshot_file_name() {
        let cache = BincodeScrapeCache::new("/tmp/cache");
        assert_eq!(
            cache.location(day(9)),
            PathBuf::from("/tmp/cache/2024-06-09.bin")
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BincodeScrapeCache::new(dir.path());
        let saved = records(&["mock:1", "mock:2"]);

        cache.save(day(3), &saved).unwrap();

        let loaded = cache.load(day(3)).unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert_eq!(loaded["mock:1"].status, JobStatus::New);
        assert!(cache.load(day(4)).unwrap().is_none());
    }

    #[test]
    fn test_load_all_oldest_first() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BincodeScrapeCache::new(dir.path().join("cache"));
        cache.save(day(20), &records(&["mock:3"])).unwrap();
        cache.save(day(5), &records(&["mock:1"])).unwrap();
        std::fs::write(dir.path().join("cache/notes.txt"), "ignored").unwrap();

        let all = cache.load_all().unwrap();
        let dates: Vec<_> = all.iter().map(|(d, _)| *d).collect();
        assert_eq!(dates, vec![day(5), day(20)]);
    }

    #[test]
    fn test_missing_folder_has_no_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BincodeScrapeCache::new(dir.path().join("absent"));
        assert!(cache.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_truncated_snapshot_is_a_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let cache = BincodeScrapeCache::new(dir.path());
        std::fs::write(cache.location(day(1)), [1u8, 2]).unwrap();
        assert!(matches!(
            cache.load(day(1)),
            Err(AppError::Storage { .. })
        ));
    }
}
