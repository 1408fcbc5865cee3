// CSV MasterStore Implementation
//
// The master file is edited by hand (status column), so parsing is strict and
// every error names the row.

use crate::atomic::write_atomic;
use chrono::NaiveDate;
use jobsieve_core::domain::{split_tags, JobStatus, Locale, Record, RecordSet};
use jobsieve_core::error::{AppError, Result};
use jobsieve_core::port::MasterStore;
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// One line of the master file. Field order is the column order.
#[derive(Debug, Serialize, Deserialize)]
struct MasterRow {
    status: String,
    title: String,
    company: String,
    location: String,
    date: String,
    blurb: String,
    tags: String,
    link: String,
    id: String,
    provider: String,
    query: String,
    locale: String,
}

impl From<&Record> for MasterRow {
    fn from(record: &Record) -> Self {
        Self {
            status: record.status.to_string(),
            title: record.title.clone(),
            company: record.company.clone(),
            location: record.location.clone(),
            date: record
                .post_date
                .map(|d| d.format(DATE_FORMAT).to_string())
                .unwrap_or_default(),
            blurb: record.description.clone(),
            tags: record.tags_joined(),
            link: record.url.clone(),
            id: record.key_id.clone(),
            provider: record.provider.clone(),
            query: record.query.clone(),
            locale: record.locale.to_string(),
        }
    }
}

impl MasterRow {
    fn into_record(self, row: usize) -> std::result::Result<Record, String> {
        let status: JobStatus = self
            .status
            .parse()
            .map_err(|e| format!("row {row}: {e}"))?;
        let locale: Locale = if self.locale.trim().is_empty() {
            Locale::default()
        } else {
            self.locale.parse().map_err(|e| format!("row {row}: {e}"))?
        };
        let post_date = match self.date.trim() {
            "" => None,
            date => Some(
                NaiveDate::parse_from_str(date, DATE_FORMAT)
                    .map_err(|e| format!("row {row}: bad date '{date}': {e}"))?,
            ),
        };
        if self.id.trim().is_empty() {
            return Err(format!("row {row}: empty id"));
        }

        let mut record = Record::draft(self.provider, self.query, locale);
        record.key_id = self.id.trim().to_string();
        record.status = status;
        record.title = self.title;
        record.company = self.company;
        record.location = self.location;
        record.description = self.blurb;
        record.url = self.link;
        record.post_date = post_date;
        record.tags = split_tags(&self.tags);
        Ok(record)
    }
}

/// Master set stored as a user-editable CSV file
pub struct CsvMasterStore {
    path: PathBuf,
}

impl CsvMasterStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MasterStore for CsvMasterStore {
    fn load(&self) -> Result<Option<RecordSet>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "No master file yet");
            return Ok(None);
        }
        let mut reader = csv::Reader::from_path(&self.path)
            .map_err(|e| AppError::storage(&self.path, e))?;

        let mut records = RecordSet::new();
        for (index, row) in reader.deserialize::<MasterRow>().enumerate() {
            // Line 1 is the header
            let line = index + 2;
            let row = row.map_err(|e| AppError::storage(&self.path, format!("row {line}: {e}")))?;
            let record = row
                .into_record(line)
                .map_err(|e| AppError::storage(&self.path, e))?;
            match records.entry(record.key_id.clone()) {
                Entry::Occupied(_) => {
                    warn!(
                        path = %self.path.display(),
                        row = line,
                        key_id = %record.key_id,
                        "Duplicate id in master file, keeping first"
                    );
                }
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
            }
        }
        debug!(path = %self.path.display(), records = records.len(), "Master file loaded");
        Ok(Some(records))
    }

    fn save(&self, records: &RecordSet) -> Result<()> {
        write_atomic(&self.path, |out| {
            let mut writer = csv::Writer::from_writer(out);
            for record in records.values() {
                writer
                    .serialize(MasterRow::from(record))
                    .map_err(|e| e.to_string())?;
            }
            if records.is_empty() {
                // serialize() writes the header with the first row only
                writer
                    .write_record([
                        "status", "title", "company", "location", "date", "blurb", "tags",
                        "link", "id", "provider", "query", "locale",
                    ])
                    .map_err(|e| e.to_string())?;
            }
            writer.flush().map_err(|e| e.to_string())
        })?;
        debug!(path = %self.path.display(), records = records.len(), "Master file written");
        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobsieve_core::domain::{FieldValue, JobField};

    fn sample() -> RecordSet {
        let mut a = Record::new("remotive:1", "Rust Engineer", "Ferris, Inc", "remotive");
        a.description = "Line one\nLine \"two\"".into();
        a.tags = vec!["rust".into(), "async".into()];
        a.post_date = NaiveDate::from_ymd_opt(2024, 5, 1);
        a.status = JobStatus::Interested;
        a.url = "https://remotive.example/1".into();
        a.query = "rust developer".into();
        a.locale = Locale::UkEnglish;

        let b = Record::new("indeed:9", "Go Developer", "Gopher Co", "indeed");
        [a, b].into_iter().map(|r| (r.key_id.clone(), r)).collect()
    }

    #[test]
    fn test_missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvMasterStore::new(dir.path().join("master.csv"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvMasterStore::new(dir.path().join("master.csv"));
        let records = sample();

        store.save(&records).unwrap();
        let loaded = store.load().unwrap().unwrap();

        assert_eq!(loaded.len(), 2);
        let a = &loaded["remotive:1"];
        assert_eq!(a.status, JobStatus::Interested);
        assert_eq!(a.company, "Ferris, Inc");
        assert_eq!(a.description, "Line one\nLine \"two\"");
        assert_eq!(a.tags, vec!["rust", "async"]);
        assert_eq!(a.post_date, NaiveDate::from_ymd_opt(2024, 5, 1));
        assert_eq!(a.locale, Locale::UkEnglish);
        assert!(loaded["indeed:9"].post_date.is_none());
    }

    #[test]
    fn test_resave_is_byte_stable_with_separator_in_tags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.csv");
        let store = CsvMasterStore::new(&path);

        let mut record = Record::draft("board", "rust", Locale::CanadaEnglish);
        record.apply(JobField::KeyId, FieldValue::Text("7".into()));
        record.apply(
            JobField::Tags,
            FieldValue::Tags(vec!["rust, tokio".into(), " remote".into()]),
        );
        store
            .save(&[(record.key_id.clone(), record)].into())
            .unwrap();
        let first = std::fs::read(&path).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded["board:7"].tags, vec!["rust", "tokio", "remote"]);
        store.save(&loaded).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), first);
    }

    #[test]
    fn test_header_and_column_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.csv");
        CsvMasterStore::new(&path).save(&sample()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(
            header,
            "status,title,company,location,date,blurb,tags,link,id,provider,query,locale"
        );
        assert!(text.contains("NEW,Go Developer,Gopher Co,,,,,,indeed:9,indeed,,CANADA_ENGLISH"));
    }

    #[test]
    fn test_user_edited_status_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.csv");
        std::fs::write(
            &path,
            "status,title,company,location,date,blurb,tags,link,id,provider,query,locale\n\
             archive,Dev,Acme,,2024-01-02,,,,a:1,a,,\n",
        )
        .unwrap();

        let loaded = CsvMasterStore::new(&path).load().unwrap().unwrap();
        assert_eq!(loaded["a:1"].status, JobStatus::Archive);
        assert_eq!(loaded["a:1"].locale, Locale::CanadaEnglish);
    }

    #[test]
    fn test_unknown_status_names_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.csv");
        std::fs::write(
            &path,
            "status,title,company,location,date,blurb,tags,link,id,provider,query,locale\n\
             NEW,Dev,Acme,,,,,,a:1,a,,\n\
             MAYBE,Dev,Acme,,,,,,a:2,a,,\n",
        )
        .unwrap();

        let err = CsvMasterStore::new(&path).load().unwrap_err();
        let message = err.to_string();
        assert!(message.contains("row 3"), "{message}");
        assert!(message.contains("MAYBE"), "{message}");
    }

    #[test]
    fn test_duplicate_rows_keep_first() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("master.csv");
        std::fs::write(
            &path,
            "status,title,company,location,date,blurb,tags,link,id,provider,query,locale\n\
             APPLIED,First,Acme,,,,,,a:1,a,,\n\
             NEW,Second,Acme,,,,,,a:1,a,,\n",
        )
        .unwrap();

        let loaded = CsvMasterStore::new(&path).load().unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["a:1"].title, "First");
    }

    #[test]
    fn test_empty_set_writes_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = CsvMasterStore::new(dir.path().join("master.csv"));
        store.save(&RecordSet::new()).unwrap();
        assert!(store.load().unwrap().unwrap().is_empty());
    }
}
