// Block List Domain Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::record::{KeyId, Record};
use super::status::JobStatus;

/// Snapshot of a dismissed posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockListEntry {
    pub title: String,
    pub company: String,
    pub post_date: Option<NaiveDate>,
    pub status: JobStatus,
    #[serde(default)]
    pub description: String,
}

impl From<&Record> for BlockListEntry {
    fn from(record: &Record) -> Self {
        Self {
            title: record.title.clone(),
            company: record.company.clone(),
            post_date: record.post_date,
            status: record.status,
            description: record.description.clone(),
        }
    }
}

/// Postings the user never wants to see again.
///
/// Entries are never removed automatically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockList {
    entries: BTreeMap<KeyId, BlockListEntry>,
}

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key_id: &str) -> bool {
        self.entries.contains_key(key_id)
    }

    /// Add a record; returns false if its key is already blocked
    pub fn block(&mut self, record: &Record) -> bool {
        if self.entries.contains_key(&record.key_id) {
            return false;
        }
        self.entries
            .insert(record.key_id.clone(), BlockListEntry::from(record));
        true
    }

    pub fn get(&self, key_id: &str) -> Option<&BlockListEntry> {
        self.entries.get(key_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &KeyId> {
        self.entries.keys()
    }
}
