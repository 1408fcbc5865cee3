// Record (Job Posting) Domain Model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::DomainError;
use super::locale::Locale;
use super::status::JobStatus;

/// Provider-qualified posting identifier (e.g. `remotive:12345`)
pub type KeyId = String;

/// Record set keyed by `key_id`, ordered for deterministic output
pub type RecordSet = BTreeMap<KeyId, Record>;

/// Separator between provider name and the source's own id
pub const KEY_ID_SEPARATOR: char = ':';

/// Separator between tags in the master file
pub const TAG_SEPARATOR: char = ',';

/// Split joined tags, trimming and dropping empty ones.
///
/// Tags never contain the separator, so joining and splitting round-trips.
pub fn split_tags(text: &str) -> Vec<String> {
    text.split(TAG_SEPARATOR)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Build a provider-qualified key id.
///
/// Ids that already carry the provider prefix are returned unchanged.
pub fn qualify_key_id(provider: &str, raw: &str) -> KeyId {
    let raw = raw.trim();
    let prefix = format!("{provider}{KEY_ID_SEPARATOR}");
    if raw.starts_with(&prefix) {
        raw.to_string()
    } else {
        format!("{prefix}{raw}")
    }
}

/// A record field that a source adapter can populate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobField {
    KeyId,
    Title,
    Company,
    Location,
    Description,
    ShortDescription,
    Url,
    Tags,
    PostDate,
    Wage,
}

impl std::fmt::Display for JobField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            JobField::KeyId => "KEY_ID",
            JobField::Title => "TITLE",
            JobField::Company => "COMPANY",
            JobField::Location => "LOCATION",
            JobField::Description => "DESCRIPTION",
            JobField::ShortDescription => "SHORT_DESCRIPTION",
            JobField::Url => "URL",
            JobField::Tags => "TAGS",
            JobField::PostDate => "POST_DATE",
            JobField::Wage => "WAGE",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for JobField {
    type Err = DomainError;

    /// Case-insensitive; accepts `KEY_ID`, `key_id` and `key-id`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "KEY_ID" | "ID" => JobField::KeyId,
            "TITLE" => JobField::Title,
            "COMPANY" => JobField::Company,
            "LOCATION" => JobField::Location,
            "DESCRIPTION" => JobField::Description,
            "SHORT_DESCRIPTION" => JobField::ShortDescription,
            "URL" => JobField::Url,
            "TAGS" => JobField::Tags,
            "POST_DATE" => JobField::PostDate,
            "WAGE" => JobField::Wage,
            _ => {
                return Err(DomainError::ValidationError(format!(
                    "unknown record field '{s}'"
                )))
            }
        };
        Ok(field)
    }
}

/// Value produced by a source adapter for one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Tags(Vec<String>),
    Date(NaiveDate),
}

/// A job posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub key_id: KeyId,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: String,
    pub short_description: String,
    pub url: String,
    pub tags: Vec<String>,
    pub status: JobStatus,
    pub post_date: Option<NaiveDate>,
    pub scrape_date: Option<NaiveDate>,
    pub provider: String,
    pub query: String,
    pub locale: Locale,
    pub wage: Option<String>,
}

impl Record {
    /// Create an empty draft for a provider, to be populated field by field
    pub fn draft(provider: impl Into<String>, query: impl Into<String>, locale: Locale) -> Self {
        Self {
            key_id: String::new(),
            title: String::new(),
            company: String::new(),
            location: String::new(),
            description: String::new(),
            short_description: String::new(),
            url: String::new(),
            tags: Vec::new(),
            status: JobStatus::New,
            post_date: None,
            scrape_date: None,
            provider: provider.into(),
            query: query.into(),
            locale,
            wage: None,
        }
    }

    /// Create a record with identity fields set (convenient in tests and adapters)
    pub fn new(
        key_id: impl Into<String>,
        title: impl Into<String>,
        company: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        let mut record = Self::draft(provider, "", Locale::default());
        record.key_id = key_id.into();
        record.title = title.into();
        record.company = company.into();
        record
    }

    /// Apply a fetched field value.
    ///
    /// Returns `false` when the value kind does not fit the field.
    pub fn apply(&mut self, field: JobField, value: FieldValue) -> bool {
        match (field, value) {
            (JobField::KeyId, FieldValue::Text(v)) => self.key_id = qualify_key_id(&self.provider, &v),
            (JobField::Title, FieldValue::Text(v)) => self.title = v,
            (JobField::Company, FieldValue::Text(v)) => self.company = v,
            (JobField::Location, FieldValue::Text(v)) => self.location = v,
            (JobField::Description, FieldValue::Text(v)) => self.description = v,
            (JobField::ShortDescription, FieldValue::Text(v)) => self.short_description = v,
            (JobField::Url, FieldValue::Text(v)) => self.url = v,
            (JobField::Wage, FieldValue::Text(v)) => self.wage = Some(v),
            (JobField::Tags, FieldValue::Tags(v)) => {
                self.tags = v.iter().flat_map(|t| split_tags(t)).collect()
            }
            (JobField::Tags, FieldValue::Text(v)) => self.tags = split_tags(&v),
            (JobField::PostDate, FieldValue::Date(d)) => self.post_date = Some(d),
            _ => return false,
        }
        true
    }

    /// True when `other` was posted strictly after `self`.
    ///
    /// A missing date counts as the oldest possible date.
    pub fn is_older_than(&self, other: &Record) -> bool {
        match (self.post_date, other.post_date) {
            (Some(mine), Some(theirs)) => theirs > mine,
            (None, Some(_)) => true,
            _ => false,
        }
    }

    /// Overwrite mutable content with `incoming` when it is strictly newer.
    ///
    /// `status` and `key_id` are never touched: status belongs to the user.
    pub fn update_if_newer(&mut self, incoming: &Record) -> bool {
        if !self.is_older_than(incoming) {
            return false;
        }
        self.description = incoming.description.clone();
        self.short_description = incoming.short_description.clone();
        self.tags = incoming.tags.clone();
        self.wage = incoming.wage.clone();
        self.location = incoming.location.clone();
        self.post_date = incoming.post_date;
        if incoming.scrape_date.is_some() {
            self.scrape_date = incoming.scrape_date;
        }
        true
    }

    /// Tags joined the way the master file stores them
    pub fn tags_joined(&self) -> String {
        self.tags.join(&TAG_SEPARATOR.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dated(key: &str, date: &str) -> Record {
        let mut record = Record::new(key, "Rust Engineer", "Ferris Inc", "remotive");
        record.post_date = Some(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap());
        record
    }

    #[test]
    fn test_qualify_key_id() {
        assert_eq!(qualify_key_id("indeed", "abc"), "indeed:abc");
        assert_eq!(qualify_key_id("indeed", "indeed:abc"), "indeed:abc");
        assert_eq!(qualify_key_id("indeed", " abc "), "indeed:abc");
    }

    #[test]
    fn test_field_names_parse_case_insensitively() {
        assert_eq!("key_id".parse::<JobField>().unwrap(), JobField::KeyId);
        assert_eq!("POST_DATE".parse::<JobField>().unwrap(), JobField::PostDate);
        assert_eq!("short-description".parse::<JobField>().unwrap(), JobField::ShortDescription);
        assert!("salary".parse::<JobField>().is_err());
    }

    #[test]
    fn test_apply_key_id_is_qualified() {
        let mut record = Record::draft("monster", "rust", Locale::UsaEnglish);
        assert!(record.apply(JobField::KeyId, FieldValue::Text("42".into())));
        assert_eq!(record.key_id, "monster:42");
    }

    #[test]
    fn test_apply_rejects_mismatched_value() {
        let mut record = Record::draft("monster", "rust", Locale::UsaEnglish);
        assert!(!record.apply(JobField::PostDate, FieldValue::Text("yesterday".into())));
        assert!(record.post_date.is_none());
    }

    #[test]
    fn test_apply_tags_from_text() {
        let mut record = Record::draft("monster", "rust", Locale::UsaEnglish);
        record.apply(JobField::Tags, FieldValue::Text("rust, tokio,,remote".into()));
        assert_eq!(record.tags, vec!["rust", "tokio", "remote"]);
    }

    #[test]
    fn test_apply_tag_list_splits_embedded_separators() {
        let mut record = Record::draft("monster", "rust", Locale::UsaEnglish);
        record.apply(
            JobField::Tags,
            FieldValue::Tags(vec!["rust, tokio".into(), " remote ".into(), "".into()]),
        );
        assert_eq!(record.tags, vec!["rust", "tokio", "remote"]);
        assert_eq!(split_tags(&record.tags_joined()), record.tags);
    }

    #[test]
    fn test_update_if_newer_keeps_status() {
        let mut existing = dated("remotive:1", "2024-03-01");
        existing.status = JobStatus::Interviewing;
        existing.description = "old text".into();

        let mut incoming = dated("remotive:1", "2024-03-05");
        incoming.description = "new text".into();
        incoming.tags = vec!["rust".into()];

        assert!(existing.update_if_newer(&incoming));
        assert_eq!(existing.description, "new text");
        assert_eq!(existing.tags, vec!["rust"]);
        assert_eq!(existing.status, JobStatus::Interviewing);
        assert_eq!(existing.key_id, "remotive:1");
    }

    #[test]
    fn test_update_if_newer_ignores_same_or_older() {
        let mut existing = dated("remotive:1", "2024-03-05");
        existing.description = "keep".into();

        let mut same_day = dated("remotive:1", "2024-03-05");
        same_day.description = "same day".into();
        assert!(!existing.update_if_newer(&same_day));

        let older = dated("remotive:1", "2024-02-01");
        assert!(!existing.update_if_newer(&older));
        assert_eq!(existing.description, "keep");
    }

    #[test]
    fn test_missing_date_counts_as_oldest() {
        let mut undated = Record::new("a:1", "t", "c", "a");
        let dated = dated("a:1", "2024-01-01");
        assert!(undated.is_older_than(&dated));
        assert!(!dated.is_older_than(&undated));
        assert!(undated.update_if_newer(&dated));
        assert_eq!(undated.post_date, dated.post_date);
    }
}
