// Source Adapter Port
// One adapter per job board; the orchestrator drives it through a capability descriptor

use crate::domain::{DomainError, FieldValue, JobField, Locale, Record, KEY_ID_SEPARATOR};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Opaque search-result stub, interpreted only by the adapter that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing(serde_json::Value);

impl Listing {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// What to search for
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub keywords: Vec<String>,
    pub locale: Locale,
}

impl SearchQuery {
    /// Query text stored on every record of this search
    pub fn text(&self) -> String {
        self.keywords.join(" ")
    }
}

/// Adapter errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Field {0} not present in listing")]
    Missing(JobField),

    #[error("Could not parse {field}: {reason}")]
    Parse { field: JobField, reason: String },

    #[error("Field {0} is not supported by this source")]
    Unsupported(JobField),
}

/// Whether a field is read from the stub or populated on the draft record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOpKind {
    /// Read from the listing stub
    Get,
    /// Populate the draft (may issue requests, may read earlier fields)
    Set,
}

/// One step of a record's population plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldOp {
    pub kind: FieldOpKind,
    pub field: JobField,
    pub delayed: bool,
    pub required: bool,
}

/// Capability descriptor declared by each source adapter
#[derive(Debug, Clone, PartialEq)]
pub struct SourceCapabilities {
    pub provider: String,
    pub get_fields: Vec<JobField>,
    pub set_fields: Vec<JobField>,
    /// Populated before every other field (e.g. a detail page others depend on)
    pub high_priority_fields: Vec<JobField>,
    /// Fields whose population issues a request and must be paced
    pub delayed_fields: BTreeSet<JobField>,
    /// Failure on one of these aborts the record
    pub min_required_fields: BTreeSet<JobField>,
}

impl SourceCapabilities {
    fn invalid(&self, reason: impl Into<String>) -> DomainError {
        DomainError::InvalidCapabilities {
            provider: self.provider.clone(),
            reason: reason.into(),
        }
    }

    fn is_planned(&self, field: &JobField) -> bool {
        self.get_fields.contains(field) || self.set_fields.contains(field)
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.provider.trim().is_empty() || self.provider.contains(KEY_ID_SEPARATOR) {
            return Err(self.invalid(format!(
                "provider name must be non-empty and must not contain '{KEY_ID_SEPARATOR}'"
            )));
        }

        let gets: BTreeSet<_> = self.get_fields.iter().collect();
        let sets: BTreeSet<_> = self.set_fields.iter().collect();
        if gets.len() != self.get_fields.len() || sets.len() != self.set_fields.len() {
            return Err(self.invalid("a field is listed twice"));
        }
        if let Some(field) = gets.intersection(&sets).next() {
            return Err(self.invalid(format!("{field} is both a get and a set field")));
        }
        if !self.is_planned(&JobField::KeyId) {
            return Err(self.invalid("KEY_ID is never populated"));
        }

        let unplanned = self
            .high_priority_fields
            .iter()
            .chain(self.delayed_fields.iter())
            .chain(self.min_required_fields.iter())
            .find(|f| !self.is_planned(f));
        if let Some(field) = unplanned {
            return Err(self.invalid(format!("{field} is referenced but never populated")));
        }
        Ok(())
    }

    /// Compile the descriptor into an ordered plan:
    /// high-priority fields, then remaining gets, then remaining sets.
    pub fn plan(&self) -> Result<Vec<FieldOp>, DomainError> {
        self.validate()?;

        let op = |field: JobField| FieldOp {
            kind: if self.get_fields.contains(&field) {
                FieldOpKind::Get
            } else {
                FieldOpKind::Set
            },
            field,
            delayed: self.delayed_fields.contains(&field),
            required: self.min_required_fields.contains(&field),
        };

        let mut plan: Vec<FieldOp> = Vec::with_capacity(self.get_fields.len() + self.set_fields.len());
        for field in &self.high_priority_fields {
            if !plan.iter().any(|p| p.field == *field) {
                plan.push(op(*field));
            }
        }
        for field in self.get_fields.iter().chain(self.set_fields.iter()) {
            if !self.high_priority_fields.contains(field) {
                plan.push(op(*field));
            }
        }
        Ok(plan)
    }
}

/// Source adapter trait
///
/// Implementations:
/// - JsonFeedSource (infra-http): generic JSON search API
/// - MockSource: in-memory listings for tests
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    fn capabilities(&self) -> &SourceCapabilities;

    /// Fetch search-result stubs for a query
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Listing>, FetchError>;

    /// Read one field from a stub
    async fn get(&self, field: JobField, listing: &Listing) -> Result<FieldValue, FetchError>;

    /// Populate one field on the draft record
    async fn set(
        &self,
        field: JobField,
        record: &mut Record,
        listing: &Listing,
    ) -> Result<(), FetchError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory source.
    ///
    /// Listings are JSON objects keyed by lower-case field name
    /// (`key_id`, `title`, `post_date`, ...). `"detail"` backs the DESCRIPTION
    /// set op and `"fail": ["title", ...]` makes those fields error.
    pub struct MockSource {
        capabilities: SourceCapabilities,
        listings: Vec<Listing>,
        search_error: Option<String>,
        set_calls: AtomicUsize,
    }

    impl MockSource {
        pub fn new(provider: &str, listings: Vec<serde_json::Value>) -> Self {
            Self {
                capabilities: Self::default_capabilities(provider),
                listings: listings.into_iter().map(Listing::new).collect(),
                search_error: None,
                set_calls: AtomicUsize::new(0),
            }
        }

        pub fn default_capabilities(provider: &str) -> SourceCapabilities {
            SourceCapabilities {
                provider: provider.to_string(),
                get_fields: vec![
                    JobField::KeyId,
                    JobField::Title,
                    JobField::Company,
                    JobField::Location,
                    JobField::Url,
                    JobField::PostDate,
                    JobField::Tags,
                ],
                set_fields: vec![JobField::Description],
                high_priority_fields: vec![JobField::KeyId],
                delayed_fields: [JobField::Description].into_iter().collect(),
                min_required_fields: [
                    JobField::KeyId,
                    JobField::Title,
                    JobField::Company,
                    JobField::Location,
                    JobField::Url,
                ]
                .into_iter()
                .collect(),
            }
        }

        pub fn with_capabilities(mut self, capabilities: SourceCapabilities) -> Self {
            self.capabilities = capabilities;
            self
        }

        pub fn failing_search(mut self, message: impl Into<String>) -> Self {
            self.search_error = Some(message.into());
            self
        }

        /// Number of `set` calls made (the "expensive" detail fetches)
        pub fn set_calls(&self) -> usize {
            self.set_calls.load(Ordering::SeqCst)
        }

        fn field_name(field: JobField) -> String {
            field.to_string().to_ascii_lowercase()
        }

        fn should_fail(field: JobField, listing: &Listing) -> bool {
            let name = Self::field_name(field);
            listing
                .as_value()
                .get("fail")
                .and_then(|v| v.as_array())
                .map(|fails| fails.iter().any(|f| f.as_str() == Some(name.as_str())))
                .unwrap_or(false)
        }
    }

    #[async_trait]
    impl SourceAdapter for MockSource {
        fn capabilities(&self) -> &SourceCapabilities {
            &self.capabilities
        }

        async fn search(&self, _query: &SearchQuery) -> Result<Vec<Listing>, FetchError> {
            match &self.search_error {
                Some(message) => Err(FetchError::Request(message.clone())),
                None => Ok(self.listings.clone()),
            }
        }

        async fn get(&self, field: JobField, listing: &Listing) -> Result<FieldValue, FetchError> {
            if Self::should_fail(field, listing) {
                return Err(FetchError::Request(format!("mock failure on {field}")));
            }
            let value = listing
                .as_value()
                .get(Self::field_name(field))
                .ok_or(FetchError::Missing(field))?;

            match (field, value) {
                (JobField::Tags, serde_json::Value::Array(items)) => Ok(FieldValue::Tags(
                    items
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect(),
                )),
                (JobField::PostDate, serde_json::Value::String(s)) => {
                    NaiveDate::parse_from_str(s, "%Y-%m-%d")
                        .map(FieldValue::Date)
                        .map_err(|e| FetchError::Parse {
                            field,
                            reason: e.to_string(),
                        })
                }
                (_, serde_json::Value::String(s)) => Ok(FieldValue::Text(s.clone())),
                (_, other) => Ok(FieldValue::Text(other.to_string())),
            }
        }

        async fn set(
            &self,
            field: JobField,
            record: &mut Record,
            listing: &Listing,
        ) -> Result<(), FetchError> {
            self.set_calls.fetch_add(1, Ordering::SeqCst);
            if Self::should_fail(field, listing) {
                return Err(FetchError::Request(format!("mock failure on {field}")));
            }
            match field {
                JobField::Description => {
                    record.description = listing
                        .as_value()
                        .get("detail")
                        .and_then(|v| v.as_str())
                        .unwrap_or_default()
                        .to_string();
                    Ok(())
                }
                other => Err(FetchError::Unsupported(other)),
            }
        }
    }
}
