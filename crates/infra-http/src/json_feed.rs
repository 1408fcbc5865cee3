// JSON Feed Source Adapter
//
// Generic adapter for job boards exposing a JSON search API. Field locations
// are JSON pointers, so a new board is a settings entry rather than new code.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jobsieve_core::domain::{parse_post_date, FieldValue, JobField, Record};
use jobsieve_core::error::{AppError, Result};
use jobsieve_core::port::{
    FetchError, Listing, SearchQuery, SourceAdapter, SourceCapabilities, TimeProvider,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("jobsieve/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT_SECS: u64 = 30;

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_required() -> Vec<String> {
    vec!["KEY_ID".to_string(), "TITLE".to_string()]
}

/// Follow-up request that fills the description (one per record, paced)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetailRequest {
    /// URL with `{id}` (raw source id) and/or `{url}` (listing url) placeholders
    pub url_template: String,
    /// Pointer to the description in the response; empty = whole body as text
    #[serde(default)]
    pub description_pointer: String,
}

/// Source definition, as found in the settings file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JsonFeedConfig {
    pub provider: String,
    pub search_url: String,
    /// Query-string parameter receiving the search keywords
    #[serde(default)]
    pub query_param: Option<String>,
    /// Pointer to the listing array in the search response ("" = root)
    #[serde(default)]
    pub listings_pointer: String,
    /// Record field name -> pointer inside one listing
    pub fields: BTreeMap<String, String>,
    #[serde(default)]
    pub detail: Option<DetailRequest>,
    #[serde(default = "default_required")]
    pub required: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

pub struct JsonFeedSource {
    config: JsonFeedConfig,
    capabilities: SourceCapabilities,
    pointers: BTreeMap<JobField, String>,
    client: reqwest::Client,
    time_provider: Arc<dyn TimeProvider>,
}

impl JsonFeedSource {
    pub fn new(config: JsonFeedConfig, time_provider: Arc<dyn TimeProvider>) -> Result<Self> {
        if config.search_url.trim().is_empty() {
            return Err(AppError::Config(format!(
                "source '{}': search_url is empty",
                config.provider
            )));
        }

        let mut pointers = BTreeMap::new();
        for (name, pointer) in &config.fields {
            pointers.insert(name.parse::<JobField>()?, pointer.clone());
        }
        if config.detail.is_some() && pointers.remove(&JobField::Description).is_some() {
            debug!(provider = %config.provider, "Description comes from the detail request");
        }

        let required = config
            .required
            .iter()
            .map(|name| name.parse::<JobField>())
            .collect::<std::result::Result<BTreeSet<_>, _>>()?;

        let mut get_fields: Vec<JobField> = pointers.keys().copied().collect();
        // KEY_ID first so the early-exit filter can use it
        get_fields.sort_by_key(|f| *f != JobField::KeyId);
        let set_fields = match config.detail {
            Some(_) => vec![JobField::Description],
            None => Vec::new(),
        };
        let capabilities = SourceCapabilities {
            provider: config.provider.clone(),
            delayed_fields: set_fields.iter().copied().collect(),
            get_fields,
            set_fields,
            high_priority_fields: vec![JobField::KeyId],
            min_required_fields: required,
        };
        capabilities.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::Config(format!("HTTP client for '{}': {e}", config.provider)))?;

        Ok(Self {
            config,
            capabilities,
            pointers,
            client,
            time_provider,
        })
    }

    async fn get_json(&self, url: &str, query: Option<(&str, String)>) -> std::result::Result<Value, FetchError> {
        let mut request = self.client.get(url);
        if let Some((param, value)) = query {
            request = request.query(&[(param, value)]);
        }
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Request(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Request(format!("HTTP {status} from {url}")));
        }
        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Request(format!("invalid JSON from {url}: {e}")))
    }

    fn raw(&self, field: JobField, listing: &Listing) -> Option<Value> {
        let pointer = self.pointers.get(&field)?;
        lookup(listing.as_value(), pointer).cloned()
    }

    fn detail_url(&self, template: &str, record: &Record, listing: &Listing) -> String {
        let raw_id = self
            .raw(JobField::KeyId, listing)
            .map(|v| value_text(&v))
            .unwrap_or_default();
        template
            .replace("{id}", raw_id.trim())
            .replace("{url}", &record.url)
    }
}

/// JSON pointer lookup where "" and "/" both mean the root
fn lookup<'a>(value: &'a Value, pointer: &str) -> Option<&'a Value> {
    match pointer {
        "" | "/" => Some(value),
        p => value.pointer(p),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Listings from a search response body
pub fn extract_listings(body: &Value, pointer: &str) -> std::result::Result<Vec<Listing>, FetchError> {
    match lookup(body, pointer) {
        Some(Value::Array(items)) => Ok(items.iter().cloned().map(Listing::new).collect()),
        Some(_) => Err(FetchError::Request(format!(
            "listings at '{pointer}' is not an array"
        ))),
        None => Err(FetchError::Request(format!(
            "no listings at '{pointer}' in search response"
        ))),
    }
}

/// Convert a raw JSON value into a field value
pub fn convert(field: JobField, value: &Value, today: chrono::NaiveDate) -> std::result::Result<FieldValue, FetchError> {
    match (field, value) {
        (_, Value::Null) => Err(FetchError::Missing(field)),
        (JobField::Tags, Value::Array(items)) => Ok(FieldValue::Tags(
            items
                .iter()
                .map(value_text)
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        )),
        (JobField::PostDate, Value::Number(n)) => n
            .as_i64()
            .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0))
            .map(|dt| FieldValue::Date(dt.date_naive()))
            .ok_or_else(|| FetchError::Parse {
                field,
                reason: format!("bad timestamp {n}"),
            }),
        (JobField::PostDate, Value::String(text)) => parse_post_date(text, today)
            .map(FieldValue::Date)
            .ok_or_else(|| FetchError::Parse {
                field,
                reason: format!("unrecognised date '{text}'"),
            }),
        (_, Value::String(text)) if text.trim().is_empty() => Err(FetchError::Missing(field)),
        (_, Value::String(text)) => Ok(FieldValue::Text(text.trim().to_string())),
        (_, Value::Number(_) | Value::Bool(_)) => Ok(FieldValue::Text(value.to_string())),
        (_, other) => Err(FetchError::Parse {
            field,
            reason: format!("unexpected JSON value {other}"),
        }),
    }
}

#[async_trait]
impl SourceAdapter for JsonFeedSource {
    fn capabilities(&self) -> &SourceCapabilities {
        &self.capabilities
    }

    async fn search(&self, query: &SearchQuery) -> std::result::Result<Vec<Listing>, FetchError> {
        let param = self
            .config
            .query_param
            .as_deref()
            .map(|p| (p, query.text()));
        let body = self.get_json(&self.config.search_url, param).await?;
        let listings = extract_listings(&body, &self.config.listings_pointer)?;
        debug!(
            provider = %self.config.provider,
            listings = listings.len(),
            "Search returned listings"
        );
        Ok(listings)
    }

    async fn get(&self, field: JobField, listing: &Listing) -> std::result::Result<FieldValue, FetchError> {
        if !self.pointers.contains_key(&field) {
            return Err(FetchError::Unsupported(field));
        }
        let value = self.raw(field, listing).ok_or(FetchError::Missing(field))?;
        convert(field, &value, self.time_provider.today())
    }

    async fn set(
        &self,
        field: JobField,
        record: &mut Record,
        listing: &Listing,
    ) -> std::result::Result<(), FetchError> {
        let (JobField::Description, Some(detail)) = (field, &self.config.detail) else {
            return Err(FetchError::Unsupported(field));
        };
        let url = self.detail_url(&detail.url_template, record, listing);
        let body = self.get_json(&url, None).await?;
        let description = lookup(&body, &detail.description_pointer)
            .map(value_text)
            .ok_or(FetchError::Missing(field))?;
        record.description = description.trim().to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use jobsieve_core::domain::Locale;
    use jobsieve_core::port::time_provider::mocks::FixedTimeProvider;
    use serde_json::json;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn config() -> JsonFeedConfig {
        serde_json::from_value(json!({
            "provider": "remotive",
            "search_url": "https://remotive.example/api/remote-jobs",
            "query_param": "search",
            "listings_pointer": "/jobs",
            "fields": {
                "key_id": "/id",
                "title": "/title",
                "company": "/company_name",
                "location": "/candidate_required_location",
                "url": "/url",
                "tags": "/tags",
                "post_date": "/publication_date",
                "description": "/description",
            },
            "detail": {
                "url_template": "https://remotive.example/api/job/{id}",
                "description_pointer": "/job/description"
            },
            "required": ["KEY_ID", "TITLE", "COMPANY"]
        }))
        .unwrap()
    }

    fn source() -> JsonFeedSource {
        JsonFeedSource::new(config(), Arc::new(FixedTimeProvider::new(today()))).unwrap()
    }

    fn listing() -> Listing {
        Listing::new(json!({
            "id": 1234,
            "title": "  Senior Rust Engineer ",
            "company_name": "Ferris Inc",
            "candidate_required_location": "Canada",
            "url": "https://remotive.example/jobs/1234",
            "tags": ["rust", "tokio", ""],
            "publication_date": "2024-06-28T10:00:00",
            "description": "<p>inline</p>",
        }))
    }

    #[test]
    fn test_capabilities_from_config() {
        let source = source();
        let caps = source.capabilities();
        assert_eq!(caps.provider, "remotive");
        assert_eq!(caps.get_fields[0], JobField::KeyId);
        assert!(!caps.get_fields.contains(&JobField::Description));
        assert_eq!(caps.set_fields, vec![JobField::Description]);
        assert!(caps.delayed_fields.contains(&JobField::Description));
        assert!(caps.min_required_fields.contains(&JobField::Company));
        assert!(caps.plan().is_ok());
    }

    #[test]
    fn test_without_detail_description_is_a_get() {
        let mut config = config();
        config.detail = None;
        let source = JsonFeedSource::new(config, Arc::new(FixedTimeProvider::new(today()))).unwrap();
        let caps = source.capabilities();
        assert!(caps.get_fields.contains(&JobField::Description));
        assert!(caps.set_fields.is_empty());
        assert!(caps.delayed_fields.is_empty());
    }

    #[test]
    fn test_unknown_field_name_is_rejected() {
        let mut config = config();
        config.fields.insert("salary_band".into(), "/salary".into());
        assert!(JsonFeedSource::new(config, Arc::new(FixedTimeProvider::new(today()))).is_err());
    }

    #[test]
    fn test_missing_key_pointer_is_rejected() {
        let mut config = config();
        config.fields.remove("key_id");
        config.required = vec!["TITLE".into()];
        assert!(matches!(
            JsonFeedSource::new(config, Arc::new(FixedTimeProvider::new(today()))),
            Err(AppError::Domain(_))
        ));
    }

    #[tokio::test]
    async fn test_get_converts_values() {
        let source = source();
        let listing = listing();

        assert_eq!(
            source.get(JobField::KeyId, &listing).await.unwrap(),
            FieldValue::Text("1234".into())
        );
        assert_eq!(
            source.get(JobField::Title, &listing).await.unwrap(),
            FieldValue::Text("Senior Rust Engineer".into())
        );
        assert_eq!(
            source.get(JobField::Tags, &listing).await.unwrap(),
            FieldValue::Tags(vec!["rust".into(), "tokio".into()])
        );
        assert_eq!(
            source.get(JobField::PostDate, &listing).await.unwrap(),
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 6, 28).unwrap())
        );
        assert_eq!(
            source.get(JobField::Wage, &listing).await,
            Err(FetchError::Unsupported(JobField::Wage))
        );
    }

    #[test]
    fn test_convert_relative_and_epoch_dates() {
        assert_eq!(
            convert(JobField::PostDate, &json!("3 days ago"), today()).unwrap(),
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 6, 27).unwrap())
        );
        assert_eq!(
            convert(JobField::PostDate, &json!(1_719_446_400), today()).unwrap(),
            FieldValue::Date(NaiveDate::from_ymd_opt(2024, 6, 27).unwrap())
        );
        assert!(matches!(
            convert(JobField::PostDate, &json!("sometime"), today()),
            Err(FetchError::Parse { .. })
        ));
        assert_eq!(
            convert(JobField::Title, &json!(null), today()),
            Err(FetchError::Missing(JobField::Title))
        );
    }

    #[test]
    fn test_extract_listings() {
        let body = json!({"jobs": [{"id": 1}, {"id": 2}], "total": 2});
        assert_eq!(extract_listings(&body, "/jobs").unwrap().len(), 2);
        assert!(extract_listings(&body, "/total").is_err());
        assert!(extract_listings(&body, "/missing").is_err());
        assert_eq!(extract_listings(&json!([{"id": 1}]), "").unwrap().len(), 1);
    }

    #[test]
    fn test_detail_url_uses_raw_id() {
        let source = source();
        let mut record = Record::draft("remotive", "rust", Locale::CanadaEnglish);
        record.key_id = "remotive:1234".into();
        record.url = "https://remotive.example/jobs/1234".into();
        assert_eq!(
            source.detail_url("https://remotive.example/api/job/{id}?from={url}", &record, &listing()),
            "https://remotive.example/api/job/1234?from=https://remotive.example/jobs/1234"
        );
    }
}
