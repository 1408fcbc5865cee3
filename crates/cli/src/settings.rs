// Settings - YAML file layered with JOBSIEVE__* environment variables
//
// Everything is validated into core types before the run starts.

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use jobsieve_core::application::dedup::{DEFAULT_MIN_CORPUS_SIZE, DEFAULT_SIMILARITY_THRESHOLD};
use jobsieve_core::application::fetch::constants::MAX_FETCH_WORKERS;
use jobsieve_core::application::{DedupSettings, FilterSettings, SearchSettings};
use jobsieve_core::domain::{DelayPolicy, Locale};
use jobsieve_infra_http::JsonFeedConfig;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "jobsieve";
const SETTINGS_FILE: &str = "settings.yaml";
const ENV_PREFIX: &str = "JOBSIEVE";
const ENV_SEPARATOR: &str = "__";

/// Settings as written in the file
#[derive(Debug, Deserialize)]
struct RawSettings {
    master_file: String,
    block_list_file: String,
    registry_file: String,
    cache_folder: String,
    #[serde(default)]
    log_file: Option<String>,
    #[serde(default)]
    log_level: Option<String>,
    #[serde(default)]
    keywords: Vec<String>,
    #[serde(default)]
    locale: Locale,
    #[serde(default)]
    delay: DelayPolicy,
    #[serde(default)]
    max_listing_days: Option<i64>,
    #[serde(default)]
    blocked_companies: Vec<String>,
    #[serde(default)]
    dedup: RawDedup,
    #[serde(default)]
    max_fetch_workers: Option<usize>,
    #[serde(default)]
    sources: Vec<JsonFeedConfig>,
}

#[derive(Debug, Deserialize)]
struct RawDedup {
    #[serde(default = "default_similarity_threshold")]
    similarity_threshold: f64,
    #[serde(default = "default_min_corpus_size")]
    min_corpus_size: usize,
}

impl Default for RawDedup {
    fn default() -> Self {
        Self {
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            min_corpus_size: DEFAULT_MIN_CORPUS_SIZE,
        }
    }
}

fn default_similarity_threshold() -> f64 {
    DEFAULT_SIMILARITY_THRESHOLD
}

fn default_min_corpus_size() -> usize {
    DEFAULT_MIN_CORPUS_SIZE
}

/// Where the persistent state lives
#[derive(Debug, Clone, PartialEq)]
pub struct Paths {
    pub master_file: PathBuf,
    pub block_list_file: PathBuf,
    pub registry_file: PathBuf,
    pub cache_folder: PathBuf,
    pub log_file: Option<PathBuf>,
}

/// Validated settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub paths: Paths,
    pub log_level: Option<String>,
    pub search: SearchSettings,
    pub filter: FilterSettings,
    pub dedup: DedupSettings,
    pub max_fetch_workers: usize,
    pub sources: Vec<JsonFeedConfig>,
}

/// `<config dir>/jobsieve/settings.yaml`
pub fn default_settings_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().join(SETTINGS_FILE))
}

pub fn expand_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw.trim()).into_owned())
}

fn required_path(name: &str, raw: &str) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        bail!("'{name}' must not be empty");
    }
    Ok(expand_path(raw))
}

impl Settings {
    /// Load `path` (or the default location), then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => default_settings_path()
                .context("Could not determine the configuration directory")?,
        };

        let raw: RawSettings = Config::builder()
            .add_source(File::from(path.as_path()))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("keywords")
                    .with_list_parse_key("blocked_companies"),
            )
            .build()
            .with_context(|| format!("Failed to read settings from {}", path.display()))?
            .try_deserialize()
            .with_context(|| format!("Invalid settings in {}", path.display()))?;

        Self::validate(raw).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    fn validate(raw: RawSettings) -> Result<Self> {
        let paths = Paths {
            master_file: required_path("master_file", &raw.master_file)?,
            block_list_file: required_path("block_list_file", &raw.block_list_file)?,
            registry_file: required_path("registry_file", &raw.registry_file)?,
            cache_folder: required_path("cache_folder", &raw.cache_folder)?,
            log_file: raw
                .log_file
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .map(expand_path),
        };

        raw.delay.validate().context("delay")?;

        let dedup = DedupSettings {
            similarity_threshold: raw.dedup.similarity_threshold,
            min_corpus_size: raw.dedup.min_corpus_size,
        };
        dedup.validate().context("dedup")?;

        if let Some(days) = raw.max_listing_days {
            if days < 0 {
                bail!("'max_listing_days' must not be negative (got {days})");
            }
        }

        let max_fetch_workers = raw.max_fetch_workers.unwrap_or(MAX_FETCH_WORKERS);
        if max_fetch_workers == 0 {
            bail!("'max_fetch_workers' must be at least 1");
        }

        let mut providers = BTreeSet::new();
        for source in &raw.sources {
            if !providers.insert(source.provider.trim()) {
                bail!("source provider '{}' is defined twice", source.provider);
            }
        }

        let keywords: Vec<String> = raw
            .keywords
            .iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();

        Ok(Self {
            paths,
            log_level: raw.log_level,
            search: SearchSettings {
                keywords,
                locale: raw.locale,
                delay_policy: raw.delay,
            },
            filter: FilterSettings {
                max_listing_days: raw.max_listing_days,
                blocked_companies: raw.blocked_companies,
            },
            dedup,
            max_fetch_workers,
            sources: raw.sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jobsieve_core::domain::DelayAlgorithm;

    const MINIMAL: &str = "\
master_file: /data/master.csv
block_list_file: /data/block_list.json
registry_file: /data/duplicates.json
cache_folder: /data/cache
";

    fn write_settings(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_minimal_settings_use_defaults() {
        let (_dir, path) = write_settings(MINIMAL);
        let settings = Settings::load(Some(&path)).unwrap();

        assert_eq!(settings.paths.master_file, PathBuf::from("/data/master.csv"));
        assert_eq!(settings.paths.cache_folder, PathBuf::from("/data/cache"));
        assert!(settings.paths.log_file.is_none());
        assert_eq!(settings.search.locale, Locale::CanadaEnglish);
        assert_eq!(settings.search.delay_policy, DelayPolicy::default());
        assert_eq!(settings.dedup.similarity_threshold, DEFAULT_SIMILARITY_THRESHOLD);
        assert_eq!(settings.dedup.min_corpus_size, DEFAULT_MIN_CORPUS_SIZE);
        assert_eq!(settings.max_fetch_workers, MAX_FETCH_WORKERS);
        assert!(settings.sources.is_empty());
    }

    #[test]
    fn test_full_settings() {
        let yaml = format!(
            "{MINIMAL}\
keywords: [rust, ' backend ', '']
locale: GERMANY_GERMAN
delay:
  algorithm: SIGMOID
  max_duration: 5.0
  min_duration: 1.0
  random: true
max_listing_days: 30
blocked_companies: [Initech]
dedup:
  similarity_threshold: 0.9
max_fetch_workers: 2
sources:
  - provider: board
    search_url: https://jobs.example.com/api/search
    query_param: q
    listings_pointer: /results
    fields:
      KEY_ID: /id
      TITLE: /title
"
        );
        let (_dir, path) = write_settings(&yaml);
        let settings = Settings::load(Some(&path)).unwrap();

        assert_eq!(settings.search.keywords, vec!["rust", "backend"]);
        assert_eq!(settings.search.locale, Locale::GermanyGerman);
        assert_eq!(settings.search.delay_policy.algorithm, DelayAlgorithm::Sigmoid);
        assert!(settings.search.delay_policy.random);
        assert_eq!(settings.filter.max_listing_days, Some(30));
        assert_eq!(settings.filter.blocked_companies, vec!["Initech"]);
        assert_eq!(settings.dedup.similarity_threshold, 0.9);
        assert_eq!(settings.dedup.min_corpus_size, DEFAULT_MIN_CORPUS_SIZE);
        assert_eq!(settings.max_fetch_workers, 2);
        assert_eq!(settings.sources.len(), 1);
        assert_eq!(settings.sources[0].provider, "board");
        assert_eq!(settings.sources[0].query_param.as_deref(), Some("q"));
    }

    #[test]
    fn test_invalid_delay_policy_is_rejected() {
        let yaml = format!("{MINIMAL}delay:\n  max_duration: 1.0\n  min_duration: 2.0\n");
        let (_dir, path) = write_settings(&yaml);
        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("min_duration"));
    }

    #[test]
    fn test_threshold_out_of_range_is_rejected() {
        let yaml = format!("{MINIMAL}dedup:\n  similarity_threshold: 1.5\n");
        let (_dir, path) = write_settings(&yaml);
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_empty_path_is_rejected() {
        let yaml = MINIMAL.replace("/data/cache", "''");
        let (_dir, path) = write_settings(&yaml);
        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("cache_folder"));
    }

    #[test]
    fn test_missing_path_is_rejected() {
        let (_dir, path) = write_settings("master_file: /data/master.csv\n");
        assert!(Settings::load(Some(&path)).is_err());
    }

    #[test]
    fn test_duplicate_provider_is_rejected() {
        let source = "  - provider: board\n    search_url: https://jobs.example.com/api\n    fields:\n      KEY_ID: /id\n";
        let yaml = format!("{MINIMAL}sources:\n{source}{source}");
        let (_dir, path) = write_settings(&yaml);
        let err = Settings::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("defined twice"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Settings::load(Some(&dir.path().join("absent.yaml"))).is_err());
    }

    #[test]
    fn test_tilde_expansion() {
        assert_eq!(expand_path("/var/jobs"), PathBuf::from("/var/jobs"));
        if let Ok(home) = std::env::var("HOME") {
            assert_eq!(expand_path("~/jobs.csv"), Path::new(&home).join("jobs.csv"));
        }
    }
}
