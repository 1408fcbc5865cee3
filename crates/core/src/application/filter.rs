// Filter Pipeline - drops records the user should never see
//
// Used twice per run: as an early-exit check while a record is still being
// populated, and as a full pass over loaded/fetched record sets.

use crate::domain::{BlockList, DuplicateRegistry, Record, RecordSet};
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Filter configuration (from settings)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSettings {
    /// Records posted more than this many days ago are dropped
    pub max_listing_days: Option<i64>,
    /// Company names to drop (matched trimmed and case-insensitive)
    pub blocked_companies: Vec<String>,
}

/// Why a record was filtered out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterReason {
    RemovableStatus,
    BlockListed,
    KnownDuplicate,
    BlockedCompany,
    TooOld,
}

impl std::fmt::Display for FilterReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FilterReason::RemovableStatus => "removable status",
            FilterReason::BlockListed => "block list",
            FilterReason::KnownDuplicate => "known duplicate",
            FilterReason::BlockedCompany => "blocked company",
            FilterReason::TooOld => "too old",
        };
        f.write_str(name)
    }
}

/// Per-reason counts of one filter pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterStats {
    counts: BTreeMap<FilterReason, usize>,
}

impl FilterStats {
    fn record(&mut self, reason: FilterReason) {
        *self.counts.entry(reason).or_default() += 1;
    }

    pub fn count(&self, reason: FilterReason) -> usize {
        self.counts.get(&reason).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FilterReason, usize)> + '_ {
        self.counts.iter().map(|(reason, count)| (*reason, *count))
    }
}

/// Snapshot of everything a filter decision needs.
///
/// Owns its data so one instance can be shared (via `Arc`) by fetch workers.
#[derive(Debug, Clone, Default)]
pub struct FilterPipeline {
    block_list: BlockList,
    registry: DuplicateRegistry,
    blocked_companies: BTreeSet<String>,
    oldest_allowed: Option<NaiveDate>,
}

impl FilterPipeline {
    pub fn new(
        settings: &FilterSettings,
        block_list: BlockList,
        registry: DuplicateRegistry,
        today: NaiveDate,
    ) -> Self {
        Self {
            block_list,
            registry,
            blocked_companies: settings
                .blocked_companies
                .iter()
                .map(|c| normalize_company(c))
                .filter(|c| !c.is_empty())
                .collect(),
            // An age limit reaching past the calendar range means no limit
            oldest_allowed: settings.max_listing_days.and_then(|days| {
                Duration::try_days(days).and_then(|age| today.checked_sub_signed(age))
            }),
        }
    }

    /// First failing condition, cheapest checks first.
    ///
    /// Empty or missing fields make their condition inapplicable.
    pub fn evaluate(&self, record: &Record) -> Option<FilterReason> {
        if record.status.is_removable() {
            return Some(FilterReason::RemovableStatus);
        }
        if !record.key_id.is_empty() {
            if self.block_list.contains(&record.key_id) {
                return Some(FilterReason::BlockListed);
            }
            if self.registry.contains(&record.key_id) {
                return Some(FilterReason::KnownDuplicate);
            }
        }
        if !self.blocked_companies.is_empty() && !record.company.trim().is_empty() {
            if self
                .blocked_companies
                .contains(&normalize_company(&record.company))
            {
                return Some(FilterReason::BlockedCompany);
            }
        }
        match (self.oldest_allowed, record.post_date) {
            (Some(oldest), Some(posted)) if posted < oldest => Some(FilterReason::TooOld),
            _ => None,
        }
    }

    pub fn passes(&self, record: &Record) -> bool {
        self.evaluate(record).is_none()
    }

    pub fn is_known_duplicate(&self, key_id: &str) -> bool {
        self.registry.contains(key_id)
    }

    pub fn registry(&self) -> &DuplicateRegistry {
        &self.registry
    }

    /// Remove failing records in place
    pub fn filter(&self, records: &mut RecordSet) -> FilterStats {
        let mut stats = FilterStats::default();
        records.retain(|key_id, record| match self.evaluate(record) {
            Some(reason) => {
                debug!(key_id = %key_id, reason = %reason, "Record filtered");
                stats.record(reason);
                false
            }
            None => true,
        });
        stats
    }
}

fn normalize_company(name: &str) -> String {
    name.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DuplicateAssociation, JobStatus, MatchType};

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
    }

    fn record(key: &str, company: &str, days_ago: Option<i64>) -> Record {
        let mut r = Record::new(key, "Backend Developer", company, "remotive");
        r.post_date = days_ago.map(|d| today() - Duration::days(d));
        r
    }

    fn pipeline() -> FilterPipeline {
        let settings = FilterSettings {
            max_listing_days: Some(30),
            blocked_companies: vec!["  Evil Corp ".to_string()],
        };
        let mut block_list = BlockList::new();
        let mut archived = record("remotive:blocked", "Acme", Some(1));
        archived.status = JobStatus::Archive;
        block_list.block(&archived);

        let mut registry = DuplicateRegistry::new();
        registry.register(&DuplicateAssociation::new(
            "remotive:orig",
            "indeed:dupe",
            MatchType::ContentMatch,
        ));
        FilterPipeline::new(&settings, block_list, registry, today())
    }

    #[test]
    fn test_each_condition() {
        let p = pipeline();

        let mut removable = record("a:1", "Acme", Some(1));
        removable.status = JobStatus::Rejected;
        assert_eq!(p.evaluate(&removable), Some(FilterReason::RemovableStatus));

        assert_eq!(
            p.evaluate(&record("remotive:blocked", "Acme", Some(1))),
            Some(FilterReason::BlockListed)
        );
        assert_eq!(
            p.evaluate(&record("indeed:dupe", "Acme", Some(1))),
            Some(FilterReason::KnownDuplicate)
        );
        assert_eq!(
            p.evaluate(&record("a:2", "EVIL CORP", Some(1))),
            Some(FilterReason::BlockedCompany)
        );
        assert_eq!(
            p.evaluate(&record("a:3", "Acme", Some(31))),
            Some(FilterReason::TooOld)
        );
        assert!(p.passes(&record("a:4", "Acme", Some(30))));
    }

    #[test]
    fn test_missing_fields_are_inapplicable() {
        let p = pipeline();
        let mut draft = Record::draft("remotive", "rust", Default::default());
        assert!(p.passes(&draft));

        draft.post_date = None;
        draft.company = String::new();
        assert!(p.passes(&draft));
        assert!(p.passes(&record("a:5", "Acme", None)));
    }

    #[test]
    fn test_no_age_limit() {
        let p = FilterPipeline::new(
            &FilterSettings::default(),
            BlockList::new(),
            DuplicateRegistry::new(),
            today(),
        );
        assert!(p.passes(&record("a:1", "Acme", Some(5000))));
    }

    #[test]
    fn test_out_of_range_age_limit_means_no_limit() {
        for days in [1_000_000_000, i64::MAX] {
            let settings = FilterSettings {
                max_listing_days: Some(days),
                ..Default::default()
            };
            let p = FilterPipeline::new(
                &settings,
                BlockList::new(),
                DuplicateRegistry::new(),
                today(),
            );
            assert!(p.passes(&record("a:1", "Acme", Some(5000))));
        }
    }

    #[test]
    fn test_filter_counts_and_is_idempotent() {
        let p = pipeline();
        let mut set: RecordSet = [
            record("a:keep", "Acme", Some(2)),
            record("a:old", "Acme", Some(90)),
            record("a:evil", "evil corp", None),
            record("indeed:dupe", "Acme", Some(2)),
        ]
        .into_iter()
        .map(|r| (r.key_id.clone(), r))
        .collect();

        let stats = p.filter(&mut set);
        assert_eq!(stats.total(), 3);
        assert_eq!(stats.count(FilterReason::TooOld), 1);
        assert_eq!(stats.count(FilterReason::BlockedCompany), 1);
        assert_eq!(stats.count(FilterReason::KnownDuplicate), 1);
        assert_eq!(set.len(), 1);

        let after_first = set.clone();
        let second = p.filter(&mut set);
        assert_eq!(second.total(), 0);
        assert_eq!(set, after_first);
    }
}
