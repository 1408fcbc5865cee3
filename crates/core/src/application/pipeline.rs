// Search Pipeline - one run end to end
//
// normal:   fetch every source -> cache snapshot -> reconcile
// no-fetch: reconcile today's cache snapshot
// recover:  merge every cache snapshot (oldest first) -> rebuild master

use crate::application::fetch::{FetchOrchestrator, FetchOutcome};
use crate::application::reconcile::{ReconcileReport, Reconciler};
use crate::domain::{DelayPolicy, Locale, RecordSet};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, ScrapeCache, SearchQuery, SourceAdapter, TimeProvider};
use chrono::NaiveDate;
use std::collections::btree_map::Entry;
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Normal,
    NoFetch,
    Recover,
}

impl std::fmt::Display for RunMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunMode::Normal => write!(f, "normal"),
            RunMode::NoFetch => write!(f, "no-fetch"),
            RunMode::Recover => write!(f, "recover"),
        }
    }
}

/// What to search for and how politely
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    pub keywords: Vec<String>,
    pub locale: Locale,
    pub delay_policy: DelayPolicy,
}

/// Fetch counts for one source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderSummary {
    pub provider: String,
    pub listings: usize,
    pub records: usize,
    pub filtered: usize,
    pub failed: usize,
    pub collisions: usize,
    /// Set when the search itself failed and the source was skipped
    pub error: Option<String>,
}

impl From<&FetchOutcome> for ProviderSummary {
    fn from(outcome: &FetchOutcome) -> Self {
        Self {
            provider: outcome.provider.clone(),
            listings: outcome.listings,
            records: outcome.records.len(),
            filtered: outcome.filtered,
            failed: outcome.failed(),
            collisions: outcome.collisions,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: String,
    pub mode: RunMode,
    pub run_date: NaiveDate,
    pub providers: Vec<ProviderSummary>,
    /// Records handed to the reconciler
    pub fetched: usize,
    pub reconcile: ReconcileReport,
}

pub struct SearchPipeline {
    sources: Vec<Arc<dyn SourceAdapter>>,
    orchestrator: FetchOrchestrator,
    cache: Arc<dyn ScrapeCache>,
    reconciler: Reconciler,
    search: SearchSettings,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SearchPipeline {
    pub fn new(
        sources: Vec<Arc<dyn SourceAdapter>>,
        orchestrator: FetchOrchestrator,
        cache: Arc<dyn ScrapeCache>,
        reconciler: Reconciler,
        search: SearchSettings,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            sources,
            orchestrator,
            cache,
            reconciler,
            search,
            id_provider,
            time_provider,
        }
    }

    pub async fn run(&self, mode: RunMode) -> Result<RunSummary> {
        let run_id = self.id_provider.generate_id();
        let run_date = self.time_provider.today();
        let span = info_span!("run", run_id = %run_id, mode = %mode, date = %run_date);

        async move {
            info!("Run started");
            let (providers, fetched, reconcile) = match mode {
                RunMode::Normal => self.fetch_and_reconcile(run_date).await?,
                RunMode::NoFetch => self.reconcile_cached(run_date)?,
                RunMode::Recover => self.recover()?,
            };
            info!(fetched, master = reconcile.master_size, "Run finished");
            Ok::<_, AppError>(RunSummary {
                run_id,
                mode,
                run_date,
                providers,
                fetched,
                reconcile,
            })
        }
        .instrument(span)
        .await
    }

    async fn fetch_and_reconcile(
        &self,
        run_date: NaiveDate,
    ) -> Result<(Vec<ProviderSummary>, usize, ReconcileReport)> {
        // Fail fast on configuration before any request goes out
        self.search.delay_policy.validate()?;
        for source in &self.sources {
            source.capabilities().validate()?;
        }

        // Promote dismissals first so the fetch already skips them
        let state = self.reconciler.load()?;
        let filter = Arc::new(self.reconciler.filter_pipeline(&state));
        let query = SearchQuery {
            keywords: self.search.keywords.clone(),
            locale: self.search.locale,
        };

        let mut providers = Vec::with_capacity(self.sources.len());
        let mut fetched = RecordSet::new();
        for source in &self.sources {
            let provider = source.capabilities().provider.clone();
            match self
                .orchestrator
                .fetch(
                    Arc::clone(source),
                    &query,
                    &self.search.delay_policy,
                    Arc::clone(&filter),
                )
                .await
            {
                Ok(outcome) => {
                    let mut summary = ProviderSummary::from(&outcome);
                    for (key_id, record) in outcome.records {
                        match fetched.entry(key_id) {
                            Entry::Vacant(slot) => {
                                slot.insert(record);
                            }
                            Entry::Occupied(slot) => {
                                warn!(
                                    provider = %provider,
                                    key_id = %slot.key(),
                                    "Key already fetched from an earlier source, dropping"
                                );
                                summary.collisions += 1;
                            }
                        }
                    }
                    providers.push(summary);
                }
                Err(AppError::Source(e)) => {
                    warn!(provider = %provider, error = %e, "Search failed, skipping source");
                    providers.push(ProviderSummary {
                        provider,
                        error: Some(e.to_string()),
                        ..Default::default()
                    });
                }
                Err(e) => return Err(e),
            }
        }

        // An empty fetch never replaces an earlier snapshot of the same day
        let fetched = if !fetched.is_empty() {
            self.cache.save(run_date, &fetched)?;
            info!(
                records = fetched.len(),
                path = %self.cache.location(run_date).display(),
                "Scrape cache written"
            );
            fetched
        } else if let Some(cached) = self.cache.load(run_date)? {
            warn!(
                records = cached.len(),
                path = %self.cache.location(run_date).display(),
                "Nothing fetched, reconciling today's earlier snapshot"
            );
            cached
        } else {
            fetched
        };

        let count = fetched.len();
        let report = self.reconciler.reconcile(state, fetched)?;
        Ok((providers, count, report))
    }

    fn reconcile_cached(
        &self,
        run_date: NaiveDate,
    ) -> Result<(Vec<ProviderSummary>, usize, ReconcileReport)> {
        let records = self
            .cache
            .load(run_date)?
            .ok_or_else(|| AppError::CacheMissing {
                date: run_date,
                path: self.cache.location(run_date),
            })?;
        info!(records = records.len(), "Reconciling cached scrape");
        let count = records.len();
        let report = self.reconciler.run(records)?;
        Ok((Vec::new(), count, report))
    }

    fn recover(&self) -> Result<(Vec<ProviderSummary>, usize, ReconcileReport)> {
        let snapshots = self.cache.load_all()?;
        info!(snapshots = snapshots.len(), "Recovering master from cache");

        let mut recovered = RecordSet::new();
        for (_, records) in snapshots {
            for (key_id, record) in records {
                match recovered.entry(key_id) {
                    Entry::Occupied(mut slot) => {
                        slot.get_mut().update_if_newer(&record);
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(record);
                    }
                }
            }
        }

        let count = recovered.len();
        let report = self.reconciler.rebuild(recovered)?;
        Ok((Vec::new(), count, report))
    }
}
