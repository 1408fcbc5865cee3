// Fetch Orchestrator - bounded concurrent population of records from one source

pub mod constants;
mod pacer;

pub use pacer::Pacer;

use constants::MAX_FETCH_WORKERS;

use crate::application::delay::{as_duration, compute_delays};
use crate::application::filter::FilterPipeline;
use crate::domain::{DelayPolicy, JobField, Locale, Record, RecordSet};
use crate::error::Result;
use crate::port::{
    FetchError, FieldOp, FieldOpKind, Listing, SearchQuery, SourceAdapter, TimeProvider,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Record-scoped failure. Never escapes the orchestrator as an `AppError`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchFieldError {
    #[error("{provider} listing {index}: required field {field} failed: {reason}")]
    Required {
        provider: String,
        index: usize,
        field: JobField,
        reason: FetchError,
    },

    #[error("{provider} listing {index}: finished without a key id")]
    MissingKey { provider: String, index: usize },

    #[error("{provider}: worker aborted: {reason}")]
    Aborted { provider: String, reason: String },
}

/// Result of one source's fetch
#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    pub provider: String,
    pub listings: usize,
    pub records: RecordSet,
    pub filtered: usize,
    pub collisions: usize,
    /// Optional fields that failed and kept their default
    pub field_warnings: usize,
    pub failures: Vec<FetchFieldError>,
}

impl FetchOutcome {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}

enum TaskOutcome {
    Completed(Record),
    Filtered,
    Failed(FetchFieldError),
}

struct RecordTask {
    index: usize,
    listing: Listing,
    delay: std::time::Duration,
    provider: String,
    query: String,
    locale: Locale,
    today: chrono::NaiveDate,
}

/// Drives source adapters through their field plan
pub struct FetchOrchestrator {
    pacer: Arc<Pacer>,
    time_provider: Arc<dyn TimeProvider>,
    max_workers: usize,
}

impl FetchOrchestrator {
    pub fn new(pacer: Arc<Pacer>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pacer,
            time_provider,
            max_workers: MAX_FETCH_WORKERS,
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    /// Search a source and populate one record per listing.
    ///
    /// Run-scoped errors (bad descriptor, bad policy, failed search) are
    /// returned; everything record-scoped lands in the outcome.
    pub async fn fetch(
        &self,
        source: Arc<dyn SourceAdapter>,
        query: &SearchQuery,
        policy: &DelayPolicy,
        filter: Arc<FilterPipeline>,
    ) -> Result<FetchOutcome> {
        let capabilities = source.capabilities();
        let provider = capabilities.provider.clone();
        let plan: Arc<[FieldOp]> = capabilities.plan()?.into();

        let listings = source.search(query).await?;
        let delays = compute_delays(listings.len(), policy)?;
        info!(
            provider = %provider,
            listings = listings.len(),
            workers = self.max_workers,
            "Fetching listings"
        );

        let mut outcome = FetchOutcome {
            provider: provider.clone(),
            listings: listings.len(),
            ..Default::default()
        };

        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let today = self.time_provider.today();
        let query_text = query.text();
        let mut workers = JoinSet::new();

        for (index, (listing, delay)) in listings.into_iter().zip(delays).enumerate() {
            let task = RecordTask {
                index,
                listing,
                delay: as_duration(delay),
                provider: provider.clone(),
                query: query_text.clone(),
                locale: query.locale,
                today,
            };
            let source = Arc::clone(&source);
            let filter = Arc::clone(&filter);
            let pacer = Arc::clone(&self.pacer);
            let plan = Arc::clone(&plan);
            let semaphore = Arc::clone(&semaphore);

            workers.spawn(async move {
                let index = task.index;
                let outcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => populate(task, source.as_ref(), &plan, &filter, &pacer).await,
                    Err(e) => (
                        TaskOutcome::Failed(FetchFieldError::Aborted {
                            provider: task.provider,
                            reason: e.to_string(),
                        }),
                        0,
                    ),
                };
                (index, outcome)
            });
        }

        let mut finished = Vec::with_capacity(outcome.listings);
        while let Some(joined) = workers.join_next().await {
            match joined {
                Ok(result) => finished.push(result),
                Err(e) => {
                    error!(provider = %provider, error = %e, "Fetch worker panicked");
                    outcome.failures.push(FetchFieldError::Aborted {
                        provider: provider.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        // First listing (search order) wins a key collision
        finished.sort_by_key(|(index, _)| *index);
        for (index, (task_outcome, warnings)) in finished {
            outcome.field_warnings += warnings;
            match task_outcome {
                TaskOutcome::Completed(record) => {
                    if outcome.records.contains_key(&record.key_id) {
                        warn!(
                            provider = %provider,
                            key_id = %record.key_id,
                            index,
                            "Duplicate key in batch, keeping first"
                        );
                        outcome.collisions += 1;
                    } else {
                        outcome.records.insert(record.key_id.clone(), record);
                    }
                }
                TaskOutcome::Filtered => outcome.filtered += 1,
                TaskOutcome::Failed(failure) => {
                    warn!(error = %failure, "Record dropped");
                    outcome.failures.push(failure);
                }
            }
        }

        info!(
            provider = %provider,
            records = outcome.records.len(),
            filtered = outcome.filtered,
            failed = outcome.failed(),
            collisions = outcome.collisions,
            "Fetch complete"
        );
        Ok(outcome)
    }
}

/// Populate one record end to end; also returns the optional-field failure count
async fn populate(
    task: RecordTask,
    source: &dyn SourceAdapter,
    plan: &[FieldOp],
    filter: &FilterPipeline,
    pacer: &Pacer,
) -> (TaskOutcome, usize) {
    let mut record = Record::draft(&task.provider, &task.query, task.locale);
    record.scrape_date = Some(task.today);
    let mut warnings = 0;

    for op in plan {
        if op.delayed {
            pacer.wait(task.delay).await;
        }

        let result = match op.kind {
            FieldOpKind::Get => match source.get(op.field, &task.listing).await {
                Ok(value) => {
                    if record.apply(op.field, value) {
                        Ok(())
                    } else {
                        Err(FetchError::Parse {
                            field: op.field,
                            reason: "unexpected value kind".to_string(),
                        })
                    }
                }
                Err(e) => Err(e),
            },
            FieldOpKind::Set => source.set(op.field, &mut record, &task.listing).await,
        };

        if let Err(reason) = result {
            if op.required {
                let failure = FetchFieldError::Required {
                    provider: task.provider,
                    index: task.index,
                    field: op.field,
                    reason,
                };
                return (TaskOutcome::Failed(failure), warnings);
            }
            debug!(
                provider = %task.provider,
                index = task.index,
                field = %op.field,
                error = %reason,
                "Optional field failed, keeping default"
            );
            warnings += 1;
        }

        if let Some(reason) = filter.evaluate(&record) {
            if !filter.is_known_duplicate(&record.key_id) {
                debug!(
                    provider = %task.provider,
                    key_id = %record.key_id,
                    after = %op.field,
                    reason = %reason,
                    "Record filtered during fetch"
                );
                return (TaskOutcome::Filtered, warnings);
            }
        }
    }

    if record.key_id.is_empty() {
        return (
            TaskOutcome::Failed(FetchFieldError::MissingKey {
                provider: task.provider,
                index: task.index,
            }),
            warnings,
        );
    }
    (TaskOutcome::Completed(record), warnings)
}
