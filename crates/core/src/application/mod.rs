// Application Layer - Use Cases and Business Logic

pub mod dedup;
pub mod delay;
pub mod fetch;
pub mod filter;
pub mod pipeline;
pub mod reconcile;

// Re-exports
pub use dedup::{DedupReport, DedupSettings, DuplicateDetector};
pub use delay::compute_delays;
pub use fetch::{FetchFieldError, FetchOrchestrator, FetchOutcome, Pacer};
pub use filter::{FilterPipeline, FilterReason, FilterSettings, FilterStats};
pub use pipeline::{ProviderSummary, RunMode, RunSummary, SearchPipeline, SearchSettings};
pub use reconcile::{ReconcileReport, ReconcileState, Reconciler, ReconcilerDeps};
