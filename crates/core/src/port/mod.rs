// Port Layer - Interfaces for external dependencies

pub mod block_list_store;
pub mod id_provider; // For deterministic testing
pub mod master_store;
pub mod scrape_cache;
pub mod source;
pub mod time_provider;

// Re-exports
pub use block_list_store::{BlockListStore, DuplicateRegistryStore};
pub use id_provider::IdProvider;
pub use master_store::MasterStore;
pub use scrape_cache::ScrapeCache;
pub use source::{
    FetchError, FieldOp, FieldOpKind, Listing, SearchQuery, SourceAdapter, SourceCapabilities,
};
pub use time_provider::TimeProvider;
