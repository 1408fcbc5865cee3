// jobsieve Infrastructure - File Adapters
// Implements: MasterStore (CSV), BlockListStore + DuplicateRegistryStore (JSON), ScrapeCache (bincode)

mod atomic;
mod json_store;
mod master_csv;
mod scrape_cache;

pub use atomic::write_atomic;
pub use json_store::{JsonBlockListStore, JsonDuplicateRegistryStore};
pub use master_csv::CsvMasterStore;
pub use scrape_cache::BincodeScrapeCache;

// Note: csv/bincode/serde_json errors are wrapped into AppError::Storage with the
// file path, since From impls for foreign errors cannot live in this crate
