// Raw-Fetch Cache Port

use crate::domain::RecordSet;
use crate::error::Result;
use chrono::NaiveDate;

/// One snapshot of orchestrator output per run date
pub trait ScrapeCache: Send + Sync {
    /// Store a run's fetched records (replaces any snapshot of the same date)
    fn save(&self, run_date: NaiveDate, records: &RecordSet) -> Result<()>;

    /// Load the snapshot for a run date, `None` if there is none
    fn load(&self, run_date: NaiveDate) -> Result<Option<RecordSet>>;

    /// Every snapshot, oldest first
    fn load_all(&self) -> Result<Vec<(NaiveDate, RecordSet)>>;

    /// Where the snapshot for a run date lives
    fn location(&self, run_date: NaiveDate) -> std::path::PathBuf;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryScrapeCache {
        snapshots: Mutex<BTreeMap<NaiveDate, RecordSet>>,
    }

    impl InMemoryScrapeCache {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn len(&self) -> usize {
            self.snapshots.lock().unwrap().len()
        }

        pub fn is_empty(&self) -> bool {
            self.len() == 0
        }
    }

    impl ScrapeCache for InMemoryScrapeCache {
        fn save(&self, run_date: NaiveDate, records: &RecordSet) -> Result<()> {
            self.snapshots
                .lock()
                .unwrap()
                .insert(run_date, records.clone());
            Ok(())
        }

        fn load(&self, run_date: NaiveDate) -> Result<Option<RecordSet>> {
            Ok(self.snapshots.lock().unwrap().get(&run_date).cloned())
        }

        fn load_all(&self) -> Result<Vec<(NaiveDate, RecordSet)>> {
            Ok(self
                .snapshots
                .lock()
                .unwrap()
                .iter()
                .map(|(date, records)| (*date, records.clone()))
                .collect())
        }

        fn location(&self, run_date: NaiveDate) -> std::path::PathBuf {
            std::path::PathBuf::from(format!("memory://cache/{run_date}"))
        }
    }
}
