// Master Record Store Port (Interface)

use crate::domain::RecordSet;
use crate::error::Result;

/// Persistence for the user-curated master record set
pub trait MasterStore: Send + Sync {
    /// Load the master set; `None` when it has never been written
    fn load(&self) -> Result<Option<RecordSet>>;

    /// Replace the stored master set (full rewrite, never an append)
    fn save(&self, records: &RecordSet) -> Result<()>;

    /// Human-readable location, for log and error messages
    fn location(&self) -> String;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    /// Master store held in memory, counting writes
    #[derive(Default)]
    pub struct InMemoryMasterStore {
        records: Mutex<Option<RecordSet>>,
        saves: Mutex<usize>,
    }

    impl InMemoryMasterStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_records(records: RecordSet) -> Self {
            Self {
                records: Mutex::new(Some(records)),
                saves: Mutex::new(0),
            }
        }

        pub fn snapshot(&self) -> Option<RecordSet> {
            self.records.lock().unwrap().clone()
        }

        pub fn save_count(&self) -> usize {
            *self.saves.lock().unwrap()
        }
    }

    impl MasterStore for InMemoryMasterStore {
        fn load(&self) -> Result<Option<RecordSet>> {
            Ok(self.records.lock().unwrap().clone())
        }

        fn save(&self, records: &RecordSet) -> Result<()> {
            *self.records.lock().unwrap() = Some(records.clone());
            *self.saves.lock().unwrap() += 1;
            Ok(())
        }

        fn location(&self) -> String {
            "memory://master".to_string()
        }
    }
}
