// Block List & Duplicate Registry Store Ports

use crate::domain::{BlockList, DuplicateRegistry};
use crate::error::Result;

/// Persistence for the block list (missing store loads as empty)
pub trait BlockListStore: Send + Sync {
    fn load(&self) -> Result<BlockList>;
    fn save(&self, block_list: &BlockList) -> Result<()>;
}

/// Persistence for the duplicate registry (missing store loads as empty)
pub trait DuplicateRegistryStore: Send + Sync {
    fn load(&self) -> Result<DuplicateRegistry>;
    fn save(&self, registry: &DuplicateRegistry) -> Result<()>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryBlockListStore {
        block_list: Mutex<BlockList>,
        saves: Mutex<usize>,
    }

    impl InMemoryBlockListStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn snapshot(&self) -> BlockList {
            self.block_list.lock().unwrap().clone()
        }

        pub fn save_count(&self) -> usize {
            *self.saves.lock().unwrap()
        }
    }

    impl BlockListStore for InMemoryBlockListStore {
        fn load(&self) -> Result<BlockList> {
            Ok(self.block_list.lock().unwrap().clone())
        }

        fn save(&self, block_list: &BlockList) -> Result<()> {
            *self.block_list.lock().unwrap() = block_list.clone();
            *self.saves.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct InMemoryRegistryStore {
        registry: Mutex<DuplicateRegistry>,
        saves: Mutex<usize>,
    }

    impl InMemoryRegistryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_registry(registry: DuplicateRegistry) -> Self {
            Self {
                registry: Mutex::new(registry),
                saves: Mutex::new(0),
            }
        }

        pub fn snapshot(&self) -> DuplicateRegistry {
            self.registry.lock().unwrap().clone()
        }

        pub fn save_count(&self) -> usize {
            *self.saves.lock().unwrap()
        }
    }

    impl DuplicateRegistryStore for InMemoryRegistryStore {
        fn load(&self) -> Result<DuplicateRegistry> {
            Ok(self.registry.lock().unwrap().clone())
        }

        fn save(&self, registry: &DuplicateRegistry) -> Result<()> {
            *self.registry.lock().unwrap() = registry.clone();
            *self.saves.lock().unwrap() += 1;
            Ok(())
        }
    }
}
