// Master Reconciler - merges one run's records into the persistent master set
//
// Owns the master set, block list and duplicate registry for the length of a
// run. User-assigned status is never overwritten and block-listed postings
// never come back.

use crate::application::dedup::{DedupReport, DuplicateDetector};
use crate::application::filter::{FilterPipeline, FilterSettings, FilterStats};
use crate::domain::{BlockList, DuplicateRegistry, Locale, RecordSet};
use crate::error::{AppError, Result};
use crate::port::{BlockListStore, DuplicateRegistryStore, MasterStore, TimeProvider};
use std::sync::Arc;
use tracing::{info, warn};

/// Loaded persistent state, with removable master records already promoted
#[derive(Debug, Clone, Default)]
pub struct ReconcileState {
    /// `None` when no master set has ever been written
    pub master: Option<RecordSet>,
    pub block_list: BlockList,
    pub registry: DuplicateRegistry,
    /// Master records newly moved into the block list by `load`
    pub promoted: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReconcileReport {
    pub incoming: usize,
    pub promoted: usize,
    pub filtered_incoming: FilterStats,
    pub filtered_master: FilterStats,
    pub dedup: DedupReport,
    pub inserted: usize,
    pub master_size: usize,
    pub first_save: bool,
    pub master_written: bool,
    pub block_list_written: bool,
    pub registry_written: bool,
}

/// Services the reconciler needs
pub struct ReconcilerDeps {
    pub master_store: Arc<dyn MasterStore>,
    pub block_list_store: Arc<dyn BlockListStore>,
    pub registry_store: Arc<dyn DuplicateRegistryStore>,
    pub time_provider: Arc<dyn TimeProvider>,
}

pub struct Reconciler {
    deps: ReconcilerDeps,
    filter_settings: FilterSettings,
    detector: DuplicateDetector,
    locale: Locale,
}

impl Reconciler {
    pub fn new(
        deps: ReconcilerDeps,
        filter_settings: FilterSettings,
        detector: DuplicateDetector,
        locale: Locale,
    ) -> Self {
        Self {
            deps,
            filter_settings,
            detector,
            locale,
        }
    }

    /// Load master set, block list and registry; promote removable master
    /// records into the block list.
    pub fn load(&self) -> Result<ReconcileState> {
        let master = self.deps.master_store.load()?;
        let mut block_list = self.deps.block_list_store.load()?;
        let registry = self.deps.registry_store.load()?;

        let mut promoted = 0;
        if let Some(master) = &master {
            for record in master.values().filter(|r| r.status.is_removable()) {
                if block_list.block(record) {
                    promoted += 1;
                } else {
                    warn!(key_id = %record.key_id, status = %record.status, "Already block-listed");
                }
            }
        }

        info!(
            master = master.as_ref().map(|m| m.len()).unwrap_or(0),
            block_list = block_list.len(),
            registry = registry.len(),
            promoted,
            "Loaded reconciliation state"
        );
        Ok(ReconcileState {
            master,
            block_list,
            registry,
            promoted,
        })
    }

    /// Filter reflecting the current block list and registry
    pub fn filter_pipeline(&self, state: &ReconcileState) -> FilterPipeline {
        FilterPipeline::new(
            &self.filter_settings,
            state.block_list.clone(),
            state.registry.clone(),
            self.deps.time_provider.today(),
        )
    }

    /// Load, then reconcile
    pub fn run(&self, incoming: RecordSet) -> Result<ReconcileReport> {
        let state = self.load()?;
        self.reconcile(state, incoming)
    }

    /// Merge `incoming` into the master set and persist what changed
    pub fn reconcile(&self, state: ReconcileState, mut incoming: RecordSet) -> Result<ReconcileReport> {
        let fetched_nothing = incoming.is_empty();
        if fetched_nothing && state.master.is_none() {
            return Err(AppError::NothingToReconcile);
        }

        let mut report = ReconcileReport {
            incoming: incoming.len(),
            promoted: state.promoted,
            first_save: state.master.is_none(),
            ..Default::default()
        };
        let pipeline = self.filter_pipeline(&state);
        let ReconcileState {
            master,
            block_list,
            mut registry,
            promoted,
        } = state;
        let mut master = master.unwrap_or_default();

        report.dedup = self
            .detector
            .resolve_known(&registry, &mut master, &mut incoming);
        report.filtered_incoming = pipeline.filter(&mut incoming);
        report.filtered_master = pipeline.filter(&mut master);
        report
            .dedup
            .absorb(self.detector.detect(&mut master, &mut incoming, self.locale));

        let mut registry_changed = false;
        for association in &report.dedup.associations {
            registry_changed |= registry.register(association);
        }

        report.inserted = incoming.len();
        master.extend(incoming);
        report.master_size = master.len();

        if promoted > 0 {
            self.deps.block_list_store.save(&block_list)?;
            report.block_list_written = true;
        }
        if registry_changed {
            self.deps.registry_store.save(&registry)?;
            report.registry_written = true;
        }
        if fetched_nothing {
            info!(location = %self.deps.master_store.location(), "Nothing fetched, master left untouched");
        } else {
            self.deps.master_store.save(&master)?;
            report.master_written = true;
        }

        info!(
            incoming = report.incoming,
            inserted = report.inserted,
            duplicates = report.dedup.associations.len(),
            master = report.master_size,
            first_save = report.first_save,
            "Reconciliation complete"
        );
        Ok(report)
    }

    /// Replace the master set with a recovered record set.
    ///
    /// Dismissals in the current master are promoted first, and user status
    /// carries over to recovered records with the same key.
    pub fn rebuild(&self, mut recovered: RecordSet) -> Result<ReconcileReport> {
        if recovered.is_empty() {
            return Err(AppError::NothingToReconcile);
        }
        let state = self.load()?;
        let pipeline = self.filter_pipeline(&state);
        let ReconcileState {
            master,
            block_list,
            mut registry,
            promoted,
        } = state;

        if let Some(previous) = &master {
            for (key_id, record) in recovered.iter_mut() {
                if let Some(existing) = previous.get(key_id) {
                    record.status = existing.status;
                }
            }
        }

        let mut report = ReconcileReport {
            incoming: recovered.len(),
            promoted,
            first_save: master.is_none(),
            ..Default::default()
        };
        report.filtered_incoming = pipeline.filter(&mut recovered);
        report.dedup = self
            .detector
            .detect(&mut RecordSet::new(), &mut recovered, self.locale);

        let mut registry_changed = false;
        for association in &report.dedup.associations {
            registry_changed |= registry.register(association);
        }

        if promoted > 0 {
            self.deps.block_list_store.save(&block_list)?;
            report.block_list_written = true;
        }
        if registry_changed {
            self.deps.registry_store.save(&registry)?;
            report.registry_written = true;
        }
        self.deps.master_store.save(&recovered)?;
        report.master_written = true;
        report.inserted = recovered.len();
        report.master_size = recovered.len();

        info!(
            recovered = report.incoming,
            master = report.master_size,
            duplicates = report.dedup.associations.len(),
            "Master rebuilt from cache"
        );
        Ok(report)
    }
}
