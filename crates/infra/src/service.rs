//! Shared, thread-safe access to the catalog engine.
//!
//! One `RwLock` guards store, history and aggregation together: imports and
//! deletes take the write lock for their whole duration, reads take the read
//! lock, so readers only ever observe fully committed batches.
//!
//! Persistence happens outside that lock: a mutation captures its snapshot
//! while still holding the write lock, releases it, and only then writes the
//! snapshot out. Each capture carries a generation number and a save that is
//! older than the last one written is skipped, so disk state never moves
//! backwards even when two saves race.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::Duration;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use market_catalog::{
    Catalog, CatalogSnapshot, DeleteSummary, HistoryEntry, ImportBatch, ImportSummary, UnitStore,
    UnitTree,
};
use market_core::{DomainError, Timestamp, UnitId};

use crate::snapshot::{NoopSnapshotStore, SnapshotError, SnapshotStore};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("snapshot store: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("catalog lock poisoned")]
    LockPoisoned,
}

impl ServiceError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(e) => Some(e),
            _ => None,
        }
    }
}

pub struct CatalogService {
    catalog: RwLock<Catalog>,
    snapshots: Arc<dyn SnapshotStore>,
    /// Bumped under the write lock for every committed mutation.
    generation: AtomicU64,
    /// Generation of the last snapshot written.
    persisted: Mutex<u64>,
    sales_window: Duration,
}

/// A snapshot taken at commit time, waiting to be written.
struct PendingSnapshot {
    generation: u64,
    snapshot: CatalogSnapshot,
}

impl std::fmt::Debug for CatalogService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogService")
            .field("sales_window", &self.sales_window)
            .finish_non_exhaustive()
    }
}

impl CatalogService {
    pub const DEFAULT_SALES_WINDOW_HOURS: i64 = 24;

    /// Empty catalog, no persistence, 24h sales window.
    pub fn in_memory() -> Self {
        Self {
            catalog: RwLock::new(Catalog::in_memory()),
            snapshots: Arc::new(NoopSnapshotStore),
            generation: AtomicU64::new(0),
            persisted: Mutex::new(0),
            sales_window: Duration::hours(Self::DEFAULT_SALES_WINDOW_HOURS),
        }
    }

    /// Restore from `snapshots` (if it holds anything) and persist into it from now on.
    pub fn open(
        snapshots: Arc<dyn SnapshotStore>,
        sales_window: Duration,
    ) -> Result<Self, ServiceError> {
        let catalog: Catalog = match snapshots.load()? {
            Some(snapshot) => {
                let catalog: Catalog = Catalog::restore(snapshot)?;
                info!(
                    units = catalog.store().len(),
                    "catalog restored from snapshot"
                );
                catalog
            }
            None => Catalog::in_memory(),
        };
        Ok(Self {
            catalog: RwLock::new(catalog),
            snapshots,
            generation: AtomicU64::new(0),
            persisted: Mutex::new(0),
            sales_window,
        })
    }

    pub fn sales_window(&self) -> Duration {
        self.sales_window
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Catalog>, ServiceError> {
        self.catalog.read().map_err(|_| ServiceError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Catalog>, ServiceError> {
        self.catalog.write().map_err(|_| ServiceError::LockPoisoned)
    }

    /// Capture committed state; must be called with the write lock held.
    fn capture(&self, catalog: &Catalog) -> Option<PendingSnapshot> {
        if !self.snapshots.enabled() {
            return None;
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        match catalog.snapshot() {
            Ok(snapshot) => Some(PendingSnapshot {
                generation,
                snapshot,
            }),
            Err(e) => {
                error!(error = %e, "failed to capture catalog snapshot");
                None
            }
        }
    }

    /// Write a captured snapshot unless a newer one already made it to the store.
    fn persist(&self, pending: Option<PendingSnapshot>) {
        let Some(pending) = pending else {
            return;
        };
        let Ok(mut persisted) = self.persisted.lock() else {
            error!("snapshot writer lock poisoned");
            return;
        };
        if *persisted >= pending.generation {
            debug!(generation = pending.generation, "skipping superseded snapshot");
            return;
        }
        match self.snapshots.save(&pending.snapshot) {
            Ok(()) => *persisted = pending.generation,
            Err(e) => error!(error = %e, "failed to persist catalog snapshot"),
        }
    }

    pub fn import_batch(&self, batch: ImportBatch) -> Result<ImportSummary, ServiceError> {
        let items = batch.items.len();
        let at = batch.update_date;
        let (summary, pending) = {
            let mut catalog = self.write()?;
            match catalog.import_batch(batch) {
                Ok(summary) => (summary, self.capture(&catalog)),
                Err(e) => {
                    warn!(items, update_date = %at, error = %e, "import batch rejected");
                    return Err(e.into());
                }
            }
        };
        info!(
            items,
            update_date = %at,
            created = summary.created,
            updated = summary.updated,
            moved = summary.moved,
            recomputed = summary.categories_recomputed,
            "import batch committed"
        );
        self.persist(pending);
        Ok(summary)
    }

    pub fn delete_unit(&self, id: &UnitId) -> Result<DeleteSummary, ServiceError> {
        let (summary, pending) = {
            let mut catalog = self.write()?;
            match catalog.delete_unit(id) {
                Ok(summary) => {
                    let pending = self.capture(&catalog);
                    (summary, pending)
                }
                Err(e) => {
                    warn!(unit = %id, error = %e, "delete rejected");
                    return Err(e.into());
                }
            }
        };
        info!(
            unit = %id,
            removed_units = summary.removed_units,
            removed_history = summary.removed_history,
            recomputed = summary.categories_recomputed,
            "unit deleted"
        );
        self.persist(pending);
        Ok(summary)
    }

    pub fn get_subtree(&self, id: &UnitId) -> Result<UnitTree, ServiceError> {
        Ok(self.read()?.get_subtree(id)?)
    }

    pub fn get_statistics(
        &self,
        unit: Option<&UnitId>,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<HistoryEntry>, ServiceError> {
        Ok(self.read()?.get_statistics(unit, from, to)?)
    }

    /// Offers updated within the sales window ending at `date` (inclusive).
    pub fn sales(&self, date: Timestamp) -> Result<Vec<HistoryEntry>, ServiceError> {
        Ok(self.read()?.sales(date, self.sales_window))
    }
}

impl Default for CatalogService {
    fn default() -> Self {
        Self::in_memory()
    }
}
