//! Catalog domain module: the shop-unit tree and everything derived from it.
//!
//! This crate contains the hierarchical aggregation engine, implemented purely
//! as deterministic domain logic (no IO, no HTTP, no locking):
//!
//! - `store`: the unit arena (units + parent/child edges)
//! - `history`: append-only logs of offer prices and category versions
//! - `validation`: whole-batch checks run before anything is mutated
//! - `aggregate`: dirty-ancestor worklist recomputing derived category values
//! - `query`: subtree snapshots and time-windowed statistics
//! - `catalog`: the four public operations wired together

pub mod aggregate;
pub mod catalog;
pub mod history;
pub mod import;
pub mod query;
pub mod snapshot;
pub mod store;
pub mod unit;
pub mod validation;

pub use aggregate::Aggregator;
pub use catalog::{Catalog, DeleteSummary, ImportSummary};
pub use history::{HistoryEntry, HistoryLog, InMemoryHistoryLog};
pub use import::{ImportBatch, UnitContent, UnitImport, UnitRecord, ValidatedBatch};
pub use query::UnitTree;
pub use snapshot::{CatalogSnapshot, SnapshotUnit};
pub use store::{InMemoryUnitStore, UnitStore, UpsertOutcome};
pub use unit::{PriceStats, ShopUnit, UnitBody, UnitKind};
