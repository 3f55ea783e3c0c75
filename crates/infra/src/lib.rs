//! Infrastructure layer: shared access to the catalog engine and persistence.

pub mod service;
pub mod snapshot;

pub use service::{CatalogService, ServiceError};
pub use snapshot::{FileSnapshotStore, NoopSnapshotStore, SnapshotError, SnapshotStore};
