//! Snapshot persistence boundary.
//!
//! The engine itself is purely in-memory; durability is a
//! whole-state snapshot written after each committed mutation.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use market_catalog::CatalogSnapshot;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io failed: {0}")]
    Io(#[from] io::Error),

    #[error("snapshot encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Where catalog snapshots live.
pub trait SnapshotStore: Send + Sync {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<CatalogSnapshot>, SnapshotError>;

    fn save(&self, snapshot: &CatalogSnapshot) -> Result<(), SnapshotError>;

    /// `false` when saves are discarded, so callers can skip capturing state.
    fn enabled(&self) -> bool {
        true
    }
}

impl<S> SnapshotStore for Arc<S>
where
    S: SnapshotStore + ?Sized,
{
    fn load(&self) -> Result<Option<CatalogSnapshot>, SnapshotError> {
        (**self).load()
    }

    fn save(&self, snapshot: &CatalogSnapshot) -> Result<(), SnapshotError> {
        (**self).save(snapshot)
    }

    fn enabled(&self) -> bool {
        (**self).enabled()
    }
}

/// Keeps nothing; for tests and ephemeral deployments.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSnapshotStore;

impl SnapshotStore for NoopSnapshotStore {
    fn load(&self) -> Result<Option<CatalogSnapshot>, SnapshotError> {
        Ok(None)
    }

    fn save(&self, _snapshot: &CatalogSnapshot) -> Result<(), SnapshotError> {
        Ok(())
    }

    fn enabled(&self) -> bool {
        false
    }
}

/// JSON file on local disk, replaced atomically via a sibling temp file.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn load(&self) -> Result<Option<CatalogSnapshot>, SnapshotError> {
        let bytes = match fs::read(&self.path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn save(&self, snapshot: &CatalogSnapshot) -> Result<(), SnapshotError> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        let tmp = self.temp_path();
        {
            let mut file = fs::File::create(&tmp)?;
            serde_json::to_writer(&mut file, snapshot)?;
            file.flush()?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}
