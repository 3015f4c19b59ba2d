//! Snapshot persistence.
//!
//! Every mutating operation writes its post-transaction [`EngineSnapshot`]
//! through a [`SnapshotStore`] before any token moves. On startup the latest
//! snapshot is loaded and the ledger rebuilt from it.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, Mutex, PoisonError},
};

use fiatlock_ledger::LedgerSnapshot;
use fiatlock_types::{EngineConfig, FiatlockError, Result};
use serde::{Deserialize, Serialize};

use crate::supply_conservation::SupplyConservation;

/// Current snapshot format.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Everything needed to resume the engine after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub version: u32,
    pub config: EngineConfig,
    pub ledger: LedgerSnapshot,
    pub supply: SupplyConservation,
    pub paused: bool,
}

impl EngineSnapshot {
    /// # Errors
    /// Returns `Configuration` for an unknown snapshot version.
    pub fn check_version(&self) -> Result<()> {
        if self.version == SNAPSHOT_VERSION {
            Ok(())
        } else {
            Err(FiatlockError::Configuration(format!(
                "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
                self.version
            )))
        }
    }
}

pub trait SnapshotStore: Send {
    /// The latest saved snapshot, if any.
    fn load(&self) -> Result<Option<EngineSnapshot>>;

    fn save(&mut self, snapshot: &EngineSnapshot) -> Result<()>;
}

/// JSON file on disk, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileStore {
    fn load(&self) -> Result<Option<EngineSnapshot>> {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let snapshot: EngineSnapshot = serde_json::from_str(&raw)?;
        snapshot.check_version()?;
        Ok(Some(snapshot))
    }

    fn save(&mut self, snapshot: &EngineSnapshot) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(snapshot)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// In-memory store holding the serialized JSON.
///
/// Clones share the slot, so a test can hand one clone to a coordinator and
/// rebuild a second coordinator from another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<EngineSnapshot>> {
        let slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.as_deref()
            .map(|raw| {
                let snapshot: EngineSnapshot = serde_json::from_str(raw)?;
                snapshot.check_version()?;
                Ok(snapshot)
            })
            .transpose()
    }

    fn save(&mut self, snapshot: &EngineSnapshot) -> Result<()> {
        let raw = serde_json::to_string(snapshot)?;
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(raw);
        Ok(())
    }
}
