//! Versioned on-disk snapshots of the class table.
//!
//! One snapshot blob per source-root set, keyed by a hash of the canonical
//! root paths. The blob stores only the flat class list; inheritance links
//! are re-derived by re-running the linker after load, which keeps the
//! format version-tolerant. A corrupt or version-mismatched snapshot is
//! deleted and treated as absent, falling back to a full rescan.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use xxhash_rust::xxh3::xxh3_64;

use crate::error::{EngineError, Result};
use crate::model::{ClassSymbol, ClassTable};

pub const SNAPSHOT_VERSION: u32 = 1;
pub const DEFAULT_INDEX_DIR: &str = ".uscope/indices";

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    classes: Vec<ClassSymbol>,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    /// Store keyed by the given source-root set.
    pub fn for_roots(roots: &[PathBuf]) -> Self {
        let mut key = String::new();
        for root in roots {
            let canonical = root.canonicalize().unwrap_or_else(|_| root.clone());
            key.push_str(&canonical.to_string_lossy());
            key.push('\n');
        }
        let hash = xxh3_64(key.as_bytes());
        Self {
            path: Self::base_dir().join(format!("{hash:016x}.bin")),
        }
    }

    /// Store at an explicit file path.
    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    /// Base directory for snapshots, honoring `USCOPE_INDEX_DIR`.
    pub fn base_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("USCOPE_INDEX_DIR") {
            return PathBuf::from(dir);
        }
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        Path::new(&home).join(DEFAULT_INDEX_DIR)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Serialize and write the table atomically (tmp + rename).
    pub fn save(&self, table: &ClassTable) -> Result<()> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            classes: table.classes().to_vec(),
        };
        let bytes =
            rmp_serde::to_vec(&snapshot).map_err(|e| EngineError::Snapshot(e.to_string()))?;
        let compressed =
            zstd::encode_all(&bytes[..], 0).map_err(|e| EngineError::Snapshot(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let temp_path = self.path.with_extension("tmp");
        std::fs::write(&temp_path, compressed)?;
        std::fs::rename(temp_path, &self.path)?;

        info!("saved snapshot to {}", self.path.display());
        Ok(())
    }

    /// Load the table, or `None` when absent, corrupt or from another
    /// version. The returned table still needs a link pass.
    pub fn load(&self) -> Option<ClassTable> {
        if !self.path.exists() {
            return None;
        }
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("failed to read snapshot at {}: {e}", self.path.display());
                return None;
            }
        };

        let snapshot = zstd::decode_all(&bytes[..])
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                rmp_serde::from_slice::<Snapshot>(&raw).map_err(|e| e.to_string())
            });
        let snapshot = match snapshot {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    "failed to parse snapshot at {}: {e}. Will rescan.",
                    self.path.display()
                );
                let _ = std::fs::remove_file(&self.path);
                return None;
            }
        };

        if snapshot.version != SNAPSHOT_VERSION {
            warn!(
                "snapshot version mismatch at {} (found {}, expected {}). Will rescan.",
                self.path.display(),
                snapshot.version,
                SNAPSHOT_VERSION
            );
            let _ = std::fs::remove_file(&self.path);
            return None;
        }

        info!("loaded snapshot from {}", self.path.display());
        Some(ClassTable::from_classes(snapshot.classes))
    }

    /// Delete this store's snapshot, if present.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }

    /// Delete every snapshot under the base directory.
    pub fn clear_all() -> Result<()> {
        let base = Self::base_dir();
        if base.exists() {
            std::fs::remove_dir_all(&base)?;
        }
        Ok(())
    }
}
