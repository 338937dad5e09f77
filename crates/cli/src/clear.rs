use std::path::PathBuf;
use tracing::info;
use uscope_core::runtime::SnapshotStore;

pub fn run(path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(path) = path {
        let store = SnapshotStore::for_roots(&[path.clone()]);
        info!("Clearing snapshot for root: {}...", path.display());
        store.clear()?;
        info!("Snapshot cleared.");
    } else {
        info!(
            "Clearing all snapshots at: {}...",
            SnapshotStore::base_dir().display()
        );
        SnapshotStore::clear_all()?;
        info!("All snapshots cleared.");
    }
    Ok(())
}
