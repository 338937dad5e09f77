use std::path::PathBuf;
use tracing::info;
use uscope_core::SymbolEngine;

pub async fn run(path: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let engine = SymbolEngine::new(vec![path.clone()]);

    info!("Indexing classes under: {}...", path.display());

    // Always rescan from disk; a plain collection would reuse the snapshot.
    engine.rebuild_cache().await?;

    let table = engine.snapshot().await;
    info!("Indexing complete!");
    info!("Classes: {}", table.len());

    info!("Sample classes:");
    for id in table.ids().take(10) {
        let class = table.get(id);
        match &class.parent_name {
            Some(parent) => info!(" - {} extends {}", class.name, parent),
            None => info!(" - {}", class.name),
        }
    }

    Ok(())
}
