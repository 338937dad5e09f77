//! Engine lifecycle: full collection passes, single-file re-parses and
//! cache rebuilds.
//!
//! File I/O and parsing run on blocking threads; the full pass fans out
//! over a rayon pool. Results carry the generation they were started
//! under and are dropped if a rebuild intervened.

use rayon::prelude::*;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::bus::EngineEvent;
use crate::error::{EngineError, Result};
use crate::model::{ClassSymbol, ClassTable, ParseState};
use crate::{collector, linker, parser};

use super::{Phase, SymbolEngine};

impl SymbolEngine {
    /// Run one full collection pass: walk the roots, parse every source
    /// file, link the table and publish it. Idempotent while a pass is
    /// already running or the table is ready; `rebuild_cache` forces a
    /// fresh pass.
    ///
    /// A valid snapshot short-circuits the walk entirely.
    pub async fn begin_collection(&self) -> Result<()> {
        {
            let mut phase = self
                .phase
                .lock()
                .map_err(|_| EngineError::Internal("phase lock poisoned".into()))?;
            match *phase {
                Phase::Collecting | Phase::Linking | Phase::Ready => return Ok(()),
                Phase::Idle => *phase = Phase::Collecting,
            }
        }
        let generation = self.generation.load(Ordering::SeqCst);

        let store = self.store.clone();
        let cached = tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))?;
        if let Some(mut table) = cached {
            if !self.try_set_phase(Phase::Linking, generation) {
                debug!("collection pass superseded; dropping results");
                return Ok(());
            }
            linker::link(&mut table);
            info!("restored {} classes from snapshot", table.len());
            if self.commit(table, generation).await {
                self.finish_pass();
                self.drain_reparse_queue().await?;
            }
            return Ok(());
        }

        let roots = self.roots.clone();
        let paths = tokio::task::spawn_blocking(move || collector::collect_paths(&roots))
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))?;
        let total = paths.len();
        info!("collected {total} source files");

        let bus = Arc::clone(&self.bus);
        let token = self.cancel_token.clone();
        let classes = tokio::task::spawn_blocking(move || parse_all(&paths, &bus, &token))
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))?;

        if self.cancel_token.is_cancelled() || !self.try_set_phase(Phase::Linking, generation) {
            debug!("collection pass superseded; dropping results");
            return Ok(());
        }

        let mut table = ClassTable::from_classes(classes);
        let report = linker::link(&mut table);
        if !report.is_clean() {
            warn!("linked with {} issue(s)", report.errors.len());
        }

        if self.commit(table, generation).await {
            self.save_snapshot().await;
            self.finish_pass();
            self.drain_reparse_queue().await?;
        }
        Ok(())
    }

    /// Re-parse one changed file and swap in an updated table. While the
    /// parse is in flight the class is marked `Parsing`, so resolution
    /// touching it defers instead of answering from stale symbols. Queued
    /// for later when a full pass is still running; deduplicated per path.
    pub async fn reparse_file(&self, path: PathBuf) -> Result<()> {
        if self.phase() != Phase::Ready {
            if let Ok(mut queue) = self.pending_reparse.lock() {
                if !queue.contains(&path) {
                    queue.push(path);
                }
            }
            return Ok(());
        }
        if self.in_flight.insert(path.clone(), ()).is_some() {
            debug!("re-parse of {} already in flight", path.display());
            return Ok(());
        }
        let generation = self.generation.load(Ordering::SeqCst);

        self.mark_file_state(&path, ParseState::Parsing).await;

        let parse_path = path.clone();
        let outcome = tokio::task::spawn_blocking(move || parser::parse_file(&parse_path))
            .await
            .map_err(|e| EngineError::Internal(e.to_string()));

        let result = match outcome {
            Ok(Ok(class)) => {
                if self.generation_current(generation) {
                    self.commit_reparsed(class).await;
                    self.bus
                        .publish(&EngineEvent::FileParsed { path: path.clone() });
                    self.save_snapshot().await;
                } else {
                    debug!("re-parse of {} superseded by rebuild", path.display());
                }
                Ok(())
            }
            Ok(Err(e)) => {
                // Keep the previous symbols usable rather than dropping the
                // class over one bad edit.
                warn!("re-parse of {} failed: {e}", path.display());
                self.mark_file_state(&path, ParseState::Parsed).await;
                Ok(())
            }
            Err(e) => Err(e),
        };

        self.in_flight.remove(&path);
        self.flush_deferred();
        result
    }

    /// Discard the snapshot and every in-memory symbol, then start a fresh
    /// collection pass. In-flight work from before the rebuild is dropped
    /// when it reports back.
    pub async fn rebuild_cache(&self) -> Result<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);

        let store = self.store.clone();
        if let Err(e) = tokio::task::spawn_blocking(move || store.clear())
            .await
            .map_err(|e| EngineError::Internal(e.to_string()))?
        {
            warn!("failed to clear snapshot: {e}");
        }

        {
            let mut current = self.current.write().await;
            *current = Arc::new(ClassTable::new());
        }
        self.in_flight.clear();
        if let Ok(mut queue) = self.pending_reparse.lock() {
            queue.clear();
        }
        self.set_phase(Phase::Idle);
        self.bus.publish(&EngineEvent::CacheRebuilt);

        self.begin_collection().await
    }

    /// Swap in a freshly linked table unless a rebuild superseded the pass.
    /// The generation check happens under the table lock, and the `Ready`
    /// transition goes through `try_set_phase`, so a stale pass neither
    /// clobbers the fresh pass's table nor its phase.
    async fn commit(&self, table: ClassTable, generation: u64) -> bool {
        {
            let mut current = self.current.write().await;
            if !self.generation_current(generation) {
                return false;
            }
            *current = Arc::new(table);
        }
        self.try_set_phase(Phase::Ready, generation)
    }

    async fn commit_reparsed(&self, class: ClassSymbol) {
        let mut current = self.current.write().await;
        let mut table = (**current).clone();
        table.insert(class);
        linker::link(&mut table);
        *current = Arc::new(table);
    }

    async fn mark_file_state(&self, path: &std::path::Path, state: ParseState) {
        let mut current = self.current.write().await;
        if let Some(id) = current.find_by_file(path) {
            let mut table = (**current).clone();
            table.get_mut(id).state = state;
            *current = Arc::new(table);
        }
    }

    fn finish_pass(&self) {
        self.bus.publish(&EngineEvent::ParsingFinished);
        self.flush_deferred();
    }

    async fn save_snapshot(&self) {
        let table = self.snapshot().await;
        let store = self.store.clone();
        match tokio::task::spawn_blocking(move || store.save(&table)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("failed to save snapshot: {e}"),
            Err(e) => warn!("snapshot save task failed: {e}"),
        }
    }

    async fn drain_reparse_queue(&self) -> Result<()> {
        let queued: Vec<PathBuf> = match self.pending_reparse.lock() {
            Ok(mut queue) => queue.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for path in queued {
            self.reparse_file(path).await?;
        }
        Ok(())
    }
}

/// Parse every file on the rayon pool, publishing progress per file.
/// Unreadable or headerless files are skipped with a warning.
fn parse_all(
    paths: &[PathBuf],
    bus: &crate::bus::EventBus,
    token: &tokio_util::sync::CancellationToken,
) -> Vec<ClassSymbol> {
    let done = AtomicUsize::new(0);
    let total = paths.len();
    paths
        .par_iter()
        .filter_map(|path| {
            if token.is_cancelled() {
                return None;
            }
            let outcome = parser::parse_file(path);
            let parsed = done.fetch_add(1, Ordering::SeqCst) + 1;
            bus.publish(&EngineEvent::ParsingProgress { parsed, total });
            match outcome {
                Ok(class) => Some(class),
                Err(e) => {
                    warn!("skipping {}: {e}", path.display());
                    None
                }
            }
        })
        .collect()
}
