//! Parse coordination: a single engine instance owns the class table and
//! supervises all background parsing.
//!
//! Readers get cheap snapshots (Arc clone); writers build a new table and
//! atomically swap it in, so resolution never observes a half-updated
//! table. Requests that arrive before the table is ready are deferred and
//! re-signaled exactly once when the pass completes.

use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::RwLock;

use crate::bus::{EngineEvent, EventBus, EventKind};
use crate::chain;
use crate::model::{ClassTable, Declaration, VariableSymbol};
use crate::resolver::{self, Resolution, ResolutionContext};

mod lifecycle;
mod storage;

pub use storage::{SNAPSHOT_VERSION, SnapshotStore};

/// Session-level state of the engine. Per-file states live on the class
/// symbols themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Collecting,
    Linking,
    Ready,
}

#[derive(Debug, Clone)]
pub enum CompletionReply {
    Ready(Vec<Declaration>),
    NotFound { name: String },
    /// Retry after `ResolutionReady { request_id }` fires on the bus.
    Pending { request_id: u64 },
}

#[derive(Debug, Clone)]
pub enum DefinitionReply {
    Found(Declaration),
    NotFound { name: String },
    /// Retry after `ResolutionReady { request_id }` fires on the bus.
    Pending { request_id: u64 },
}

pub struct SymbolEngine {
    /// Current version of the table (MVCC: swap, never mutate in place).
    current: RwLock<Arc<ClassTable>>,
    roots: Vec<PathBuf>,
    store: SnapshotStore,
    bus: Arc<EventBus>,
    phase: Mutex<Phase>,
    /// Files with an in-flight background parse; at most one per path.
    in_flight: DashMap<PathBuf, ()>,
    /// Re-parse requests that arrived while a pass was running.
    pending_reparse: Mutex<Vec<PathBuf>>,
    /// Deferred resolution request ids, drained exactly once per pass.
    deferred: Mutex<Vec<u64>>,
    next_request_id: AtomicU64,
    /// Bumped on rebuild; results from a stale generation are dropped.
    generation: AtomicU64,
    cancel_token: tokio_util::sync::CancellationToken,
}

impl Drop for SymbolEngine {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

impl SymbolEngine {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        let store = SnapshotStore::for_roots(&roots);
        Self::with_store(roots, store)
    }

    /// Engine with an explicit snapshot location (tests, custom cache dirs).
    pub fn with_store(roots: Vec<PathBuf>, store: SnapshotStore) -> Self {
        Self {
            current: RwLock::new(Arc::new(ClassTable::new())),
            roots,
            store,
            bus: Arc::new(EventBus::new()),
            phase: Mutex::new(Phase::Idle),
            in_flight: DashMap::new(),
            pending_reparse: Mutex::new(Vec::new()),
            deferred: Mutex::new(Vec::new()),
            next_request_id: AtomicU64::new(1),
            generation: AtomicU64::new(0),
            cancel_token: tokio_util::sync::CancellationToken::new(),
        }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(kind, handler);
    }

    pub fn phase(&self) -> Phase {
        self.phase.lock().map(|p| *p).unwrap_or(Phase::Idle)
    }

    pub fn is_ready(&self) -> bool {
        self.phase() == Phase::Ready
    }

    /// Cheap snapshot of the current table.
    pub async fn snapshot(&self) -> Arc<ClassTable> {
        Arc::clone(&*self.current.read().await)
    }

    /// Context-sensitive completion candidates for the text left of the
    /// cursor. A partial final segment is dropped: completions always list
    /// the members of the type before the last dot (or the top-level scope
    /// when there is none).
    pub async fn query_completions(
        &self,
        chain_text: &str,
        locals: &[VariableSymbol],
        current_class: Option<&str>,
    ) -> CompletionReply {
        if self.phase() != Phase::Ready {
            return CompletionReply::Pending {
                request_id: self.defer_request(),
            };
        }
        let table = self.snapshot().await;
        let current = current_class.and_then(|name| table.find(name));

        let normalized = completion_scope_chain(chain_text);
        if normalized.is_empty() {
            return match resolver::toplevel_completions(&table, locals, current) {
                Ok(list) => CompletionReply::Ready(list),
                Err(_) => CompletionReply::Pending {
                    request_id: self.defer_request(),
                },
            };
        }

        let ctx = ResolutionContext {
            locals,
            current_class: current,
            chain: &normalized,
        };
        match resolver::resolve(&table, &ctx) {
            Resolution::Found(decl) => {
                let Some(scope) = decl.origin else {
                    return CompletionReply::NotFound { name: decl.name };
                };
                match resolver::completions_in(&table, scope) {
                    Ok(list) => CompletionReply::Ready(list),
                    Err(_) => CompletionReply::Pending {
                        request_id: self.defer_request(),
                    },
                }
            }
            Resolution::NotFound { name } => CompletionReply::NotFound { name },
            Resolution::Pending { .. } => CompletionReply::Pending {
                request_id: self.defer_request(),
            },
        }
    }

    /// Declaration (file + line) of the symbol the chain refers to.
    pub async fn query_definition(
        &self,
        chain_text: &str,
        locals: &[VariableSymbol],
        current_class: Option<&str>,
    ) -> DefinitionReply {
        if self.phase() != Phase::Ready {
            return DefinitionReply::Pending {
                request_id: self.defer_request(),
            };
        }
        let table = self.snapshot().await;
        let current = current_class.and_then(|name| table.find(name));
        let normalized =
            chain::strip_call_arguments(&chain::extract_relevant_chain(chain_text));

        let ctx = ResolutionContext {
            locals,
            current_class: current,
            chain: &normalized,
        };
        match resolver::resolve(&table, &ctx) {
            Resolution::Found(decl) => DefinitionReply::Found(decl),
            Resolution::NotFound { name } => DefinitionReply::NotFound { name },
            Resolution::Pending { .. } => DefinitionReply::Pending {
                request_id: self.defer_request(),
            },
        }
    }

    // ---- Deferred-request bookkeeping ----

    fn defer_request(&self) -> u64 {
        let id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut deferred) = self.deferred.lock() {
            deferred.push(id);
        }
        id
    }

    /// Signal every deferred request exactly once (drain semantics).
    pub(super) fn flush_deferred(&self) {
        let drained: Vec<u64> = match self.deferred.lock() {
            Ok(mut deferred) => deferred.drain(..).collect(),
            Err(_) => Vec::new(),
        };
        for request_id in drained {
            self.bus
                .publish(&EngineEvent::ResolutionReady { request_id });
        }
    }

    pub(super) fn set_phase(&self, phase: Phase) {
        if let Ok(mut guard) = self.phase.lock() {
            *guard = phase;
        }
    }

    /// Phase write on behalf of a pass started under `generation`. A pass
    /// superseded by a rebuild must not touch the phase: the fresh pass owns
    /// it now, and overwriting its `Ready` would strand the session.
    pub(super) fn try_set_phase(&self, phase: Phase, generation: u64) -> bool {
        let Ok(mut guard) = self.phase.lock() else {
            return false;
        };
        if !self.generation_current(generation) {
            return false;
        }
        *guard = phase;
        true
    }

    pub(super) fn generation_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }
}

/// Normalize completion input: extract the chain, collapse call arguments
/// and drop any partially typed final segment.
fn completion_scope_chain(text: &str) -> String {
    let stripped = chain::strip_call_arguments(&chain::extract_relevant_chain(text));
    if stripped.ends_with('.') {
        return stripped;
    }
    match stripped.rfind('.') {
        Some(i) => stripped[..=i].to_string(),
        None => String::new(),
    }
}
