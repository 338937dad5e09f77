//! Typed synchronous publish/subscribe, decoupling the parse coordinator
//! from its callers (editor integration, CLI, tests).
//!
//! Handlers for one kind run in registration order; no behavior depends on
//! ordering across distinct kinds. Delivery is synchronous on the
//! publishing thread, so handlers must stay cheap.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

#[derive(Debug, Clone)]
pub enum EngineEvent {
    /// One file of the current pass finished parsing.
    ParsingProgress { parsed: usize, total: usize },
    /// The current pass completed and the table is linked and ready.
    ParsingFinished,
    /// A single file was re-parsed and committed.
    FileParsed { path: PathBuf },
    /// A previously deferred request can now be retried. Fired exactly once
    /// per deferred request id.
    ResolutionReady { request_id: u64 },
    /// All cached state was discarded; collection is restarting.
    CacheRebuilt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    ParsingProgress,
    ParsingFinished,
    FileParsed,
    ResolutionReady,
    CacheRebuilt,
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::ParsingProgress { .. } => EventKind::ParsingProgress,
            EngineEvent::ParsingFinished => EventKind::ParsingFinished,
            EngineEvent::FileParsed { .. } => EventKind::FileParsed,
            EngineEvent::ResolutionReady { .. } => EventKind::ResolutionReady,
            EngineEvent::CacheRebuilt => EventKind::CacheRebuilt,
        }
    }
}

type Handler = Box<dyn Fn(&EngineEvent) + Send + Sync>;

#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<EventKind, Vec<Handler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, kind: EventKind, handler: F)
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        if let Ok(mut handlers) = self.handlers.write() {
            handlers.entry(kind).or_default().push(Box::new(handler));
        }
    }

    pub fn publish(&self, event: &EngineEvent) {
        if let Ok(handlers) = self.handlers.read() {
            if let Some(list) = handlers.get(&event.kind()) {
                for handler in list {
                    handler(event);
                }
            }
        }
    }
}
