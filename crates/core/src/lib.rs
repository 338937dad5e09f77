//! Incremental symbol engine for UnrealScript-style class trees.
//!
//! Source files are collected from a set of roots, parsed line by line into
//! class symbols, linked into an inheritance hierarchy and kept in a table
//! that resolution queries read through cheap snapshots. Parsing happens in
//! the background; queries that would race an unfinished parse return a
//! pending handle instead of stale or missing answers.

pub mod bus;
pub mod chain;
pub mod collector;
pub mod error;
pub mod linker;
pub mod logging;
pub mod model;
pub mod parser;
pub mod resolver;
pub mod runtime;
pub mod scope;

pub use error::{EngineError, Result};
pub use runtime::{CompletionReply, DefinitionReply, SymbolEngine};
