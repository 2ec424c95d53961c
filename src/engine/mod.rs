//! Execution engine boundary and the reference declarative engine.
//!
//! The reloader only needs three things from an engine: find the live handle
//! for a module, execute a freshly resolved module, and re-execute a live one
//! in place. [`ConfigEngine`] implements this for declarative modules written
//! as YAML, TOML or JSON documents.

mod config_engine;
mod module;

pub use config_engine::ConfigEngine;
pub(crate) use config_engine::DEFAULT_EXTENSIONS;
pub use module::{Exports, Module};

use crate::error::ExecutionError;
use crate::resolvers::Resolution;
use std::path::Path;
use std::sync::Arc;

/// The engine's live, in-memory representation of a loaded module.
pub trait ModuleHandle: Send + Sync {
    /// The module's identity.
    fn identity(&self) -> &str;

    /// The file the module was executed from, if it has one.
    fn source_path(&self) -> Option<&Path>;
}

/// Runs module code and keeps track of live module handles.
pub trait ExecutionEngine: Send + Sync {
    /// The engine's module handle type.
    type Handle: ModuleHandle;

    /// The live handle for an already loaded module.
    fn live_handle(&self, identity: &str) -> Option<Arc<Self::Handle>>;

    /// Execute a freshly resolved module for the first time and make it live.
    ///
    /// If another caller made the same module live first, its handle is
    /// returned instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the module's top-level code fails.
    fn execute(&self, resolution: &Resolution) -> Result<Arc<Self::Handle>, ExecutionError>;

    /// Re-run a live module's top-level code, rebinding its exports in place.
    ///
    /// On failure the handle keeps its previous exports.
    ///
    /// # Errors
    ///
    /// Returns an error if the module's top-level code fails.
    fn re_execute(&self, handle: &Self::Handle) -> Result<(), ExecutionError>;
}
