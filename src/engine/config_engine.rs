//! Execution engine for declarative modules.

use crate::engine::{ExecutionEngine, Exports, Module};
use crate::error::ExecutionError;
use crate::resolvers::Resolution;
use config::File;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Source extensions the engine can execute by default.
pub(crate) const DEFAULT_EXTENSIONS: &[&str] = &["yaml", "yml", "toml", "json"];

/// Executes modules written as YAML, TOML or JSON documents.
///
/// "Executing" a module parses its document; every top-level key becomes an
/// exported name. Modules without a source file run from an inline
/// [`Exports`] payload attached to their resolution.
///
/// The engine keeps the table of live modules. A module enters the table on
/// its first successful execution and keeps the same [`Module`] handle for
/// the rest of its life; re-execution only swaps the handle's exports.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_modules::engine::{ConfigEngine, ExecutionEngine};
/// use hotswap_modules::resolvers::Resolution;
///
/// let engine = ConfigEngine::new();
/// let resolution = Resolution::new("settings", "fs").with_source("settings.yaml");
/// let module = engine.execute(&resolution)?;
/// println!("exports: {:?}", module.exports().names());
/// # Ok::<(), hotswap_modules::error::ExecutionError>(())
/// ```
pub struct ConfigEngine {
    modules: RwLock<HashMap<String, Arc<Module>>>,
}

impl ConfigEngine {
    /// Create an engine with no live modules.
    pub fn new() -> Self {
        Self {
            modules: RwLock::new(HashMap::new()),
        }
    }

    /// Identities of all live modules, sorted.
    pub fn live_modules(&self) -> Vec<String> {
        let mut names: Vec<_> = self.modules.read().keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Drop a module from the live table.
    ///
    /// Existing holders keep their handle, but the module is no longer live:
    /// it will not be reported stale and cannot be reloaded until imported again.
    pub fn unload(&self, identity: &str) -> Option<Arc<Module>> {
        self.modules.write().remove(identity)
    }

    fn run(&self, identity: &str, source: Option<&Path>, resolution: Option<&Resolution>) -> Result<Exports, ExecutionError> {
        if let Some(path) = source {
            return parse_source(path);
        }
        resolution
            .and_then(|r| r.payload::<Exports>())
            .cloned()
            .ok_or_else(|| {
                ExecutionError::Unsupported(format!(
                    "module '{}' has neither a source file nor inline exports",
                    identity
                ))
            })
    }
}

impl Default for ConfigEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionEngine for ConfigEngine {
    type Handle = Module;

    fn live_handle(&self, identity: &str) -> Option<Arc<Module>> {
        self.modules.read().get(identity).cloned()
    }

    fn execute(&self, resolution: &Resolution) -> Result<Arc<Module>, ExecutionError> {
        let identity = resolution.identity();
        let exports = self.run(identity, resolution.source(), Some(resolution))?;
        let module = Arc::new(Module::new(
            identity,
            resolution.source().map(Path::to_path_buf),
            exports,
        ));

        // First execution to finish wins; later ones adopt its handle
        let mut modules = self.modules.write();
        let live = modules
            .entry(identity.to_string())
            .or_insert_with(|| Arc::clone(&module));
        debug!(module = identity, generation = live.generation(), "module live");
        Ok(Arc::clone(live))
    }

    fn re_execute(&self, handle: &Module) -> Result<(), ExecutionError> {
        use crate::engine::ModuleHandle;

        let exports = match (handle.source_path(), handle.inline_definition()) {
            (Some(path), _) => parse_source(path)?,
            (None, Some(inline)) => inline.clone(),
            (None, None) => {
                return Err(ExecutionError::Unsupported(format!(
                    "module '{}' has nothing to re-execute",
                    handle.identity()
                )));
            }
        };
        handle.rebind(exports);
        debug!(module = handle.identity(), generation = handle.generation(), "module re-executed");
        Ok(())
    }
}

/// Validate that the file extension is one the engine can execute.
fn validate_extension(path: &Path) -> Result<(), ExecutionError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| {
            ExecutionError::Unsupported(format!(
                "Unable to determine module format for: {}",
                path.display()
            ))
        })?;

    if DEFAULT_EXTENSIONS.contains(&extension) {
        Ok(())
    } else {
        Err(ExecutionError::Unsupported(format!(
            "Unsupported module extension: {}. Supported: .yaml, .yml, .toml, .json",
            extension
        )))
    }
}

/// Parse a module document into its export table.
fn parse_source(path: &Path) -> Result<Exports, ExecutionError> {
    validate_extension(path)?;

    // Surface a vanished file as IO, not as a parse failure
    std::fs::metadata(path)?;

    let document = config::Config::builder()
        .add_source(File::from(path.to_path_buf()).required(true))
        .build()
        .map_err(|e| ExecutionError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let values = document
        .try_deserialize::<HashMap<String, config::Value>>()
        .map_err(|e| ExecutionError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    Ok(Exports::new(values))
}
