//! On-demand staleness detection by modification-time comparison.

use crate::core::ModuleRegistry;
use crate::core::clock::from_system_time;
use crate::core::registry::LoadedModule;
use crate::engine::{ExecutionEngine, ModuleHandle};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Finds tracked modules whose source changed after they were loaded.
///
/// A module is stale when its live handle's source file has a modification
/// time strictly later than the module's recorded load time. Modules that are
/// no longer live, have no source file, or whose file has vanished are never
/// stale. Nothing is cached: every call looks at the filesystem afresh.
pub struct StalenessDetector<E> {
    registry: Arc<ModuleRegistry>,
    engine: Arc<E>,
    warn_on_divergence: bool,
}

impl<E: ExecutionEngine> StalenessDetector<E> {
    /// Create a detector over `registry` using `engine` to find live handles.
    pub fn new(registry: Arc<ModuleRegistry>, engine: Arc<E>) -> Self {
        Self {
            registry,
            engine,
            warn_on_divergence: true,
        }
    }

    /// Whether to log a warning when a handle's source path differs from the
    /// path recorded at load time (default: `true`).
    pub fn with_divergence_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_divergence = enabled;
        self
    }

    /// Identities of every stale module.
    pub fn compute_stale(&self) -> BTreeSet<String> {
        self.registry
            .all_entries()
            .into_iter()
            .filter(|record| self.classify(record))
            .map(|record| record.identity)
            .collect()
    }

    /// Whether a single tracked module is stale.
    ///
    /// Untracked modules are never stale.
    pub fn is_stale(&self, identity: &str) -> bool {
        self.registry
            .get(identity)
            .is_some_and(|record| self.classify(&record))
    }

    fn classify(&self, record: &LoadedModule) -> bool {
        let Some(handle) = self.engine.live_handle(&record.identity) else {
            debug!(module = %record.identity, "tracked module is no longer live");
            return false;
        };
        let Some(path) = handle.source_path() else {
            return false;
        };

        if self.warn_on_divergence && path != record.source {
            warn!(
                module = %record.identity,
                recorded = %record.source.display(),
                live = %path.display(),
                "live module source differs from recorded source; using live path"
            );
        }

        match modified_time(path) {
            Some(modified) => modified > record.loaded_at,
            None => {
                debug!(module = %record.identity, path = %path.display(), "source unreadable, skipping");
                false
            }
        }
    }
}

fn modified_time(path: &Path) -> Option<chrono::DateTime<chrono::Utc>> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    Some(from_system_time(modified))
}
