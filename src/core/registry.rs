//! The loaded-module registry.

use crate::core::clock::{Clock, SystemClock};
use crate::error::{ReloadError, Result};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A tracked module: where its source lives and when it was last loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadedModule {
    /// Fully-qualified module name; unique within a registry
    pub identity: String,
    /// Location of the module's source file
    pub source: PathBuf,
    /// When the module was first loaded or last successfully reloaded
    pub loaded_at: DateTime<Utc>,
}

#[derive(Default)]
struct RegistryInner {
    order: Vec<String>,
    entries: HashMap<String, LoadedModule>,
}

/// Mapping from module identity to its [`LoadedModule`] record.
///
/// Entries are created once per identity and afterwards only have their
/// timestamp refreshed; nothing is ever removed. A registry is an ordinary
/// value: share it with `Arc` between the interceptor and the reloader, and
/// create a fresh one per test.
///
/// # Examples
///
/// ```rust
/// use hotswap_modules::core::ModuleRegistry;
///
/// let registry = ModuleRegistry::new();
/// assert!(registry.record_if_absent("pkg.mod", "/tmp/pkg/mod.yaml").unwrap());
/// assert!(!registry.record_if_absent("pkg.mod", "/tmp/elsewhere.yaml").unwrap());
/// assert_eq!(registry.len(), 1);
/// ```
pub struct ModuleRegistry {
    inner: RwLock<RegistryInner>,
    clock: Arc<dyn Clock>,
}

impl ModuleRegistry {
    /// Create an empty registry stamped by the system clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty registry stamped by the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: RwLock::new(RegistryInner::default()),
            clock,
        }
    }

    /// The clock used to stamp loads.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Start tracking a module unless it is already tracked.
    ///
    /// Returns `true` if a new entry was created. When several callers race on
    /// the same identity exactly one of them creates the entry and the rest
    /// see `false`.
    ///
    /// # Errors
    ///
    /// Returns an error if the identity is malformed or the source path is empty.
    pub fn record_if_absent(&self, identity: &str, source: impl AsRef<Path>) -> Result<bool> {
        validate_identity(identity)?;
        let source = source.as_ref();
        if source.as_os_str().is_empty() {
            return Err(ReloadError::InvalidSource {
                identity: identity.to_string(),
                reason: "source path is empty".to_string(),
            });
        }

        let mut inner = self.inner.write();
        if inner.entries.contains_key(identity) {
            return Ok(false);
        }

        // Stamp under the lock so the first writer's time is the one kept
        let record = LoadedModule {
            identity: identity.to_string(),
            source: source.to_path_buf(),
            loaded_at: self.clock.now(),
        };
        inner.order.push(identity.to_string());
        inner.entries.insert(identity.to_string(), record);
        Ok(true)
    }

    /// Mark a tracked module as freshly loaded now.
    ///
    /// Returns `false` (and does nothing) if the identity is not tracked.
    pub fn refresh_timestamp(&self, identity: &str) -> bool {
        let now = self.clock.now();
        self.refresh_timestamp_at(identity, now)
    }

    /// Mark a tracked module as loaded at `at`.
    ///
    /// Timestamps never move backwards: an `at` earlier than the recorded time
    /// leaves the record unchanged.
    pub(crate) fn refresh_timestamp_at(&self, identity: &str, at: DateTime<Utc>) -> bool {
        let mut inner = self.inner.write();
        match inner.entries.get_mut(identity) {
            Some(record) => {
                record.loaded_at = record.loaded_at.max(at);
                true
            }
            None => false,
        }
    }

    /// Look up a tracked module.
    pub fn get(&self, identity: &str) -> Option<LoadedModule> {
        self.inner.read().entries.get(identity).cloned()
    }

    /// Whether the identity is tracked.
    pub fn contains(&self, identity: &str) -> bool {
        self.inner.read().entries.contains_key(identity)
    }

    /// Point-in-time copy of every record, in the order modules were first tracked.
    pub fn all_entries(&self) -> Vec<LoadedModule> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|identity| inner.entries.get(identity).cloned())
            .collect()
    }

    /// Number of tracked modules.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    /// Whether nothing is tracked yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("tracked", &self.len())
            .finish()
    }
}

/// Reject identities that could never name a module.
///
/// An identity must be non-empty, contain no whitespace, and have no empty
/// dotted segment (`"a..b"`, `".a"`, `"a."`).
pub(crate) fn validate_identity(identity: &str) -> Result<()> {
    let malformed = identity.is_empty()
        || identity.chars().any(char::is_whitespace)
        || identity.split('.').any(str::is_empty);
    if malformed {
        return Err(ReloadError::InvalidIdentity(identity.to_string()));
    }
    Ok(())
}
