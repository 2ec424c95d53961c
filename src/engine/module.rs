//! Live module handles with atomically swappable exports.

use crate::engine::ModuleHandle;
use arc_swap::ArcSwap;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// The names a module exports and their values.
#[derive(Debug, Clone, Default)]
pub struct Exports {
    values: HashMap<String, config::Value>,
}

impl Exports {
    /// Create an export table from already parsed values.
    pub fn new(values: HashMap<String, config::Value>) -> Self {
        Self { values }
    }

    /// Create an export table from name/value pairs.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use hotswap_modules::engine::Exports;
    ///
    /// let exports = Exports::from_pairs([("answer", 42i64)]);
    /// assert_eq!(exports.get_as::<i64>("answer"), Some(42));
    /// ```
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<config::Value>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// The raw value bound to `name`.
    pub fn get(&self, name: &str) -> Option<&config::Value> {
        self.values.get(name)
    }

    /// The value bound to `name`, deserialized as `T`.
    ///
    /// Returns `None` if the name is unbound or the value does not fit `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.values
            .get(name)
            .and_then(|v| v.clone().try_deserialize::<T>().ok())
    }

    /// Whether `name` is exported.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Exported names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.values.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of exported names.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing is exported.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A live module.
///
/// Holders of an `Arc<Module>` always read through the handle, so a reload
/// that swaps in a new export table is visible to every holder at once and
/// no holder ever sees a half-built table.
pub struct Module {
    identity: String,
    source: Option<PathBuf>,
    exports: ArcSwap<Exports>,
    // Definition of a module without a source file, re-run on reload
    inline: Option<Exports>,
    generation: AtomicU64,
}

impl Module {
    /// Create a live module with its first export table.
    ///
    /// A module without a source file keeps `exports` as its inline
    /// definition; re-executing it binds that definition again.
    pub fn new(identity: impl Into<String>, source: Option<PathBuf>, exports: Exports) -> Self {
        let inline = source.is_none().then(|| exports.clone());
        Self {
            identity: identity.into(),
            source,
            exports: ArcSwap::from_pointee(exports),
            inline,
            generation: AtomicU64::new(1),
        }
    }

    /// The module's current exports.
    pub fn exports(&self) -> Arc<Exports> {
        self.exports.load_full()
    }

    /// The current value bound to `name`.
    pub fn get(&self, name: &str) -> Option<config::Value> {
        self.exports.load().get(name).cloned()
    }

    /// The current value bound to `name`, deserialized as `T`.
    pub fn get_as<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        self.exports.load().get_as(name)
    }

    /// How many times the module's code has run successfully.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub(crate) fn inline_definition(&self) -> Option<&Exports> {
        self.inline.as_ref()
    }

    /// Atomically replace the export table.
    pub(crate) fn rebind(&self, exports: Exports) {
        self.exports.store(Arc::new(exports));
        self.generation.fetch_add(1, Ordering::AcqRel);
    }
}

impl ModuleHandle for Module {
    fn identity(&self) -> &str {
        &self.identity
    }

    fn source_path(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("identity", &self.identity)
            .field("source", &self.source)
            .field("generation", &self.generation())
            .finish()
    }
}
