//! The main entry point: import, list and reload modules.

use crate::core::registry::LoadedModule;
use crate::core::{ModuleRegistry, ReloadOutcome, ReloadReport, Reloader, ResolutionPipeline};
use crate::engine::ExecutionEngine;
use crate::error::{ReloadError, Result};
use crate::notify::{ReloadEvent, SubscriptionHandle};
use crate::resolvers::{Resolution, SearchContext};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::debug;

/// Ties a resolution pipeline, a registry of loaded modules and an execution
/// engine together.
///
/// Every module imported through the pipeline is tracked; `list_stale`
/// reports those whose source changed since they were loaded, and `reload`
/// re-executes them in place.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_modules::prelude::*;
/// use std::sync::Arc;
///
/// # fn example() -> Result<()> {
/// let reloader = HotReloader::builder()
///     .with_search_path("modules")
///     .build(Arc::new(ConfigEngine::new()));
///
/// let module = reloader.import("greetings")?;
/// println!("hello = {:?}", module.get_as::<String>("hello"));
///
/// // ... greetings.yaml is edited ...
///
/// for identity in reloader.list_stale() {
///     reloader.reload(&identity)?;
/// }
/// # Ok(())
/// # }
/// ```
pub struct HotReloader<E> {
    registry: Arc<ModuleRegistry>,
    pipeline: Arc<ResolutionPipeline>,
    context: SearchContext,
    engine: Arc<E>,
    reloader: Reloader<E>,
}

impl<E: ExecutionEngine> HotReloader<E> {
    pub(crate) fn from_parts(
        registry: Arc<ModuleRegistry>,
        pipeline: Arc<ResolutionPipeline>,
        context: SearchContext,
        engine: Arc<E>,
        reloader: Reloader<E>,
    ) -> Self {
        Self {
            registry,
            pipeline,
            context,
            engine,
            reloader,
        }
    }

    /// Load a module, or return it if it is already live.
    ///
    /// A first load resolves the module through the pipeline, which tracks
    /// it, and then executes it.
    ///
    /// # Errors
    ///
    /// - [`ReloadError::NotFound`] if no resolver knows the module
    /// - [`ReloadError::Resolution`] if a resolver fails
    /// - [`ReloadError::Execution`] if the module's code fails
    pub fn import(&self, identity: &str) -> Result<Arc<E::Handle>> {
        if let Some(handle) = self.engine.live_handle(identity) {
            return Ok(handle);
        }

        let resolution = self
            .resolve(identity)?
            .ok_or_else(|| ReloadError::NotFound(identity.to_string()))?;
        debug!(module = identity, resolver = resolution.resolver(), "executing module");

        self.engine
            .execute(&resolution)
            .map_err(|source| ReloadError::Execution {
                identity: identity.to_string(),
                source,
            })
    }

    /// Resolve a module through the pipeline without executing it.
    pub fn resolve(&self, identity: &str) -> Result<Option<Resolution>> {
        self.pipeline.resolve(identity, &self.context)
    }

    /// Every tracked module, in the order it was first loaded.
    pub fn list_tracked(&self) -> Vec<LoadedModule> {
        self.registry.all_entries()
    }

    /// Identities of tracked modules whose source changed since they were loaded.
    pub fn list_stale(&self) -> BTreeSet<String> {
        self.reloader.detector().compute_stale()
    }

    /// Re-execute one module in place.
    ///
    /// # Errors
    ///
    /// Returns [`ReloadError::Execution`] if the module's code fails.
    pub fn reload(&self, identity: &str) -> Result<ReloadOutcome> {
        self.reloader.reload_one(identity)
    }

    /// Re-execute every stale module. A failure does not stop the others.
    pub fn reload_all_stale(&self) -> ReloadReport {
        self.reloader.reload_all_stale()
    }

    /// Register a callback for every reload attempt.
    ///
    /// The subscription lasts until the returned handle is dropped.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&ReloadEvent) + Send + Sync + 'static,
    {
        self.reloader.subscribers().subscribe(callback)
    }

    /// The registry of tracked modules.
    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    /// The resolution pipeline, with the tracking interceptor at its front.
    pub fn pipeline(&self) -> &Arc<ResolutionPipeline> {
        &self.pipeline
    }

    /// The execution engine.
    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    /// The search context passed to every resolution.
    pub fn search_context(&self) -> &SearchContext {
        &self.context
    }
}
