//! Builder for constructing HotReloader instances.

use crate::core::{
    Clock, HotReloader, ModuleRegistry, Reloader, ResolutionPipeline, StalenessDetector,
    TrackingInterceptor,
};
use crate::engine::ExecutionEngine;
use crate::notify::ReloadSubscribers;
use crate::resolvers::{FileSystemResolver, Resolver, SearchContext};
use crate::settings::ReloadSettings;
use std::path::PathBuf;
use std::sync::Arc;

#[cfg(feature = "metrics")]
use crate::metrics::ReloadMetrics;

/// Builder for constructing a `HotReloader`.
///
/// Resolvers are asked in the order they were added. When search paths are
/// configured, a [`FileSystemResolver`] is appended after them. The tracking
/// interceptor is always installed at the front of the pipeline.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_modules::prelude::*;
/// use hotswap_modules::resolvers::BuiltinResolver;
/// use std::sync::Arc;
///
/// let reloader = HotReloader::builder()
///     .with_resolver(BuiltinResolver::new().with_module("sys", [("version", "1.0")]))
///     .with_search_path("modules")
///     .with_extensions(["yaml"])
///     .build(Arc::new(ConfigEngine::new()));
/// ```
pub struct HotReloaderBuilder {
    registry: Option<Arc<ModuleRegistry>>,
    clock: Option<Arc<dyn Clock>>,
    pipeline: Option<Arc<ResolutionPipeline>>,
    resolvers: Vec<Arc<dyn Resolver>>,
    search_paths: Vec<PathBuf>,
    extensions: Option<Vec<String>>,
    warn_on_divergence: bool,
    subscribers: Option<ReloadSubscribers>,
    #[cfg(feature = "metrics")]
    metrics: Option<ReloadMetrics>,
}

impl HotReloaderBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            registry: None,
            clock: None,
            pipeline: None,
            resolvers: Vec::new(),
            search_paths: Vec::new(),
            extensions: None,
            warn_on_divergence: true,
            subscribers: None,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Track modules in an existing registry instead of a fresh one.
    ///
    /// The registry keeps its own clock; `with_clock` is ignored.
    pub fn with_registry(mut self, registry: Arc<ModuleRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Timestamp loads and reloads with this clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Install into an existing pipeline instead of a fresh one.
    ///
    /// Resolvers added with `with_resolver` are appended to it.
    pub fn with_pipeline(mut self, pipeline: Arc<ResolutionPipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Add a resolver. Resolvers are asked in the order they are added.
    pub fn with_resolver<R: Resolver + 'static>(mut self, resolver: R) -> Self {
        self.resolvers.push(Arc::new(resolver));
        self
    }

    /// Add a directory to search for module sources.
    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Restrict the filesystem resolver to these extensions, in preference order.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    /// Whether to warn when a live module's source path differs from the
    /// path it was tracked with (default: `true`).
    pub fn with_divergence_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_divergence = enabled;
        self
    }

    /// Apply loaded settings: search paths, extensions and divergence warnings.
    pub fn with_settings(mut self, settings: &ReloadSettings) -> Self {
        self.search_paths.extend(settings.search_paths.iter().cloned());
        self.extensions = Some(settings.extensions.clone());
        self.warn_on_divergence = settings.warn_on_divergence;
        self
    }

    /// Share subscribers with other components.
    pub fn with_subscribers(mut self, subscribers: ReloadSubscribers) -> Self {
        self.subscribers = Some(subscribers);
        self
    }

    /// Enable OpenTelemetry metrics for tracking and reloads.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use hotswap_modules::prelude::*;
    /// use opentelemetry::global;
    /// use std::sync::Arc;
    ///
    /// let reloader = HotReloader::builder()
    ///     .with_metrics(global::meter("my-app"))
    ///     .build(Arc::new(ConfigEngine::new()));
    /// ```
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, meter: opentelemetry::metrics::Meter) -> Self {
        self.metrics = Some(ReloadMetrics::new(meter));
        self
    }

    /// Assemble the reloader around `engine`.
    pub fn build<E: ExecutionEngine>(self, engine: Arc<E>) -> HotReloader<E> {
        let registry = match (self.registry, self.clock) {
            (Some(registry), _) => registry,
            (None, Some(clock)) => Arc::new(ModuleRegistry::with_clock(clock)),
            (None, None) => Arc::new(ModuleRegistry::new()),
        };

        let pipeline = self.pipeline.unwrap_or_default();
        for resolver in self.resolvers {
            pipeline.push(resolver);
        }
        if !self.search_paths.is_empty() {
            let mut fs = FileSystemResolver::new();
            if let Some(extensions) = &self.extensions {
                fs = fs.with_extensions(extensions.iter().cloned());
            }
            pipeline.push(Arc::new(fs));
        }

        let interceptor = TrackingInterceptor::new(Arc::clone(&registry));
        #[cfg(feature = "metrics")]
        let interceptor = match &self.metrics {
            Some(metrics) => interceptor.with_metrics(metrics.clone()),
            None => interceptor,
        };
        pipeline.install_front(Arc::new(interceptor));

        let detector = StalenessDetector::new(Arc::clone(&registry), Arc::clone(&engine))
            .with_divergence_warnings(self.warn_on_divergence);
        let reloader = Reloader::with_detector(Arc::clone(&registry), Arc::clone(&engine), detector)
            .with_subscribers(self.subscribers.unwrap_or_default());
        #[cfg(feature = "metrics")]
        let reloader = match self.metrics {
            Some(metrics) => reloader.with_metrics(metrics),
            None => reloader,
        };

        let context = SearchContext {
            search_paths: self.search_paths,
            target: None,
        };

        HotReloader::from_parts(registry, pipeline, context, engine, reloader)
    }
}

impl Default for HotReloaderBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HotReloader<()> {
    /// Create a new builder for constructing a reloader.
    pub fn builder() -> HotReloaderBuilder {
        HotReloaderBuilder::new()
    }
}
