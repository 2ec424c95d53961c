//! Pipeline participant that tracks every successful resolution.

use crate::core::{Chain, ModuleRegistry};
use crate::error::Result;
use crate::resolvers::{Outcome, Resolution, Resolver, SearchContext};
use std::sync::Arc;
use tracing::{debug, warn};

#[cfg(feature = "metrics")]
use crate::metrics::ReloadMetrics;

/// Name under which the interceptor is installed in a pipeline.
pub const TRACKING_RESOLVER_NAME: &str = "tracking";

/// Observes resolutions made by the rest of the pipeline and records them in
/// a [`ModuleRegistry`].
///
/// The interceptor never resolves anything itself. It hands the request to
/// the participants behind it, records the result, and returns that result
/// untouched. Tracking is fail-open: a module that cannot be recorded still
/// resolves normally.
///
/// # Examples
///
/// ```rust
/// use hotswap_modules::core::{ModuleRegistry, ResolutionPipeline, TrackingInterceptor};
/// use hotswap_modules::resolvers::SearchContext;
/// use std::sync::Arc;
///
/// let registry = Arc::new(ModuleRegistry::new());
/// let pipeline = ResolutionPipeline::new();
/// pipeline.install_front(Arc::new(TrackingInterceptor::new(Arc::clone(&registry))));
///
/// assert!(pipeline.resolve("missing", &SearchContext::new()).unwrap().is_none());
/// assert!(registry.is_empty());
/// ```
pub struct TrackingInterceptor {
    registry: Arc<ModuleRegistry>,
    #[cfg(feature = "metrics")]
    metrics: Option<ReloadMetrics>,
}

impl TrackingInterceptor {
    /// Create an interceptor that records into `registry`.
    pub fn new(registry: Arc<ModuleRegistry>) -> Self {
        Self {
            registry,
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Report tracking activity to the given metrics collector.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: ReloadMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The registry this interceptor records into.
    pub fn registry(&self) -> &Arc<ModuleRegistry> {
        &self.registry
    }

    fn track(&self, resolution: &Resolution) {
        let Some(source) = resolution.source() else {
            debug!(module = resolution.identity(), "resolved without a source file, not tracking");
            return;
        };

        match self.registry.record_if_absent(resolution.identity(), source) {
            Ok(true) => {
                debug!(module = resolution.identity(), source = %source.display(), "tracking module");
                #[cfg(feature = "metrics")]
                if let Some(metrics) = &self.metrics {
                    metrics.tracked(self.registry.len());
                }
            }
            Ok(false) => {}
            Err(e) => {
                warn!(module = resolution.identity(), error = %e, "failed to track module");
                #[cfg(feature = "metrics")]
                if let Some(metrics) = &self.metrics {
                    metrics.tracking_failed(&e);
                }
            }
        }
    }
}

impl Resolver for TrackingInterceptor {
    fn name(&self) -> String {
        TRACKING_RESOLVER_NAME.to_string()
    }

    fn try_resolve(&self, identity: &str, ctx: &SearchContext, rest: Chain<'_>) -> Result<Outcome> {
        match rest.resolve(identity, ctx)? {
            Some(resolution) => {
                self.track(&resolution);
                Ok(Outcome::Resolved(resolution))
            }
            None => Ok(Outcome::NotFound),
        }
    }
}
