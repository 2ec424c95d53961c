//! Resolver trait and the values that flow through the resolution pipeline.

use crate::core::Chain;
use crate::error::Result;
use std::any::Any;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Type alias for opaque resolver payloads.
type Payload = Arc<dyn Any + Send + Sync>;

/// The outcome of asking a module name to resolve.
///
/// Besides the resolved identity and its source file, a resolution can carry
/// an opaque payload from the resolver to the execution engine (for example
/// the contents of an in-memory module).
#[derive(Clone)]
pub struct Resolution {
    identity: String,
    source: Option<PathBuf>,
    resolver: String,
    payload: Option<Payload>,
}

impl Resolution {
    /// Create a resolution for `identity` produced by the named resolver.
    pub fn new(identity: impl Into<String>, resolver: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            source: None,
            resolver: resolver.into(),
            payload: None,
        }
    }

    /// Attach the module's source location.
    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach a payload for the execution engine.
    pub fn with_payload<T: Any + Send + Sync>(mut self, payload: T) -> Self {
        self.payload = Some(Arc::new(payload));
        self
    }

    /// The resolved module identity.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Where the module's source lives, if it has one.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Name of the resolver that produced this resolution.
    pub fn resolver(&self) -> &str {
        &self.resolver
    }

    /// The payload, if one of type `T` is attached.
    pub fn payload<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.payload.as_ref().and_then(|p| p.downcast_ref::<T>())
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolution")
            .field("identity", &self.identity)
            .field("source", &self.source)
            .field("resolver", &self.resolver)
            .field("has_payload", &self.payload.is_some())
            .finish()
    }
}

/// Extra context a resolution request carries through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct SearchContext {
    /// Additional directories to search, tried before a resolver's own roots
    pub search_paths: Vec<PathBuf>,
    /// The already-loaded module this request is resolving again, if any.
    /// Passed through untouched by every participant.
    pub target: Option<String>,
}

impl SearchContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a directory to search.
    pub fn with_search_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.search_paths.push(path.into());
        self
    }

    /// Resolve on behalf of an already-loaded module.
    pub fn with_target(mut self, identity: impl Into<String>) -> Self {
        self.target = Some(identity.into());
        self
    }
}

/// What a pipeline participant decided.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// The module was resolved; stop here.
    Resolved(Resolution),
    /// This participant cannot resolve the module; ask the next one.
    Delegate,
    /// The module definitely cannot be resolved; stop here.
    NotFound,
}

/// A participant in the module resolution pipeline.
///
/// Participants are asked in order. Plain resolvers either resolve the module
/// or [`Outcome::Delegate`] to the next participant and never touch `rest`.
/// Wrapping participants (such as the tracking interceptor) may resolve
/// through `rest` themselves and observe the result.
///
/// Returning `Err` signals that the pipeline itself is broken. Such errors
/// propagate to the caller of [`ResolutionPipeline::resolve`](crate::core::ResolutionPipeline::resolve)
/// unchanged; "not found" is expressed with `Delegate` or `NotFound`, never with an error.
pub trait Resolver: Send + Sync {
    /// Human-readable name, unique within a pipeline.
    fn name(&self) -> String;

    /// Try to resolve `identity`.
    ///
    /// # Errors
    ///
    /// Returns an error only when resolution fails in a way the caller must see.
    fn try_resolve(&self, identity: &str, ctx: &SearchContext, rest: Chain<'_>) -> Result<Outcome>;
}
