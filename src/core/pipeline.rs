//! The ordered chain of resolvers that turns module names into resolutions.

use crate::error::Result;
use crate::resolvers::{Outcome, Resolution, Resolver, SearchContext};
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Type alias for the shared resolver list.
type ResolverList = Vec<Arc<dyn Resolver>>;

/// The participants after the one currently being asked.
///
/// A participant that wants to observe what the rest of the pipeline does
/// calls [`Chain::resolve`]; plain resolvers ignore it.
#[derive(Clone, Copy)]
pub struct Chain<'a> {
    resolvers: &'a [Arc<dyn Resolver>],
}

impl<'a> Chain<'a> {
    /// A chain over the given participants.
    pub fn new(resolvers: &'a [Arc<dyn Resolver>]) -> Self {
        Self { resolvers }
    }

    /// An empty chain; resolving through it always finds nothing.
    pub fn empty() -> Self {
        Self { resolvers: &[] }
    }

    /// Ask each remaining participant in order until one resolves the module
    /// or declares it not found.
    ///
    /// # Errors
    ///
    /// Propagates the first participant error unchanged.
    pub fn resolve(&self, identity: &str, ctx: &SearchContext) -> Result<Option<Resolution>> {
        for (index, resolver) in self.resolvers.iter().enumerate() {
            let rest = Chain::new(&self.resolvers[index + 1..]);
            match resolver.try_resolve(identity, ctx, rest)? {
                Outcome::Resolved(resolution) => return Ok(Some(resolution)),
                Outcome::NotFound => return Ok(None),
                Outcome::Delegate => continue,
            }
        }
        Ok(None)
    }

    /// Number of remaining participants.
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    /// Whether no participants remain.
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

/// An ordered, atomically replaceable list of resolvers.
///
/// Resolution reads the current list without locking; installing a resolver
/// swaps in a new list, so in-flight resolutions finish against the list they
/// started with.
///
/// # Examples
///
/// ```rust
/// use hotswap_modules::core::ResolutionPipeline;
/// use hotswap_modules::resolvers::{BuiltinResolver, SearchContext};
///
/// let builtins = BuiltinResolver::new().with_module("sys", [("version", 3i64)]);
/// let pipeline = ResolutionPipeline::new().with_resolver(builtins);
///
/// let found = pipeline.resolve("sys", &SearchContext::new()).unwrap();
/// assert!(found.is_some());
/// ```
pub struct ResolutionPipeline {
    chain: ArcSwap<ResolverList>,
}

impl ResolutionPipeline {
    /// Create an empty pipeline.
    pub fn new() -> Self {
        Self {
            chain: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Append a resolver (builder style).
    pub fn with_resolver<R: Resolver + 'static>(self, resolver: R) -> Self {
        self.push(Arc::new(resolver));
        self
    }

    /// Append a resolver to the end of the chain.
    pub fn push(&self, resolver: Arc<dyn Resolver>) {
        self.chain.rcu(|current| {
            let mut next = ResolverList::clone(current);
            next.push(Arc::clone(&resolver));
            next
        });
    }

    /// Insert a resolver ahead of every existing one.
    ///
    /// Returns `false` without changing anything if a resolver with the same
    /// name is already installed.
    pub fn install_front(&self, resolver: Arc<dyn Resolver>) -> bool {
        let name = resolver.name();
        let mut installed = false;
        self.chain.rcu(|current| {
            if current.iter().any(|r| r.name() == name) {
                installed = false;
                return ResolverList::clone(current);
            }
            installed = true;
            let mut next = Vec::with_capacity(current.len() + 1);
            next.push(Arc::clone(&resolver));
            next.extend(current.iter().cloned());
            next
        });
        installed
    }

    /// Resolve a module through the whole chain.
    ///
    /// Returns `Ok(None)` when no participant can resolve it.
    ///
    /// # Errors
    ///
    /// Returns the first error raised by a participant, unchanged.
    pub fn resolve(&self, identity: &str, ctx: &SearchContext) -> Result<Option<Resolution>> {
        let resolvers = self.chain.load_full();
        Chain::new(&resolvers).resolve(identity, ctx)
    }

    /// Names of the installed resolvers, in the order they are asked.
    pub fn resolver_names(&self) -> Vec<String> {
        self.chain.load().iter().map(|r| r.name()).collect()
    }

    /// Number of installed resolvers.
    pub fn len(&self) -> usize {
        self.chain.load().len()
    }

    /// Whether no resolvers are installed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ResolutionPipeline {
    fn default() -> Self {
        Self::new()
    }
}
