//! Resolver for in-memory modules that have no source file.

use crate::core::Chain;
use crate::engine::Exports;
use crate::error::Result;
use crate::resolvers::{Outcome, Resolution, Resolver, SearchContext};
use std::collections::HashMap;

/// Serves modules defined in memory.
///
/// Builtin modules resolve without a source location, so they are never
/// tracked and never reported stale. Their exports travel to the engine as
/// the resolution payload.
///
/// # Examples
///
/// ```rust
/// use hotswap_modules::resolvers::BuiltinResolver;
///
/// let resolver = BuiltinResolver::new()
///     .with_module("sys", [("platform", "linux")]);
/// assert!(resolver.contains("sys"));
/// ```
#[derive(Default)]
pub struct BuiltinResolver {
    modules: HashMap<String, Exports>,
}

impl BuiltinResolver {
    /// Create a resolver with no modules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Define a builtin module from name/value pairs.
    pub fn with_module<I, K, V>(mut self, identity: impl Into<String>, exports: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<config::Value>,
    {
        self.modules.insert(identity.into(), Exports::from_pairs(exports));
        self
    }

    /// Define a builtin module from an export table.
    pub fn with_exports(mut self, identity: impl Into<String>, exports: Exports) -> Self {
        self.modules.insert(identity.into(), exports);
        self
    }

    /// Whether a builtin module with this identity exists.
    pub fn contains(&self, identity: &str) -> bool {
        self.modules.contains_key(identity)
    }
}

impl Resolver for BuiltinResolver {
    fn name(&self) -> String {
        "builtin".to_string()
    }

    fn try_resolve(&self, identity: &str, _ctx: &SearchContext, _rest: Chain<'_>) -> Result<Outcome> {
        Ok(match self.modules.get(identity) {
            Some(exports) => {
                Outcome::Resolved(Resolution::new(identity, self.name()).with_payload(exports.clone()))
            }
            None => Outcome::Delegate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_without_source() {
        let resolver = BuiltinResolver::new().with_module("sys", [("platform", "linux")]);
        let outcome = resolver
            .try_resolve("sys", &SearchContext::new(), Chain::empty())
            .unwrap();

        let Outcome::Resolved(resolution) = outcome else {
            panic!("expected resolution");
        };
        assert!(resolution.source().is_none());
        let exports = resolution.payload::<Exports>().unwrap();
        assert_eq!(exports.get_as::<String>("platform").as_deref(), Some("linux"));
    }

    #[test]
    fn test_unknown_delegates() {
        let resolver = BuiltinResolver::new();
        let outcome = resolver
            .try_resolve("sys", &SearchContext::new(), Chain::empty())
            .unwrap();
        assert!(matches!(outcome, Outcome::Delegate));
    }
}
