//! Filesystem resolver mapping dotted module names to source files.

use crate::core::Chain;
use crate::engine::DEFAULT_EXTENSIONS;
use crate::error::Result;
use crate::resolvers::{Outcome, Resolution, Resolver, SearchContext};
use std::path::{Path, PathBuf};

/// Resolves `pkg.mod` to `<root>/pkg/mod.<ext>`.
///
/// Directories from the request's [`SearchContext`] are searched first, then
/// the resolver's own roots, each in order. Within a directory extensions are
/// tried in order. The first existing file wins; its canonical path becomes
/// the module's source.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_modules::resolvers::FileSystemResolver;
///
/// let resolver = FileSystemResolver::new()
///     .with_root("modules")
///     .with_extensions(["yaml", "toml"]);
/// ```
pub struct FileSystemResolver {
    roots: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl FileSystemResolver {
    /// Create a resolver with no roots that accepts every format the
    /// reference engine can execute.
    pub fn new() -> Self {
        Self {
            roots: Vec::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    /// Add a directory to search.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.roots.push(root.into());
        self
    }

    /// Replace the list of source extensions, in preference order.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// The directories this resolver searches on its own.
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Find the source file for `identity`, if any.
    pub fn locate(&self, identity: &str, ctx: &SearchContext) -> Option<PathBuf> {
        let relative = relative_path(identity)?;
        let relative = &relative;
        ctx.search_paths
            .iter()
            .chain(self.roots.iter())
            .flat_map(|dir| {
                self.extensions
                    .iter()
                    .map(move |ext| dir.join(relative).with_extension(ext))
            })
            .find(|candidate| candidate.is_file())
            .map(|found| found.canonicalize().unwrap_or(found))
    }
}

impl Default for FileSystemResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl Resolver for FileSystemResolver {
    fn name(&self) -> String {
        "fs".to_string()
    }

    fn try_resolve(&self, identity: &str, ctx: &SearchContext, _rest: Chain<'_>) -> Result<Outcome> {
        Ok(match self.locate(identity, ctx) {
            Some(path) => Outcome::Resolved(Resolution::new(identity, self.name()).with_source(path)),
            None => Outcome::Delegate,
        })
    }
}

/// `pkg.sub.mod` -> `pkg/sub/mod`; `None` for names with empty segments.
fn relative_path(identity: &str) -> Option<PathBuf> {
    if identity.is_empty() {
        return None;
    }
    let mut path = PathBuf::new();
    for segment in identity.split('.') {
        if segment.is_empty() || Path::new(segment).components().count() != 1 {
            return None;
        }
        path.push(segment);
    }
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_relative_path() {
        assert_eq!(relative_path("pkg.mod"), Some(PathBuf::from("pkg/mod")));
        assert_eq!(relative_path("ModuleA"), Some(PathBuf::from("ModuleA")));
        assert_eq!(relative_path(""), None);
        assert_eq!(relative_path("pkg..mod"), None);
        assert_eq!(relative_path("pkg/evil"), None);
    }

    #[test]
    fn test_resolves_nested_module() {
        let temp_dir = TempDir::new().unwrap();
        fs::create_dir_all(temp_dir.path().join("pkg")).unwrap();
        fs::write(temp_dir.path().join("pkg/mod.yaml"), "a: 1\n").unwrap();

        let resolver = FileSystemResolver::new().with_root(temp_dir.path());
        let outcome = resolver
            .try_resolve("pkg.mod", &SearchContext::new(), Chain::empty())
            .unwrap();

        match outcome {
            Outcome::Resolved(resolution) => {
                assert_eq!(resolution.identity(), "pkg.mod");
                assert_eq!(resolution.resolver(), "fs");
                let source = resolution.source().unwrap();
                assert!(source.is_absolute());
                assert!(source.ends_with("pkg/mod.yaml"));
            }
            other => panic!("expected resolution, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_module_delegates() {
        let temp_dir = TempDir::new().unwrap();
        let resolver = FileSystemResolver::new().with_root(temp_dir.path());
        let outcome = resolver
            .try_resolve("nope", &SearchContext::new(), Chain::empty())
            .unwrap();
        assert!(matches!(outcome, Outcome::Delegate));
    }

    #[test]
    fn test_extension_preference() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("m.json"), "{}").unwrap();
        fs::write(temp_dir.path().join("m.toml"), "").unwrap();

        let resolver = FileSystemResolver::new()
            .with_root(temp_dir.path())
            .with_extensions(["toml", "json"]);
        let found = resolver.locate("m", &SearchContext::new()).unwrap();
        assert_eq!(found.extension().unwrap(), "toml");
    }

    #[test]
    fn test_context_paths_searched_first() {
        let root = TempDir::new().unwrap();
        let extra = TempDir::new().unwrap();
        fs::write(root.path().join("m.yaml"), "a: 1\n").unwrap();
        fs::write(extra.path().join("m.yaml"), "a: 2\n").unwrap();

        let resolver = FileSystemResolver::new().with_root(root.path());
        let ctx = SearchContext::new().with_search_path(extra.path());
        let found = resolver.locate("m", &ctx).unwrap();
        assert!(found.starts_with(extra.path().canonicalize().unwrap()));
    }
}
