//! Reloader settings loaded from a file and environment overrides.

use crate::engine::DEFAULT_EXTENSIONS;
use crate::error::{ReloadError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Tunables for a [`HotReloader`](crate::core::HotReloader).
///
/// Every field has a default, so a settings file only needs the keys it
/// changes.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_modules::settings::ReloadSettings;
///
/// // reload.yaml, overridden by HOTSWAP_POLL_INTERVAL_MS=250 etc.
/// let settings = ReloadSettings::load("reload.yaml", Some("HOTSWAP"))?;
/// println!("polling every {:?}", settings.poll_interval());
/// # Ok::<(), hotswap_modules::error::ReloadError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReloadSettings {
    /// Directories searched for module sources, in order
    pub search_paths: Vec<PathBuf>,
    /// Source extensions, in preference order
    pub extensions: Vec<String>,
    /// Interval between stale checks when polling
    pub poll_interval_ms: u64,
    /// Log a warning when a module's live source path differs from the
    /// path it was tracked with
    pub warn_on_divergence: bool,
}

impl Default for ReloadSettings {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            poll_interval_ms: 1000,
            warn_on_divergence: true,
        }
    }
}

impl ReloadSettings {
    /// Load settings from a YAML, TOML or JSON file, then apply environment
    /// overrides.
    ///
    /// With a prefix of `"APP"`, `APP_POLL_INTERVAL_MS=250` overrides
    /// `poll_interval_ms`; list values such as `APP_SEARCH_PATHS` are
    /// comma-separated.
    ///
    /// # Errors
    ///
    /// Returns [`ReloadError::Settings`] if the file is missing or malformed,
    /// or the merged settings are invalid.
    pub fn load(path: impl AsRef<Path>, env_prefix: Option<&str>) -> Result<Self> {
        Self::load_from(Some(path.as_ref()), env_prefix.map(environment))
    }

    /// Load settings from environment variables alone.
    ///
    /// # Errors
    ///
    /// Returns [`ReloadError::Settings`] if a variable cannot be parsed or the
    /// settings are invalid.
    pub fn from_env(prefix: &str) -> Result<Self> {
        Self::load_from(None, Some(environment(prefix)))
    }

    fn load_from(path: Option<&Path>, env: Option<Environment>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        if let Some(env) = env {
            builder = builder.add_source(env);
        }

        let settings: Self = builder
            .build()
            .map_err(|e| ReloadError::Settings(format!("failed to load settings: {}", e)))?
            .try_deserialize()
            .map_err(|e| ReloadError::Settings(format!("failed to deserialize settings: {}", e)))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Check that the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns [`ReloadError::Settings`] for a zero poll interval, an empty
    /// extension list, or an extension containing a dot.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(ReloadError::Settings(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.extensions.is_empty() {
            return Err(ReloadError::Settings(
                "at least one source extension is required".to_string(),
            ));
        }
        if let Some(bad) = self.extensions.iter().find(|e| e.is_empty() || e.contains('.')) {
            return Err(ReloadError::Settings(format!(
                "invalid extension '{}': give the bare extension, e.g. 'yaml'",
                bad
            )));
        }
        Ok(())
    }

    /// The poll interval as a [`Duration`].
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn environment(prefix: &str) -> Environment {
    Environment::with_prefix(prefix)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("search_paths")
        .with_list_parse_key("extensions")
}
