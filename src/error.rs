//! Error types for hotswap-modules.

use std::path::PathBuf;

/// Result type alias for hotswap-modules operations.
pub type Result<T> = std::result::Result<T, ReloadError>;

/// Errors that can occur while tracking, resolving, or reloading modules.
#[derive(Debug, thiserror::Error)]
pub enum ReloadError {
    /// The module identity is empty or malformed.
    #[error("Invalid module identity: {0:?}")]
    InvalidIdentity(String),

    /// The module's source location cannot be tracked.
    #[error("Invalid source for module '{identity}': {reason}")]
    InvalidSource {
        /// The module whose source was rejected
        identity: String,
        /// Why the source was rejected
        reason: String,
    },

    /// A resolver in the pipeline failed outright (as opposed to not finding the module).
    #[error("Resolver '{resolver}' failed: {reason}")]
    Resolution {
        /// Name of the failing resolver
        resolver: String,
        /// The underlying failure
        reason: String,
    },

    /// No resolver in the pipeline could find the module.
    #[error("Module not found: {0}")]
    NotFound(String),

    /// Executing a module's top-level code failed.
    #[error("Failed to execute module '{identity}': {source}")]
    Execution {
        /// The module that failed to execute
        identity: String,
        /// The engine's failure
        #[source]
        source: ExecutionError,
    },

    /// Failed to load reloader settings.
    #[error("Failed to load settings: {0}")]
    Settings(String),
}

impl ReloadError {
    /// The module identity this error concerns, if any.
    pub fn identity(&self) -> Option<&str> {
        match self {
            Self::InvalidIdentity(identity)
            | Self::NotFound(identity)
            | Self::InvalidSource { identity, .. }
            | Self::Execution { identity, .. } => Some(identity.as_str()),
            Self::Resolution { .. } | Self::Settings(_) => None,
        }
    }
}

/// Failure reported by an execution engine while running a module.
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The module's source format is not supported by the engine.
    #[error("Unsupported module source: {0}")]
    Unsupported(String),

    /// The module's source could not be parsed.
    #[error("Failed to parse {}: {reason}", path.display())]
    Parse {
        /// The source file that failed to parse
        path: PathBuf,
        /// The parser's message
        reason: String,
    },

    /// Reading the module's source failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine-specific failure.
    #[error("{0}")]
    Custom(String),
}

impl ExecutionError {
    /// Create a custom execution error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}
