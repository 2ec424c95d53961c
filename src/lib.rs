//! # hotswap-modules
//!
//! Live reloading for dynamically loaded modules.
//!
//! ## Overview
//!
//! `hotswap-modules` keeps a registry of every module loaded through a
//! resolution pipeline and lets you re-execute the ones whose source changed:
//! - A tracking interceptor at the front of the pipeline records each module's
//!   identity, source file and load time
//! - Staleness is computed on demand by comparing file modification times with
//!   load times; nothing watches the filesystem
//! - Reloading re-executes a module in place, so holders of its handle see the
//!   new definitions
//! - A failing module never stops the others from reloading
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use hotswap_modules::prelude::*;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<()> {
//! let reloader = HotReloader::builder()
//!     .with_search_path("modules")
//!     .build(Arc::new(ConfigEngine::new()));
//!
//! // modules/greetings.yaml
//! let module = reloader.import("greetings")?;
//! println!("hello = {:?}", module.get_as::<String>("hello"));
//!
//! // ... edit modules/greetings.yaml ...
//!
//! let report = reloader.reload_all_stale();
//! for failure in &report.failures {
//!     eprintln!("{} failed to reload: {}", failure.identity, failure.error);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `poll` (default): a tokio task that reloads stale modules on an interval
//! - `metrics`: OpenTelemetry counters for tracking and reloads

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod engine;
pub mod error;
pub mod notify;
pub mod resolvers;
pub mod settings;

#[cfg(feature = "poll")]
pub mod poll;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{
        HotReloader, HotReloaderBuilder, LoadedModule, ReloadOutcome, ReloadReport,
    };
    pub use crate::engine::{ConfigEngine, ExecutionEngine, ModuleHandle};
    pub use crate::error::{ExecutionError, ReloadError, Result};
    pub use crate::resolvers::{Resolution, Resolver};
    pub use crate::settings::ReloadSettings;
}
