//! Built-in metrics for tracking and reload operations.
//!
//! Reloads are counted and timed per module, with an `outcome` attribute
//! of `reloaded` or the kind of failure. Gauges report the size of the
//! last stale scan and of the registry.
//!
//! # Examples
//!
//! ```rust,no_run
//! use hotswap_modules::prelude::*;
//! use opentelemetry::global;
//! use std::sync::Arc;
//!
//! let meter = global::meter("my-app");
//!
//! let reloader = HotReloader::builder()
//!     .with_metrics(meter)
//!     .build(Arc::new(ConfigEngine::new()));
//! ```

mod reload_metrics;

pub use reload_metrics::{ReloadMetrics, ReloadTimer};
