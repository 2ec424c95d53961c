//! OpenTelemetry instruments for tracking and reloads.

use crate::error::{ExecutionError, ReloadError};
use opentelemetry::KeyValue;
use opentelemetry::metrics::{Counter, Gauge, Histogram, Meter};
use std::time::Instant;

const MODULE: &str = "module";
const OUTCOME: &str = "outcome";
const REASON: &str = "reason";

/// Instruments recording what the tracking interceptor and reloader do.
///
/// Reload counts and durations are attributed to the module that was
/// reloaded and to how the reload ended, so a dashboard can single out a
/// module that keeps failing to parse.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_modules::metrics::ReloadMetrics;
/// use opentelemetry::global;
///
/// let metrics = ReloadMetrics::new(global::meter("hotswap-modules"));
///
/// let timer = metrics.reload_started("pkg.mod");
/// // ... re-execute pkg.mod ...
/// timer.reloaded();
/// ```
#[derive(Clone)]
pub struct ReloadMetrics {
    reloads: Counter<u64>,
    reload_duration: Histogram<f64>,
    stale_modules: Gauge<u64>,
    tracked_modules: Gauge<u64>,
    tracking_failures: Counter<u64>,
}

impl ReloadMetrics {
    /// Register the instruments on `meter`.
    pub fn new(meter: Meter) -> Self {
        Self {
            reloads: meter
                .u64_counter("hotswap_modules.reloads")
                .with_description("Module re-executions, by module and outcome")
                .build(),
            reload_duration: meter
                .f64_histogram("hotswap_modules.reload.duration")
                .with_description("Time spent re-executing a module")
                .with_unit("s")
                .build(),
            stale_modules: meter
                .u64_gauge("hotswap_modules.stale")
                .with_description("Stale modules found by the last scan")
                .build(),
            tracked_modules: meter
                .u64_gauge("hotswap_modules.tracked")
                .with_description("Modules in the registry")
                .build(),
            tracking_failures: meter
                .u64_counter("hotswap_modules.tracking.failures")
                .with_description("Resolutions the interceptor could not record")
                .build(),
        }
    }

    /// Begin timing a re-execution of `identity`.
    pub fn reload_started(&self, identity: &str) -> ReloadTimer<'_> {
        ReloadTimer {
            metrics: self,
            module: KeyValue::new(MODULE, identity.to_string()),
            started: Instant::now(),
        }
    }

    /// Record the size of a stale scan.
    pub fn stale_scanned(&self, stale: usize) {
        self.stale_modules.record(stale as u64, &[]);
    }

    /// Record the registry size after a module was tracked.
    pub fn tracked(&self, count: usize) {
        self.tracked_modules.record(count as u64, &[]);
    }

    /// Record a resolution the interceptor failed to track.
    pub fn tracking_failed(&self, error: &ReloadError) {
        let reason = match error {
            ReloadError::InvalidIdentity(_) => "invalid_identity",
            ReloadError::InvalidSource { .. } => "invalid_source",
            _ => "other",
        };
        self.tracking_failures.add(1, &[KeyValue::new(REASON, reason)]);
    }

    fn finish(&self, module: KeyValue, outcome: &'static str, started: Instant) {
        let elapsed = started.elapsed().as_secs_f64();
        let outcome = KeyValue::new(OUTCOME, outcome);
        self.reload_duration.record(elapsed, &[outcome.clone()]);
        self.reloads.add(1, &[module, outcome]);
    }
}

/// A re-execution in progress. Consume it with [`reloaded`](Self::reloaded)
/// or [`failed`](Self::failed); dropping it records nothing.
pub struct ReloadTimer<'a> {
    metrics: &'a ReloadMetrics,
    module: KeyValue,
    started: Instant,
}

impl ReloadTimer<'_> {
    /// The module was re-executed and rebound.
    pub fn reloaded(self) {
        self.metrics.finish(self.module, "reloaded", self.started);
    }

    /// The module's code failed; the outcome names the kind of failure.
    pub fn failed(self, error: &ExecutionError) {
        let outcome = match error {
            ExecutionError::Unsupported(_) => "unsupported",
            ExecutionError::Parse { .. } => "parse_error",
            ExecutionError::Io(_) => "io_error",
            ExecutionError::Custom(_) => "failed",
        };
        self.metrics.finish(self.module, outcome, self.started);
    }
}
