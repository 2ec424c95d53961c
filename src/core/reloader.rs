//! Re-execution of stale modules.

use crate::core::{ModuleRegistry, StalenessDetector};
use crate::engine::ExecutionEngine;
use crate::error::{ReloadError, Result};
use crate::notify::{ReloadEvent, ReloadEventKind, ReloadSubscribers};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[cfg(feature = "metrics")]
use crate::metrics::ReloadMetrics;

/// What `reload_one` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The module was re-executed and its load time refreshed.
    Reloaded,
    /// The module is not live; nothing was done.
    NotLoaded,
}

/// A module that failed to reload during a batch.
#[derive(Debug)]
pub struct ReloadFailure {
    /// The module that failed
    pub identity: String,
    /// Why it failed
    pub error: ReloadError,
}

/// Summary of a `reload_all_stale` batch.
#[derive(Debug, Default)]
pub struct ReloadReport {
    /// Modules that were re-executed
    pub reloaded: Vec<String>,
    /// Stale modules that were no longer live when their turn came
    pub skipped: Vec<String>,
    /// Modules whose re-execution failed; they remain stale
    pub failures: Vec<ReloadFailure>,
}

impl ReloadReport {
    /// Whether every attempted reload succeeded.
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Whether the batch found nothing to do.
    pub fn is_empty(&self) -> bool {
        self.reloaded.is_empty() && self.skipped.is_empty() && self.failures.is_empty()
    }

    /// The reloaded modules, or every failure if any module failed.
    pub fn into_result(self) -> std::result::Result<Vec<String>, Vec<ReloadFailure>> {
        if self.failures.is_empty() {
            Ok(self.reloaded)
        } else {
            Err(self.failures)
        }
    }
}

/// Re-executes modules and refreshes their load times.
///
/// A reload never loads a module for the first time: modules without a live
/// handle are left alone. A failed re-execution leaves the load time untouched
/// so the module keeps being reported stale until it is fixed and retried.
pub struct Reloader<E> {
    registry: Arc<ModuleRegistry>,
    engine: Arc<E>,
    detector: StalenessDetector<E>,
    subscribers: ReloadSubscribers,
    #[cfg(feature = "metrics")]
    metrics: Option<ReloadMetrics>,
}

impl<E: ExecutionEngine> Reloader<E> {
    /// Create a reloader for modules tracked in `registry` and run by `engine`.
    pub fn new(registry: Arc<ModuleRegistry>, engine: Arc<E>) -> Self {
        let detector = StalenessDetector::new(Arc::clone(&registry), Arc::clone(&engine));
        Self::with_detector(registry, engine, detector)
    }

    /// Create a reloader that uses a preconfigured detector.
    pub fn with_detector(registry: Arc<ModuleRegistry>, engine: Arc<E>, detector: StalenessDetector<E>) -> Self {
        Self {
            registry,
            engine,
            detector,
            subscribers: ReloadSubscribers::new(),
            #[cfg(feature = "metrics")]
            metrics: None,
        }
    }

    /// Notify these subscribers after every reload attempt.
    pub fn with_subscribers(mut self, subscribers: ReloadSubscribers) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Report reloads to the given metrics collector.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(mut self, metrics: ReloadMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// The staleness detector used by `reload_all_stale`.
    pub fn detector(&self) -> &StalenessDetector<E> {
        &self.detector
    }

    /// The subscribers notified after each reload attempt.
    pub fn subscribers(&self) -> &ReloadSubscribers {
        &self.subscribers
    }

    /// Re-execute one live module in place.
    ///
    /// # Errors
    ///
    /// Returns [`ReloadError::Execution`] if the module's code fails; its
    /// previous exports and load time are kept.
    pub fn reload_one(&self, identity: &str) -> Result<ReloadOutcome> {
        let Some(handle) = self.engine.live_handle(identity) else {
            debug!(module = identity, "not live, nothing to reload");
            return Ok(ReloadOutcome::NotLoaded);
        };

        // Stamp with the time execution began, so edits made while the module
        // runs still count as newer than the load
        let started = self.registry.clock().now();
        #[cfg(feature = "metrics")]
        let timer = self.metrics.as_ref().map(|m| m.reload_started(identity));

        match self.engine.re_execute(&handle) {
            Ok(()) => {
                self.registry.refresh_timestamp_at(identity, started);
                #[cfg(feature = "metrics")]
                if let Some(timer) = timer {
                    timer.reloaded();
                }
                info!(module = identity, "module reloaded");
                self.subscribers.notify_all(&ReloadEvent {
                    identity: identity.to_string(),
                    kind: ReloadEventKind::Reloaded,
                });
                Ok(ReloadOutcome::Reloaded)
            }
            Err(source) => {
                #[cfg(feature = "metrics")]
                if let Some(timer) = timer {
                    timer.failed(&source);
                }
                warn!(module = identity, error = %source, "module reload failed");
                self.subscribers.notify_all(&ReloadEvent {
                    identity: identity.to_string(),
                    kind: ReloadEventKind::Failed(source.to_string()),
                });
                Err(ReloadError::Execution {
                    identity: identity.to_string(),
                    source,
                })
            }
        }
    }

    /// Reload every stale module, continuing past failures.
    pub fn reload_all_stale(&self) -> ReloadReport {
        let stale = self.detector.compute_stale();
        #[cfg(feature = "metrics")]
        if let Some(metrics) = &self.metrics {
            metrics.stale_scanned(stale.len());
        }

        let mut report = ReloadReport::default();
        for identity in stale {
            match self.reload_one(&identity) {
                Ok(ReloadOutcome::Reloaded) => report.reloaded.push(identity),
                Ok(ReloadOutcome::NotLoaded) => report.skipped.push(identity),
                Err(error) => report.failures.push(ReloadFailure { identity, error }),
            }
        }

        if !report.is_empty() {
            info!(
                reloaded = report.reloaded.len(),
                skipped = report.skipped.len(),
                failed = report.failures.len(),
                "stale module reload finished"
            );
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::{ManualClock, unix_secs};
    use crate::engine::ModuleHandle;
    use crate::error::ExecutionError;
    use crate::resolvers::Resolution;
    use parking_lot::Mutex;
    use std::collections::{HashMap, HashSet};
    use std::fs::{self, File};
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, UNIX_EPOCH};
    use tempfile::TempDir;

    struct Handle {
        identity: String,
        source: PathBuf,
        runs: AtomicUsize,
    }

    impl ModuleHandle for Handle {
        fn identity(&self) -> &str {
            &self.identity
        }

        fn source_path(&self) -> Option<&Path> {
            Some(&self.source)
        }
    }

    /// Engine whose re-execution fails for identities in `broken`.
    #[derive(Default)]
    struct ScriptedEngine {
        live: Mutex<HashMap<String, Arc<Handle>>>,
        broken: Mutex<HashSet<String>>,
    }

    impl ScriptedEngine {
        fn add(&self, identity: &str, source: &Path) -> Arc<Handle> {
            let handle = Arc::new(Handle {
                identity: identity.to_string(),
                source: source.to_path_buf(),
                runs: AtomicUsize::new(1),
            });
            self.live.lock().insert(identity.to_string(), Arc::clone(&handle));
            handle
        }
    }

    impl ExecutionEngine for ScriptedEngine {
        type Handle = Handle;

        fn live_handle(&self, identity: &str) -> Option<Arc<Handle>> {
            self.live.lock().get(identity).cloned()
        }

        fn execute(&self, _resolution: &Resolution) -> std::result::Result<Arc<Handle>, ExecutionError> {
            Err(ExecutionError::custom("not used"))
        }

        fn re_execute(&self, handle: &Handle) -> std::result::Result<(), ExecutionError> {
            if self.broken.lock().contains(&handle.identity) {
                return Err(ExecutionError::custom("top-level code raised"));
            }
            handle.runs.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Fixture {
        dir: TempDir,
        clock: Arc<ManualClock>,
        registry: Arc<ModuleRegistry>,
        engine: Arc<ScriptedEngine>,
        reloader: Reloader<ScriptedEngine>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let clock = Arc::new(ManualClock::at_unix_secs(100));
            let registry = Arc::new(ModuleRegistry::with_clock(clock.clone()));
            let engine = Arc::new(ScriptedEngine::default());
            let reloader = Reloader::new(Arc::clone(&registry), Arc::clone(&engine));
            Self {
                dir,
                clock,
                registry,
                engine,
                reloader,
            }
        }

        fn load(&self, identity: &str) -> Arc<Handle> {
            let path = self.dir.path().join(format!("{identity}.src"));
            fs::write(&path, identity).unwrap();
            set_mtime(&path, 90);
            self.registry.record_if_absent(identity, &path).unwrap();
            self.engine.add(identity, &path)
        }

        fn touch(&self, identity: &str, secs: u64) {
            set_mtime(&self.dir.path().join(format!("{identity}.src")), secs);
        }
    }

    fn set_mtime(path: &Path, secs: u64) {
        let file = File::options().write(true).open(path).unwrap();
        file.set_modified(UNIX_EPOCH + Duration::from_secs(secs)).unwrap();
    }

    #[test]
    fn test_reload_clears_staleness() {
        let f = Fixture::new();
        let handle = f.load("pkg.mod");
        assert!(f.reloader.detector().compute_stale().is_empty());

        f.touch("pkg.mod", 150);
        assert!(f.reloader.detector().is_stale("pkg.mod"));

        f.clock.set(unix_secs(200));
        assert_eq!(f.reloader.reload_one("pkg.mod").unwrap(), ReloadOutcome::Reloaded);

        assert!(f.registry.get("pkg.mod").unwrap().loaded_at >= unix_secs(150));
        assert!(f.reloader.detector().compute_stale().is_empty());
        assert_eq!(handle.runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_reload_of_unloaded_module_is_noop() {
        let f = Fixture::new();
        f.load("pkg.mod");
        f.engine.live.lock().clear();
        f.clock.set(unix_secs(200));

        assert_eq!(f.reloader.reload_one("pkg.mod").unwrap(), ReloadOutcome::NotLoaded);
        assert_eq!(f.registry.get("pkg.mod").unwrap().loaded_at, unix_secs(100));
        assert_eq!(f.reloader.reload_one("never.seen").unwrap(), ReloadOutcome::NotLoaded);
    }

    #[test]
    fn test_failed_reload_keeps_timestamp() {
        let f = Fixture::new();
        f.load("pkg.mod");
        f.touch("pkg.mod", 150);
        f.engine.broken.lock().insert("pkg.mod".to_string());
        f.clock.set(unix_secs(200));

        let err = f.reloader.reload_one("pkg.mod").unwrap_err();
        assert!(matches!(err, ReloadError::Execution { ref identity, .. } if identity == "pkg.mod"));
        assert_eq!(f.registry.get("pkg.mod").unwrap().loaded_at, unix_secs(100));
        assert!(f.reloader.detector().is_stale("pkg.mod"));
    }

    #[test]
    fn test_batch_isolates_failures() {
        let f = Fixture::new();
        f.load("a");
        let b = f.load("b");
        f.load("c");
        f.touch("a", 150);
        f.touch("b", 150);
        f.engine.broken.lock().insert("a".to_string());
        f.clock.set(unix_secs(200));

        let report = f.reloader.reload_all_stale();

        assert_eq!(report.reloaded, vec!["b"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].identity, "a");
        assert!(!report.is_success());

        assert_eq!(f.registry.get("a").unwrap().loaded_at, unix_secs(100));
        assert_eq!(f.registry.get("b").unwrap().loaded_at, unix_secs(200));
        assert_eq!(f.registry.get("c").unwrap().loaded_at, unix_secs(100));
        assert_eq!(b.runs.load(Ordering::SeqCst), 2);

        let still_stale = f.reloader.detector().compute_stale();
        assert_eq!(still_stale.into_iter().collect::<Vec<_>>(), vec!["a"]);
    }

    #[test]
    fn test_nothing_stale_gives_empty_report() {
        let f = Fixture::new();
        f.load("a");
        let report = f.reloader.reload_all_stale();
        assert!(report.is_empty());
        assert_eq!(report.into_result().unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_subscribers_see_each_attempt() {
        let f = Fixture::new();
        f.load("good");
        f.load("bad");
        f.touch("good", 150);
        f.touch("bad", 150);
        f.engine.broken.lock().insert("bad".to_string());
        f.clock.set(unix_secs(200));

        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = Arc::clone(&events);
        let _handle = f.reloader.subscribers().subscribe(move |event| {
            events_clone.lock().push(event.clone());
        });

        f.reloader.reload_all_stale();

        let events = events.lock();
        assert_eq!(events.len(), 2);
        assert!(events.iter().any(|e| e.identity == "good" && e.kind == ReloadEventKind::Reloaded));
        assert!(events
            .iter()
            .any(|e| e.identity == "bad" && matches!(e.kind, ReloadEventKind::Failed(_))));
    }

    #[test]
    fn test_reload_stamps_start_of_execution() {
        let f = Fixture::new();
        f.load("pkg.mod");
        f.touch("pkg.mod", 150);
        f.clock.set(unix_secs(200));

        f.reloader.reload_one("pkg.mod").unwrap();
        assert_eq!(f.registry.get("pkg.mod").unwrap().loaded_at, unix_secs(200));
    }
}
