//! Periodic stale checks on a tokio runtime.

use crate::core::HotReloader;
use crate::engine::ExecutionEngine;
use crate::settings::ReloadSettings;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Background task that reloads stale modules on a fixed interval.
///
/// This polls; it does not watch the filesystem. Each tick runs
/// [`HotReloader::reload_all_stale`] on the blocking pool. The task stops
/// when [`Poller::stop`] is called or the poller is dropped.
///
/// # Examples
///
/// ```rust,no_run
/// use hotswap_modules::prelude::*;
/// use hotswap_modules::poll::Poller;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # async fn example() {
/// let reloader = Arc::new(
///     HotReloader::builder()
///         .with_search_path("modules")
///         .build(Arc::new(ConfigEngine::new())),
/// );
/// let poller = Poller::spawn(Arc::clone(&reloader), Duration::from_millis(500));
/// // ... modules are reloaded as their files change ...
/// poller.stop();
/// # }
/// ```
pub struct Poller {
    task: JoinHandle<()>,
}

impl Poller {
    /// Start polling every `interval`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn spawn<E>(reloader: Arc<HotReloader<E>>, interval: Duration) -> Self
    where
        E: ExecutionEngine + 'static,
    {
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let reloader = Arc::clone(&reloader);
                match tokio::task::spawn_blocking(move || reloader.reload_all_stale()).await {
                    Ok(report) if report.is_empty() => debug!("poll found nothing stale"),
                    Ok(report) => {
                        for failure in &report.failures {
                            warn!(module = %failure.identity, error = %failure.error, "polled reload failed");
                        }
                        info!(reloaded = report.reloaded.len(), failed = report.failures.len(), "polled reload");
                    }
                    Err(e) => warn!(error = %e, "stale check task failed"),
                }
            }
        });
        Self { task }
    }

    /// Start polling at the interval given in `settings`.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    pub fn from_settings<E>(reloader: Arc<HotReloader<E>>, settings: &ReloadSettings) -> Self
    where
        E: ExecutionEngine + 'static,
    {
        Self::spawn(reloader, settings.poll_interval())
    }

    /// Whether the polling task is still running.
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop polling. A check already in progress runs to completion.
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.task.abort();
    }
}
