//! Core module tracking and reload types.

mod builder;
pub(crate) mod clock;
mod detector;
mod hot_reloader;
mod interceptor;
mod pipeline;
pub(crate) mod registry;
mod reloader;

pub use builder::HotReloaderBuilder;
pub use clock::{Clock, ManualClock, SystemClock, unix_secs};
pub use detector::StalenessDetector;
pub use hot_reloader::HotReloader;
pub use interceptor::{TRACKING_RESOLVER_NAME, TrackingInterceptor};
pub use pipeline::{Chain, ResolutionPipeline};
pub use registry::{LoadedModule, ModuleRegistry};
pub use reloader::{ReloadFailure, ReloadOutcome, ReloadReport, Reloader};
