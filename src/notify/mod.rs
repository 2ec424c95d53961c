//! Reload notifications.
//!
//! Lets code react after a module has been re-executed (or failed to be).

pub mod subscriber;

pub use subscriber::{ReloadEvent, ReloadEventKind, ReloadSubscribers, SubscriptionHandle};
