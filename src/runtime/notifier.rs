//! Progress reporting for long-running runtime operations

use tracing::info;

/// Receives human-readable progress messages
///
/// Messages carry no control information; implementations may render or drop them.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Forwards messages to the `tracing` subscriber at info level
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, message: &str) {
        info!("{}", message);
    }
}

/// Discards every message
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn notify(&self, _message: &str) {}
}
