//! Collaborators the orchestrator hands off to after a request: routing and
//! user-visible notifications.

use tracing::{error, info};

pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Used when the host has no router; navigation requests are dropped.
pub struct MissingNavigator;

impl Navigator for MissingNavigator {
    fn navigate(&self, path: &str) {
        info!(path, "navigation requested without a navigator");
    }
}

pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
}

/// Writes notifications to the log instead of a toast area.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str) {
        info!(message, "notification");
    }

    fn error(&self, message: &str) {
        error!(message, "error notification");
    }
}
