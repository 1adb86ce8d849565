//! Navigation after a completed form.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

/// Something that can move the user to another route.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str);
}

/// Logs the route instead of moving anywhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, route: &str) {
        tracing::info!(route = %route, "Navigating");
    }
}

/// Records every route it is asked to open. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RouteLog {
    routes: Arc<Mutex<Vec<String>>>,
}

impl RouteLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes visited so far, oldest first.
    #[must_use]
    pub fn routes(&self) -> Vec<String> {
        self.routes
            .lock()
            .map(|routes| routes.clone())
            .unwrap_or_default()
    }
}

impl Navigator for RouteLog {
    fn navigate(&self, route: &str) {
        if let Ok(mut routes) = self.routes.lock() {
            routes.push(route.to_string());
        }
    }
}

/// A navigation scheduled to happen after a delay.
///
/// Dropping the handle does not cancel the navigation; call
/// [`PendingRedirect::cancel`] for that.
#[derive(Debug)]
pub struct PendingRedirect {
    route: String,
    delay: Duration,
    task: JoinHandle<()>,
}

impl PendingRedirect {
    /// Spawn a task that sleeps for `delay` and then navigates to `route`.
    ///
    /// Must be called from within a Tokio runtime.
    #[must_use]
    pub fn schedule(navigator: Arc<dyn Navigator>, route: String, delay: Duration) -> Self {
        let target = route.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            debug!(route = %target, "Redirect delay elapsed");
            navigator.navigate(&target);
        });

        Self { route, delay, task }
    }

    /// Destination route.
    #[must_use]
    pub fn route(&self) -> &str {
        &self.route
    }

    /// Delay before navigating.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether the navigation has already happened (or was cancelled).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the navigation to happen.
    pub async fn wait(self) {
        if let Err(e) = self.task.await
            && !e.is_cancelled()
        {
            tracing::warn!(error = %e, "Redirect task failed");
        }
    }

    /// Abort the navigation if it has not happened yet.
    pub fn cancel(&self) {
        self.task.abort();
    }
}
