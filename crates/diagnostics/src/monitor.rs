//! Periodic leak sweep task
//!
//! [`LeakMonitor`] owns a background tokio task that sweeps a
//! [`LeakTracker`] on a fixed interval after an initial delay. The task holds
//! only a weak reference to the tracker and exits when the tracker's owner
//! drops it, so the monitor is never the reason tracked state stays alive.

use crate::tracker::LeakTracker;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Sweep scheduling options.
#[derive(Debug, Clone, Copy)]
pub struct MonitorOptions {
    /// Delay before the first sweep
    pub initial_delay: Duration,
    /// Interval between sweeps
    pub period: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        MonitorOptions {
            initial_delay: Duration::from_secs(10),
            period: Duration::from_secs(5),
        }
    }
}

/// Owned handle to the background sweep task.
///
/// The task stops when [`stop`](Self::stop) is called or the handle is
/// dropped, tying the sweep's lifetime to its owner.
pub struct LeakMonitor {
    task: JoinHandle<()>,
}

impl LeakMonitor {
    /// Spawn the sweep loop on the current tokio runtime.
    pub fn start<T>(tracker: &Arc<LeakTracker<T>>, options: MonitorOptions) -> Self
    where
        T: std::fmt::Display + Send + Sync + ?Sized + 'static,
    {
        let weak: Weak<LeakTracker<T>> = Arc::downgrade(tracker);
        let task = tokio::spawn(async move {
            tokio::time::sleep(options.initial_delay).await;
            let mut ticker = tokio::time::interval(options.period);
            loop {
                ticker.tick().await;
                let Some(tracker) = weak.upgrade() else {
                    tracing::debug!("leak tracker dropped, sweep task exiting");
                    return;
                };
                tracker.sweep();
            }
        });

        LeakMonitor { task }
    }

    /// Stop the sweep task.
    pub fn stop(self) {
        self.task.abort();
    }
}

impl Drop for LeakMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}
