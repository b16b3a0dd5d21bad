//! Weak registry of live transactional units
//!
//! Every unit is registered on creation and removed on disposal. The registry
//! keeps only [`Weak`] references paired with creation metadata, so an
//! abandoned unit is still collectable; stale entries are pruned
//! opportunistically (one per registration) and skipped by the sweep.
//!
//! The entry list is guarded by a single coarse lock; the live counter is a
//! separate atomic so a sweep never blocks registration for longer than the
//! scan itself.

use crate::clock::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::backtrace::Backtrace;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Metadata captured when a unit is registered.
#[derive(Debug)]
struct CreationInfo {
    created: Instant,
    created_at: DateTime<Utc>,
    thread: Option<String>,
    /// Captured in debug builds only
    origin: Option<Backtrace>,
}

impl CreationInfo {
    fn capture(clock: &dyn Clock) -> Self {
        CreationInfo {
            created: clock.now(),
            created_at: Utc::now(),
            thread: std::thread::current().name().map(str::to_string),
            origin: if cfg!(debug_assertions) {
                Some(Backtrace::capture())
            } else {
                None
            },
        }
    }
}

struct Entry<T: ?Sized> {
    target: Weak<T>,
    info: CreationInfo,
}

/// One still-alive unit observed by a sweep.
#[derive(Debug, Clone)]
pub struct LeakReport {
    /// Display label of the unit
    pub label: String,
    /// Age since registration
    pub age: Duration,
    /// Wall-clock registration time
    pub created_at: DateTime<Utc>,
    /// Name of the registering thread, when it had one
    pub thread: Option<String>,
    /// Rendered creation call stack (debug builds)
    pub origin: Option<String>,
}

/// Non-owning registry of live transactional units.
///
/// `started` / `remove` bracket a unit's lifetime; [`sweep`](Self::sweep)
/// reports every registered unit that is still alive, however old. The
/// tracker never keeps a target alive: entries hold [`Weak`] references and
/// entries whose target was already dropped are pruned.
pub struct LeakTracker<T: ?Sized> {
    entries: Mutex<Vec<Entry<T>>>,
    live: AtomicUsize,
    clock: Arc<dyn Clock>,
}

impl<T: ?Sized> Default for LeakTracker<T> {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl<T: ?Sized> LeakTracker<T> {
    /// Create a tracker with an injected clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        LeakTracker {
            entries: Mutex::new(Vec::new()),
            live: AtomicUsize::new(0),
            clock,
        }
    }

    /// Number of currently registered units.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Drop at most one entry whose target was already collected.
    ///
    /// Bounded to a single removal per call so registration stays cheap.
    fn prune_one_dead(entries: &mut Vec<Entry<T>>) {
        if let Some(pos) = entries.iter().position(|e| e.target.strong_count() == 0) {
            entries.swap_remove(pos);
        }
    }
}

impl<T: std::fmt::Display + Send + Sync + ?Sized> LeakTracker<T> {
    /// Register a unit at creation.
    pub fn started(&self, target: &Arc<T>) {
        let mut entries = self.entries.lock();
        Self::prune_one_dead(&mut entries);

        self.live.fetch_add(1, Ordering::SeqCst);
        entries.push(Entry {
            target: Arc::downgrade(target),
            info: CreationInfo::capture(self.clock.as_ref()),
        });

        tracing::debug!(unit = %target, live = self.live(), "tracking started");
    }

    /// Remove a unit on disposal.
    ///
    /// Identity scan over the live entries; removing a unit that was never
    /// registered (or whose entry was already pruned) is a no-op and does not
    /// disturb the counter.
    pub fn remove(&self, target: &Arc<T>) {
        let weak = Arc::downgrade(target);
        let mut entries = self.entries.lock();
        if let Some(pos) = entries.iter().position(|e| e.target.ptr_eq(&weak)) {
            entries.swap_remove(pos);
            self.live.fetch_sub(1, Ordering::SeqCst);
            tracing::debug!(unit = %target, live = self.live(), "tracking removed");
        } else {
            tracing::debug!(unit = %target, "remove for untracked unit ignored");
        }
    }

    /// Warn when a unit registered on one thread is touched from another.
    pub fn reused(&self, target: &Arc<T>) {
        let weak = Arc::downgrade(target);
        let entries = self.entries.lock();
        if let Some(entry) = entries.iter().find(|e| e.target.ptr_eq(&weak)) {
            let current = std::thread::current().name().map(str::to_string);
            if entry.info.thread != current {
                tracing::warn!(
                    unit = %target,
                    creator_thread = entry.info.thread.as_deref().unwrap_or("<unnamed>"),
                    current_thread = current.as_deref().unwrap_or("<unnamed>"),
                    "unit shared between threads"
                );
            }
        }
    }

    /// Scan for units that are still alive and report their age.
    ///
    /// No-op when nothing is registered. Strictly diagnostic: targets are
    /// upgraded only for the duration of the log line and never altered.
    pub fn sweep(&self) -> Vec<LeakReport> {
        if self.live.load(Ordering::SeqCst) == 0 {
            return Vec::new();
        }

        let now = self.clock.now();
        let entries = self.entries.lock();
        let mut reports = Vec::new();
        for entry in entries.iter() {
            let Some(target) = entry.target.upgrade() else {
                continue;
            };

            let report = LeakReport {
                label: target.to_string(),
                age: now.saturating_duration_since(entry.info.created),
                created_at: entry.info.created_at,
                thread: entry.info.thread.clone(),
                origin: entry.info.origin.as_ref().map(|b| b.to_string()),
            };

            tracing::error!(
                unit = %report.label,
                age_secs = report.age.as_secs(),
                created_at = %report.created_at,
                origin = report.origin.as_deref().unwrap_or("<release build>"),
                "unit hanging since creation"
            );

            reports.push(report);
        }
        reports
    }
}
