//! Passive revalidation.
//!
//! A background task that calls [`EntityCache::revalidate_stale`] on a fixed
//! interval and whenever the host reports that the application became
//! visible or focused again.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info};

use folio_core::logging::SUBSYSTEM_SCHEDULER;
use folio_core::{Error, Result};

use crate::cache::EntityCache;

/// Reason for a revalidation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Periodic timer.
    Interval,
    /// The application became visible again.
    VisibilityRegained,
    /// The application window regained focus.
    FocusGained,
}

/// Handle for controlling a running scheduler.
pub struct SchedulerHandle {
    trigger_tx: mpsc::Sender<Trigger>,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Report a host event that should revalidate stale entries.
    pub async fn notify(&self, trigger: Trigger) -> Result<()> {
        self.trigger_tx
            .send(trigger)
            .await
            .map_err(|_| Error::Internal("Revalidation scheduler is not running".into()))
    }

    /// Stop the scheduler and wait for its task to finish.
    pub async fn shutdown(self) -> Result<()> {
        // The task may already be gone; joining below reports that.
        let _ = self.shutdown_tx.send(()).await;
        self.task
            .await
            .map_err(|e| Error::Internal(format!("Scheduler task failed: {}", e)))
    }
}

/// Periodic and event-driven revalidation of the entity cache.
pub struct RevalidationScheduler {
    cache: EntityCache,
    interval: Duration,
}

impl RevalidationScheduler {
    /// Scheduler using the cache's configured interval.
    pub fn new(cache: EntityCache) -> Self {
        let interval = cache.config().revalidate_interval;
        Self { cache, interval }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Start the scheduler and return a handle for control.
    pub fn start(self) -> SchedulerHandle {
        let (trigger_tx, trigger_rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(self.run(trigger_rx, shutdown_rx));

        SchedulerHandle {
            trigger_tx,
            shutdown_tx,
            task,
        }
    }

    async fn run(
        self,
        mut trigger_rx: mpsc::Receiver<Trigger>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        info!(
            subsystem = SUBSYSTEM_SCHEDULER,
            interval_secs = self.interval.as_secs(),
            "Revalidation scheduler started"
        );

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = ticker.tick() => self.pass(Trigger::Interval),
                Some(trigger) = trigger_rx.recv() => self.pass(trigger),
            }
        }

        info!(subsystem = SUBSYSTEM_SCHEDULER, "Revalidation scheduler stopped");
    }

    fn pass(&self, trigger: Trigger) {
        let scheduled = self.cache.revalidate_stale();
        debug!(
            subsystem = SUBSYSTEM_SCHEDULER,
            ?trigger,
            scheduled = scheduled.len(),
            "Revalidation pass"
        );
    }
}
