//! Periodic and on-demand sync triggering.

use crate::orchestrator::SyncTarget;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

/// Fires a [`SyncTarget`] on a fixed period and on request.
///
/// Each attempt runs on its own task, so a slow run never delays the timer.
/// Overlap is handled by the target's run-lock.
pub struct SyncScheduler;

impl SyncScheduler {
    /// Start the timer loop. The first tick fires immediately.
    pub fn spawn<O>(target: Arc<O>, period: Duration) -> SchedulerHandle
    where
        O: SyncTarget + 'static,
    {
        let manual = Arc::new(Notify::new());
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let wake = manual.clone();
        let task = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = wake.notified() => {
                        tracing::debug!("Manual sync requested");
                    }
                    _ = shutdown_rx.changed() => break,
                }

                let target = target.clone();
                tokio::spawn(async move {
                    target.trigger().await;
                });
            }

            tracing::debug!("Sync scheduler stopped");
        });

        tracing::info!(period_secs = period.as_secs(), "Sync scheduler started");

        SchedulerHandle {
            manual,
            shutdown: shutdown_tx,
            task,
        }
    }
}

/// Controls a running [`SyncScheduler`].
pub struct SchedulerHandle {
    manual: Arc<Notify>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Request an immediate attempt ("sync now").
    pub fn trigger_now(&self) {
        self.manual.notify_one();
    }

    /// Stop the timer loop. Attempts already started finish on their own.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::warn!(error = %e, "Sync scheduler task ended abnormally");
        }
    }
}
