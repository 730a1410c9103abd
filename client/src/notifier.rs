//! Notifier collaborator - receives sync outcomes and conflicts for display.

use quotesync_engine::ConflictEntry;
use serde::Serialize;
use tokio::sync::mpsc;

/// Result of one sync attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SyncOutcome {
    /// The local set changed
    #[serde(rename_all = "camelCase")]
    Synced {
        added: usize,
        updated: usize,
        pushed: usize,
    },
    /// Nothing to merge
    #[serde(rename_all = "camelCase")]
    UpToDate { pushed: usize },
    /// The cycle was skipped; local data is untouched
    Failed { reason: String },
}

impl SyncOutcome {
    /// Whether the attempt failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncOutcome::Failed { .. })
    }
}

/// Event delivered through a [`ChannelNotifier`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum SyncEvent {
    Outcome(SyncOutcome),
    ConflictsPending(Vec<ConflictEntry>),
}

/// Receives orchestrator results.
pub trait Notifier: Send + Sync {
    /// Called once per executed sync attempt.
    fn outcome(&self, outcome: &SyncOutcome);

    /// Called when conflicts await a manual decision.
    fn conflicts_pending(&self, conflicts: &[ConflictEntry]);
}

/// [`Notifier`] that writes to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn outcome(&self, outcome: &SyncOutcome) {
        match outcome {
            SyncOutcome::Synced {
                added,
                updated,
                pushed,
            } => tracing::info!(added, updated, pushed, "Quotes synced with server"),
            SyncOutcome::UpToDate { pushed } => {
                tracing::debug!(pushed, "Quotes already up to date")
            }
            SyncOutcome::Failed { reason } => tracing::warn!(%reason, "Sync skipped"),
        }
    }

    fn conflicts_pending(&self, conflicts: &[ConflictEntry]) {
        for conflict in conflicts {
            tracing::warn!(
                id = %conflict.id,
                local = %conflict.local.text,
                remote = %conflict.remote.text,
                "Conflict awaiting manual resolution"
            );
        }
    }
}

/// [`Notifier`] that forwards events to a UI task.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<SyncEvent>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SyncEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn send(&self, event: SyncEvent) {
        if self.sender.send(event).is_err() {
            tracing::debug!("Notification dropped, receiver closed");
        }
    }
}

impl Notifier for ChannelNotifier {
    fn outcome(&self, outcome: &SyncOutcome) {
        self.send(SyncEvent::Outcome(outcome.clone()));
    }

    fn conflicts_pending(&self, conflicts: &[ConflictEntry]) {
        self.send(SyncEvent::ConflictsPending(conflicts.to_vec()));
    }
}
