//! Poll → diff → notify loop
//!
//! One `Watcher` owns its `WatcherState` and runs strictly sequential cycles: a cycle's
//! notifications are all attempted before the next sleep starts.

use crate::event::{diff, ChangeEvent, WatcherState};
use crate::monitoring::message::{format_task_event, POLL_ONLINE_MESSAGE};
use crate::monitoring::ObservationSource;
use crate::notify::Notifier;
use crate::utils::{DeliveryError, FetchError};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

/// Where the watcher is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherPhase {
    Idle,
    Polling,
    Diffing,
    Notifying,
    Stopped,
}

/// Outcome of one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReport {
    /// Fetch failed; state untouched, nothing sent
    Skipped { reason: FetchError },
    /// Snapshot diffed and every event attempted
    Completed {
        events: usize,
        delivered: usize,
        failed: usize,
    },
}

/// Send one line per event, in order.
///
/// A failed delivery is logged and does not stop the remaining events.
/// Returns `(delivered, failed)`.
pub async fn deliver_all<F>(
    notifier: &dyn Notifier,
    events: &[ChangeEvent],
    format: F,
) -> (usize, usize)
where
    F: Fn(&ChangeEvent) -> String,
{
    let mut delivered = 0;
    let mut failed = 0;

    for event in events {
        let text = format(event);
        match notifier.send(&text).await {
            Ok(()) => delivered += 1,
            Err(e) => {
                failed += 1;
                error!(
                    error = %e,
                    item_id = %event.item_id(),
                    kind = event.kind(),
                    "Failed to deliver notification"
                );
            }
        }
    }

    (delivered, failed)
}

/// Snapshot-polling watcher
pub struct Watcher<S> {
    source: S,
    notifier: Arc<dyn Notifier>,
    state: WatcherState,
    interval: Duration,
    phase: WatcherPhase,
}

impl<S: ObservationSource> Watcher<S> {
    pub fn new(source: S, notifier: Arc<dyn Notifier>, interval: Duration) -> Self {
        Self {
            source,
            notifier,
            state: WatcherState::new(),
            interval,
            phase: WatcherPhase::Idle,
        }
    }

    /// Start from a known state instead of an empty one
    pub fn with_state(mut self, state: WatcherState) -> Self {
        self.state = state;
        self
    }

    pub fn state(&self) -> &WatcherState {
        &self.state
    }

    pub fn phase(&self) -> WatcherPhase {
        self.phase
    }

    /// Send the startup announcement
    pub async fn announce_online(&self) -> Result<(), DeliveryError> {
        self.notifier.send(POLL_ONLINE_MESSAGE).await
    }

    /// Run one fetch → diff → notify cycle without sleeping first
    #[instrument(skip(self), level = "debug")]
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.phase = WatcherPhase::Polling;
        let snapshot = match self.source.fetch().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(url = %e.url(), error = %e, "Fetch failed, skipping cycle");
                self.phase = WatcherPhase::Idle;
                return CycleReport::Skipped { reason: e };
            }
        };

        self.phase = WatcherPhase::Diffing;
        let (events, next) = diff(&self.state, &snapshot);
        self.state = next;
        debug!(
            items = snapshot.len(),
            events = events.len(),
            "Snapshot diffed"
        );

        self.phase = WatcherPhase::Notifying;
        let (delivered, failed) =
            deliver_all(&*self.notifier, &events, format_task_event).await;

        self.phase = WatcherPhase::Idle;
        CycleReport::Completed {
            events: events.len(),
            delivered,
            failed,
        }
    }

    /// Loop until `cancel` fires.
    ///
    /// Cancellation is observed during the sleep between cycles; a cycle that has
    /// started always runs to completion.
    pub async fn run(&mut self, cancel: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting polling loop..."
        );

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }

            match self.run_cycle().await {
                CycleReport::Completed {
                    events,
                    delivered,
                    failed,
                } if events > 0 => {
                    info!(events, delivered, failed, tracked = self.state.len(), "Cycle completed");
                }
                CycleReport::Completed { .. } => {
                    debug!(tracked = self.state.len(), "Cycle completed with no changes");
                }
                CycleReport::Skipped { .. } => {}
            }
        }

        self.phase = WatcherPhase::Stopped;
        info!("Polling loop stopped");
    }
}
