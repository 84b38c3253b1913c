//! Log tail watcher
//!
//! Follows a container's log stream and forwards every line that matches a trigger.
//! Lines are handled one by one with no state between them. When the container is
//! missing, the stream ends or a read fails, the watcher waits `reconnect_backoff` and
//! opens a new stream.

use crate::event::LogTrigger;
use crate::monitoring::message::{format_log_event, logs_online_message};
use crate::monitoring::processor::deliver_all;
use crate::monitoring::{LineStream, LogSource};
use crate::notify::Notifier;
use crate::utils::{DeliveryError, SourceError};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Counters accumulated over a `run`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TailStats {
    /// Streams successfully opened
    pub connections: usize,
    /// Lines read across all streams
    pub lines: usize,
    /// Lines that matched a trigger
    pub matched: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// How a single stream stopped being consumed
enum StreamEnd {
    Exhausted,
    Cancelled,
}

/// Stream-based watcher for container logs
pub struct LogTailWatcher<L> {
    source: L,
    trigger: LogTrigger,
    notifier: Arc<dyn Notifier>,
    reconnect_backoff: Duration,
}

impl<L: LogSource> LogTailWatcher<L> {
    pub fn new(
        source: L,
        trigger: LogTrigger,
        notifier: Arc<dyn Notifier>,
        reconnect_backoff: Duration,
    ) -> Self {
        Self {
            source,
            trigger,
            notifier,
            reconnect_backoff,
        }
    }

    /// Send the startup announcement
    pub async fn announce_online(&self) -> Result<(), DeliveryError> {
        self.notifier
            .send(&logs_online_message(self.source.name()))
            .await
    }

    /// Match one line and notify if it triggers.
    ///
    /// Returns `None` when the line matched nothing, otherwise whether it was delivered.
    pub async fn handle_line(&self, line: &str) -> Option<bool> {
        let event = self.trigger.evaluate(self.source.name(), line)?;
        let (delivered, _) =
            deliver_all(&*self.notifier, std::slice::from_ref(&event), format_log_event).await;
        Some(delivered == 1)
    }

    /// Follow the log until `cancel` fires, reconnecting as needed
    pub async fn run(&self, cancel: CancellationToken) -> TailStats {
        let mut stats = TailStats::default();
        info!(
            source = %self.source.name(),
            triggers = ?self.trigger.patterns(),
            "Starting log tail loop"
        );

        loop {
            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                opened = self.source.open() => opened,
            };

            match opened {
                Ok(lines) => {
                    stats.connections += 1;
                    info!(source = %self.source.name(), "Log stream connected");
                    if let StreamEnd::Cancelled = self.consume(lines, &cancel, &mut stats).await {
                        break;
                    }
                    warn!(
                        source = %self.source.name(),
                        backoff_secs = self.reconnect_backoff.as_secs(),
                        "Log stream ended, reconnecting after backoff"
                    );
                }
                Err(e @ SourceError::Unavailable { .. }) => {
                    warn!(
                        error = %e,
                        backoff_secs = self.reconnect_backoff.as_secs(),
                        "Log source unavailable, retrying after backoff"
                    );
                }
                Err(e) => {
                    error!(
                        error = %e,
                        source = %self.source.name(),
                        "Failed to open log stream"
                    );
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_backoff) => {}
            }
        }

        info!(
            lines = stats.lines,
            matched = stats.matched,
            delivered = stats.delivered,
            "Log tail loop stopped"
        );
        stats
    }

    async fn consume(
        &self,
        mut lines: LineStream,
        cancel: &CancellationToken,
        stats: &mut TailStats,
    ) -> StreamEnd {
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return StreamEnd::Cancelled,
                next = lines.next() => next,
            };

            match next {
                Some(Ok(line)) => {
                    stats.lines += 1;
                    match self.handle_line(&line).await {
                        Some(true) => {
                            stats.matched += 1;
                            stats.delivered += 1;
                        }
                        Some(false) => {
                            stats.matched += 1;
                            stats.failed += 1;
                        }
                        None => {}
                    }
                }
                // Either output failing ends the whole connection.
                Some(Err(e)) => {
                    warn!(error = %e, source = %self.source.name(), "Error reading log stream");
                    return StreamEnd::Exhausted;
                }
                None => {
                    debug!(source = %self.source.name(), "Log stream exhausted");
                    return StreamEnd::Exhausted;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use futures::stream;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    type ScriptedStream = Vec<Result<&'static str, SourceError>>;

    /// Hands out scripted streams in order, then reports the container as gone
    struct ScriptedLogSource {
        script: Mutex<VecDeque<Result<ScriptedStream, SourceError>>>,
        opens: AtomicUsize,
    }

    fn lines(lines: &[&'static str]) -> Result<ScriptedStream, SourceError> {
        Ok(lines.iter().map(|line| Ok(*line)).collect())
    }

    impl ScriptedLogSource {
        fn new(script: Vec<Result<ScriptedStream, SourceError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                opens: AtomicUsize::new(0),
            }
        }
    }

    fn gone() -> SourceError {
        SourceError::Unavailable {
            source_name: "openhands-app".to_string(),
            reason: "No such container".to_string(),
        }
    }

    #[async_trait]
    impl LogSource for ScriptedLogSource {
        fn name(&self) -> &str {
            "openhands-app"
        }

        async fn open(&self) -> Result<LineStream, SourceError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front();
            match next {
                Some(Ok(items)) => Ok(stream::iter(
                    items.into_iter().map(|item| item.map(str::to_string)),
                )
                .boxed()),
                Some(Err(e)) => Err(e),
                None => Err(gone()),
            }
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct RejectingNotifier;

    #[async_trait]
    impl Notifier for RejectingNotifier {
        async fn send(&self, _text: &str) -> Result<(), DeliveryError> {
            Err(DeliveryError::Rejected {
                status: 400,
                description: "Bad Request: chat not found".to_string(),
            })
        }
    }

    fn default_trigger() -> LogTrigger {
        LogTrigger::new(["ERROR", "AgentStateChanged", "Action"])
    }

    #[tokio::test]
    async fn should_notify_only_matching_lines() {
        // Arrange
        let notifier = Arc::new(RecordingNotifier::default());
        let watcher = LogTailWatcher::new(
            ScriptedLogSource::new(vec![]),
            default_trigger(),
            notifier.clone(),
            Duration::from_secs(60),
        );

        // Act
        let quiet = watcher.handle_line("INFO: server started").await;
        let loud = watcher
            .handle_line("openhands:ERROR: agent_controller.py:230 - boom")
            .await;

        // Assert
        assert_eq!(quiet, None);
        assert_eq!(loud, Some(true));
        assert_eq!(
            *notifier.sent.lock().unwrap(),
            vec!["🚨 [ERROR] openhands:ERROR: agent_controller.py:230 - boom".to_string()]
        );
    }

    #[tokio::test]
    async fn should_report_failed_delivery_for_matching_line() {
        let watcher = LogTailWatcher::new(
            ScriptedLogSource::new(vec![]),
            default_trigger(),
            Arc::new(RejectingNotifier),
            Duration::from_secs(60),
        );

        assert_eq!(watcher.handle_line("ERROR: disk full").await, Some(false));
    }

    #[tokio::test(start_paused = true)]
    async fn should_reconnect_after_backoff_when_unavailable_or_ended() {
        // Arrange: unavailable at t=0, stream at t=60, unavailable again from t=120
        let notifier = Arc::new(RecordingNotifier::default());
        let source = ScriptedLogSource::new(vec![
            Err(gone()),
            lines(&[
                "INFO: listening on 3000",
                "AgentStateChanged: RUNNING -> AWAITING_USER_INPUT",
                "Action: CmdRunAction(ls)",
            ]),
        ]);
        let watcher = LogTailWatcher::new(
            source,
            default_trigger(),
            notifier.clone(),
            Duration::from_secs(60),
        );
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(150)).await;
            canceller.cancel();
        });

        // Act
        let stats = watcher.run(cancel).await;

        // Assert
        assert_eq!(
            stats,
            TailStats {
                connections: 1,
                lines: 3,
                matched: 2,
                delivered: 2,
                failed: 0,
            }
        );
        assert_eq!(watcher.source.opens.load(Ordering::SeqCst), 3);
        assert_eq!(notifier.sent.lock().unwrap().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn should_reconnect_when_stream_read_fails() {
        // Arrange: the first stream fails mid-way, the second one carries the alert
        let notifier = Arc::new(RecordingNotifier::default());
        let source = ScriptedLogSource::new(vec![
            Ok(vec![
                Ok("INFO: listening on 3000"),
                Err(SourceError::Io("connection reset".to_string())),
                Ok("ERROR: dropped with the broken stream"),
            ]),
            lines(&["ERROR: sandbox crashed"]),
        ]);
        let watcher = LogTailWatcher::new(
            source,
            default_trigger(),
            notifier.clone(),
            Duration::from_secs(60),
        );
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(90)).await;
            canceller.cancel();
        });

        // Act
        let stats = watcher.run(cancel).await;

        // Assert
        assert_eq!(stats.connections, 2);
        assert_eq!(stats.lines, 2);
        assert_eq!(stats.delivered, 1);
        assert_eq!(
            *notifier.sent.lock().unwrap(),
            vec!["🚨 [ERROR] ERROR: sandbox crashed".to_string()]
        );
    }

    #[tokio::test]
    async fn should_not_open_stream_when_already_cancelled() {
        let source = ScriptedLogSource::new(vec![lines(&["ERROR: never read"])]);
        let watcher = LogTailWatcher::new(
            source,
            default_trigger(),
            Arc::new(RecordingNotifier::default()),
            Duration::from_secs(60),
        );
        let cancel = CancellationToken::new();
        cancel.cancel();

        let stats = watcher.run(cancel).await;

        assert_eq!(stats, TailStats::default());
        assert_eq!(watcher.source.opens.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn should_announce_container_name() {
        let notifier = Arc::new(RecordingNotifier::default());
        let watcher = LogTailWatcher::new(
            ScriptedLogSource::new(vec![]),
            default_trigger(),
            notifier.clone(),
            Duration::from_secs(60),
        );

        watcher.announce_online().await.unwrap();

        assert_eq!(
            *notifier.sent.lock().unwrap(),
            vec!["🤖 Monitor Bot is online and watching logs of openhands-app.".to_string()]
        );
    }
}
