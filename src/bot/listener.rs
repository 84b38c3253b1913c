//! Long-polling listener for chat commands
//!
//! Runs next to a watcher and never touches its state. Replies go back to the chat the
//! command came from, which may differ from the notification chat.

use crate::bot::commands::BotCommand;
use crate::notify::telegram::Update;
use crate::notify::TelegramClient;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Pause after a failed `getUpdates` before asking again
const ERROR_PAUSE: Duration = Duration::from_secs(1);

pub struct CommandListener {
    client: TelegramClient,
    poll_timeout: Duration,
    offset: i64,
}

impl CommandListener {
    pub fn new(client: TelegramClient, poll_timeout: Duration) -> Self {
        Self {
            client,
            poll_timeout,
            offset: 0,
        }
    }

    /// Next `update_id` to ask for
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Confirm whatever queued up while the bot was offline, without answering it.
    ///
    /// `offset = -1` returns only the newest pending update and drops older ones.
    pub async fn skip_backlog(&mut self) {
        match self.client.get_updates(-1, Duration::ZERO).await {
            Ok(updates) => {
                if let Some(newest) = updates.iter().map(|u| u.update_id).max() {
                    self.offset = self.offset.max(newest + 1);
                    debug!(offset = self.offset, "Skipped pending bot updates");
                }
            }
            Err(e) => warn!(error = %e, "Failed to skip pending bot updates"),
        }
    }

    /// Answer the commands in one batch of updates and advance the offset past them.
    ///
    /// Returns the number of replies sent.
    pub async fn handle_updates(&mut self, updates: &[Update]) -> usize {
        let mut replied = 0;

        for update in updates {
            self.offset = self.offset.max(update.update_id + 1);

            let Some(message) = &update.message else {
                continue;
            };
            let Some(command) = message.text.as_deref().and_then(BotCommand::parse) else {
                continue;
            };

            debug!(command = ?command, chat_id = message.chat.id, "Received bot command");
            match self
                .client
                .send_message(&message.chat.id.to_string(), command.reply())
                .await
            {
                Ok(()) => replied += 1,
                Err(e) => warn!(error = %e, command = ?command, "Failed to reply to command"),
            }
        }

        replied
    }

    /// Poll for commands until `cancel` fires
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            poll_timeout_secs = self.poll_timeout.as_secs(),
            "Starting command listener"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("Command listener stopped");
                return;
            }
            _ = self.skip_backlog() => {}
        }

        loop {
            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                polled = self.client.get_updates(self.offset, self.poll_timeout) => polled,
            };

            match polled {
                Ok(updates) => {
                    self.handle_updates(&updates).await;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to fetch bot updates");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(ERROR_PAUSE) => {}
                    }
                }
            }
        }

        info!("Command listener stopped");
    }
}
