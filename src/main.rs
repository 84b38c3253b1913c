use monitor_bot::bot::CommandListener;
use monitor_bot::config::{AppConfig, WatchMode};
use monitor_bot::event::LogTrigger;
use monitor_bot::monitoring::{DockerLogSource, HttpConversationSource, LogTailWatcher, Watcher};
use monitor_bot::notify::{Notifier, RetryingNotifier, TelegramClient};
use monitor_bot::shutdown::shutdown_signal;
use monitor_bot::utils::{init_logging, LogSettings};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Long-poll timeout for bot commands
const COMMAND_POLL_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> ExitCode {
    // 1. Environment
    dotenvy::dotenv().ok();

    // 2. Logging
    let _guard = init_logging(&LogSettings::from_env());

    // 3. Configuration
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Configuration error");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        mode = ?config.watch_mode,
        api_base_url = %config.api_base_url,
        "Configuration loaded"
    );

    // 4. Transport
    let telegram = TelegramClient::new(
        config.telegram_api_url.as_str(),
        config.bot_token.as_str(),
        config.chat_id.as_str(),
    );
    let notifier: Arc<dyn Notifier> =
        Arc::new(RetryingNotifier::new(telegram.clone(), config.retry));

    // 5. Shutdown
    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    let commands = if config.commands_enabled {
        let listener = CommandListener::new(telegram, COMMAND_POLL_TIMEOUT);
        Some(tokio::spawn(listener.run(cancel.clone())))
    } else {
        None
    };

    // 6. Watch
    match config.watch_mode {
        WatchMode::Poll => {
            let source = HttpConversationSource::new(&config.api_base_url, config.fetch_timeout);
            let mut watcher = Watcher::new(source, notifier, config.poll_interval);
            if let Err(e) = watcher.announce_online().await {
                tracing::error!(error = %e, "Failed to send online announcement");
            }
            watcher.run(cancel.clone()).await;
        }
        WatchMode::Logs => {
            // Checked by AppConfig in logs mode.
            let container = config.container_name.clone().unwrap_or_default();
            let watcher = LogTailWatcher::new(
                DockerLogSource::new(container),
                LogTrigger::new(config.log_triggers.iter().cloned()),
                notifier,
                config.reconnect_backoff,
            );
            if let Err(e) = watcher.announce_online().await {
                tracing::error!(error = %e, "Failed to send online announcement");
            }
            let tail = tokio::spawn({
                let cancel = cancel.clone();
                async move { watcher.run(cancel).await }
            });
            if let Err(e) = tail.await {
                tracing::error!(error = %e, "Log tail task failed");
            }
        }
    }

    if let Some(commands) = commands {
        if let Err(e) = commands.await {
            tracing::error!(error = %e, "Command listener task failed");
        }
    }

    tracing::info!("Bot shutting down.");
    ExitCode::SUCCESS
}
