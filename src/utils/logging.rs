//! Logging initialization
//!
//! Structured JSON logs go to stdout and to a daily-rolling file at the same time.

use std::path::PathBuf;
use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::{self, time::UtcTime, MakeWriter};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_FILTER: &str = "info,monitor_bot=debug";
const DEFAULT_LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "monitor-bot.log";

/// Where logs go and how verbose they are
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub dir: PathBuf,
    /// `EnvFilter` directives
    pub filter: String,
}

impl LogSettings {
    /// `LOG_DIR` and `RUST_LOG`, with defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            dir: PathBuf::from(non_empty("LOG_DIR").unwrap_or_else(|| DEFAULT_LOG_DIR.into())),
            filter: non_empty("RUST_LOG").unwrap_or_else(|| DEFAULT_FILTER.into()),
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.filter).unwrap_or_else(|err| {
            eprintln!("Invalid log filter {:?} ({}), using {}", self.filter, err, DEFAULT_FILTER);
            EnvFilter::new(DEFAULT_FILTER)
        })
    }
}

fn json_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .json()
        .with_timer(UtcTime::rfc_3339())
        .with_current_span(true)
        .with_ansi(false)
        .with_writer(writer)
}

/// Install the global subscriber: JSON to stdout and to `{dir}/monitor-bot.log.YYYY-MM-DD`.
///
/// Call once from `main` and keep the returned guard alive; dropping it flushes and
/// stops the background file writer.
pub fn init_logging(settings: &LogSettings) -> WorkerGuard {
    let file_appender = rolling::daily(&settings.dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(settings.env_filter())
        .with(json_layer(std::io::stdout))
        .with(json_layer(file_writer))
        .init();

    guard
}
