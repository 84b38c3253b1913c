use crate::notify::RetryPolicy;
use std::env;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_API_BASE_URL: &str = "http://host.docker.internal:3000";
const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RECONNECT_BACKOFF_SECS: u64 = 60;
const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_SECS: u64 = 2;
const DEFAULT_LOG_TRIGGERS: &[&str] = &["ERROR", "AgentStateChanged", "Action"];

/// Which observation source drives this deployment.
///
/// A deployment watches exactly one kind of source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchMode {
    /// Poll the conversations API and diff snapshots.
    #[default]
    Poll,
    /// Follow a container's log stream and match trigger substrings.
    Logs,
}

impl FromStr for WatchMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "poll" => Ok(WatchMode::Poll),
            "logs" | "log" | "tail" => Ok(WatchMode::Logs),
            _ => Err(ConfigError::Invalid {
                key: "WATCH_MODE",
                value: s.to_string(),
            }),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_base_url: String,
    pub telegram_api_url: String,
    pub watch_mode: WatchMode,
    pub container_name: Option<String>,
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
    pub reconnect_backoff: Duration,
    pub log_triggers: Vec<String>,
    pub retry: RetryPolicy,
    pub commands_enabled: bool,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated the same as missing ones.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bot_token = get("TELEGRAM_TOKEN").ok_or(ConfigError::Missing("TELEGRAM_TOKEN"))?;
        let chat_id = get("CHAT_ID").ok_or(ConfigError::Missing("CHAT_ID"))?;

        let watch_mode = match get("WATCH_MODE") {
            Some(raw) => raw.parse()?,
            None => WatchMode::default(),
        };

        let container_name = get("CONTAINER_NAME");
        if watch_mode == WatchMode::Logs && container_name.is_none() {
            return Err(ConfigError::Missing("CONTAINER_NAME"));
        }

        let poll_interval = positive_secs(&get, "POLL_INTERVAL", DEFAULT_POLL_INTERVAL_SECS)?;
        let fetch_timeout = positive_secs(&get, "FETCH_TIMEOUT", DEFAULT_FETCH_TIMEOUT_SECS)?;
        let reconnect_backoff =
            positive_secs(&get, "RECONNECT_BACKOFF", DEFAULT_RECONNECT_BACKOFF_SECS)?;

        let max_attempts = match get("NOTIFY_MAX_ATTEMPTS") {
            Some(raw) => match raw.parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::Invalid {
                        key: "NOTIFY_MAX_ATTEMPTS",
                        value: raw,
                    })
                }
            },
            None => DEFAULT_MAX_ATTEMPTS,
        };

        // Zero is a valid retry delay (retry immediately).
        let retry_delay = match get("NOTIFY_RETRY_DELAY") {
            Some(raw) => raw
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::Invalid {
                    key: "NOTIFY_RETRY_DELAY",
                    value: raw,
                })?,
            None => Duration::from_secs(DEFAULT_RETRY_DELAY_SECS),
        };

        let log_triggers = match get("LOG_TRIGGERS") {
            Some(raw) => {
                let triggers: Vec<String> = raw
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect();
                if triggers.is_empty() {
                    return Err(ConfigError::Invalid {
                        key: "LOG_TRIGGERS",
                        value: raw,
                    });
                }
                triggers
            }
            None => DEFAULT_LOG_TRIGGERS.iter().map(|t| t.to_string()).collect(),
        };

        let commands_enabled = match get("COMMANDS_ENABLED") {
            Some(raw) => raw.parse::<bool>().map_err(|_| ConfigError::Invalid {
                key: "COMMANDS_ENABLED",
                value: raw,
            })?,
            None => true,
        };

        Ok(Self {
            bot_token,
            chat_id,
            api_base_url: get("OPENHANDS_API_URL")
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string()),
            telegram_api_url: get("TELEGRAM_API_URL")
                .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
            watch_mode,
            container_name,
            poll_interval,
            fetch_timeout,
            reconnect_backoff,
            log_triggers,
            retry: RetryPolicy::new(max_attempts, retry_delay),
            commands_enabled,
        })
    }
}

fn positive_secs<G>(get: &G, key: &'static str, default: u64) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
            _ => Err(ConfigError::Invalid { key, value: raw }),
        },
        None => Ok(Duration::from_secs(default)),
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    const REQUIRED: &[(&str, &str)] = &[("TELEGRAM_TOKEN", "123:abc"), ("CHAT_ID", "-100200")];

    #[test]
    fn should_apply_defaults_when_only_required_keys_are_set() {
        // Act
        let config = AppConfig::from_lookup(lookup_from(REQUIRED)).unwrap();

        // Assert
        assert_eq!(config.bot_token, "123:abc");
        assert_eq!(config.chat_id, "-100200");
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.telegram_api_url, DEFAULT_TELEGRAM_API_URL);
        assert_eq!(config.watch_mode, WatchMode::Poll);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.reconnect_backoff, Duration::from_secs(60));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay, Duration::from_secs(2));
        assert_eq!(
            config.log_triggers,
            vec!["ERROR", "AgentStateChanged", "Action"]
        );
        assert!(config.commands_enabled);
    }

    #[test]
    fn should_fail_when_token_is_missing() {
        let result = AppConfig::from_lookup(lookup_from(&[("CHAT_ID", "1")]));
        assert!(matches!(result, Err(ConfigError::Missing("TELEGRAM_TOKEN"))));
    }

    #[test]
    fn should_fail_when_chat_id_is_blank() {
        let result =
            AppConfig::from_lookup(lookup_from(&[("TELEGRAM_TOKEN", "t"), ("CHAT_ID", "  ")]));
        assert!(matches!(result, Err(ConfigError::Missing("CHAT_ID"))));
    }

    #[test]
    fn should_require_container_name_in_logs_mode() {
        // Arrange
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("WATCH_MODE", "logs"));

        // Act
        let result = AppConfig::from_lookup(lookup_from(&pairs));

        // Assert
        assert!(matches!(result, Err(ConfigError::Missing("CONTAINER_NAME"))));
    }

    #[test]
    fn should_parse_logs_mode_settings() {
        // Arrange
        let mut pairs = REQUIRED.to_vec();
        pairs.extend_from_slice(&[
            ("WATCH_MODE", "logs"),
            ("CONTAINER_NAME", "openhands-app"),
            ("LOG_TRIGGERS", "ERROR, Traceback ,,"),
            ("RECONNECT_BACKOFF", "30"),
        ]);

        // Act
        let config = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();

        // Assert
        assert_eq!(config.watch_mode, WatchMode::Logs);
        assert_eq!(config.container_name.as_deref(), Some("openhands-app"));
        assert_eq!(config.log_triggers, vec!["ERROR", "Traceback"]);
        assert_eq!(config.reconnect_backoff, Duration::from_secs(30));
    }

    #[test]
    fn should_reject_zero_poll_interval() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("POLL_INTERVAL", "0"));

        let result = AppConfig::from_lookup(lookup_from(&pairs));

        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "POLL_INTERVAL",
                ..
            })
        ));
    }

    #[test]
    fn should_parse_watch_mode_aliases_case_insensitively() {
        assert_eq!("Poll".parse::<WatchMode>(), Ok(WatchMode::Poll));
        assert_eq!(" TAIL ".parse::<WatchMode>(), Ok(WatchMode::Logs));
        assert_eq!(
            "webhook".parse::<WatchMode>(),
            Err(ConfigError::Invalid {
                key: "WATCH_MODE",
                value: "webhook".to_string(),
            })
        );
    }

    #[test]
    fn should_reject_unknown_watch_mode() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("WATCH_MODE", "webhook"));

        let result = AppConfig::from_lookup(lookup_from(&pairs));

        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                key: "WATCH_MODE",
                ..
            })
        ));
    }

    #[test]
    fn should_allow_zero_retry_delay() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend_from_slice(&[("NOTIFY_RETRY_DELAY", "0"), ("NOTIFY_MAX_ATTEMPTS", "5")]);

        let config = AppConfig::from_lookup(lookup_from(&pairs)).unwrap();

        assert_eq!(config.retry.delay, Duration::ZERO);
        assert_eq!(config.retry.max_attempts, 5);
    }

    #[test]
    fn should_reject_zero_max_attempts() {
        let mut pairs = REQUIRED.to_vec();
        pairs.push(("NOTIFY_MAX_ATTEMPTS", "0"));

        let result = AppConfig::from_lookup(lookup_from(&pairs));

        assert!(result.is_err());
    }
}
