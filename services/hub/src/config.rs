use crate::models::MAX_HISTORY_LIMIT;
use crate::state::HubSettings;
use bus::RetryPolicy;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use types::instrument::{self, Instrument};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },

    #[error("Startup instrument is not in the registry: {0}")]
    UnknownSymbol(String),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bus_url: String,
    pub bus_retry: RetryPolicy,
    /// Instrument the hub makes current at startup.
    pub instrument: Instrument,
    pub addr: SocketAddr,
    /// Journal directory; history is unavailable when unset.
    pub journal_dir: Option<PathBuf>,
    pub settings: HubSettings,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = HubSettings::default();
        let retry = RetryPolicy::default();

        let symbol = lookup("SYMBOL").unwrap_or_else(|| "btcusdt".to_string());
        let instrument =
            instrument::lookup(&symbol).map_err(|_| ConfigError::UnknownSymbol(symbol.clone()))?;

        Ok(Self {
            bus_url: lookup("BUS_URL").unwrap_or_else(|| "redis://127.0.0.1:6379".to_string()),
            bus_retry: RetryPolicy {
                attempts: parse(&lookup, "BUS_CONNECT_ATTEMPTS")?.unwrap_or(retry.attempts),
                delay: parse(&lookup, "BUS_CONNECT_DELAY_MS")?
                    .map(Duration::from_millis)
                    .unwrap_or(retry.delay),
            },
            instrument,
            addr: parse(&lookup, "HUB_ADDR")?.unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 8080))),
            journal_dir: lookup("JOURNAL_DIR")
                .filter(|dir| !dir.trim().is_empty())
                .map(PathBuf::from),
            settings: HubSettings {
                history_limit: parse::<usize>(&lookup, "HISTORY_LIMIT")?
                    .unwrap_or(defaults.history_limit)
                    .clamp(1, MAX_HISTORY_LIMIT),
                subscriber_queue: parse::<usize>(&lookup, "SUBSCRIBER_QUEUE")?
                    .unwrap_or(defaults.subscriber_queue)
                    .max(1),
            },
        })
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    lookup(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::Invalid { key, value })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.instrument.symbol, "btcusdt");
        assert_eq!(config.addr.port(), 8080);
        assert!(config.journal_dir.is_none());
        assert_eq!(config.settings.history_limit, 100);
        assert_eq!(config.settings.subscriber_queue, 256);
    }

    #[test]
    fn test_unknown_startup_symbol() {
        let result = Config::from_lookup(env(&[("SYMBOL", "zzzusdt")]));
        assert!(matches!(result, Err(ConfigError::UnknownSymbol(_))));
    }

    #[test]
    fn test_history_limit_is_clamped() {
        let config = Config::from_lookup(env(&[("HISTORY_LIMIT", "5000"), ("JOURNAL_DIR", "/tmp/j")])).unwrap();
        assert_eq!(config.settings.history_limit, MAX_HISTORY_LIMIT);
        assert_eq!(config.journal_dir, Some(PathBuf::from("/tmp/j")));
    }

    #[test]
    fn test_bad_address() {
        let result = Config::from_lookup(env(&[("HUB_ADDR", "localhost")]));
        assert!(matches!(result, Err(ConfigError::Invalid { key: "HUB_ADDR", .. })));
    }
}
