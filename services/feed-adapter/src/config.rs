use crate::adapter::AdapterSettings;
use bus::RetryPolicy;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bus_url: String,
    pub bus_retry: RetryPolicy,
    /// Instrument to stream until the hub announces another.
    pub symbol: String,
    /// Stream base URL; `/{symbol}@trade` is appended.
    pub feed_url: String,
    pub adapter: AdapterSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bus_url: "redis://127.0.0.1:6379".to_string(),
            bus_retry: RetryPolicy::default(),
            symbol: "btcusdt".to_string(),
            feed_url: "wss://stream.binance.com:9443/ws".to_string(),
            adapter: AdapterSettings::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let d = Self::default();
        let millis = |key: &'static str| -> Result<Option<Duration>, ConfigError> {
            Ok(parse::<u64>(&lookup, key)?.map(Duration::from_millis))
        };

        Ok(Self {
            bus_url: lookup("BUS_URL").unwrap_or(d.bus_url),
            bus_retry: RetryPolicy {
                attempts: parse(&lookup, "BUS_CONNECT_ATTEMPTS")?.unwrap_or(d.bus_retry.attempts),
                delay: millis("BUS_CONNECT_DELAY_MS")?.unwrap_or(d.bus_retry.delay),
            },
            symbol: lookup("SYMBOL").unwrap_or(d.symbol),
            feed_url: lookup("FEED_URL").unwrap_or(d.feed_url),
            adapter: AdapterSettings {
                dial_retry: millis("FEED_DIAL_RETRY_MS")?.unwrap_or(d.adapter.dial_retry),
                reconnect_delay: millis("FEED_RECONNECT_MS")?.unwrap_or(d.adapter.reconnect_delay),
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
