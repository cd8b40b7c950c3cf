use bus::RetryPolicy;
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
    /// Instrument assumed current until the first control message arrives.
    pub symbol: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bus_url: "redis://127.0.0.1:6379".to_string(),
            bus_retry: RetryPolicy::default(),
            symbol: "btcusdt".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            bus_url: lookup("BUS_URL").unwrap_or(defaults.bus_url),
            bus_retry: RetryPolicy {
                attempts: parse(&lookup, "BUS_CONNECT_ATTEMPTS")?
                    .unwrap_or(defaults.bus_retry.attempts),
                delay: parse(&lookup, "BUS_CONNECT_DELAY_MS")?
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.bus_retry.delay),
            },
            symbol: lookup("SYMBOL").unwrap_or(defaults.symbol),
        })
    }
}

fn parse<T: std::str::FromStr>(
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
    use std::collections::HashMap;

    #[test]
    fn test_defaults_when_unset() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.bus_url, "redis://127.0.0.1:6379");
        assert_eq!(config.bus_retry.attempts, 10);
        assert_eq!(config.symbol, "btcusdt");
    }

    #[test]
    fn test_overrides_and_bad_numbers() {
        let env: HashMap<&str, &str> = [("BUS_URL", "memory://"), ("BUS_CONNECT_DELAY_MS", "250")].into();
        let config = Config::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.bus_url, "memory://");
        assert_eq!(config.bus_retry.delay, Duration::from_millis(250));

        let bad = Config::from_lookup(|k| (k == "BUS_CONNECT_ATTEMPTS").then(|| "ten".to_string()));
        assert!(matches!(bad, Err(ConfigError::Invalid { key: "BUS_CONNECT_ATTEMPTS", .. })));
    }
}
