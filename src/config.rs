//! Runtime configuration read from environment variables

use crate::core::{CachedRateProvider, HttpRateProvider, RateProvider, StaticRateProvider};
use std::env;
use std::time::Duration;
use thiserror::Error;

pub const RATE_URL_VAR: &str = "CGTC_RATE_URL";
pub const RATE_TIMEOUT_VAR: &str = "CGTC_RATE_TIMEOUT_SECS";
pub const RATE_CACHE_TTL_VAR: &str = "CGTC_RATE_CACHE_TTL_SECS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value} ({reason})")]
    InvalidValue {
        var: &'static str,
        value: String,
        reason: String,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Discount rate lookup settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Rate endpoint; the statutory rate is used when absent
    pub rate_url: Option<String>,
    pub rate_timeout_secs: u64,
    pub rate_cache_ttl_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            rate_url: None,
            rate_timeout_secs: 5,
            rate_cache_ttl_secs: 3600,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let rate_url = lookup(RATE_URL_VAR)
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());

        let rate_timeout_secs = parse_secs(&lookup, RATE_TIMEOUT_VAR, defaults.rate_timeout_secs)?;
        if !(1..=60).contains(&rate_timeout_secs) {
            return Err(ConfigError::InvalidConfig(format!(
                "{RATE_TIMEOUT_VAR} must be between 1 and 60 seconds"
            )));
        }
        let rate_cache_ttl_secs = parse_secs(&lookup, RATE_CACHE_TTL_VAR, defaults.rate_cache_ttl_secs)?;

        log::debug!(
            "configuration loaded: rate_url={:?}, timeout={}s, cache_ttl={}s",
            rate_url,
            rate_timeout_secs,
            rate_cache_ttl_secs
        );

        Ok(Config {
            rate_url,
            rate_timeout_secs,
            rate_cache_ttl_secs,
        })
    }

    /// Override the rate endpoint, e.g. from a command line flag
    pub fn with_rate_url(mut self, url: Option<String>) -> Self {
        if url.is_some() {
            self.rate_url = url;
        }
        self
    }

    pub fn rate_provider(&self) -> Box<dyn RateProvider> {
        match &self.rate_url {
            Some(url) => {
                let http = HttpRateProvider::new(url.clone(), Duration::from_secs(self.rate_timeout_secs));
                Box::new(CachedRateProvider::new(
                    http,
                    Duration::from_secs(self.rate_cache_ttl_secs),
                ))
            }
            None => Box::new(StaticRateProvider::statutory()),
        }
    }
}

fn parse_secs(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse::<u64>().map_err(|e| ConfigError::InvalidValue {
            var,
            value,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| vars.get(k).cloned())
    }

    #[test]
    fn defaults_when_unset() {
        assert_eq!(load(&[]).unwrap(), Config::default());
    }

    #[test]
    fn reads_values() {
        let config = load(&[
            (RATE_URL_VAR, " https://rates.example/cgt "),
            (RATE_TIMEOUT_VAR, "10"),
            (RATE_CACHE_TTL_VAR, "0"),
        ])
        .unwrap();
        assert_eq!(config.rate_url.as_deref(), Some("https://rates.example/cgt"));
        assert_eq!(config.rate_timeout_secs, 10);
        assert_eq!(config.rate_cache_ttl_secs, 0);
    }

    #[test]
    fn blank_url_means_static_rate() {
        assert_eq!(load(&[(RATE_URL_VAR, "  ")]).unwrap().rate_url, None);
    }

    #[test]
    fn rejects_bad_timeouts() {
        assert!(matches!(
            load(&[(RATE_TIMEOUT_VAR, "soon")]),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            load(&[(RATE_TIMEOUT_VAR, "0")]),
            Err(ConfigError::InvalidConfig(_))
        ));
        assert!(matches!(
            load(&[(RATE_TIMEOUT_VAR, "61")]),
            Err(ConfigError::InvalidConfig(_))
        ));
    }

    #[test]
    fn flag_overrides_env() {
        let config = load(&[(RATE_URL_VAR, "https://a")])
            .unwrap()
            .with_rate_url(Some("https://b".to_string()));
        assert_eq!(config.rate_url.as_deref(), Some("https://b"));
        let config = config.with_rate_url(None);
        assert_eq!(config.rate_url.as_deref(), Some("https://b"));
    }
}
