//! Runtime configuration for the price service
//!
//! Defaults come from `constants`; `from_env` lets a deployment point the
//! service at different API hosts or tune its timings without a rebuild.

use crate::{
    constants::{
        COINGECKO_API_URL, CYCLE_TIMEOUT_SECS, EXCHANGE_RATE_API_URL, FALLBACK_RATES,
        REFRESH_INTERVAL_SECS, REQUEST_TIMEOUT_SECS,
    },
    types::FallbackRates,
};
use std::time::Duration;

/// Environment variable overriding the crypto-price API base URL
pub const ENV_PRICE_API_URL: &str = "ICP_PRICE_API_URL";
/// Environment variable overriding the fiat exchange-rate API base URL
pub const ENV_EXCHANGE_RATE_API_URL: &str = "ICP_EXCHANGE_RATE_API_URL";
/// Environment variable overriding the polling interval (seconds)
pub const ENV_REFRESH_SECS: &str = "ICP_PRICE_REFRESH_SECS";
/// Environment variable overriding the per-request timeout (seconds)
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "ICP_PRICE_REQUEST_TIMEOUT_SECS";

/// Settings for a `PriceService` instance
#[derive(Debug, Clone, PartialEq)]
pub struct PriceServiceConfig {
    /// CoinGecko-compatible API base URL
    pub price_api_url: String,
    /// Exchange-rate API base URL; the base currency is appended as a path segment
    pub exchange_rate_api_url: String,
    /// Polling interval while there are subscribers
    pub refresh_interval: Duration,
    /// Timeout for each outbound request
    pub request_timeout: Duration,
    /// Upper bound for a whole fetch cycle
    pub cycle_timeout: Duration,
    /// Rates served until the first live fetch succeeds
    pub fallback: FallbackRates,
}

impl Default for PriceServiceConfig {
    fn default() -> Self {
        Self {
            price_api_url: COINGECKO_API_URL.to_string(),
            exchange_rate_api_url: EXCHANGE_RATE_API_URL.to_string(),
            refresh_interval: Duration::from_secs(REFRESH_INTERVAL_SECS),
            request_timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
            cycle_timeout: Duration::from_secs(CYCLE_TIMEOUT_SECS),
            fallback: FALLBACK_RATES,
        }
    }
}

impl PriceServiceConfig {
    /// Builds a config from the process environment
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from an arbitrary key lookup, starting from the defaults
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = non_empty(lookup(ENV_PRICE_API_URL)) {
            config.price_api_url = url;
        }
        if let Some(url) = non_empty(lookup(ENV_EXCHANGE_RATE_API_URL)) {
            config.exchange_rate_api_url = url;
        }
        if let Some(secs) = parse_secs(ENV_REFRESH_SECS, lookup(ENV_REFRESH_SECS)) {
            config.refresh_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_secs(ENV_REQUEST_TIMEOUT_SECS, lookup(ENV_REQUEST_TIMEOUT_SECS)) {
            config.request_timeout = Duration::from_secs(secs);
        }

        config
    }

    /// Sets the API base URLs
    pub fn with_api_urls(
        mut self,
        price_api_url: impl Into<String>,
        exchange_rate_api_url: impl Into<String>,
    ) -> Self {
        self.price_api_url = price_api_url.into();
        self.exchange_rate_api_url = exchange_rate_api_url.into();
        self
    }

    /// Sets the polling interval
    pub fn with_refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Sets the fallback rate table
    pub fn with_fallback(mut self, fallback: FallbackRates) -> Self {
        self.fallback = fallback;
        self
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_secs(key: &str, value: Option<String>) -> Option<u64> {
    let raw = non_empty(value)?;
    match raw.parse::<u64>() {
        Ok(secs) if secs > 0 => Some(secs),
        _ => {
            tracing::warn!(key, value = %raw, "Ignoring invalid duration override");
            None
        }
    }
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
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = PriceServiceConfig::default();
        assert_eq!(config.price_api_url, "https://api.coingecko.com/api/v3");
        assert_eq!(
            config.exchange_rate_api_url,
            "https://api.exchangerate-api.com/v4/latest"
        );
        assert_eq!(config.refresh_interval, Duration::from_secs(30));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.fallback.icp_usd, 4.93);
    }

    #[test]
    fn test_lookup_overrides() {
        let config = PriceServiceConfig::from_lookup(lookup_from(&[
            (ENV_PRICE_API_URL, "http://localhost:9000/api"),
            (ENV_EXCHANGE_RATE_API_URL, " http://localhost:9001/latest "),
            (ENV_REFRESH_SECS, "5"),
            (ENV_REQUEST_TIMEOUT_SECS, "2"),
        ]));

        assert_eq!(config.price_api_url, "http://localhost:9000/api");
        assert_eq!(config.exchange_rate_api_url, "http://localhost:9001/latest");
        assert_eq!(config.refresh_interval, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_overrides_keep_defaults() {
        let config = PriceServiceConfig::from_lookup(lookup_from(&[
            (ENV_PRICE_API_URL, "   "),
            (ENV_REFRESH_SECS, "soon"),
            (ENV_REQUEST_TIMEOUT_SECS, "0"),
        ]));

        assert_eq!(config, PriceServiceConfig::default());
    }
}
