//! Constants for the ICP price sync service
//!
//! Compile-time defaults for every setting. `PriceServiceConfig::from_env`
//! can override the URLs and timings at runtime; the fallback table is fixed.

use crate::types::FallbackRates;

/// How often to poll the rate APIs while there are subscribers (in seconds)
pub const REFRESH_INTERVAL_SECS: u64 = 30;

/// How long before live rates are reported as stale by the health check (in seconds)
pub const STALE_THRESHOLD_SECS: u64 = 300;

/// HTTP request timeout for each outbound call (in seconds)
pub const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Upper bound for a whole fetch cycle (both requests), in seconds
pub const CYCLE_TIMEOUT_SECS: u64 = 25;

/// Rates used until the first live fetch succeeds
pub const FALLBACK_RATES: FallbackRates = FallbackRates {
    icp_usd: 4.93,
    icp_ghs: 50.95,
    icp_eur: 4.68,
};

/// Message surfaced on the snapshot when a fetch cycle fails
pub const FETCH_FAILED_MESSAGE: &str = "Unable to fetch live prices. Using cached rates.";

/// CoinGecko API base URL
pub const COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

/// CoinGecko API endpoint for simple price queries
pub const COINGECKO_SIMPLE_PRICE_ENDPOINT: &str = "/simple/price";

/// CoinGecko asset id for the Internet Computer token
pub const ICP_COINGECKO_ID: &str = "internet-computer";

/// Fiat exchange-rate API base URL (latest rates, keyed by base currency)
pub const EXCHANGE_RATE_API_URL: &str = "https://api.exchangerate-api.com/v4/latest";

/// Largest amount a single payment may carry
pub const MAX_PAYMENT_AMOUNT: f64 = 1_000_000.0;

/// User agent for HTTP requests
pub const USER_AGENT: &str = "icp-price-sync/0.1.0";
