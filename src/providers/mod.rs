//! Upstream API clients and the production rate fetcher

pub mod coingecko;
pub mod exchange_rate;
pub mod live;

pub use coingecko::{CoinGeckoClient, IcpQuote};
pub use exchange_rate::ExchangeRateClient;
pub use live::LiveRateFetcher;

use crate::error::ProviderError;
use serde::de::DeserializeOwned;

/// Maps a transport error, keeping timeouts distinguishable
pub(crate) fn map_send_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::NetworkError(err)
    }
}

/// Checks the status of an upstream response and decodes its JSON body
pub(crate) async fn decode_json<T: DeserializeOwned>(
    response: reqwest::Response,
    source: &str,
) -> Result<T, ProviderError> {
    // Check for rate limiting
    if response.status().as_u16() == 429 {
        return Err(ProviderError::RateLimitExceeded);
    }

    if !response.status().is_success() {
        return Err(ProviderError::ApiError(format!(
            "{} returned HTTP {}: {}",
            source,
            response.status(),
            response.text().await.unwrap_or_default()
        )));
    }

    let text = response.text().await.map_err(map_send_error)?;

    serde_json::from_str(&text).map_err(|e| {
        ProviderError::InvalidResponse(format!(
            "Failed to parse {} response: {}. Response: {}",
            source, e, text
        ))
    })
}
