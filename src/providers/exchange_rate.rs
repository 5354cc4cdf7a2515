//! Fiat exchange-rate client (exchangerate-api.com v4 format)

use crate::{
    error::ProviderError,
    provider::ensure_positive,
    providers::{decode_json, map_send_error},
};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct ExchangeRateResponse {
    rates: HashMap<String, f64>,
}

/// Client for the latest-rates endpoint, `{base_url}/{BASE}`
pub struct ExchangeRateClient {
    client: Client,
    base_url: String,
}

impl ExchangeRateClient {
    /// Creates a client against `base_url` (e.g. `https://api.exchangerate-api.com/v4/latest`)
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Fetches how many units of `quote` one unit of `base` buys
    pub async fn fetch_rate(&self, base: &str, quote: &str) -> Result<f64, ProviderError> {
        let url = format!("{}/{}", self.base_url.trim_end_matches('/'), base);
        tracing::debug!(url = %url, base, quote, "Fetching fiat exchange rate");

        let response = self.client.get(&url).send().await.map_err(map_send_error)?;
        let body: ExchangeRateResponse = decode_json(response, "exchange-rate API").await?;

        let rate = body.rates.get(quote).copied().ok_or_else(|| {
            ProviderError::InvalidResponse(format!("No {} rate for base {}", quote, base))
        })?;

        ensure_positive(&format!("{}/{}", base, quote), rate)
    }
}
