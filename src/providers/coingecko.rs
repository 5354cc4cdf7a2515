//! CoinGecko client for the ICP quote

use crate::{
    constants::{COINGECKO_SIMPLE_PRICE_ENDPOINT, ICP_COINGECKO_ID},
    error::ProviderError,
    provider::ensure_positive,
    providers::{decode_json, map_send_error},
};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;

/// CoinGecko API response for simple price queries
#[derive(Debug, Deserialize)]
struct CoinGeckoResponse {
    #[serde(flatten)]
    prices: HashMap<String, CoinGeckoPriceData>,
}

#[derive(Debug, Deserialize)]
struct CoinGeckoPriceData {
    usd: f64,
    eur: f64,
}

/// ICP price in the currencies CoinGecko quotes directly
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IcpQuote {
    pub usd: f64,
    pub eur: f64,
}

/// Client for the CoinGecko simple-price endpoint
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
}

impl CoinGeckoClient {
    /// Creates a client against `base_url` (e.g. `https://api.coingecko.com/api/v3`)
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Builds the CoinGecko API URL for the ICP quote
    fn build_url(&self) -> String {
        format!(
            "{}{}?ids={}&vs_currencies=usd,eur",
            self.base_url.trim_end_matches('/'),
            COINGECKO_SIMPLE_PRICE_ENDPOINT,
            ICP_COINGECKO_ID
        )
    }

    /// Fetches the ICP price in USD and EUR
    pub async fn fetch_icp_quote(&self) -> Result<IcpQuote, ProviderError> {
        let url = self.build_url();
        tracing::debug!(url = %url, "Fetching ICP quote from CoinGecko");

        let response = self.client.get(&url).send().await.map_err(map_send_error)?;
        let body: CoinGeckoResponse = decode_json(response, "CoinGecko").await?;

        let price = body.prices.get(ICP_COINGECKO_ID).ok_or_else(|| {
            ProviderError::InvalidResponse(format!(
                "No {} entry in CoinGecko response",
                ICP_COINGECKO_ID
            ))
        })?;

        Ok(IcpQuote {
            usd: ensure_positive("ICP/USD", price.usd)?,
            eur: ensure_positive("ICP/EUR", price.eur)?,
        })
    }
}
