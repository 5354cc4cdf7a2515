//! Production rate fetcher: CoinGecko quote chained with the USD→GHS rate

use crate::{
    config::PriceServiceConfig,
    constants::USER_AGENT,
    error::ProviderError,
    provider::RateFetcher,
    providers::{CoinGeckoClient, ExchangeRateClient},
    types::LiveRates,
};
use async_trait::async_trait;
use reqwest::Client;

/// Rate fetcher backed by the two public HTTP APIs
///
/// A cycle first asks CoinGecko for ICP in USD and EUR, then asks the
/// exchange-rate API for USD→GHS, and derives ICP→GHS from the two.
/// Failure of either request fails the cycle.
pub struct LiveRateFetcher {
    coingecko: CoinGeckoClient,
    exchange: ExchangeRateClient,
}

impl LiveRateFetcher {
    /// Creates a fetcher from the service config
    pub fn new(config: &PriceServiceConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(ProviderError::NetworkError)?;

        Ok(Self {
            coingecko: CoinGeckoClient::new(client.clone(), config.price_api_url.clone()),
            exchange: ExchangeRateClient::new(client, config.exchange_rate_api_url.clone()),
        })
    }
}

#[async_trait]
impl RateFetcher for LiveRateFetcher {
    async fn fetch_rates(&self) -> Result<LiveRates, ProviderError> {
        let quote = self.coingecko.fetch_icp_quote().await?;
        let usd_to_ghs = self.exchange.fetch_rate("USD", "GHS").await?;

        let rates = LiveRates::derive(quote.usd, quote.eur, usd_to_ghs);
        tracing::debug!(
            icp_usd = rates.icp_usd,
            icp_eur = rates.icp_eur,
            icp_ghs = rates.icp_ghs,
            "Fetched live ICP rates"
        );

        Ok(rates)
    }

    fn provider_name(&self) -> &'static str {
        "coingecko+exchangerate"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_quote(server: &MockServer, body: &str) {
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body.to_string()))
            .mount(server)
            .await;
    }

    async fn mount_fx(server: &MockServer, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path("/latest/USD"))
            .respond_with(template)
            .mount(server)
            .await;
    }

    fn config_for(server: &MockServer) -> PriceServiceConfig {
        PriceServiceConfig::default()
            .with_api_urls(server.uri(), format!("{}/latest", server.uri()))
    }

    #[tokio::test]
    async fn test_derives_ghs_cross_rate() {
        let server = MockServer::start().await;
        mount_quote(&server, r#"{ "internet-computer": { "usd": 5.0, "eur": 4.6 } }"#).await;
        mount_fx(
            &server,
            ResponseTemplate::new(200).set_body_string(r#"{ "rates": { "GHS": 10.5 } }"#),
        )
        .await;

        let fetcher = LiveRateFetcher::new(&config_for(&server)).unwrap();
        let rates = fetcher.fetch_rates().await.unwrap();

        assert_eq!(rates.icp_usd, 5.0);
        assert_eq!(rates.icp_eur, 4.6);
        assert_eq!(rates.icp_ghs, 52.5);
    }

    #[tokio::test]
    async fn test_second_call_failure_fails_cycle() {
        let server = MockServer::start().await;
        mount_quote(&server, r#"{ "internet-computer": { "usd": 5.0, "eur": 4.6 } }"#).await;
        mount_fx(&server, ResponseTemplate::new(500)).await;

        let fetcher = LiveRateFetcher::new(&config_for(&server)).unwrap();
        let result = fetcher.fetch_rates().await;

        assert!(matches!(result, Err(ProviderError::ApiError(_))));
    }

    #[tokio::test]
    async fn test_first_call_failure_skips_second() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/latest/USD"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{ "rates": { "GHS": 10.5 } }"#),
            )
            .expect(0)
            .mount(&server)
            .await;

        let fetcher = LiveRateFetcher::new(&config_for(&server)).unwrap();
        assert!(fetcher.fetch_rates().await.is_err());
    }
}
