//! Consumer-side binding to a price service
//!
//! A `PriceBinding` keeps its own copy of the latest snapshot, refreshed by
//! the service on every change, so UI code can read it without locking the
//! store.

use crate::{
    error::PriceError,
    service::{PriceService, Subscription},
    types::{Currency, RateSnapshot},
};
use std::sync::{Arc, Mutex, PoisonError};

/// Live view of a price service for one consumer
///
/// Holds a subscription for as long as it lives; dropping the binding
/// unsubscribes, which stops polling if it was the last subscriber.
#[derive(Debug)]
pub struct PriceBinding {
    service: PriceService,
    latest: Arc<Mutex<RateSnapshot>>,
    subscription: Subscription,
}

impl PriceBinding {
    /// Subscribes to `service` and starts tracking its snapshot
    pub fn new(service: &PriceService) -> Result<Self, PriceError> {
        let latest = Arc::new(Mutex::new(service.current()));

        let sink = latest.clone();
        let subscription = service.subscribe(move |snapshot| {
            *sink.lock().unwrap_or_else(PoisonError::into_inner) = snapshot.clone();
        })?;

        Ok(Self {
            service: service.clone(),
            latest,
            subscription,
        })
    }

    /// The latest snapshot delivered to this binding
    pub fn price_data(&self) -> RateSnapshot {
        self.latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True while a fetch cycle is in flight
    pub fn is_loading(&self) -> bool {
        self.price_data().is_loading
    }

    /// Message from the last failed fetch cycle, if any
    pub fn error(&self) -> Option<String> {
        self.price_data().error
    }

    /// Gets the latest ICP rate for a currency
    pub fn get_current_price(&self, currency: Currency) -> f64 {
        self.service.get_current_price(currency)
    }

    /// Converts an ICP amount into `currency`
    pub fn convert_from_icp(&self, icp_amount: f64, currency: Currency) -> f64 {
        self.service.convert_from_icp(icp_amount, currency)
    }

    /// Converts an amount in `currency` into ICP
    pub fn convert_to_icp(&self, amount: f64, currency: Currency) -> Result<f64, PriceError> {
        self.service.convert_to_icp(amount, currency)
    }

    /// Forces an out-of-cycle fetch without touching the polling interval
    pub async fn refresh_prices(&self) -> RateSnapshot {
        self.service.refresh_prices().await
    }

    /// Explicitly ends the binding's subscription
    pub fn unsubscribe(&self) {
        self.subscription.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PriceServiceConfig;
    use crate::provider::mock::MockFetcher;
    use std::time::Duration;

    fn service(fetcher: Arc<MockFetcher>) -> PriceService {
        PriceService::with_fetcher(PriceServiceConfig::default(), fetcher)
    }

    #[tokio::test(start_paused = true)]
    async fn test_binding_tracks_latest_snapshot() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.set_rates(5.0, 4.6, 10.5);
        let service = service(fetcher);

        let binding = service.bind().unwrap();
        assert_eq!(binding.price_data().icp_usd, 4.93);

        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(binding.price_data().icp_ghs, 52.5);
        assert_eq!(binding.get_current_price(Currency::GHS), 52.5);
        assert!(!binding.is_loading());
        assert!(binding.error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_binding_conversions() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.set_rates(5.0, 4.0, 10.0);
        let service = service(fetcher);
        let binding = PriceBinding::new(&service).unwrap();
        binding.refresh_prices().await;

        assert_eq!(binding.convert_from_icp(2.0, Currency::USD), 10.0);
        assert_eq!(binding.convert_from_icp(2.0, Currency::GHS), 100.0);
        assert_eq!(binding.convert_to_icp(8.0, Currency::EUR).unwrap(), 2.0);

        let x = 3.75;
        let ghs = binding.convert_from_icp(x, Currency::GHS);
        assert!((binding.convert_to_icp(ghs, Currency::GHS).unwrap() - x).abs() < 1e-12);
    }

    #[tokio::test(start_paused = true)]
    async fn test_binding_surfaces_fetch_error() {
        let fetcher = Arc::new(MockFetcher::new());
        fetcher.set_error("down");
        let service = service(fetcher);
        let binding = service.bind().unwrap();

        binding.refresh_prices().await;

        assert_eq!(
            binding.error().as_deref(),
            Some(crate::constants::FETCH_FAILED_MESSAGE)
        );
        assert_eq!(binding.get_current_price(Currency::USD), 4.93);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_binding_stops_polling() {
        let service = service(Arc::new(MockFetcher::new()));
        let binding = service.bind().unwrap();
        assert!(service.is_polling());

        drop(binding);

        assert_eq!(service.subscriber_count(), 0);
        assert!(!service.is_polling());
    }
}
