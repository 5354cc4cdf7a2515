//! Rate fetcher abstraction over the upstream price APIs

use crate::{error::ProviderError, types::LiveRates};
use async_trait::async_trait;

/// Trait for rate fetchers
///
/// One call is one fetch cycle: the implementation gathers every quote it
/// needs and either returns a complete rate table or fails as a whole.
/// Implementations never touch shared state; the service applies the result.
#[async_trait]
pub trait RateFetcher: Send + Sync {
    /// Fetches a fresh rate table
    async fn fetch_rates(&self) -> Result<LiveRates, ProviderError>;

    /// Returns the name of this fetcher
    fn provider_name(&self) -> &'static str;
}

/// Rejects rates that could not have come from a healthy upstream
pub(crate) fn ensure_positive(name: &str, value: f64) -> Result<f64, ProviderError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ProviderError::InvalidResponse(format!(
            "{} must be a positive number, got {}",
            name, value
        )))
    }
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    /// Scripted outcome of one mock fetch
    #[derive(Debug, Clone)]
    pub enum MockOutcome {
        Rates(LiveRates),
        Fail(String),
    }

    /// Mock fetcher for testing
    ///
    /// Replays queued outcomes in order, then repeats the default outcome.
    pub struct MockFetcher {
        queue: Arc<Mutex<VecDeque<MockOutcome>>>,
        default: Arc<Mutex<MockOutcome>>,
        delay: Arc<Mutex<Option<Duration>>>,
        call_count: Arc<Mutex<usize>>,
    }

    impl Default for MockFetcher {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockFetcher {
        pub fn new() -> Self {
            Self {
                queue: Arc::new(Mutex::new(VecDeque::new())),
                default: Arc::new(Mutex::new(MockOutcome::Rates(LiveRates::derive(
                    5.0, 4.6, 10.5,
                )))),
                delay: Arc::new(Mutex::new(None)),
                call_count: Arc::new(Mutex::new(0)),
            }
        }

        pub fn set_rates(&self, icp_usd: f64, icp_eur: f64, usd_to_ghs: f64) {
            *self.default.lock().unwrap() =
                MockOutcome::Rates(LiveRates::derive(icp_usd, icp_eur, usd_to_ghs));
        }

        pub fn set_error(&self, message: &str) {
            *self.default.lock().unwrap() = MockOutcome::Fail(message.to_string());
        }

        pub fn push(&self, outcome: MockOutcome) {
            self.queue.lock().unwrap().push_back(outcome);
        }

        pub fn set_delay(&self, delay: Duration) {
            *self.delay.lock().unwrap() = Some(delay);
        }

        pub fn call_count(&self) -> usize {
            *self.call_count.lock().unwrap()
        }
    }

    #[async_trait]
    impl RateFetcher for MockFetcher {
        async fn fetch_rates(&self) -> Result<LiveRates, ProviderError> {
            *self.call_count.lock().unwrap() += 1;
            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            let outcome = {
                let mut queue = self.queue.lock().unwrap();
                queue
                    .pop_front()
                    .unwrap_or_else(|| self.default.lock().unwrap().clone())
            };
            match outcome {
                MockOutcome::Rates(rates) => Ok(rates),
                MockOutcome::Fail(message) => Err(ProviderError::ApiError(message)),
            }
        }

        fn provider_name(&self) -> &'static str {
            "mock"
        }
    }
}
