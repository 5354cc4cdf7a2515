//! ICP price service
//!
//! Ties the rate fetcher, the store and the polling scheduler together.
//! Instances are explicitly constructed and fully isolated from each other;
//! there is no process-wide singleton.

use crate::{
    binding::PriceBinding,
    config::PriceServiceConfig,
    constants::{FETCH_FAILED_MESSAGE, STALE_THRESHOLD_SECS},
    error::{PriceError, ProviderError},
    metrics::{FetchMetrics, MetricsCollector},
    provider::RateFetcher,
    providers::LiveRateFetcher,
    scheduler::{spawn_poller, PollingScheduler},
    store::{PriceStore, SubscriptionId},
    types::{ComponentHealth, Currency, HealthStatus, RateSnapshot, RateSource},
};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::Mutex;

/// What started a fetch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleTrigger {
    /// Timer tick; skipped if a cycle is already in flight
    Scheduled,
    /// Explicit refresh; waits for any in-flight cycle, then runs
    Manual,
}

struct Shared {
    config: PriceServiceConfig,
    fetcher: Arc<dyn RateFetcher>,
    store: PriceStore,
    scheduler: PollingScheduler,
    metrics: MetricsCollector,
    /// Serializes fetch cycles so a slow response can never overwrite a newer one
    fetch_gate: Mutex<()>,
}

impl Shared {
    fn reconcile(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let period = self.config.refresh_interval;

        self.scheduler.reconcile(
            || self.store.subscriber_count(),
            || {
                if Handle::try_current().is_err() {
                    tracing::warn!("No Tokio runtime available, price polling not started");
                    return None;
                }
                Some(spawn_poller(period, move || match weak.upgrade() {
                    Some(shared) => {
                        tokio::spawn(async move {
                            shared.run_cycle(CycleTrigger::Scheduled).await;
                        });
                        true
                    }
                    None => false,
                }))
            },
        );
    }

    fn remove(self: &Arc<Self>, id: SubscriptionId) -> bool {
        let removed = self.store.unsubscribe(id).is_some();
        self.reconcile();
        removed
    }

    async fn run_cycle(&self, trigger: CycleTrigger) -> RateSnapshot {
        let _gate = match trigger {
            CycleTrigger::Scheduled => match self.fetch_gate.try_lock() {
                Ok(guard) => guard,
                Err(_) => {
                    tracing::debug!("Fetch cycle already in flight, skipping tick");
                    return self.store.current();
                }
            },
            CycleTrigger::Manual => self.fetch_gate.lock().await,
        };

        self.store.begin_fetch();
        let start = Instant::now();

        let outcome =
            match tokio::time::timeout(self.config.cycle_timeout, self.fetcher.fetch_rates()).await
            {
                Ok(result) => result,
                Err(_) => Err(ProviderError::Timeout),
            };

        match outcome {
            Ok(rates) => {
                self.metrics.record_cycle(start.elapsed(), true).await;
                tracing::info!(
                    provider = self.fetcher.provider_name(),
                    icp_usd = rates.icp_usd,
                    icp_ghs = rates.icp_ghs,
                    icp_eur = rates.icp_eur,
                    latency_ms = start.elapsed().as_millis() as u64,
                    ?trigger,
                    "Fetched live prices"
                );
                self.store.apply_rates(rates)
            }
            Err(e) => {
                self.metrics.record_cycle(start.elapsed(), false).await;
                tracing::warn!(
                    provider = self.fetcher.provider_name(),
                    error = %e,
                    ?trigger,
                    "Failed to fetch prices, keeping previous rates"
                );
                self.store.apply_failure(FETCH_FAILED_MESSAGE)
            }
        }
    }
}

/// Live ICP price service
///
/// Cheap to clone; all clones share one store, one scheduler and one
/// fetcher. Dropping the last clone cancels the polling timer.
///
/// # Example
/// ```no_run
/// use icp_price_sync::{Currency, PriceService, PriceServiceConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let service = PriceService::new(PriceServiceConfig::from_env())?;
///
/// let subscription = service.subscribe(|snapshot| {
///     println!("ICP: ₵{:.2} (loading: {})", snapshot.icp_ghs, snapshot.is_loading);
/// })?;
///
/// let cedis = service.convert_from_icp(2.5, Currency::GHS);
/// println!("2.5 ICP = ₵{:.2}", cedis);
///
/// subscription.unsubscribe();
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct PriceService {
    shared: Arc<Shared>,
}

impl PriceService {
    /// Creates a service backed by the live HTTP fetcher
    pub fn new(config: PriceServiceConfig) -> Result<Self, ProviderError> {
        let fetcher = Arc::new(LiveRateFetcher::new(&config)?);
        Ok(Self::with_fetcher(config, fetcher))
    }

    /// Creates a service with a custom fetcher
    ///
    /// This is primarily for testing with mock fetchers.
    pub fn with_fetcher(config: PriceServiceConfig, fetcher: Arc<dyn RateFetcher>) -> Self {
        let store = PriceStore::new(config.fallback);
        let metrics = MetricsCollector::new(fetcher.provider_name());

        Self {
            shared: Arc::new(Shared {
                config,
                fetcher,
                store,
                scheduler: PollingScheduler::new(),
                metrics,
                fetch_gate: Mutex::new(()),
            }),
        }
    }

    /// Registers a subscriber
    ///
    /// The callback runs once with the current snapshot before this returns,
    /// then again after every state change. The first subscriber starts the
    /// polling timer, which triggers an immediate fetch. Must be called from
    /// within a Tokio runtime.
    pub fn subscribe<F>(&self, callback: F) -> Result<Subscription, PriceError>
    where
        F: Fn(&RateSnapshot) + Send + Sync + 'static,
    {
        Handle::try_current()
            .map_err(|_| PriceError::internal("subscribe requires a Tokio runtime"))?;

        let (id, _) = self.shared.store.subscribe(Box::new(callback))?;
        self.shared.reconcile();

        Ok(Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        })
    }

    /// Removes a subscriber; unknown or already removed ids are ignored
    ///
    /// # Returns
    /// True if the subscriber was registered
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.remove(id)
    }

    /// Subscribes a [`PriceBinding`] that tracks the latest snapshot
    pub fn bind(&self) -> Result<PriceBinding, PriceError> {
        PriceBinding::new(self)
    }

    /// Returns the current snapshot without touching the network
    pub fn current(&self) -> RateSnapshot {
        self.shared.store.current()
    }

    /// Gets the latest ICP rate for a currency
    pub fn get_current_price(&self, currency: Currency) -> f64 {
        self.current().rate(currency)
    }

    /// Converts an ICP amount into `currency` at the latest rate
    pub fn convert_from_icp(&self, icp_amount: f64, currency: Currency) -> f64 {
        self.current().convert_from_icp(icp_amount, currency)
    }

    /// Converts an amount in `currency` into ICP at the latest rate
    pub fn convert_to_icp(&self, amount: f64, currency: Currency) -> Result<f64, PriceError> {
        self.current().convert_to_icp(amount, currency)
    }

    /// Forces an out-of-cycle fetch
    ///
    /// Does not restart the polling interval. Waits for an in-flight cycle to
    /// finish before starting its own. The cycle runs to completion even if
    /// the returned future is dropped. Fetch failures are reflected in the
    /// returned snapshot's `error`, never returned as `Err`.
    pub async fn refresh_prices(&self) -> RateSnapshot {
        if self.shared.store.is_closed() {
            return self.current();
        }

        let shared = self.shared.clone();
        match tokio::spawn(async move { shared.run_cycle(CycleTrigger::Manual).await }).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!(error = %e, "Refresh task failed");
                self.current()
            }
        }
    }

    /// Re-enables polling after `stop`; the timer resumes if there are subscribers
    pub fn start(&self) {
        if self.shared.store.is_closed() {
            return;
        }
        self.shared.scheduler.set_enabled(true);
        self.shared.reconcile();
    }

    /// Cancels the polling timer; subscribers stay registered
    pub fn stop(&self) {
        self.shared.scheduler.set_enabled(false);
        self.shared.reconcile();
    }

    /// Stops polling, drops every subscriber and refuses new ones
    pub fn dispose(&self) {
        self.shared.scheduler.shutdown();
        self.shared.store.close();
        tracing::info!("Price service disposed");
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.shared.store.subscriber_count()
    }

    /// True while the polling timer is running
    pub fn is_polling(&self) -> bool {
        self.shared.scheduler.is_active()
    }

    /// Returns the name of the underlying fetcher
    pub fn provider_name(&self) -> &'static str {
        self.shared.fetcher.provider_name()
    }

    /// Gets fetch-cycle metrics including latency percentiles and success rate
    pub async fn fetch_metrics(&self) -> FetchMetrics {
        self.shared.metrics.snapshot().await
    }

    /// Perform a health check on the price service
    pub async fn health_check(&self) -> ComponentHealth {
        let snapshot = self.current();
        let metrics = self.fetch_metrics().await;
        let stale = snapshot.is_stale(STALE_THRESHOLD_SECS);

        let mut details = HashMap::new();
        details.insert("provider_name".to_string(), serde_json::json!(self.provider_name()));
        details.insert("source".to_string(), serde_json::json!(snapshot.source));
        details.insert("stale".to_string(), serde_json::json!(stale));
        details.insert("subscribers".to_string(), serde_json::json!(self.subscriber_count()));
        details.insert("polling".to_string(), serde_json::json!(self.is_polling()));
        details.insert("success_rate".to_string(), serde_json::json!(metrics.success_rate));

        let status = match (snapshot.source, snapshot.error.is_some()) {
            (RateSource::Fallback, true) => HealthStatus::Unhealthy,
            (_, true) => HealthStatus::Degraded,
            (RateSource::Live, false) if stale => HealthStatus::Degraded,
            (RateSource::Live, false) => HealthStatus::Healthy,
            (RateSource::Fallback, false) => HealthStatus::Degraded,
        };

        let message = match status {
            HealthStatus::Healthy => "Price service is serving fresh live rates".to_string(),
            HealthStatus::Degraded if snapshot.source == RateSource::Fallback => {
                "Price service has not fetched live rates yet".to_string()
            }
            HealthStatus::Degraded => format!(
                "Price service is serving cached rates ({})",
                snapshot.updated_ago()
            ),
            HealthStatus::Unhealthy => {
                "Price service could not fetch live rates and is using fallback rates".to_string()
            }
        };

        ComponentHealth {
            name: "icp_price_service".to_string(),
            status,
            message: Some(message),
            details,
            last_checked: chrono::Utc::now(),
        }
    }
}

impl std::fmt::Debug for PriceService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceService")
            .field("provider", &self.provider_name())
            .field("subscribers", &self.subscriber_count())
            .field("polling", &self.is_polling())
            .finish()
    }
}

/// Handle returned by [`PriceService::subscribe`]
///
/// Unsubscribes when dropped. `unsubscribe` may be called any number of times.
#[must_use = "dropping a Subscription unsubscribes it"]
pub struct Subscription {
    id: SubscriptionId,
    shared: Weak<Shared>,
}

impl Subscription {
    /// The id of this registration
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// Removes the subscriber; later calls are no-ops
    pub fn unsubscribe(&self) {
        if let Some(shared) = self.shared.upgrade() {
            shared.remove(self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
