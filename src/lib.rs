//! # ICP Price Sync
//!
//! Keeps live ICP exchange rates (USD, EUR, GHS) in memory and pushes every
//! change to subscribers.
//!
//! Rates come from two public APIs: CoinGecko for ICP in USD and EUR, and an
//! exchange-rate API for USD→GHS, from which ICP→GHS is derived. When a
//! fetch fails the service keeps serving the last good rates (or the
//! fallback table if nothing was fetched yet) and flags the snapshot with an
//! error message instead of failing callers.
//!
//! ## Usage
//!
//! ```no_run
//! use icp_price_sync::{Currency, PriceService, PriceServiceConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = PriceService::new(PriceServiceConfig::from_env())?;
//!
//! // The first subscriber starts polling every 30 seconds
//! let binding = service.bind()?;
//!
//! let ghs = binding.convert_from_icp(10.0, Currency::GHS);
//! println!("10 ICP = {}", Currency::GHS.format_price(ghs));
//!
//! if let Some(error) = binding.error() {
//!     eprintln!("{}", error);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! PriceService (explicitly constructed, cheap to clone)
//!     ├── PollingScheduler ── one timer while subscribers > 0
//!     ├── RateFetcher ─────── CoinGecko + exchange-rate API
//!     └── PriceStore ──────── snapshot + ordered subscribers
//!             ↓
//!     PriceBinding / subscriber callbacks
//! ```

pub mod amount;
pub mod binding;
pub mod config;
pub mod constants;
pub mod error;
pub mod metrics;
pub mod provider;
pub mod providers;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod types;
pub mod validation;

// Re-export commonly used types
pub use amount::TransactionFees;
pub use binding::PriceBinding;
pub use config::PriceServiceConfig;
pub use error::{AmountError, PriceError, ProviderError, ValidationError};
pub use metrics::FetchMetrics;
pub use provider::RateFetcher;
pub use service::{PriceService, Subscription};
pub use store::SubscriptionId;
pub use types::{
    ComponentHealth, Currency, FallbackRates, HealthStatus, LiveRates, RateSnapshot, RateSource,
};
