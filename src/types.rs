//! Types for the ICP price sync service

use crate::error::PriceError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Fiat currencies ICP is quoted in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// US Dollar
    USD,
    /// Ghanaian Cedi
    #[default]
    GHS,
    /// Euro
    EUR,
}

impl Currency {
    /// Get the ISO 4217 code
    pub fn code(&self) -> &'static str {
        match self {
            Currency::USD => "USD",
            Currency::GHS => "GHS",
            Currency::EUR => "EUR",
        }
    }

    /// Get the display symbol
    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::GHS => "₵",
            Currency::EUR => "€",
        }
    }

    /// Get all supported currencies
    pub fn all() -> &'static [Currency] {
        &[Currency::USD, Currency::GHS, Currency::EUR]
    }

    /// Resolves an optional currency code, falling back to GHS when the code
    /// is missing or not recognized.
    pub fn from_code(code: Option<&str>) -> Self {
        code.and_then(|c| c.parse().ok()).unwrap_or_default()
    }

    /// Formats a price with this currency's symbol and two decimals
    pub fn format_price(&self, price: f64) -> String {
        format!("{}{:.2}", self.symbol(), price)
    }
}

impl FromStr for Currency {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USD" => Ok(Currency::USD),
            "GHS" => Ok(Currency::GHS),
            "EUR" => Ok(Currency::EUR),
            other => Err(PriceError::UnsupportedCurrency(other.to_string())),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Static rate table used when no live rate is available
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FallbackRates {
    pub icp_usd: f64,
    pub icp_ghs: f64,
    pub icp_eur: f64,
}

/// Rates produced by one successful fetch cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LiveRates {
    pub icp_usd: f64,
    pub icp_ghs: f64,
    pub icp_eur: f64,
}

impl LiveRates {
    /// Derives the full rate table from the ICP quotes and the USD→GHS factor
    pub fn derive(icp_usd: f64, icp_eur: f64, usd_to_ghs: f64) -> Self {
        Self {
            icp_usd,
            icp_ghs: icp_usd * usd_to_ghs,
            icp_eur,
        }
    }
}

/// Where the rates in a snapshot came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Fallback constants, no live fetch has succeeded yet
    Fallback,
    /// Rates from a successful fetch cycle
    Live,
}

/// Full rate state delivered to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateSnapshot {
    /// ICP price in US dollars
    pub icp_usd: f64,

    /// ICP price in Ghanaian cedis
    pub icp_ghs: f64,

    /// ICP price in euros
    pub icp_eur: f64,

    /// When the rates were last replaced
    pub last_updated: DateTime<Utc>,

    /// True only while a fetch cycle is in flight
    pub is_loading: bool,

    /// User-facing message set when the last fetch cycle failed
    pub error: Option<String>,

    /// Where the current rates came from
    pub source: RateSource,

    /// Incremented on every mutation
    pub revision: u64,
}

impl RateSnapshot {
    /// Creates the initial snapshot from a fallback table
    pub fn from_fallback(fallback: FallbackRates) -> Self {
        Self {
            icp_usd: fallback.icp_usd,
            icp_ghs: fallback.icp_ghs,
            icp_eur: fallback.icp_eur,
            last_updated: Utc::now(),
            is_loading: false,
            error: None,
            source: RateSource::Fallback,
            revision: 0,
        }
    }

    /// Get the ICP rate for a currency
    pub fn rate(&self, currency: Currency) -> f64 {
        match currency {
            Currency::USD => self.icp_usd,
            Currency::GHS => self.icp_ghs,
            Currency::EUR => self.icp_eur,
        }
    }

    /// Converts an ICP amount into `currency`
    pub fn convert_from_icp(&self, icp_amount: f64, currency: Currency) -> f64 {
        icp_amount * self.rate(currency)
    }

    /// Converts an amount in `currency` into ICP
    ///
    /// Fails instead of dividing when the rate is zero, negative or not finite.
    pub fn convert_to_icp(&self, amount: f64, currency: Currency) -> Result<f64, PriceError> {
        let rate = self.rate(currency);
        if !rate.is_finite() || rate <= 0.0 {
            return Err(PriceError::invalid_rate(currency, rate));
        }
        Ok(amount / rate)
    }

    /// Replaces all three rates at once and clears any error
    pub(crate) fn apply_live(&mut self, rates: LiveRates) {
        self.icp_usd = rates.icp_usd;
        self.icp_ghs = rates.icp_ghs;
        self.icp_eur = rates.icp_eur;
        self.last_updated = Utc::now();
        self.is_loading = false;
        self.error = None;
        self.source = RateSource::Live;
    }

    /// Check if the rates are older than `threshold_seconds`
    pub fn is_stale(&self, threshold_seconds: u64) -> bool {
        let age = Utc::now().signed_duration_since(self.last_updated);
        age.num_seconds() > threshold_seconds as i64
    }

    /// Get the age of the rates
    pub fn age(&self) -> Duration {
        let duration = Utc::now().signed_duration_since(self.last_updated);
        Duration::from_secs(duration.num_seconds().max(0) as u64)
    }

    /// Human readable age, e.g. "12s ago"
    pub fn updated_ago(&self) -> String {
        format_age(self.age())
    }
}

/// Formats an age as seconds, minutes or hours ago
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    if secs < 60 {
        return format!("{}s ago", secs);
    }
    let mins = secs / 60;
    if mins < 60 {
        return format!("{}m ago", mins);
    }
    format!("{}h ago", mins / 60)
}

/// Overall system health status
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Live rates are fresh
    Healthy,
    /// Serving cached or stale rates
    Degraded,
    /// Serving fallback constants and the last fetch failed
    Unhealthy,
}

/// Component health information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    /// Component name
    pub name: String,
    /// Component status
    pub status: HealthStatus,
    /// Optional status message
    pub message: Option<String>,
    /// Component-specific details
    pub details: std::collections::HashMap<String, serde_json::Value>,
    /// Last checked timestamp
    pub last_checked: DateTime<Utc>,
}
