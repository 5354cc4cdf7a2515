//! Error types for the ICP price sync service

use crate::types::Currency;
use thiserror::Error;

/// Errors that can occur while fetching rates from the upstream APIs
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Invalid response from provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// Provider API error
    #[error("Provider API error: {0}")]
    ApiError(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,
}

/// Errors surfaced to consumers of the price service
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PriceError {
    /// The service was disposed and no longer accepts subscribers
    #[error("Price service has been disposed")]
    Disposed,

    /// Currency code is not one ICP is quoted in
    #[error("Unsupported currency: {0}")]
    UnsupportedCurrency(String),

    /// The current rate cannot be used as a divisor
    #[error("Invalid {currency} rate: {rate}")]
    InvalidRate { currency: Currency, rate: f64 },

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PriceError {
    /// Creates an InvalidRate error
    pub fn invalid_rate(currency: Currency, rate: f64) -> Self {
        Self::InvalidRate { currency, rate }
    }

    /// Creates an Internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

/// A rejected user input, carrying the message shown next to the field
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ValidationError {
    /// Name of the offending field
    pub field: String,
    /// User-facing message
    pub message: String,
}

impl ValidationError {
    /// Creates a validation error for `field`
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Errors converting between ICP and e8s
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AmountError {
    /// Amount is negative, NaN or infinite
    #[error("ICP amount must be a finite non-negative number, got {0}")]
    Invalid(f64),

    /// Amount does not fit in a u64 count of e8s
    #[error("ICP amount {0} exceeds the e8s range")]
    Overflow(f64),
}
