//! Payment and card input validation
//!
//! Checks user input before it reaches the payment backend. Every validator
//! returns the message to show next to the offending field.

use crate::{constants::MAX_PAYMENT_AMOUNT, error::ValidationError};
use chrono::{Datelike, NaiveDate, Utc};
use regex::Regex;
use std::sync::LazyLock;

/// Result of validating one field
pub type ValidationResult = Result<(), ValidationError>;

/// Currencies a payment may be denominated in
pub const SUPPORTED_PAYMENT_CURRENCIES: &[&str] = &["GHS", "USD", "EUR", "ICP"];

static SUSPICIOUS_CONTENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<script|javascript:|on\w+\s*=|\bexec\b|\beval\b|\balert\b")
        .expect("suspicious content pattern is valid")
});

static EVENT_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)on\w+\s*=").expect("event handler pattern is valid"));

static JAVASCRIPT_PROTOCOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript:").expect("protocol pattern is valid"));

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

static INTERNATIONAL_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+\d{7,15}$").expect("phone pattern is valid"));

fn invalid(field: &str, message: impl Into<String>) -> ValidationResult {
    Err(ValidationError::new(field, message))
}

/// Number of decimal places a currency's amounts may carry
pub fn decimal_places(currency: &str) -> i32 {
    match currency.to_ascii_uppercase().as_str() {
        "ICP" => 8,
        _ => 2,
    }
}

// ---------------------------------------------------------------------------
// Payments
// ---------------------------------------------------------------------------

/// Validates a payment amount entered as text
pub fn validate_amount_str(amount: &str, currency: &str) -> ValidationResult {
    match amount.trim().parse::<f64>() {
        Ok(value) => validate_amount(value, currency),
        Err(_) => invalid("amount", "Amount must be a valid number"),
    }
}

/// Validates a payment amount against the limits and the currency's precision
pub fn validate_amount(amount: f64, currency: &str) -> ValidationResult {
    if amount.is_nan() {
        return invalid("amount", "Amount must be a valid number");
    }
    if amount <= 0.0 {
        return invalid("amount", "Amount must be greater than 0");
    }
    if amount > MAX_PAYMENT_AMOUNT {
        return invalid("amount", "Amount exceeds maximum limit");
    }

    let places = decimal_places(currency);
    let scale = 10f64.powi(places);
    if (amount * scale).round() / scale != amount {
        return invalid(
            "amount",
            format!("Amount can have at most {} decimal places", places),
        );
    }

    Ok(())
}

/// Validates a payment currency code (case-insensitive)
pub fn validate_currency(currency: &str) -> ValidationResult {
    if currency.trim().is_empty() {
        return invalid("currency", "Currency is required");
    }

    let code = currency.to_ascii_uppercase();
    if !SUPPORTED_PAYMENT_CURRENCIES.contains(&code.as_str()) {
        return invalid(
            "currency",
            format!(
                "Unsupported currency. Supported: {}",
                SUPPORTED_PAYMENT_CURRENCIES.join(", ")
            ),
        );
    }

    Ok(())
}

/// Validates a payment description
pub fn validate_description(description: &str) -> ValidationResult {
    if description.is_empty() {
        return invalid("description", "Description is required");
    }
    if description.trim().chars().count() < 3 {
        return invalid("description", "Description must be at least 3 characters");
    }
    if description.chars().count() > 200 {
        return invalid("description", "Description must not exceed 200 characters");
    }
    if SUSPICIOUS_CONTENT.is_match(description) {
        return invalid("description", "Description contains invalid characters");
    }

    Ok(())
}

/// Validates an Internet Computer principal id
pub fn validate_principal(principal: &str) -> ValidationResult {
    if principal.is_empty() {
        return invalid("principal", "Principal ID is required");
    }

    let well_formed = principal
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !well_formed {
        return invalid("principal", "Invalid principal format");
    }
    if !(5..=63).contains(&principal.len()) {
        return invalid("principal", "Principal ID length is invalid");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Cards
// ---------------------------------------------------------------------------

/// Luhn checksum over a string of ASCII digits
pub fn luhn_check(digits: &str) -> bool {
    let mut sum = 0u32;
    for (i, c) in digits.chars().rev().enumerate() {
        let Some(mut digit) = c.to_digit(10) else {
            return false;
        };
        if i % 2 == 1 {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
    }
    sum % 10 == 0
}

/// Validates a card number; spaces and dashes are ignored
pub fn validate_card_number(card_number: &str) -> ValidationResult {
    if card_number.is_empty() {
        return invalid("card_number", "Card number is required");
    }

    let digits: String = card_number
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();

    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return invalid("card_number", "Card number must contain only digits");
    }
    if !(13..=19).contains(&digits.len()) {
        return invalid("card_number", "Card number must be between 13-19 digits");
    }
    if !luhn_check(&digits) {
        return invalid("card_number", "Invalid card number");
    }

    Ok(())
}

/// Validates a card security code; AMEX cards use four digits, others three
pub fn validate_cvv(cvv: &str, card_type: Option<&str>) -> ValidationResult {
    if cvv.is_empty() {
        return invalid("cvv", "CVV is required");
    }
    if !cvv.chars().all(|c| c.is_ascii_digit()) {
        return invalid("cvv", "CVV must contain only digits");
    }

    let expected = if card_type == Some("AMEX") { 4 } else { 3 };
    if cvv.len() != expected {
        return invalid("cvv", format!("CVV must be {} digits", expected));
    }

    Ok(())
}

/// Validates a card expiry date against today's date
pub fn validate_expiry_date(month: u32, year: i32) -> ValidationResult {
    validate_expiry_date_at(month, year, Utc::now().date_naive())
}

/// Validates a card expiry date against `today`
pub fn validate_expiry_date_at(month: u32, year: i32, today: NaiveDate) -> ValidationResult {
    if month == 0 || year == 0 {
        return invalid("expiry", "Expiry date is required");
    }
    if month > 12 {
        return invalid("expiry", "Invalid expiry month");
    }
    if year < today.year() || (year == today.year() && month < today.month()) {
        return invalid("expiry", "Card has expired");
    }
    if year > today.year() + 10 {
        return invalid("expiry", "Invalid expiry year");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Contact forms
// ---------------------------------------------------------------------------

/// Validates an email address
pub fn validate_email(email: &str) -> ValidationResult {
    if email.is_empty() {
        return invalid("email", "Email is required");
    }
    if !EMAIL.is_match(email) {
        return invalid("email", "Invalid email format");
    }
    Ok(())
}

/// Validates a phone number in international format, e.g. `+233 20 123 4567`
pub fn validate_phone(phone: &str) -> ValidationResult {
    if phone.is_empty() {
        return invalid("phone", "Phone number is required");
    }

    let compact: String = phone
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | '-'))
        .collect();
    if !INTERNATIONAL_PHONE.is_match(&compact) {
        return invalid(
            "phone",
            "Invalid phone number format. Use international format (+233...)",
        );
    }

    Ok(())
}

/// Validates that a field has a non-blank value
pub fn validate_required(value: Option<&str>, field_name: &str) -> ValidationResult {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => invalid(field_name, format!("{} is required", field_name)),
    }
}

// ---------------------------------------------------------------------------
// Sanitizers
// ---------------------------------------------------------------------------

/// Strips angle brackets, `javascript:` and inline event handlers
pub fn sanitize_text(text: &str) -> String {
    let without_tags = text.replace(['<', '>'], "");
    let without_protocol = JAVASCRIPT_PROTOCOL.replace_all(&without_tags, "");
    EVENT_HANDLER
        .replace_all(&without_protocol, "")
        .trim()
        .to_string()
}

/// Keeps only digits and the decimal point
pub fn sanitize_amount(amount: &str) -> String {
    amount
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect()
}

/// Keeps only ASCII letters, upper-cased
pub fn sanitize_currency(currency: &str) -> String {
    currency
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}
