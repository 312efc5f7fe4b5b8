//! # Validation Module
//!
//! Input validation utilities shared by the transaction engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Frontend                                                      │
//! │  └── Basic format checks, immediate feedback                            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE (inside the engine, before any mutation)          │
//! │  └── Required fields, sign checks, 2-decimal currency rounding,         │
//! │      ISO date parsing                                                   │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                             │
//! │  └── NOT NULL / UNIQUE / foreign key constraints                        │
//! │                                                                         │
//! │  Defense in depth: the engine never trusts the frontend's checks.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;

use crate::error::ValidationError;
use crate::money::Money;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Requires a non-empty string and returns it trimmed.
pub fn required_text(field: &'static str, value: &str) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::Required { field });
    }
    Ok(value.to_string())
}

/// Validates a mobile / contact number.
///
/// ## Rules
/// - Must not be empty
/// - Digits only, 6 to 15 characters (landlines and mobiles both occur
///   in legacy data)
pub fn phone_number(field: &'static str, value: &str) -> ValidationResult<String> {
    let value = required_text(field, value)?;

    if value.len() < 6 || value.len() > 15 || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field,
            reason: "must be 6-15 digits".to_string(),
        });
    }

    Ok(value)
}

/// Parses an ISO calendar date (YYYY-MM-DD).
pub fn iso_date(field: &'static str, value: &str) -> ValidationResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        ValidationError::InvalidFormat {
            field,
            reason: format!("'{}' is not a YYYY-MM-DD date", value.trim()),
        }
    })
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a quantity (must be strictly positive).
pub fn positive_quantity(field: &'static str, quantity: i64) -> ValidationResult<i64> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive { field });
    }
    Ok(quantity)
}

/// Validates a currency amount: finite, non-negative, rounded to
/// 2 decimal places before storage.
pub fn currency(field: &'static str, rupees: f64) -> ValidationResult<Money> {
    if !rupees.is_finite() {
        return Err(ValidationError::InvalidFormat {
            field,
            reason: "not a finite number".to_string(),
        });
    }
    if rupees < 0.0 {
        return Err(ValidationError::NegativeAmount { field });
    }
    Ok(Money::from_rupees(rupees))
}

/// Validates a currency amount that must be strictly positive
/// (repayments, refunds).
pub fn positive_currency(field: &'static str, rupees: f64) -> ValidationResult<Money> {
    let amount = currency(field, rupees)?;
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive { field });
    }
    Ok(amount)
}

// =============================================================================
// Unit Tests
// =============================================================================
