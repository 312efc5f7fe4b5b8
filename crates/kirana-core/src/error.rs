//! # Error Types
//!
//! Domain-specific error types for kirana-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  kirana-core errors (this file)                                        │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  kirana-db errors (separate crate)                                     │
//! │  └── StoreError       - Database operation failures                    │
//! │                                                                         │
//! │  kirana-ipc errors                                                     │
//! │  └── ApiError         - What the frontend sees (serialized)            │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → StoreError → ApiError → Frontend  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (barcode, bill id, the bound
//!    that was exceeded) - the UI surfaces these verbatim
//! 3. Errors are enum variants, never bare strings

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by the transaction engine.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A referenced entity is absent (item by barcode, customer by
    /// mobile, bill/return/ledger entry by id).
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// A stock-consuming operation asked for more than is available.
    ///
    /// The message format is load-bearing: the UI shows it verbatim and
    /// the cashier reads the two numbers off the error toast.
    #[error("Insufficient stock for {barcode}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        barcode: String,
        available: i64,
        requested: i64,
    },

    /// Cross-entity referential mismatch, e.g. a return quoting a bill
    /// that belongs to a different customer.
    #[error("Bill {bill_id} does not belong to customer {customer}")]
    Ownership { bill_id: i64, customer: String },

    /// At most one return may exist per (bill, item) pair.
    #[error("A return already exists for item {item} on bill {bill_id}")]
    DuplicateReturn { bill_id: i64, item: String },

    /// Validation error (wraps ValidationError).
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when a request doesn't meet requirements, before any
/// store mutation is attempted.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: &'static str },

    /// Currency values must not be negative.
    #[error("{field} must not be negative")]
    NegativeAmount { field: &'static str },

    /// Invalid format (e.g. a date that is not YYYY-MM-DD).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: &'static str, reason: String },

    /// Duplicate natural key (barcode, mobile number, contact number).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: &'static str, value: String },

    /// A return asked for more units than the bill line carried.
    #[error("Return quantity {requested} exceeds purchased quantity ({purchased})")]
    ExceedsPurchasedQuantity { requested: i64, purchased: i64 },

    /// A refund larger than the original line total.
    #[error("Refund amount {refund} exceeds original line total ({line_total})")]
    ExceedsLineTotal { refund: Money, line_total: Money },

    /// The named item has no line on the named bill.
    #[error("Item {item} was not billed on bill {bill_id}")]
    NotOnBill { item: String, bill_id: i64 },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
