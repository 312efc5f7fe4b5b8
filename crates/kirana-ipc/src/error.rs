//! # API Error Type
//!
//! What the frontend sees when an operation fails.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow to the Frontend                           │
//! │                                                                         │
//! │  engine.save_bill(req)                                                  │
//! │       │                                                                 │
//! │       ├── Ok(bill_id) ───────────► { success: true, billId }            │
//! │       │                                                                 │
//! │       └── Err(StoreError)                                               │
//! │              │                                                          │
//! │              ▼                                                          │
//! │          ApiError { code, message }                                     │
//! │              │                                                          │
//! │              ▼                                                          │
//! │          { success: false, error: { code, message } }                   │
//! │                                                                         │
//! │  Business-rule messages (insufficient stock, return bounds) pass        │
//! │  through VERBATIM - the UI shows them to the cashier as-is.            │
//! │  Infrastructure failures are logged in full and replaced with a         │
//! │  generic message.                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;

use kirana_core::CoreError;
use kirana_db::StoreError;

/// API error inside a failed reply envelope.
///
/// ## Serialization
/// ```json
/// {
///   "code": "INSUFFICIENT_STOCK",
///   "message": "Insufficient stock for A1. Available: 2, Requested: 5"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Referenced entity does not exist
    NotFound,

    /// Input validation failed
    ValidationError,

    /// A stock-consuming operation exceeded available stock
    InsufficientStock,

    /// Bill/customer referential mismatch
    OwnershipError,

    /// Duplicate natural key or duplicate return
    Duplicate,

    /// Database operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Business rule violations keep their message; the code comes from the
/// variant.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let code = match &err {
            CoreError::NotFound { .. } => ErrorCode::NotFound,
            CoreError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            CoreError::Ownership { .. } => ErrorCode::OwnershipError,
            CoreError::DuplicateReturn { .. } => ErrorCode::Duplicate,
            CoreError::Validation(_) => ErrorCode::ValidationError,
        };
        ApiError::new(code, err.to_string())
    }
}

/// Infrastructure failures get logged in full and surface generically;
/// core errors pass through untouched.
impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Core(core) => core.into(),
            StoreError::UniqueViolation { field } => {
                ApiError::new(ErrorCode::Duplicate, format!("Duplicate {field}: already exists"))
            }
            StoreError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(
                    ErrorCode::ValidationError,
                    "Record is still referenced by other records",
                )
            }
            StoreError::ConnectionFailed(e) => {
                tracing::error!("Database connection failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            StoreError::MigrationFailed(e) => {
                tracing::error!("Migration failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            StoreError::QueryFailed(e) => {
                tracing::error!("Query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            StoreError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            StoreError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn business_rule_messages_pass_through_verbatim() {
        let err: ApiError = CoreError::InsufficientStock {
            barcode: "A1".into(),
            available: 2,
            requested: 5,
        }
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert_eq!(
            err.message,
            "Insufficient stock for A1. Available: 2, Requested: 5"
        );
    }

    #[test]
    fn infrastructure_failures_are_generic() {
        let err: ApiError = StoreError::QueryFailed("disk I/O error at page 42".into()).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(!err.message.contains("page 42"));
    }

    #[test]
    fn codes_serialize_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::InsufficientStock).unwrap();
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
    }
}
