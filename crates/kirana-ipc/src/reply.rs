//! # Reply Envelopes
//!
//! Every handler answers with a `{ success, ... }` envelope - never a
//! transport-level error. The frontend branches on `success` and either
//! reads the payload fields or shows `error.message`.
//!
//! ```json
//! { "success": true, "billId": 42 }
//! { "success": false, "error": { "code": "NOT_FOUND", "message": "Bill not found: 42" } }
//! ```

use serde::Serialize;

use crate::error::ApiError;

/// A handler reply: success with a flattened payload, or failure with
/// an [`ApiError`].
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Reply<T: Serialize> {
    Ok {
        success: bool,
        #[serde(flatten)]
        data: T,
    },
    Err {
        success: bool,
        error: ApiError,
    },
}

impl<T: Serialize> Reply<T> {
    pub fn ok(data: T) -> Self {
        Reply::Ok {
            success: true,
            data,
        }
    }

    pub fn err(error: impl Into<ApiError>) -> Self {
        Reply::Err {
            success: false,
            error: error.into(),
        }
    }

    /// Folds a fallible outcome into an envelope.
    pub fn from_result<E: Into<ApiError>>(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Reply::ok(data),
            Err(e) => Reply::err(e),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Reply::Ok { .. })
    }
}

// =============================================================================
// Payload Types
// =============================================================================

/// Empty success payload for operations with nothing to report.
#[derive(Debug, Serialize)]
pub struct Ack {}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BillSaved {
    pub bill_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySaved {
    pub entry_id: i64,
}

/// The deleted ledger entry rides back so the UI can offer undo.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDeleted {
    pub entry_id: i64,
    pub deleted: kirana_core::CreditLedgerEntry,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReturnSaved {
    pub return_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseSaved {
    pub purchase_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSaved {
    pub id: i64,
}

/// Listing payload for the query handlers.
#[derive(Debug, Serialize)]
pub struct Listing<T: Serialize> {
    pub items: Vec<T>,
}

/// Single-record payload; `record` is null when nothing matched.
#[derive(Debug, Serialize)]
pub struct Record<T: Serialize> {
    pub record: Option<T>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ApiError, ErrorCode};

    #[test]
    fn success_envelope_flattens_payload() {
        let reply = Reply::ok(BillSaved { bill_id: 42 });
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["billId"], 42);
    }

    #[test]
    fn failure_envelope_nests_the_error() {
        let reply: Reply<Ack> = Reply::err(ApiError::new(ErrorCode::NotFound, "Bill not found: 42"));
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "NOT_FOUND");
        assert_eq!(json["error"]["message"], "Bill not found: 42");
    }
}
