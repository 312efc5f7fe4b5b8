//! # Request Contracts
//!
//! Explicit request types for every transaction engine operation.
//!
//! The legacy IPC surface passed loosely-typed row objects; here every
//! operation gets a tagged struct so the boundary is checked at
//! deserialization time. Currency fields arrive as decimal rupees
//! (what the cashier typed) and are rounded to 2 decimal places on
//! ingestion via [`Money::from_rupees`](crate::money::Money::from_rupees);
//! everything the engine reads back out of the store is integer paise.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::PaymentMethod;

// =============================================================================
// Billing
// =============================================================================

/// One line of a bill being saved: the item is addressed by barcode,
/// its natural key in every UI flow.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillLineRequest {
    pub barcode: String,
    pub quantity: i64,
    /// Unit price in rupees as charged at the counter.
    pub unit_price: f64,
}

/// Request payload for `save_bill`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaveBillRequest {
    pub customer_id: Option<i64>,
    pub lines: Vec<BillLineRequest>,
    pub payment_method: PaymentMethod,
    pub discount: f64,
    pub total_cost: f64,
    pub amount_paid: f64,
    pub change: f64,
    /// When true the full bill amount is booked to the customer's
    /// udhari ledger; requires `customer_id`.
    pub is_debt: bool,
}

// =============================================================================
// Udhari
// =============================================================================

/// Request payload for `record_repayment`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RepaymentRequest {
    pub customer_id: i64,
    /// Rupees; must be strictly positive.
    pub amount: f64,
    pub note: Option<String>,
    /// Omitted = now. Supplied when the UI restores a deleted
    /// repayment with its original timestamp.
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Request payload for `restore_ledger_entry`.
///
/// Carries the exact fields of the deleted entry (amount already in
/// paise - it round-trips through the read layer, never through a
/// float), so delete→restore is an exact inverse apart from the new id.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RestoreEntryRequest {
    pub customer_id: i64,
    pub bill_id: Option<i64>,
    pub amount: Money,
    pub entry_type: crate::types::LedgerEntryType,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Returns
// =============================================================================

/// Request payload for `add_return`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AddReturnRequest {
    pub customer_mobile: String,
    pub item_barcode: String,
    pub bill_id: i64,
    pub quantity: i64,
    /// Rupees.
    pub refund_amount: f64,
    pub reason: Option<String>,
    /// ISO date (YYYY-MM-DD) the return was taken.
    pub date: String,
}

/// Request payload for `edit_return`.
///
/// Only the item (by name, among the bill's lines), quantity and refund
/// are editable; bill and customer are fixed - delete and re-add to
/// change those.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EditReturnRequest {
    pub id: i64,
    pub item_name: String,
    pub quantity: i64,
    pub refund_amount: f64,
}

// =============================================================================
// Wholesaler Purchases
// =============================================================================

/// One line of a wholesaler purchase. Unknown barcodes create the item
/// (purchase-driven upsert), so the full item description rides along.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PurchaseLineRequest {
    pub barcode: String,
    pub name: String,
    /// Per-unit buying cost in rupees.
    pub cost: f64,
    /// GST as a percentage (18.0 = 18%).
    pub gst_percent: f64,
    pub unit: String,
    pub quantity: i64,
}

/// Request payload for `save_purchase`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SavePurchaseRequest {
    pub wholesaler_id: i64,
    pub invoice_number: Option<String>,
    pub lines: Vec<PurchaseLineRequest>,
    pub total_cost: f64,
    pub amount_paid: f64,
    pub discount: f64,
    pub payment_method: PaymentMethod,
    /// Controls only the ledger entry's type tag; the owed balance
    /// accrues from total_cost − amount_paid regardless.
    pub is_debt: bool,
    pub notes: Option<String>,
    /// Omitted = now.
    #[ts(as = "Option<String>")]
    pub created_at: Option<DateTime<Utc>>,
}

// =============================================================================
// Expired Stock
// =============================================================================

/// Request payload for `add_expired_stock`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AddExpiredRequest {
    pub item_barcode: String,
    pub quantity: i64,
    /// ISO date (YYYY-MM-DD).
    pub expiry_date: String,
    pub reason: Option<String>,
}

/// Request payload for `update_expired_stock`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UpdateExpiredRequest {
    pub id: i64,
    pub quantity: i64,
    /// ISO date; omitted = keep the stored date.
    pub expiry_date: Option<String>,
    pub reason: Option<String>,
}

// =============================================================================
// Inventory / Customer / Wholesaler Maintenance
// =============================================================================

/// Request payload for `add_item` / `update_item` (id ignored on add).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ItemRequest {
    pub id: Option<i64>,
    pub name: String,
    pub barcode: String,
    pub gst_percent: f64,
    pub buying_cost: f64,
    pub selling_cost: f64,
    pub mrp: f64,
    pub stock: i64,
    pub unit: String,
}

/// Request payload for `add_customer` / `update_customer`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CustomerRequest {
    pub id: Option<i64>,
    pub name: String,
    pub mobile_number: String,
}

/// Request payload for `add_wholesaler` / `update_wholesaler`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct WholesalerRequest {
    pub id: Option<i64>,
    pub name: String,
    pub contact_number: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
    pub min_order_qty: Option<i64>,
    pub specialty: Option<String>,
}
