//! # Domain Types
//!
//! Core domain types for the kirana store.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────────┐   │
//! │  │      Item       │   │      Bill       │   │  CreditLedgerEntry  │   │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────────  │   │
//! │  │  id             │   │  id             │   │  id                 │   │
//! │  │  barcode (biz)  │   │  customer_id?   │   │  customer_id        │   │
//! │  │  stock          │   │  BillLine[]     │   │  amount (signed)    │   │
//! │  │  selling_cost   │   │  total_cost     │   │  debt | repayment   │   │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────────┘   │
//! │                                                                         │
//! │  Wholesaler / WholesalerPurchase / WholesalerLedgerEntry mirror the    │
//! │  customer side for money the store owes its suppliers.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has an `id` (SQLite row id, used for foreign keys) and most
//! carry a natural key used in UI flows: `items.barcode`,
//! `customers.mobile_number`, `wholesalers.contact_number`.
//!
//! ## Snapshot Pattern
//! `BillLine` and `PurchaseLine` freeze item name/barcode/price at
//! transaction time. Historical bills stay immutable when the live Item
//! is renamed or repriced later.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// GST Rate
// =============================================================================

/// GST rate in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000, so 1800 bps = 18%. Integer bps avoid
/// the drift the legacy REAL percentage column suffered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct GstRate(u32);

impl GstRate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        GstRate(bps)
    }

    /// Creates a rate from a percentage (IPC payloads carry percent).
    pub fn from_percentage(pct: f64) -> Self {
        GstRate((pct * 100.0).round().max(0.0) as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

// =============================================================================
// Payment Method
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// Card payment on external terminal.
    Card,
    /// UPI transfer.
    Upi,
    /// Credit sale - settled later through the udhari ledger.
    Udhari,
}

// =============================================================================
// Inventory
// =============================================================================

/// An inventory item.
///
/// `stock` must stay >= 0 at all times; the transaction engine owns every
/// mutation of it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Item {
    pub id: i64,
    pub name: String,
    /// Natural key used by every UI flow (scanner input).
    pub barcode: String,
    pub gst_bps: GstRate,
    pub buying_cost: Money,
    pub selling_cost: Money,
    pub mrp: Money,
    pub stock: i64,
    /// Unit of measure ("pcs", "kg", ...).
    pub unit: String,
}

// =============================================================================
// Customers & Udhari
// =============================================================================

/// A customer with a running udhari balance.
///
/// `udhari` is signed: negative = the customer owes the store. It is
/// denormalized for fast reads but must always equal the sum of the
/// customer's ledger entries.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    /// Natural key (unique).
    pub mobile_number: String,
    pub udhari: Money,
}

/// The type tag on a customer ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum LedgerEntryType {
    /// Credit sale - amount is negative.
    Debt,
    /// Customer paid money back - amount is positive.
    Repayment,
}

/// One row of the customer udhari ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct CreditLedgerEntry {
    pub id: i64,
    pub customer_id: i64,
    /// Present for debt-creating entries, absent for repayments.
    pub bill_id: Option<i64>,
    /// Signed: negative = debt increase, positive = repayment.
    pub amount: Money,
    pub entry_type: LedgerEntryType,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Bills
// =============================================================================

/// A finalized bill. Owns its `BillLine`s exclusively.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Bill {
    pub id: i64,
    pub customer_id: Option<i64>,
    pub payment_method: PaymentMethod,
    pub discount: Money,
    pub total_cost: Money,
    pub amount_paid: Money,
    pub change: Money,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A line item on a bill - a point-in-time snapshot, not a live
/// reference to the Item.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BillLine {
    pub id: i64,
    pub bill_id: i64,
    pub item_id: i64,
    /// Item name at time of sale (frozen).
    pub name_snapshot: String,
    /// Barcode at time of sale (frozen).
    pub barcode_snapshot: String,
    /// Unit of measure at time of sale (frozen).
    pub unit_snapshot: String,
    /// Unit price at time of sale (frozen).
    pub unit_price: Money,
    pub quantity: i64,
    /// unit_price × quantity, computed at sale time.
    pub line_total: Money,
}

// =============================================================================
// Returns
// =============================================================================

/// A recorded customer return. At most one per (bill, item) pair.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReturnEntry {
    pub id: i64,
    pub customer_id: i64,
    pub bill_id: i64,
    pub item_id: i64,
    pub quantity: i64,
    pub refund_amount: Money,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Wholesalers
// =============================================================================

/// A supplier the store purchases from.
///
/// `udhari` mirrors the customer ledger with the opposite sign
/// convention: positive = the store owes the wholesaler.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Wholesaler {
    pub id: i64,
    pub name: String,
    /// Natural key (unique).
    pub contact_number: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub tax_id: Option<String>,
    pub min_order_qty: Option<i64>,
    pub specialty: Option<String>,
    /// Cumulative amount ever purchased from this wholesaler.
    pub total_amount: Money,
    pub udhari: Money,
}

/// The type tag on a wholesaler ledger entry.
///
/// Chosen from the purchase's `is_debt` flag; note that debt accrual on
/// the wholesaler balance is independent of this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum WholesalerEntryType {
    Debt,
    Purchase,
}

/// A purchase from a wholesaler. Owns its `PurchaseLine`s exclusively.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct WholesalerPurchase {
    pub id: i64,
    pub wholesaler_id: i64,
    pub invoice_number: Option<String>,
    pub total_cost: Money,
    pub amount_paid: Money,
    pub discount: Money,
    pub payment_method: PaymentMethod,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// A line item on a wholesaler purchase (snapshot, same immutability
/// rule as `BillLine`).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PurchaseLine {
    pub id: i64,
    pub purchase_id: i64,
    pub item_id: i64,
    pub name_snapshot: String,
    pub barcode_snapshot: String,
    pub unit_snapshot: String,
    /// Per-unit buying cost at purchase time (frozen).
    pub cost: Money,
    pub gst_bps: GstRate,
    pub quantity: i64,
    pub line_total: Money,
}

/// One row of the wholesaler ledger.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct WholesalerLedgerEntry {
    pub id: i64,
    pub wholesaler_id: i64,
    pub purchase_id: Option<i64>,
    /// Positive = the store owes more.
    pub amount: Money,
    pub entry_type: WholesalerEntryType,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Expired Stock
// =============================================================================

/// A write-off of expired inventory.
///
/// Creating one decrements the item's stock; deleting restores it;
/// editing applies the quantity delta.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ExpiredStockEntry {
    pub id: i64,
    pub item_id: i64,
    pub quantity: i64,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    pub reason: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
