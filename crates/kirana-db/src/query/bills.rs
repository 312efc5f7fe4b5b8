//! Bill history reads.

use serde::Serialize;
use sqlx::SqlitePool;

use kirana_core::{Bill, BillLine};

use crate::error::StoreResult;
use crate::query::collect_rows;

const BILL_COLUMNS: &str =
    "id, customer_id, payment_method, discount, total_cost, amount_paid, change, created_at";

const LINE_COLUMNS: &str =
    "id, bill_id, item_id, name_snapshot, barcode_snapshot, unit_snapshot, unit_price, quantity, line_total";

/// A bill with its line snapshots and the customer it was billed to,
/// as the receipt/history screens show it.
#[derive(Debug, Clone, Serialize)]
pub struct BillView {
    #[serde(flatten)]
    pub bill: Bill,
    /// Absent for walk-in (anonymous) bills.
    pub customer_name: Option<String>,
    pub customer_mobile: Option<String>,
    pub lines: Vec<BillLine>,
}

#[derive(Debug, Clone)]
pub struct BillQueries {
    pool: SqlitePool,
}

impl BillQueries {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        BillQueries { pool }
    }

    /// A single bill with its lines.
    pub async fn by_id(&self, bill_id: i64) -> StoreResult<Option<BillView>> {
        let bill = sqlx::query_as::<_, Bill>(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE id = ?"
        ))
        .bind(bill_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(bill) = bill else { return Ok(None) };

        let customer: Option<(String, String)> = match bill.customer_id {
            Some(customer_id) => {
                sqlx::query_as("SELECT name, mobile_number FROM customers WHERE id = ?")
                    .bind(customer_id)
                    .fetch_optional(&self.pool)
                    .await?
            }
            None => None,
        };
        let (customer_name, customer_mobile) = match customer {
            Some((name, mobile)) => (Some(name), Some(mobile)),
            None => (None, None),
        };

        let lines = sqlx::query_as::<_, BillLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM bill_lines WHERE bill_id = ? ORDER BY id"
        ))
        .bind(bill_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(BillView {
            bill,
            customer_name,
            customer_mobile,
            lines,
        }))
    }

    /// Most recent bills, newest first.
    pub async fn recent(&self, limit: i64) -> StoreResult<Vec<Bill>> {
        let rows = sqlx::query(&format!(
            "SELECT {BILL_COLUMNS} FROM bills ORDER BY created_at DESC, id DESC LIMIT ?"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_rows(rows))
    }

    /// A customer's bills, newest first. The returns screen uses this
    /// to let the cashier pick the bill being returned against.
    pub async fn for_customer(&self, customer_id: i64) -> StoreResult<Vec<Bill>> {
        let rows = sqlx::query(&format!(
            "SELECT {BILL_COLUMNS} FROM bills WHERE customer_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_rows(rows))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
