//! Wholesaler reads: supplier contacts, purchase history and the
//! supplier-side ledger.

use serde::Serialize;
use sqlx::SqlitePool;

use kirana_core::{PurchaseLine, Wholesaler, WholesalerLedgerEntry, WholesalerPurchase};

use crate::error::StoreResult;
use crate::query::collect_rows;

const WHOLESALER_COLUMNS: &str =
    "id, name, contact_number, email, address, tax_id, min_order_qty, specialty, total_amount, udhari";

const PURCHASE_COLUMNS: &str =
    "id, wholesaler_id, invoice_number, total_cost, amount_paid, discount, payment_method, notes, created_at";

const LINE_COLUMNS: &str =
    "id, purchase_id, item_id, name_snapshot, barcode_snapshot, unit_snapshot, cost, gst_bps, quantity, line_total";

/// A purchase with its line snapshots.
#[derive(Debug, Clone, Serialize)]
pub struct PurchaseView {
    #[serde(flatten)]
    pub purchase: WholesalerPurchase,
    pub lines: Vec<PurchaseLine>,
}

#[derive(Debug, Clone)]
pub struct WholesalerQueries {
    pool: SqlitePool,
}

impl WholesalerQueries {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        WholesalerQueries { pool }
    }

    /// All wholesalers, name order.
    pub async fn all(&self) -> StoreResult<Vec<Wholesaler>> {
        let rows = sqlx::query(&format!(
            "SELECT {WHOLESALER_COLUMNS} FROM wholesalers ORDER BY name COLLATE NOCASE"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_rows(rows))
    }

    pub async fn by_id(&self, wholesaler_id: i64) -> StoreResult<Option<Wholesaler>> {
        let wholesaler = sqlx::query_as::<_, Wholesaler>(&format!(
            "SELECT {WHOLESALER_COLUMNS} FROM wholesalers WHERE id = ?"
        ))
        .bind(wholesaler_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(wholesaler)
    }

    /// Exact contact-number lookup; the purchase form uses this to
    /// check whether a supplier already exists before creating one.
    pub async fn by_contact(&self, contact_number: &str) -> StoreResult<Option<Wholesaler>> {
        let wholesaler = sqlx::query_as::<_, Wholesaler>(&format!(
            "SELECT {WHOLESALER_COLUMNS} FROM wholesalers WHERE contact_number = ?"
        ))
        .bind(contact_number.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(wholesaler)
    }

    /// Suppliers the store currently owes, largest balance first.
    pub async fn with_outstanding_balance(&self) -> StoreResult<Vec<Wholesaler>> {
        let rows = sqlx::query(&format!(
            "SELECT {WHOLESALER_COLUMNS} FROM wholesalers WHERE udhari > 0 ORDER BY udhari DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_rows(rows))
    }

    /// One wholesaler's purchases, newest first.
    pub async fn purchases(&self, wholesaler_id: i64) -> StoreResult<Vec<WholesalerPurchase>> {
        let rows = sqlx::query(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases
             WHERE wholesaler_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(wholesaler_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_rows(rows))
    }

    /// A single purchase with its lines.
    pub async fn purchase_by_id(&self, purchase_id: i64) -> StoreResult<Option<PurchaseView>> {
        let purchase = sqlx::query_as::<_, WholesalerPurchase>(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchases WHERE id = ?"
        ))
        .bind(purchase_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(purchase) = purchase else { return Ok(None) };

        let lines = sqlx::query_as::<_, PurchaseLine>(&format!(
            "SELECT {LINE_COLUMNS} FROM purchase_lines WHERE purchase_id = ? ORDER BY id"
        ))
        .bind(purchase_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(PurchaseView { purchase, lines }))
    }

    /// One wholesaler's ledger, newest first.
    pub async fn ledger(&self, wholesaler_id: i64) -> StoreResult<Vec<WholesalerLedgerEntry>> {
        let rows = sqlx::query(
            "SELECT id, wholesaler_id, purchase_id, amount, entry_type, created_at
             FROM wholesaler_entries
             WHERE wholesaler_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(wholesaler_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_rows(rows))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use kirana_core::{PaymentMethod, PurchaseLineRequest, SavePurchaseRequest};

    use crate::testutil::{engine, seed_wholesaler};

    #[tokio::test]
    async fn purchase_history_and_ledger_read_back() {
        let (store, engine) = engine().await;
        let wholesaler_id = seed_wholesaler(&store, "Mehta & Sons", "2212345678").await;

        let purchase_id = engine
            .save_purchase(SavePurchaseRequest {
                wholesaler_id,
                invoice_number: Some("INV-7".into()),
                lines: vec![PurchaseLineRequest {
                    barcode: "A1".into(),
                    name: "Soap".into(),
                    cost: 32.0,
                    gst_percent: 18.0,
                    unit: "pcs".into(),
                    quantity: 10,
                }],
                total_cost: 320.0,
                amount_paid: 100.0,
                discount: 0.0,
                payment_method: PaymentMethod::Cash,
                is_debt: false,
                notes: None,
                created_at: None,
            })
            .await
            .unwrap();

        let purchases = store.wholesalers().purchases(wholesaler_id).await.unwrap();
        assert_eq!(purchases.len(), 1);
        assert_eq!(purchases[0].invoice_number.as_deref(), Some("INV-7"));

        let view = store
            .wholesalers()
            .purchase_by_id(purchase_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(view.lines.len(), 1);
        assert_eq!(view.lines[0].line_total.paise(), 32000);

        let ledger = store.wholesalers().ledger(wholesaler_id).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].amount.paise(), 22000);

        let owing = store.wholesalers().with_outstanding_balance().await.unwrap();
        assert_eq!(owing.len(), 1);
        assert_eq!(owing[0].udhari.paise(), 22000);

        let found = store.wholesalers().by_contact("2212345678").await.unwrap();
        assert_eq!(found.map(|w| w.id), Some(wholesaler_id));
        assert!(store.wholesalers().by_contact("000").await.unwrap().is_none());
    }
}
