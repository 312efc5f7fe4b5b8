//! Return reads: the returns screen shows a joined view (customer and
//! item resolved to names), searchable by customer, item or bill id.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use kirana_core::Money;

use crate::error::StoreResult;
use crate::query::collect_rows;

/// A return joined with its customer and item for display.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ReturnView {
    pub id: i64,
    pub bill_id: i64,
    pub customer_name: String,
    pub customer_mobile: String,
    pub item_name: String,
    pub item_barcode: String,
    pub quantity: i64,
    pub refund_amount: Money,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

const VIEW_SELECT: &str = "
    SELECT r.id, r.bill_id,
           c.name AS customer_name, c.mobile_number AS customer_mobile,
           i.name AS item_name, i.barcode AS item_barcode,
           r.quantity, r.refund_amount, r.reason, r.created_at
    FROM returns r
    JOIN customers c ON c.id = r.customer_id
    JOIN items i ON i.id = r.item_id";

#[derive(Debug, Clone)]
pub struct ReturnQueries {
    pool: SqlitePool,
}

impl ReturnQueries {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        ReturnQueries { pool }
    }

    /// All returns, newest first.
    pub async fn all(&self) -> StoreResult<Vec<ReturnView>> {
        let rows = sqlx::query(&format!("{VIEW_SELECT} ORDER BY r.created_at DESC, r.id DESC"))
            .fetch_all(&self.pool)
            .await?;
        Ok(collect_rows(rows))
    }

    /// Returns filed against one bill.
    pub async fn for_bill(&self, bill_id: i64) -> StoreResult<Vec<ReturnView>> {
        let rows = sqlx::query(&format!("{VIEW_SELECT} WHERE r.bill_id = ? ORDER BY r.id"))
            .bind(bill_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(collect_rows(rows))
    }

    /// Substring search over customer name/mobile, item name/barcode
    /// and the bill id - everything the returns screen's single search
    /// box matches against.
    pub async fn search(&self, term: &str) -> StoreResult<Vec<ReturnView>> {
        let pattern = format!("%{}%", term.trim());
        let rows = sqlx::query(&format!(
            "{VIEW_SELECT}
             WHERE c.name LIKE ?1 OR c.mobile_number LIKE ?1
                OR i.name LIKE ?1 OR i.barcode LIKE ?1
                OR CAST(r.bill_id AS TEXT) LIKE ?1
             ORDER BY r.created_at DESC, r.id DESC"
        ))
        .bind(&pattern)
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
    use kirana_core::{AddReturnRequest, BillLineRequest, PaymentMethod, SaveBillRequest};

    use crate::testutil::{engine, seed_customer, seed_item};

    #[tokio::test]
    async fn view_joins_customer_and_item() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Soap", 10, 5000).await;
        let customer_id = seed_customer(&store, "Asha", "9876543210").await;

        let bill_id = engine
            .save_bill(SaveBillRequest {
                customer_id: Some(customer_id),
                lines: vec![BillLineRequest {
                    barcode: "A1".into(),
                    quantity: 4,
                    unit_price: 50.0,
                }],
                payment_method: PaymentMethod::Cash,
                discount: 0.0,
                total_cost: 200.0,
                amount_paid: 200.0,
                change: 0.0,
                is_debt: false,
            })
            .await
            .unwrap();

        engine
            .add_return(AddReturnRequest {
                customer_mobile: "9876543210".into(),
                item_barcode: "A1".into(),
                bill_id,
                quantity: 2,
                refund_amount: 100.0,
                reason: None,
                date: "2026-03-01".into(),
            })
            .await
            .unwrap();

        let all = store.returns().all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].customer_name, "Asha");
        assert_eq!(all[0].item_name, "Soap");
        assert_eq!(all[0].refund_amount.paise(), 10000);

        let by_bill = store.returns().for_bill(bill_id).await.unwrap();
        assert_eq!(by_bill.len(), 1);

        assert_eq!(store.returns().search("asha").await.unwrap().len(), 1);
        assert_eq!(store.returns().search("soap").await.unwrap().len(), 1);
        assert_eq!(store.returns().search(&bill_id.to_string()).await.unwrap().len(), 1);
        assert_eq!(store.returns().search("ravi").await.unwrap().len(), 0);
    }
}
