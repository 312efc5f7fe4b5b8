//! Expired-stock reads: the write-off listing joined with item details.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::error::StoreResult;
use crate::query::collect_rows;

/// A write-off joined with its item for display.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ExpiredView {
    pub id: i64,
    pub item_id: i64,
    pub item_name: String,
    pub item_barcode: String,
    pub unit: String,
    pub quantity: i64,
    pub expiry_date: NaiveDate,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

const VIEW_SELECT: &str = "
    SELECT e.id, e.item_id, i.name AS item_name, i.barcode AS item_barcode, i.unit,
           e.quantity, e.expiry_date, e.reason, e.created_at
    FROM expired_stock e
    JOIN items i ON i.id = e.item_id";

#[derive(Debug, Clone)]
pub struct ExpiredQueries {
    pool: SqlitePool,
}

impl ExpiredQueries {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        ExpiredQueries { pool }
    }

    /// All write-offs, most recent expiry first.
    pub async fn all(&self) -> StoreResult<Vec<ExpiredView>> {
        let rows = sqlx::query(&format!(
            "{VIEW_SELECT} ORDER BY e.expiry_date DESC, e.id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_rows(rows))
    }

    /// Write-offs for a single item.
    pub async fn for_item(&self, item_id: i64) -> StoreResult<Vec<ExpiredView>> {
        let rows = sqlx::query(&format!("{VIEW_SELECT} WHERE e.item_id = ? ORDER BY e.id"))
            .bind(item_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(collect_rows(rows))
    }

    /// Substring search over item name and barcode.
    pub async fn search(&self, term: &str) -> StoreResult<Vec<ExpiredView>> {
        let pattern = format!("%{}%", term.trim());
        let rows = sqlx::query(&format!(
            "{VIEW_SELECT} WHERE i.name LIKE ?1 OR i.barcode LIKE ?1
             ORDER BY e.expiry_date DESC, e.id DESC"
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
    use kirana_core::AddExpiredRequest;

    use crate::testutil::{engine, seed_item};

    #[tokio::test]
    async fn listing_joins_item_details() {
        let (store, engine) = engine().await;
        let item_id = seed_item(&store, "C1", "Curd 500g", 8, 4000).await;

        engine
            .add_expired_stock(AddExpiredRequest {
                item_barcode: "C1".into(),
                quantity: 3,
                expiry_date: "2026-05-31".into(),
                reason: Some("past date".into()),
            })
            .await
            .unwrap();

        let all = store.expired().all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].item_name, "Curd 500g");
        assert_eq!(all[0].quantity, 3);
        assert_eq!(all[0].expiry_date.to_string(), "2026-05-31");

        let per_item = store.expired().for_item(item_id).await.unwrap();
        assert_eq!(per_item.len(), 1);

        assert_eq!(store.expired().search("curd").await.unwrap().len(), 1);
        assert_eq!(store.expired().search("C1").await.unwrap().len(), 1);
        assert_eq!(store.expired().search("bread").await.unwrap().len(), 0);
    }
}
