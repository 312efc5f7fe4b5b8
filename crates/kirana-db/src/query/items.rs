//! Inventory reads: catalog listing, barcode lookup, search and the
//! stock-status views the dashboard tiles poll.

use sqlx::SqlitePool;

use kirana_core::{Item, LOW_STOCK_THRESHOLD};

use crate::error::StoreResult;
use crate::query::collect_rows;

const ITEM_COLUMNS: &str =
    "id, name, barcode, gst_bps, buying_cost, selling_cost, mrp, stock, unit";

#[derive(Debug, Clone)]
pub struct ItemQueries {
    pool: SqlitePool,
}

impl ItemQueries {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        ItemQueries { pool }
    }

    /// Full catalog, name order.
    pub async fn all(&self) -> StoreResult<Vec<Item>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items ORDER BY name COLLATE NOCASE"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_rows(rows))
    }

    /// Scanner lookup.
    pub async fn by_barcode(&self, barcode: &str) -> StoreResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE barcode = ?"
        ))
        .bind(barcode.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    /// Substring search over name and barcode.
    pub async fn search(&self, term: &str) -> StoreResult<Vec<Item>> {
        let pattern = format!("%{}%", term.trim());
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE name LIKE ? OR barcode LIKE ?
             ORDER BY name COLLATE NOCASE"
        ))
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_rows(rows))
    }

    /// Items running low: 0 < stock <= threshold.
    pub async fn low_stock(&self) -> StoreResult<Vec<Item>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE stock > 0 AND stock <= ?
             ORDER BY stock ASC, name COLLATE NOCASE"
        ))
        .bind(LOW_STOCK_THRESHOLD)
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_rows(rows))
    }

    /// Items fully sold out.
    pub async fn out_of_stock(&self) -> StoreResult<Vec<Item>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE stock = 0 ORDER BY name COLLATE NOCASE"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_rows(rows))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
