//! # Schema & Migrations
//!
//! Creates the store schema and upgrades legacy databases in place.
//!
//! ## Migration Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Catalog-Driven Migration                               │
//! │                                                                         │
//! │  Store::open()                                                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  1. CREATE TABLE IF NOT EXISTS for every table (no-op when present)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  2. PRAGMA table_info(<table>) ── inspect the live column catalog      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  3. ALTER TABLE ADD COLUMN for each column the catalog is missing      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  4. Legacy data fixups (REAL gstPercentage → INTEGER gst_bps)          │
//! │                                                                         │
//! │  Forward-only and idempotent: running against an already-current       │
//! │  database changes nothing.                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no migration version table. The live catalog IS the version:
//! a column either exists or it doesn't, and additive upgrades compose in
//! any order. Destructive changes are limited to dropping columns whose
//! data has already been merged forward.

use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};

// =============================================================================
// Table DDL
// =============================================================================

/// Every table in creation order (parents before children).
const CREATE_TABLES: &[&str] = &[
    // Inventory
    r#"
    CREATE TABLE IF NOT EXISTS items (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        name          TEXT    NOT NULL,
        barcode       TEXT    NOT NULL UNIQUE,
        gst_bps       INTEGER NOT NULL DEFAULT 0,
        buying_cost   INTEGER NOT NULL DEFAULT 0,
        selling_cost  INTEGER NOT NULL DEFAULT 0,
        mrp           INTEGER NOT NULL DEFAULT 0,
        stock         INTEGER NOT NULL DEFAULT 0,
        unit          TEXT    NOT NULL DEFAULT 'pcs'
    )
    "#,
    // Customers
    r#"
    CREATE TABLE IF NOT EXISTS customers (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        name          TEXT    NOT NULL,
        mobile_number TEXT    NOT NULL UNIQUE,
        udhari        INTEGER NOT NULL DEFAULT 0
    )
    "#,
    // Bills
    r#"
    CREATE TABLE IF NOT EXISTS bills (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id    INTEGER REFERENCES customers(id),
        payment_method TEXT    NOT NULL,
        discount       INTEGER NOT NULL DEFAULT 0,
        total_cost     INTEGER NOT NULL,
        amount_paid    INTEGER NOT NULL,
        change         INTEGER NOT NULL DEFAULT 0,
        created_at     TEXT    NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS bill_lines (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        bill_id          INTEGER NOT NULL REFERENCES bills(id) ON DELETE CASCADE,
        item_id          INTEGER NOT NULL REFERENCES items(id),
        name_snapshot    TEXT    NOT NULL,
        barcode_snapshot TEXT    NOT NULL,
        unit_snapshot    TEXT    NOT NULL,
        unit_price       INTEGER NOT NULL,
        quantity         INTEGER NOT NULL,
        line_total       INTEGER NOT NULL
    )
    "#,
    // Udhari ledger
    r#"
    CREATE TABLE IF NOT EXISTS udhari_entries (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id INTEGER NOT NULL REFERENCES customers(id),
        bill_id     INTEGER REFERENCES bills(id),
        amount      INTEGER NOT NULL,
        entry_type  TEXT    NOT NULL,
        note        TEXT,
        created_at  TEXT    NOT NULL
    )
    "#,
    // Returns - at most one per (bill, item)
    r#"
    CREATE TABLE IF NOT EXISTS returns (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        customer_id   INTEGER NOT NULL REFERENCES customers(id),
        bill_id       INTEGER NOT NULL REFERENCES bills(id),
        item_id       INTEGER NOT NULL REFERENCES items(id),
        quantity      INTEGER NOT NULL,
        refund_amount INTEGER NOT NULL,
        reason        TEXT,
        created_at    TEXT    NOT NULL,
        UNIQUE (bill_id, item_id)
    )
    "#,
    // Wholesalers
    r#"
    CREATE TABLE IF NOT EXISTS wholesalers (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        name           TEXT    NOT NULL,
        contact_number TEXT    NOT NULL UNIQUE,
        email          TEXT,
        address        TEXT,
        tax_id         TEXT,
        min_order_qty  INTEGER,
        specialty      TEXT,
        total_amount   INTEGER NOT NULL DEFAULT 0,
        udhari         INTEGER NOT NULL DEFAULT 0
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS purchases (
        id             INTEGER PRIMARY KEY AUTOINCREMENT,
        wholesaler_id  INTEGER NOT NULL REFERENCES wholesalers(id),
        invoice_number TEXT,
        total_cost     INTEGER NOT NULL,
        amount_paid    INTEGER NOT NULL DEFAULT 0,
        discount       INTEGER NOT NULL DEFAULT 0,
        payment_method TEXT    NOT NULL,
        notes          TEXT,
        created_at     TEXT    NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS purchase_lines (
        id               INTEGER PRIMARY KEY AUTOINCREMENT,
        purchase_id      INTEGER NOT NULL REFERENCES purchases(id) ON DELETE CASCADE,
        item_id          INTEGER NOT NULL REFERENCES items(id),
        name_snapshot    TEXT    NOT NULL,
        barcode_snapshot TEXT    NOT NULL,
        unit_snapshot    TEXT    NOT NULL,
        cost             INTEGER NOT NULL,
        gst_bps          INTEGER NOT NULL DEFAULT 0,
        quantity         INTEGER NOT NULL,
        line_total       INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS wholesaler_entries (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        wholesaler_id INTEGER NOT NULL REFERENCES wholesalers(id),
        purchase_id   INTEGER REFERENCES purchases(id),
        amount        INTEGER NOT NULL,
        entry_type    TEXT    NOT NULL,
        created_at    TEXT    NOT NULL
    )
    "#,
    // Expired stock write-offs
    r#"
    CREATE TABLE IF NOT EXISTS expired_stock (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        item_id     INTEGER NOT NULL REFERENCES items(id),
        quantity    INTEGER NOT NULL,
        expiry_date TEXT    NOT NULL,
        reason      TEXT,
        created_at  TEXT    NOT NULL
    )
    "#,
];

/// Secondary indexes for the hot read paths.
const CREATE_INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_bill_lines_bill ON bill_lines(bill_id)",
    "CREATE INDEX IF NOT EXISTS idx_bills_customer ON bills(customer_id)",
    "CREATE INDEX IF NOT EXISTS idx_udhari_customer ON udhari_entries(customer_id)",
    "CREATE INDEX IF NOT EXISTS idx_returns_customer ON returns(customer_id)",
    "CREATE INDEX IF NOT EXISTS idx_purchase_lines_purchase ON purchase_lines(purchase_id)",
    "CREATE INDEX IF NOT EXISTS idx_purchases_wholesaler ON purchases(wholesaler_id)",
    "CREATE INDEX IF NOT EXISTS idx_wholesaler_entries_wholesaler ON wholesaler_entries(wholesaler_id)",
    "CREATE INDEX IF NOT EXISTS idx_expired_item ON expired_stock(item_id)",
];

/// Columns added after the tables first shipped. Each is applied only
/// when `PRAGMA table_info` shows the column missing, so re-running is
/// free and old databases upgrade additively.
const ADDITIVE_COLUMNS: &[(&str, &str, &str)] = &[
    ("items", "unit", "TEXT NOT NULL DEFAULT 'pcs'"),
    ("wholesalers", "specialty", "TEXT"),
    ("udhari_entries", "note", "TEXT"),
];

// =============================================================================
// Migration Entry Point
// =============================================================================

/// Creates missing tables/indexes/columns and runs legacy fixups.
/// Idempotent; called on every `Store::open`.
pub async fn migrate(pool: &SqlitePool) -> StoreResult<()> {
    info!("Applying schema migrations");

    for ddl in CREATE_TABLES {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
    }

    for ddl in CREATE_INDEXES {
        sqlx::query(ddl)
            .execute(pool)
            .await
            .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;
    }

    for (table, column, definition) in ADDITIVE_COLUMNS {
        ensure_column(pool, table, column, definition).await?;
    }

    merge_legacy_gst_percentage(pool).await?;

    info!("Schema migrations complete");
    Ok(())
}

// =============================================================================
// Catalog Inspection
// =============================================================================

/// Returns the column names of `table` from the live catalog.
pub(crate) async fn table_columns(pool: &SqlitePool, table: &str) -> StoreResult<Vec<String>> {
    // Table names come from compile-time constants, never user input,
    // so string interpolation is safe here (PRAGMA takes no binds).
    let rows = sqlx::query(&format!("PRAGMA table_info({table})"))
        .fetch_all(pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;

    rows.iter()
        .map(|row| {
            row.try_get::<String, _>("name")
                .map_err(|e| StoreError::MigrationFailed(e.to_string()))
        })
        .collect()
}

/// Adds `column` to `table` if the catalog doesn't have it yet.
async fn ensure_column(
    pool: &SqlitePool,
    table: &str,
    column: &str,
    definition: &str,
) -> StoreResult<()> {
    let columns = table_columns(pool, table).await?;
    if columns.iter().any(|c| c == column) {
        return Ok(());
    }

    debug!(table, column, "Adding missing column");
    sqlx::query(&format!("ALTER TABLE {table} ADD COLUMN {column} {definition}"))
        .execute(pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;

    Ok(())
}

// =============================================================================
// Legacy Fixups
// =============================================================================

/// Merges the legacy REAL `gstPercentage` column into integer `gst_bps`.
///
/// Old databases stored GST as a floating-point percentage. The merge
/// converts percent → basis points (18.0 → 1800) for rows that haven't
/// been migrated yet, then drops the old column so the fixup never
/// runs twice.
async fn merge_legacy_gst_percentage(pool: &SqlitePool) -> StoreResult<()> {
    let columns = table_columns(pool, "items").await?;
    if !columns.iter().any(|c| c == "gstPercentage") {
        return Ok(());
    }

    warn!("Legacy gstPercentage column found, merging into gst_bps");

    sqlx::query(
        "UPDATE items
         SET gst_bps = CAST(ROUND(gstPercentage * 100.0) AS INTEGER)
         WHERE gst_bps = 0 AND gstPercentage IS NOT NULL",
    )
    .execute(pool)
    .await
    .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;

    sqlx::query("ALTER TABLE items DROP COLUMN gstPercentage")
        .execute(pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(e.to_string()))?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::Store;

    #[tokio::test]
    async fn test_migrate_is_idempotent() {
        let store = Store::in_memory().await.unwrap();
        // Store::open already migrated; a second run must be a no-op.
        migrate(store.pool()).await.unwrap();
        migrate(store.pool()).await.unwrap();
        assert!(store.health_check().await);
    }

    #[tokio::test]
    async fn test_all_tables_exist() {
        let store = Store::in_memory().await.unwrap();
        for table in [
            "items",
            "customers",
            "bills",
            "bill_lines",
            "udhari_entries",
            "returns",
            "wholesalers",
            "purchases",
            "purchase_lines",
            "wholesaler_entries",
            "expired_stock",
        ] {
            let columns = table_columns(store.pool(), table).await.unwrap();
            assert!(!columns.is_empty(), "table {table} missing");
        }
    }

    #[tokio::test]
    async fn test_additive_column_upgrade() {
        let store = Store::in_memory().await.unwrap();

        // Simulate an old database: items without the unit column.
        sqlx::query("ALTER TABLE items DROP COLUMN unit")
            .execute(store.pool())
            .await
            .unwrap();
        let columns = table_columns(store.pool(), "items").await.unwrap();
        assert!(!columns.contains(&"unit".to_string()));

        migrate(store.pool()).await.unwrap();
        let columns = table_columns(store.pool(), "items").await.unwrap();
        assert!(columns.contains(&"unit".to_string()));
    }

    #[tokio::test]
    async fn test_legacy_gst_percentage_merge() {
        let store = Store::in_memory().await.unwrap();

        sqlx::query("ALTER TABLE items ADD COLUMN gstPercentage REAL")
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO items (name, barcode, gstPercentage, stock) VALUES ('Soap', 'S1', 18.0, 4)",
        )
        .execute(store.pool())
        .await
        .unwrap();

        migrate(store.pool()).await.unwrap();

        let bps: i64 = sqlx::query_scalar("SELECT gst_bps FROM items WHERE barcode = 'S1'")
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(bps, 1800);

        let columns = table_columns(store.pool(), "items").await.unwrap();
        assert!(!columns.contains(&"gstPercentage".to_string()));
    }
}
