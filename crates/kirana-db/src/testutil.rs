//! Shared helpers for engine and query tests: an isolated in-memory
//! store plus direct-SQL seeding that bypasses the engine, so tests
//! exercise exactly one operation.

use crate::engine::TransactionEngine;
use crate::events::EventBus;
use crate::pool::Store;

pub(crate) async fn engine() -> (Store, TransactionEngine) {
    let store = Store::in_memory().await.unwrap();
    let engine = TransactionEngine::new(store.clone(), EventBus::new());
    (store, engine)
}

pub(crate) async fn seed_item(
    store: &Store,
    barcode: &str,
    name: &str,
    stock: i64,
    selling_paise: i64,
) -> i64 {
    sqlx::query(
        "INSERT INTO items (name, barcode, gst_bps, buying_cost, selling_cost, mrp, stock, unit)
         VALUES (?, ?, 0, 0, ?, ?, ?, 'pcs')",
    )
    .bind(name)
    .bind(barcode)
    .bind(selling_paise)
    .bind(selling_paise)
    .bind(stock)
    .execute(store.pool())
    .await
    .unwrap()
    .last_insert_rowid()
}

pub(crate) async fn seed_customer(store: &Store, name: &str, mobile: &str) -> i64 {
    sqlx::query("INSERT INTO customers (name, mobile_number, udhari) VALUES (?, ?, 0)")
        .bind(name)
        .bind(mobile)
        .execute(store.pool())
        .await
        .unwrap()
        .last_insert_rowid()
}

pub(crate) async fn seed_wholesaler(store: &Store, name: &str, contact: &str) -> i64 {
    sqlx::query(
        "INSERT INTO wholesalers (name, contact_number, total_amount, udhari) VALUES (?, ?, 0, 0)",
    )
    .bind(name)
    .bind(contact)
    .execute(store.pool())
    .await
    .unwrap()
    .last_insert_rowid()
}

pub(crate) async fn item_stock(store: &Store, barcode: &str) -> i64 {
    sqlx::query_scalar("SELECT stock FROM items WHERE barcode = ?")
        .bind(barcode)
        .fetch_one(store.pool())
        .await
        .unwrap()
}

pub(crate) async fn customer_udhari_paise(store: &Store, customer_id: i64) -> i64 {
    sqlx::query_scalar("SELECT udhari FROM customers WHERE id = ?")
        .bind(customer_id)
        .fetch_one(store.pool())
        .await
        .unwrap()
}

pub(crate) async fn count(store: &Store, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(store.pool())
        .await
        .unwrap()
}
