//! # Transaction Engine
//!
//! Atomic multi-row mutations over the store.
//!
//! ## Engine Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  One Operation = One Transaction                        │
//! │                                                                         │
//! │  handler ──► engine.save_bill(req)                                      │
//! │                  │                                                      │
//! │                  ├── 1. validate the request (pure, no I/O)             │
//! │                  ├── 2. BEGIN                                           │
//! │                  ├── 3. read + validate against current state           │
//! │                  │      (every precheck BEFORE the first write)         │
//! │                  ├── 4. mutate                                          │
//! │                  ├── 5. COMMIT   ── any error before this: ROLLBACK     │
//! │                  └── 6. publish events (post-commit only)               │
//! │                                                                         │
//! │  Partial effects are impossible: either every row of an operation       │
//! │  lands or none do.                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reversibility
//! Every stock or balance adjustment has an exact inverse, which is what
//! makes delete/restore and edit flows safe: deleting a ledger entry
//! subtracts exactly the amount the entry added, deleting an expired
//! write-off restores exactly the quantity it removed.

mod billing;
mod expired;
mod inventory;
mod purchase;
mod returns;
mod udhari;

use sqlx::{Sqlite, Transaction};

use kirana_core::{CoreError, Money};

use crate::error::StoreResult;
use crate::events::EventBus;
use crate::pool::Store;

// =============================================================================
// Engine
// =============================================================================

/// The single writer for every store mutation.
///
/// Cheap to clone; all clones share the pool and the event bus.
#[derive(Debug, Clone)]
pub struct TransactionEngine {
    store: Store,
    events: EventBus,
}

impl TransactionEngine {
    pub fn new(store: Store, events: EventBus) -> Self {
        TransactionEngine { store, events }
    }

    pub(crate) fn pool(&self) -> &sqlx::SqlitePool {
        self.store.pool()
    }

    pub(crate) fn events(&self) -> &EventBus {
        &self.events
    }
}

// =============================================================================
// Shared In-Transaction Reads
// =============================================================================

/// The item fields the engine needs for stock math and snapshots.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ItemRef {
    pub id: i64,
    pub name: String,
    pub barcode: String,
    pub unit: String,
    pub stock: i64,
}

/// Fetches an item by barcode inside a transaction.
pub(crate) async fn item_by_barcode(
    tx: &mut Transaction<'_, Sqlite>,
    barcode: &str,
) -> StoreResult<Option<ItemRef>> {
    let item = sqlx::query_as::<_, ItemRef>(
        "SELECT id, name, barcode, unit, stock FROM items WHERE barcode = ?",
    )
    .bind(barcode)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(item)
}

/// Fetches an item by id inside a transaction.
pub(crate) async fn item_by_id(
    tx: &mut Transaction<'_, Sqlite>,
    item_id: i64,
) -> StoreResult<Option<ItemRef>> {
    let item = sqlx::query_as::<_, ItemRef>(
        "SELECT id, name, barcode, unit, stock FROM items WHERE id = ?",
    )
    .bind(item_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(item)
}

/// Applies a signed stock delta, enforcing the non-negativity invariant.
///
/// Callers precheck against the stock they just read in the same
/// transaction, so a violation here means a caller bug; it still fails
/// closed rather than committing a negative stock.
pub(crate) async fn adjust_stock(
    tx: &mut Transaction<'_, Sqlite>,
    item: &ItemRef,
    delta: i64,
) -> StoreResult<()> {
    let new_stock = item.stock + delta;
    if new_stock < 0 {
        return Err(CoreError::InsufficientStock {
            barcode: item.barcode.clone(),
            available: item.stock,
            requested: -delta,
        }
        .into());
    }

    sqlx::query("UPDATE items SET stock = ? WHERE id = ?")
        .bind(new_stock)
        .bind(item.id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Applies a signed delta to a customer's denormalized udhari balance.
pub(crate) async fn adjust_customer_udhari(
    tx: &mut Transaction<'_, Sqlite>,
    customer_id: i64,
    delta: Money,
) -> StoreResult<()> {
    sqlx::query("UPDATE customers SET udhari = udhari + ? WHERE id = ?")
        .bind(delta)
        .bind(customer_id)
        .execute(&mut **tx)
        .await?;
    Ok(())
}

/// Asserts a customer exists and returns its id.
pub(crate) async fn require_customer(
    tx: &mut Transaction<'_, Sqlite>,
    customer_id: i64,
) -> StoreResult<i64> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM customers WHERE id = ?")
        .bind(customer_id)
        .fetch_optional(&mut **tx)
        .await?;

    id.ok_or_else(|| {
        CoreError::NotFound {
            entity: "Customer",
            key: customer_id.to_string(),
        }
        .into()
    })
}
