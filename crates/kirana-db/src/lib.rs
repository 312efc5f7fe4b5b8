//! # kirana-db: Store + Transaction Engine
//!
//! SQLite persistence for the kirana ledger: connection pool, schema
//! migrations, the atomic transaction engine and the read layer.
//!
//! ## Crate Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          kirana-db                                      │
//! │                                                                         │
//! │  pool      Store / StoreConfig (WAL, foreign keys, in-memory tests)     │
//! │  schema    CREATE TABLE + catalog-driven additive migrations            │
//! │  engine    TransactionEngine - every mutation, one tx each              │
//! │  query     read-only families, one per UI surface                       │
//! │  events    post-commit broadcast fan-out                                │
//! │  error     StoreError / StoreResult                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! let store = Store::open(StoreConfig::new("kirana.db")).await?;
//! let engine = TransactionEngine::new(store.clone(), EventBus::new());
//!
//! let bill_id = engine.save_bill(request).await?;
//! let view = store.bills().by_id(bill_id).await?;
//! ```

pub mod engine;
pub mod error;
pub mod events;
pub mod pool;
pub mod query;
pub mod schema;

#[cfg(test)]
pub(crate) mod testutil;

pub use engine::TransactionEngine;
pub use error::{StoreError, StoreResult};
pub use events::{EventBus, StoreEvent};
pub use pool::{Store, StoreConfig};
