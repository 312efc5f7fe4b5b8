//! # Read Layer
//!
//! Read-only query families, one per UI surface.
//!
//! ## Structure
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Read Layer                                      │
//! │                                                                         │
//! │  Store ──┬── bills()        BillQueries        bill history + lines     │
//! │          ├── customers()    CustomerQueries    contacts + udhari ledger │
//! │          ├── items()        ItemQueries        catalog + stock status   │
//! │          ├── returns()      ReturnQueries      returns (joined view)    │
//! │          ├── wholesalers()  WholesalerQueries  suppliers + purchases    │
//! │          └── expired()      ExpiredQueries     write-off listing        │
//! │                                                                         │
//! │  Reads never mutate and never start transactions; WAL lets them run     │
//! │  alongside a committing engine operation.                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Malformed Rows
//! List queries decode row-by-row and skip (with a warning) any row
//! that fails to decode, rather than failing the whole listing. A
//! decade-old hand-migrated database with one bad row should still
//! show the other ten thousand.

pub mod bills;
pub mod customers;
pub mod expired;
pub mod items;
pub mod returns;
pub mod wholesalers;

use sqlx::sqlite::SqliteRow;
use sqlx::FromRow;
use tracing::warn;

/// Decodes rows individually, warning on and skipping failures.
pub(crate) fn collect_rows<T>(rows: Vec<SqliteRow>) -> Vec<T>
where
    T: for<'r> FromRow<'r, SqliteRow>,
{
    let total = rows.len();
    let decoded: Vec<T> = rows
        .iter()
        .filter_map(|row| match T::from_row(row) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "Skipping malformed row");
                None
            }
        })
        .collect();

    if decoded.len() < total {
        warn!(skipped = total - decoded.len(), total, "Listing dropped malformed rows");
    }
    decoded
}
