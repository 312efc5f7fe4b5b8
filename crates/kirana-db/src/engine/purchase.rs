//! # Wholesaler Purchase Operations
//!
//! `save_purchase`: goods arriving from a supplier.
//!
//! ## Purchase Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save_purchase(request)                                                 │
//! │                                                                         │
//! │  for each line (by barcode):                                            │
//! │    known item   ──► buying_cost / gst / unit refreshed, stock += qty    │
//! │    unknown item ──► created; selling_cost and mrp start at cost         │
//! │                     (the owner reprices from the inventory screen)      │
//! │                                                                         │
//! │  wholesaler: total_amount += total_cost                                 │
//! │              udhari       += total_cost − amount_paid                   │
//! │                                                                         │
//! │  The owed balance accrues UNCONDITIONALLY from the shortfall; the       │
//! │  is_debt flag only picks the ledger entry's type tag.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Purchase-driven upsert never touches `selling_cost`/`mrp` of an
//! existing item: restocking must not silently change shelf prices.

use chrono::Utc;
use tracing::{info, instrument};

use kirana_core::validation;
use kirana_core::{
    CoreError, GstRate, SavePurchaseRequest, ValidationError, WholesalerEntryType, MAX_LINES,
};

use crate::engine::{item_by_barcode, TransactionEngine};
use crate::error::StoreResult;
use crate::events::StoreEvent;

impl TransactionEngine {
    /// Saves a wholesaler purchase: upserts the purchased items,
    /// restocks them, writes the purchase + line snapshots and books
    /// the supplier ledger. Returns the new purchase id.
    #[instrument(skip(self, request), fields(wholesaler_id = request.wholesaler_id, lines = request.lines.len()))]
    pub async fn save_purchase(&self, request: SavePurchaseRequest) -> StoreResult<i64> {
        if request.lines.is_empty() {
            return Err(CoreError::from(ValidationError::Required { field: "lines" }).into());
        }
        if request.lines.len() > MAX_LINES {
            return Err(CoreError::from(ValidationError::InvalidFormat {
                field: "lines",
                reason: format!("more than {MAX_LINES} lines"),
            })
            .into());
        }

        let total_cost =
            validation::currency("total_cost", request.total_cost).map_err(CoreError::from)?;
        let amount_paid =
            validation::currency("amount_paid", request.amount_paid).map_err(CoreError::from)?;
        let discount =
            validation::currency("discount", request.discount).map_err(CoreError::from)?;

        struct ValidLine {
            barcode: String,
            name: String,
            cost: kirana_core::Money,
            gst: GstRate,
            unit: String,
            quantity: i64,
        }

        let mut lines = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            lines.push(ValidLine {
                barcode: validation::required_text("barcode", &line.barcode)
                    .map_err(CoreError::from)?,
                name: validation::required_text("name", &line.name).map_err(CoreError::from)?,
                cost: validation::currency("cost", line.cost).map_err(CoreError::from)?,
                gst: GstRate::from_percentage(line.gst_percent),
                unit: validation::required_text("unit", &line.unit).map_err(CoreError::from)?,
                quantity: validation::positive_quantity("quantity", line.quantity)
                    .map_err(CoreError::from)?,
            });
        }

        let mut tx = self.pool().begin().await?;

        let wholesaler_id: i64 = sqlx::query_scalar("SELECT id FROM wholesalers WHERE id = ?")
            .bind(request.wholesaler_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "Wholesaler",
                key: request.wholesaler_id.to_string(),
            })?;

        let created_at = request.created_at.unwrap_or_else(Utc::now);

        let purchase_id = sqlx::query(
            "INSERT INTO purchases
                 (wholesaler_id, invoice_number, total_cost, amount_paid, discount, payment_method, notes, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(wholesaler_id)
        .bind(&request.invoice_number)
        .bind(total_cost)
        .bind(amount_paid)
        .bind(discount)
        .bind(request.payment_method)
        .bind(&request.notes)
        .bind(created_at)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        let mut touched_items = Vec::with_capacity(lines.len());
        for line in &lines {
            let item_id = match item_by_barcode(&mut tx, &line.barcode).await? {
                Some(item) => {
                    sqlx::query(
                        "UPDATE items
                         SET buying_cost = ?, gst_bps = ?, unit = ?, stock = stock + ?
                         WHERE id = ?",
                    )
                    .bind(line.cost)
                    .bind(line.gst)
                    .bind(&line.unit)
                    .bind(line.quantity)
                    .bind(item.id)
                    .execute(&mut *tx)
                    .await?;
                    item.id
                }
                None => {
                    sqlx::query(
                        "INSERT INTO items
                             (name, barcode, gst_bps, buying_cost, selling_cost, mrp, stock, unit)
                         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                    )
                    .bind(&line.name)
                    .bind(&line.barcode)
                    .bind(line.gst)
                    .bind(line.cost)
                    .bind(line.cost)
                    .bind(line.cost)
                    .bind(line.quantity)
                    .bind(&line.unit)
                    .execute(&mut *tx)
                    .await?
                    .last_insert_rowid()
                }
            };

            sqlx::query(
                "INSERT INTO purchase_lines
                     (purchase_id, item_id, name_snapshot, barcode_snapshot, unit_snapshot, cost, gst_bps, quantity, line_total)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(purchase_id)
            .bind(item_id)
            .bind(&line.name)
            .bind(&line.barcode)
            .bind(&line.unit)
            .bind(line.cost)
            .bind(line.gst)
            .bind(line.quantity)
            .bind(line.cost.multiply_quantity(line.quantity))
            .execute(&mut *tx)
            .await?;

            touched_items.push(item_id);
        }

        // The owed balance accrues from the shortfall regardless of
        // is_debt; the flag only chooses the entry's type tag.
        let owed = total_cost - amount_paid;
        let entry_type = if request.is_debt {
            WholesalerEntryType::Debt
        } else {
            WholesalerEntryType::Purchase
        };

        sqlx::query(
            "UPDATE wholesalers SET total_amount = total_amount + ?, udhari = udhari + ? WHERE id = ?",
        )
        .bind(total_cost)
        .bind(owed)
        .bind(wholesaler_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO wholesaler_entries (wholesaler_id, purchase_id, amount, entry_type, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(wholesaler_id)
        .bind(purchase_id)
        .bind(owed)
        .bind(entry_type)
        .bind(created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(purchase_id, wholesaler_id, owed = %owed, "Purchase saved");
        self.events().publish(StoreEvent::PurchaseSaved {
            purchase_id,
            wholesaler_id,
        });
        for item_id in touched_items {
            self.events().publish(StoreEvent::InventoryChanged { item_id });
        }
        self.events()
            .publish(StoreEvent::WholesalerChanged { wholesaler_id });

        Ok(purchase_id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
