//! # Expired Stock Operations
//!
//! Write-offs of inventory that expired on the shelf.
//!
//! ## Stock Effect
//! ```text
//! add_expired      stock -= quantity     (goods binned)
//! update_expired   stock -= (new − old)  (delta only)
//! delete_expired   stock += quantity     (write-off was a mistake)
//!
//! The non-negativity invariant holds throughout: a write-off larger
//! than the remaining stock is rejected before anything changes.
//! ```

use chrono::{NaiveDate, Utc};
use tracing::{info, instrument};

use kirana_core::validation;
use kirana_core::{AddExpiredRequest, CoreError, UpdateExpiredRequest};

use crate::engine::{adjust_stock, item_by_barcode, item_by_id, TransactionEngine};
use crate::error::StoreResult;
use crate::events::StoreEvent;

impl TransactionEngine {
    /// Records an expired-stock write-off and removes the quantity from
    /// stock. Returns the new entry id.
    #[instrument(skip(self, request), fields(barcode = %request.item_barcode))]
    pub async fn add_expired_stock(&self, request: AddExpiredRequest) -> StoreResult<i64> {
        let quantity =
            validation::positive_quantity("quantity", request.quantity).map_err(CoreError::from)?;
        let expiry_date =
            validation::iso_date("expiry_date", &request.expiry_date).map_err(CoreError::from)?;

        let mut tx = self.pool().begin().await?;

        let item = item_by_barcode(&mut tx, request.item_barcode.trim())
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "Item",
                key: request.item_barcode.clone(),
            })?;

        adjust_stock(&mut tx, &item, -quantity).await?;

        let entry_id = sqlx::query(
            "INSERT INTO expired_stock (item_id, quantity, expiry_date, reason, created_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(item.id)
        .bind(quantity)
        .bind(expiry_date)
        .bind(&request.reason)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;

        info!(entry_id, item_id = item.id, quantity, "Expired stock recorded");
        self.events().publish(StoreEvent::ExpiredStockAdded {
            entry_id,
            item_id: item.id,
        });
        self.events()
            .publish(StoreEvent::InventoryChanged { item_id: item.id });

        Ok(entry_id)
    }

    /// Updates a write-off's quantity/expiry/reason, applying only the
    /// quantity delta to stock.
    #[instrument(skip(self, request), fields(entry_id = request.id))]
    pub async fn update_expired_stock(&self, request: UpdateExpiredRequest) -> StoreResult<()> {
        let quantity =
            validation::positive_quantity("quantity", request.quantity).map_err(CoreError::from)?;
        let new_date: Option<NaiveDate> = match &request.expiry_date {
            Some(raw) => Some(validation::iso_date("expiry_date", raw).map_err(CoreError::from)?),
            None => None,
        };

        let mut tx = self.pool().begin().await?;

        let existing: Option<(i64, i64, NaiveDate)> =
            sqlx::query_as("SELECT item_id, quantity, expiry_date FROM expired_stock WHERE id = ?")
                .bind(request.id)
                .fetch_optional(&mut *tx)
                .await?;
        let (item_id, old_quantity, old_date) = existing.ok_or_else(|| CoreError::NotFound {
            entity: "Expired stock entry",
            key: request.id.to_string(),
        })?;

        let item = item_by_id(&mut tx, item_id)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "Item",
                key: item_id.to_string(),
            })?;

        // Growing the write-off takes more stock; shrinking gives back.
        adjust_stock(&mut tx, &item, old_quantity - quantity).await?;

        sqlx::query(
            "UPDATE expired_stock SET quantity = ?, expiry_date = ?, reason = ? WHERE id = ?",
        )
        .bind(quantity)
        .bind(new_date.unwrap_or(old_date))
        .bind(&request.reason)
        .bind(request.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(entry_id = request.id, item_id, quantity, "Expired stock updated");
        self.events().publish(StoreEvent::ExpiredStockUpdated {
            entry_id: request.id,
            item_id,
        });
        self.events()
            .publish(StoreEvent::InventoryChanged { item_id });

        Ok(())
    }

    /// Deletes a write-off and returns its quantity to stock.
    #[instrument(skip(self))]
    pub async fn delete_expired_stock(&self, entry_id: i64) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;

        let existing: Option<(i64, i64)> =
            sqlx::query_as("SELECT item_id, quantity FROM expired_stock WHERE id = ?")
                .bind(entry_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (item_id, quantity) = existing.ok_or_else(|| CoreError::NotFound {
            entity: "Expired stock entry",
            key: entry_id.to_string(),
        })?;

        let item = item_by_id(&mut tx, item_id)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "Item",
                key: item_id.to_string(),
            })?;

        adjust_stock(&mut tx, &item, quantity).await?;

        sqlx::query("DELETE FROM expired_stock WHERE id = ?")
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(entry_id, item_id, quantity, "Expired stock entry deleted");
        self.events()
            .publish(StoreEvent::ExpiredStockDeleted { entry_id, item_id });
        self.events()
            .publish(StoreEvent::InventoryChanged { item_id });

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
