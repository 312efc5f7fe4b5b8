//! # Return Operations
//!
//! Customer returns against a specific bill line.
//!
//! ## Return Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A return is valid only when ALL of:                                    │
//! │                                                                         │
//! │  1. customer (by mobile) exists                                         │
//! │  2. item (by barcode) exists                                            │
//! │  3. the bill exists AND belongs to that customer                        │
//! │  4. the item has a line on that bill                                    │
//! │  5. quantity   ≤ line.quantity                                          │
//! │  6. refund     ≤ line.line_total                                        │
//! │  7. no return already exists for (bill, item)                           │
//! │                                                                         │
//! │  Effect: stock += quantity (the goods came back).                       │
//! │  Deleting a return takes that stock away again and fails closed         │
//! │  when it has already been re-sold.                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveTime;
use tracing::{info, instrument};

use kirana_core::validation;
use kirana_core::{AddReturnRequest, CoreError, EditReturnRequest, Money, ValidationError};

use crate::engine::{adjust_stock, item_by_barcode, item_by_id, TransactionEngine};
use crate::error::StoreResult;
use crate::events::StoreEvent;

/// The bill-line fields a return is validated against.
#[derive(Debug, sqlx::FromRow)]
struct LineRef {
    item_id: i64,
    quantity: i64,
    line_total: Money,
}

fn check_bounds(quantity: i64, refund: Money, line: &LineRef) -> Result<(), CoreError> {
    if quantity > line.quantity {
        return Err(ValidationError::ExceedsPurchasedQuantity {
            requested: quantity,
            purchased: line.quantity,
        }
        .into());
    }
    if refund > line.line_total {
        return Err(ValidationError::ExceedsLineTotal {
            refund,
            line_total: line.line_total,
        }
        .into());
    }
    Ok(())
}

impl TransactionEngine {
    /// Records a customer return and restocks the returned quantity.
    /// Returns the new return id.
    #[instrument(skip(self, request), fields(bill_id = request.bill_id))]
    pub async fn add_return(&self, request: AddReturnRequest) -> StoreResult<i64> {
        let quantity =
            validation::positive_quantity("quantity", request.quantity).map_err(CoreError::from)?;
        let refund = validation::positive_currency("refund_amount", request.refund_amount)
            .map_err(CoreError::from)?;
        let date = validation::iso_date("date", &request.date).map_err(CoreError::from)?;

        let mut tx = self.pool().begin().await?;

        let customer_id: i64 =
            sqlx::query_scalar("SELECT id FROM customers WHERE mobile_number = ?")
                .bind(request.customer_mobile.trim())
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| CoreError::NotFound {
                    entity: "Customer",
                    key: request.customer_mobile.clone(),
                })?;

        let item = item_by_barcode(&mut tx, request.item_barcode.trim())
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "Item",
                key: request.item_barcode.clone(),
            })?;

        let bill_customer: Option<i64> =
            sqlx::query_scalar("SELECT customer_id FROM bills WHERE id = ?")
                .bind(request.bill_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| CoreError::NotFound {
                    entity: "Bill",
                    key: request.bill_id.to_string(),
                })?;

        if bill_customer != Some(customer_id) {
            return Err(CoreError::Ownership {
                bill_id: request.bill_id,
                customer: request.customer_mobile.clone(),
            }
            .into());
        }

        let line = sqlx::query_as::<_, LineRef>(
            "SELECT item_id, quantity, line_total FROM bill_lines
             WHERE bill_id = ? AND item_id = ?",
        )
        .bind(request.bill_id)
        .bind(item.id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            CoreError::from(ValidationError::NotOnBill {
                item: item.barcode.clone(),
                bill_id: request.bill_id,
            })
        })?;

        check_bounds(quantity, refund, &line)?;

        let already: Option<i64> =
            sqlx::query_scalar("SELECT id FROM returns WHERE bill_id = ? AND item_id = ?")
                .bind(request.bill_id)
                .bind(item.id)
                .fetch_optional(&mut *tx)
                .await?;
        if already.is_some() {
            return Err(CoreError::DuplicateReturn {
                bill_id: request.bill_id,
                item: item.name.clone(),
            }
            .into());
        }

        let created_at = date.and_time(NaiveTime::MIN).and_utc();
        let return_id = sqlx::query(
            "INSERT INTO returns (customer_id, bill_id, item_id, quantity, refund_amount, reason, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(customer_id)
        .bind(request.bill_id)
        .bind(item.id)
        .bind(quantity)
        .bind(refund)
        .bind(&request.reason)
        .bind(created_at)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        adjust_stock(&mut tx, &item, quantity).await?;
        tx.commit().await?;

        info!(return_id, bill_id = request.bill_id, quantity, "Return recorded");
        self.events().publish(StoreEvent::ReturnAdded { return_id });
        self.events()
            .publish(StoreEvent::InventoryChanged { item_id: item.id });

        Ok(return_id)
    }

    /// Edits a return in place: item (picked by name among the bill's
    /// lines), quantity and refund. Bill and customer are fixed.
    #[instrument(skip(self, request), fields(return_id = request.id))]
    pub async fn edit_return(&self, request: EditReturnRequest) -> StoreResult<()> {
        let quantity =
            validation::positive_quantity("quantity", request.quantity).map_err(CoreError::from)?;
        let refund = validation::positive_currency("refund_amount", request.refund_amount)
            .map_err(CoreError::from)?;
        let item_name = validation::required_text("item_name", &request.item_name)
            .map_err(CoreError::from)?;

        let mut tx = self.pool().begin().await?;

        let existing: Option<(i64, i64, i64)> = sqlx::query_as(
            "SELECT bill_id, item_id, quantity FROM returns WHERE id = ?",
        )
        .bind(request.id)
        .fetch_optional(&mut *tx)
        .await?;
        let (bill_id, old_item_id, old_quantity) = existing.ok_or_else(|| CoreError::NotFound {
            entity: "Return",
            key: request.id.to_string(),
        })?;

        let line = sqlx::query_as::<_, LineRef>(
            "SELECT item_id, quantity, line_total FROM bill_lines
             WHERE bill_id = ? AND name_snapshot = ?",
        )
        .bind(bill_id)
        .bind(&item_name)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| {
            CoreError::from(ValidationError::NotOnBill {
                item: item_name.clone(),
                bill_id,
            })
        })?;

        check_bounds(quantity, refund, &line)?;

        if line.item_id != old_item_id {
            // Moving the return to a different line: the target line
            // must not already have one.
            let clash: Option<i64> = sqlx::query_scalar(
                "SELECT id FROM returns WHERE bill_id = ? AND item_id = ? AND id != ?",
            )
            .bind(bill_id)
            .bind(line.item_id)
            .bind(request.id)
            .fetch_optional(&mut *tx)
            .await?;
            if clash.is_some() {
                return Err(CoreError::DuplicateReturn {
                    bill_id,
                    item: item_name.clone(),
                }
                .into());
            }

            let old_item = item_by_id(&mut tx, old_item_id)
                .await?
                .ok_or_else(|| CoreError::NotFound {
                    entity: "Item",
                    key: old_item_id.to_string(),
                })?;
            let new_item = item_by_id(&mut tx, line.item_id)
                .await?
                .ok_or_else(|| CoreError::NotFound {
                    entity: "Item",
                    key: line.item_id.to_string(),
                })?;

            // Take back the old restock, apply the new one.
            adjust_stock(&mut tx, &old_item, -old_quantity).await?;
            adjust_stock(&mut tx, &new_item, quantity).await?;
        } else {
            let item = item_by_id(&mut tx, old_item_id)
                .await?
                .ok_or_else(|| CoreError::NotFound {
                    entity: "Item",
                    key: old_item_id.to_string(),
                })?;
            adjust_stock(&mut tx, &item, quantity - old_quantity).await?;
        }

        sqlx::query(
            "UPDATE returns SET item_id = ?, quantity = ?, refund_amount = ? WHERE id = ?",
        )
        .bind(line.item_id)
        .bind(quantity)
        .bind(refund)
        .bind(request.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(return_id = request.id, "Return edited");
        self.events().publish(StoreEvent::ReturnEdited { return_id: request.id });
        self.events()
            .publish(StoreEvent::InventoryChanged { item_id: line.item_id });

        Ok(())
    }

    /// Deletes a return, removing the restocked quantity again. Fails
    /// with `InsufficientStock` when those units were already re-sold.
    #[instrument(skip(self))]
    pub async fn delete_return(&self, return_id: i64) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;

        let existing: Option<(i64, i64)> =
            sqlx::query_as("SELECT item_id, quantity FROM returns WHERE id = ?")
                .bind(return_id)
                .fetch_optional(&mut *tx)
                .await?;
        let (item_id, quantity) = existing.ok_or_else(|| CoreError::NotFound {
            entity: "Return",
            key: return_id.to_string(),
        })?;

        let item = item_by_id(&mut tx, item_id)
            .await?
            .ok_or_else(|| CoreError::NotFound {
                entity: "Item",
                key: item_id.to_string(),
            })?;

        adjust_stock(&mut tx, &item, -quantity).await?;

        sqlx::query("DELETE FROM returns WHERE id = ?")
            .bind(return_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(return_id, "Return deleted");
        self.events().publish(StoreEvent::ReturnDeleted { return_id });
        self.events()
            .publish(StoreEvent::InventoryChanged { item_id });

        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use kirana_core::{
        AddReturnRequest, BillLineRequest, CoreError, EditReturnRequest, PaymentMethod,
        SaveBillRequest, ValidationError,
    };

    use crate::engine::TransactionEngine;
    use crate::error::StoreError;
    use crate::testutil::{count, engine, item_stock, seed_customer, seed_item};

    /// Cash bill of 4 × A1 @ ₹50 for the given customer.
    async fn bill_of_four(engine: &TransactionEngine, customer_id: i64) -> i64 {
        engine
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
            .unwrap()
    }

    fn return_req(bill_id: i64, quantity: i64, refund: f64) -> AddReturnRequest {
        AddReturnRequest {
            customer_mobile: "9876543210".into(),
            item_barcode: "A1".into(),
            bill_id,
            quantity,
            refund_amount: refund,
            reason: Some("damaged".into()),
            date: "2026-03-01".into(),
        }
    }

    #[tokio::test]
    async fn add_return_restocks_the_quantity() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Soap", 10, 5000).await;
        let customer_id = seed_customer(&store, "Asha", "9876543210").await;
        let bill_id = bill_of_four(&engine, customer_id).await;
        assert_eq!(item_stock(&store, "A1").await, 6);

        engine.add_return(return_req(bill_id, 2, 100.0)).await.unwrap();

        assert_eq!(item_stock(&store, "A1").await, 8);
        assert_eq!(count(&store, "returns").await, 1);
    }

    #[tokio::test]
    async fn return_cannot_exceed_purchased_quantity() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Soap", 10, 5000).await;
        let customer_id = seed_customer(&store, "Asha", "9876543210").await;
        let bill_id = bill_of_four(&engine, customer_id).await;

        let err = engine.add_return(return_req(bill_id, 6, 100.0)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Return quantity 6 exceeds purchased quantity (4)"
        );
        assert_eq!(item_stock(&store, "A1").await, 6);
    }

    #[tokio::test]
    async fn refund_cannot_exceed_line_total() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Soap", 10, 5000).await;
        let customer_id = seed_customer(&store, "Asha", "9876543210").await;
        let bill_id = bill_of_four(&engine, customer_id).await;

        // Line total is ₹200.
        let err = engine.add_return(return_req(bill_id, 1, 250.0)).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::Validation(ValidationError::ExceedsLineTotal { .. }))
        ));
    }

    #[tokio::test]
    async fn second_return_for_same_line_is_rejected() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Soap", 10, 5000).await;
        let customer_id = seed_customer(&store, "Asha", "9876543210").await;
        let bill_id = bill_of_four(&engine, customer_id).await;

        engine.add_return(return_req(bill_id, 1, 50.0)).await.unwrap();
        let err = engine.add_return(return_req(bill_id, 1, 50.0)).await.unwrap_err();

        assert!(matches!(
            err,
            StoreError::Core(CoreError::DuplicateReturn { .. })
        ));
        assert_eq!(count(&store, "returns").await, 1);
    }

    #[tokio::test]
    async fn bill_of_another_customer_is_rejected() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Soap", 10, 5000).await;
        let owner = seed_customer(&store, "Asha", "9876543210").await;
        seed_customer(&store, "Ravi", "9000000000").await;
        let bill_id = bill_of_four(&engine, owner).await;

        let mut req = return_req(bill_id, 1, 50.0);
        req.customer_mobile = "9000000000".into();

        let err = engine.add_return(req).await.unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::Ownership { .. })));
    }

    #[tokio::test]
    async fn item_without_a_line_on_the_bill_is_rejected() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Soap", 10, 5000).await;
        seed_item(&store, "B2", "Oil", 10, 12000).await;
        let customer_id = seed_customer(&store, "Asha", "9876543210").await;
        let bill_id = bill_of_four(&engine, customer_id).await;

        let mut req = return_req(bill_id, 1, 50.0);
        req.item_barcode = "B2".into();

        let err = engine.add_return(req).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::Validation(ValidationError::NotOnBill { .. }))
        ));
    }

    #[tokio::test]
    async fn edit_return_applies_the_stock_delta() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Soap", 10, 5000).await;
        let customer_id = seed_customer(&store, "Asha", "9876543210").await;
        let bill_id = bill_of_four(&engine, customer_id).await;

        let return_id = engine.add_return(return_req(bill_id, 1, 50.0)).await.unwrap();
        assert_eq!(item_stock(&store, "A1").await, 7);

        engine
            .edit_return(EditReturnRequest {
                id: return_id,
                item_name: "Soap".into(),
                quantity: 3,
                refund_amount: 150.0,
            })
            .await
            .unwrap();

        // 1 → 3 returned units: stock gains the difference.
        assert_eq!(item_stock(&store, "A1").await, 9);
        let (quantity, refund): (i64, i64) =
            sqlx::query_as("SELECT quantity, refund_amount FROM returns WHERE id = ?")
                .bind(return_id)
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(quantity, 3);
        assert_eq!(refund, 15000);
    }

    #[tokio::test]
    async fn delete_return_fails_when_units_were_resold() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Soap", 5, 5000).await;
        let customer_id = seed_customer(&store, "Asha", "9876543210").await;
        let bill_id = bill_of_four(&engine, customer_id).await; // stock 1

        let return_id = engine.add_return(return_req(bill_id, 3, 150.0)).await.unwrap();
        assert_eq!(item_stock(&store, "A1").await, 4);

        // Re-sell the returned units.
        engine
            .save_bill(SaveBillRequest {
                customer_id: None,
                lines: vec![BillLineRequest {
                    barcode: "A1".into(),
                    quantity: 3,
                    unit_price: 50.0,
                }],
                payment_method: PaymentMethod::Cash,
                discount: 0.0,
                total_cost: 150.0,
                amount_paid: 150.0,
                change: 0.0,
                is_debt: false,
            })
            .await
            .unwrap();
        assert_eq!(item_stock(&store, "A1").await, 1);

        // Deleting would drive stock to -2; the return must survive.
        let err = engine.delete_return(return_id).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::InsufficientStock { .. })
        ));
        assert_eq!(count(&store, "returns").await, 1);
        assert_eq!(item_stock(&store, "A1").await, 1);
    }

    #[tokio::test]
    async fn delete_return_removes_restocked_units() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Soap", 10, 5000).await;
        let customer_id = seed_customer(&store, "Asha", "9876543210").await;
        let bill_id = bill_of_four(&engine, customer_id).await;

        let return_id = engine.add_return(return_req(bill_id, 2, 100.0)).await.unwrap();
        assert_eq!(item_stock(&store, "A1").await, 8);

        engine.delete_return(return_id).await.unwrap();
        assert_eq!(item_stock(&store, "A1").await, 6);
        assert_eq!(count(&store, "returns").await, 0);
    }
}
