//! # Billing Operations
//!
//! `save_bill`: the single entry point for finalizing a sale.
//!
//! ## Save Bill Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save_bill(request)                                                     │
//! │                                                                         │
//! │  validate request (pure)                                                │
//! │       │                                                                 │
//! │  BEGIN                                                                  │
//! │       │                                                                 │
//! │  resolve customer (if any)                                              │
//! │       │                                                                 │
//! │  resolve every barcode, AGGREGATING duplicate lines,                    │
//! │  and precheck combined quantity against stock                           │
//! │       │            │                                                    │
//! │       │            └── any line short ──► ROLLBACK, nothing changed     │
//! │       ▼                                                                 │
//! │  INSERT bill ──► INSERT bill_lines (snapshots) ──► decrement stock      │
//! │       │                                                                 │
//! │  is_debt? ──► INSERT udhari entry (-total_cost) + update balance        │
//! │       │                                                                 │
//! │  COMMIT ──► publish BillSaved / InventoryChanged                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use tracing::{info, instrument};

use kirana_core::validation;
use kirana_core::{CoreError, LedgerEntryType, SaveBillRequest, ValidationError, MAX_LINES};

use crate::engine::{
    adjust_customer_udhari, adjust_stock, item_by_barcode, require_customer, ItemRef,
    TransactionEngine,
};
use crate::error::StoreResult;
use crate::events::StoreEvent;

impl TransactionEngine {
    /// Finalizes a bill: writes the bill and its line snapshots,
    /// decrements stock, and books the full bill amount to the udhari
    /// ledger when the sale is on credit. Returns the new bill id.
    #[instrument(skip(self, request), fields(lines = request.lines.len()))]
    pub async fn save_bill(&self, request: SaveBillRequest) -> StoreResult<i64> {
        // ---- pure validation, before any I/O ----
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
        if request.is_debt && request.customer_id.is_none() {
            return Err(
                CoreError::from(ValidationError::Required { field: "customer_id" }).into(),
            );
        }

        let discount = validation::currency("discount", request.discount).map_err(CoreError::from)?;
        let total_cost =
            validation::currency("total_cost", request.total_cost).map_err(CoreError::from)?;
        let amount_paid =
            validation::currency("amount_paid", request.amount_paid).map_err(CoreError::from)?;
        let change = validation::currency("change", request.change).map_err(CoreError::from)?;

        let mut validated_lines = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let quantity =
                validation::positive_quantity("quantity", line.quantity).map_err(CoreError::from)?;
            let unit_price =
                validation::currency("unit_price", line.unit_price).map_err(CoreError::from)?;
            validated_lines.push((line.barcode.trim().to_string(), quantity, unit_price));
        }

        let mut tx = self.pool().begin().await?;

        // ---- in-transaction prechecks ----
        if let Some(customer_id) = request.customer_id {
            require_customer(&mut tx, customer_id).await?;
        }

        // Duplicate barcode lines are legal (the cashier scanned the
        // same product twice); stock must cover their SUM.
        let mut aggregated: Vec<(ItemRef, i64)> = Vec::new();
        for (barcode, quantity, _) in &validated_lines {
            if let Some(entry) = aggregated.iter_mut().find(|(i, _)| &i.barcode == barcode) {
                entry.1 += quantity;
                continue;
            }
            let item = item_by_barcode(&mut tx, barcode)
                .await?
                .ok_or_else(|| CoreError::NotFound {
                    entity: "Item",
                    key: barcode.clone(),
                })?;
            aggregated.push((item, *quantity));
        }

        for (item, requested) in &aggregated {
            if *requested > item.stock {
                return Err(CoreError::InsufficientStock {
                    barcode: item.barcode.clone(),
                    available: item.stock,
                    requested: *requested,
                }
                .into());
            }
        }

        // ---- mutations ----
        let created_at = Utc::now();
        let bill_id = sqlx::query(
            "INSERT INTO bills (customer_id, payment_method, discount, total_cost, amount_paid, change, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(request.customer_id)
        .bind(request.payment_method)
        .bind(discount)
        .bind(total_cost)
        .bind(amount_paid)
        .bind(change)
        .bind(created_at)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        for (barcode, quantity, unit_price) in &validated_lines {
            // Barcodes were all resolved during aggregation.
            let item = aggregated
                .iter()
                .map(|(i, _)| i)
                .find(|i| &i.barcode == barcode)
                .ok_or_else(|| CoreError::NotFound {
                    entity: "Item",
                    key: barcode.clone(),
                })?;

            sqlx::query(
                "INSERT INTO bill_lines
                     (bill_id, item_id, name_snapshot, barcode_snapshot, unit_snapshot, unit_price, quantity, line_total)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(bill_id)
            .bind(item.id)
            .bind(&item.name)
            .bind(&item.barcode)
            .bind(&item.unit)
            .bind(unit_price)
            .bind(quantity)
            .bind(unit_price.multiply_quantity(*quantity))
            .execute(&mut *tx)
            .await?;
        }

        for (item, quantity) in &aggregated {
            adjust_stock(&mut tx, item, -quantity).await?;
        }

        // Credit sale: the ledger carries the whole bill, not the
        // unpaid remainder - any cash tendered alongside is already on
        // the bill row. Debt entries are negative by convention.
        if request.is_debt {
            let customer_id = request.customer_id.ok_or(CoreError::Validation(
                ValidationError::Required { field: "customer_id" },
            ))?;

            sqlx::query(
                "INSERT INTO udhari_entries (customer_id, bill_id, amount, entry_type, note, created_at)
                 VALUES (?, ?, ?, ?, NULL, ?)",
            )
            .bind(customer_id)
            .bind(bill_id)
            .bind(-total_cost)
            .bind(LedgerEntryType::Debt)
            .bind(created_at)
            .execute(&mut *tx)
            .await?;

            adjust_customer_udhari(&mut tx, customer_id, -total_cost).await?;
        }

        tx.commit().await?;

        info!(bill_id, total = %total_cost, is_debt = request.is_debt, "Bill saved");

        self.events().publish(StoreEvent::BillSaved { bill_id });
        for (item, _) in &aggregated {
            self.events()
                .publish(StoreEvent::InventoryChanged { item_id: item.id });
        }
        if request.is_debt {
            if let Some(customer_id) = request.customer_id {
                self.events()
                    .publish(StoreEvent::CustomerChanged { customer_id });
            }
        }

        Ok(bill_id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use kirana_core::{
        BillLineRequest, CoreError, PaymentMethod, RepaymentRequest, SaveBillRequest,
    };

    use crate::error::StoreError;
    use crate::testutil::{count, customer_udhari_paise, engine, item_stock, seed_customer, seed_item};

    fn cash_bill(lines: Vec<BillLineRequest>, total: f64) -> SaveBillRequest {
        SaveBillRequest {
            customer_id: None,
            lines,
            payment_method: PaymentMethod::Cash,
            discount: 0.0,
            total_cost: total,
            amount_paid: total,
            change: 0.0,
            is_debt: false,
        }
    }

    #[tokio::test]
    async fn save_bill_decrements_stock_and_snapshots_lines() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Rice 5kg", 10, 45000).await;

        let bill_id = engine
            .save_bill(cash_bill(
                vec![BillLineRequest {
                    barcode: "A1".into(),
                    quantity: 3,
                    unit_price: 450.0,
                }],
                1350.0,
            ))
            .await
            .unwrap();

        assert_eq!(item_stock(&store, "A1").await, 7);

        let (name, line_total): (String, i64) = sqlx::query_as(
            "SELECT name_snapshot, line_total FROM bill_lines WHERE bill_id = ?",
        )
        .bind(bill_id)
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(name, "Rice 5kg");
        assert_eq!(line_total, 3 * 45000);
    }

    #[tokio::test]
    async fn insufficient_stock_rolls_back_everything() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Rice 5kg", 10, 45000).await;
        seed_item(&store, "A2", "Oil 1L", 2, 12000).await;

        let err = engine
            .save_bill(cash_bill(
                vec![
                    BillLineRequest { barcode: "A1".into(), quantity: 3, unit_price: 450.0 },
                    BillLineRequest { barcode: "A2".into(), quantity: 5, unit_price: 120.0 },
                ],
                1950.0,
            ))
            .await
            .unwrap_err();

        assert_eq!(
            err.to_string(),
            "Insufficient stock for A2. Available: 2, Requested: 5"
        );
        // Nothing moved: no bill, no lines, both stocks intact.
        assert_eq!(count(&store, "bills").await, 0);
        assert_eq!(count(&store, "bill_lines").await, 0);
        assert_eq!(item_stock(&store, "A1").await, 10);
        assert_eq!(item_stock(&store, "A2").await, 2);
    }

    #[tokio::test]
    async fn bill_with_duplicate_barcode_lines_checks_combined_quantity() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Rice 5kg", 5, 45000).await;

        // 3 + 3 = 6 > 5 even though each line alone would fit.
        let err = engine
            .save_bill(cash_bill(
                vec![
                    BillLineRequest { barcode: "A1".into(), quantity: 3, unit_price: 450.0 },
                    BillLineRequest { barcode: "A1".into(), quantity: 3, unit_price: 450.0 },
                ],
                2700.0,
            ))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            StoreError::Core(CoreError::InsufficientStock { available: 5, requested: 6, .. })
        ));
        assert_eq!(item_stock(&store, "A1").await, 5);
    }

    fn credit_bill(customer_id: i64, amount_paid: f64) -> SaveBillRequest {
        SaveBillRequest {
            customer_id: Some(customer_id),
            lines: vec![BillLineRequest {
                barcode: "A1".into(),
                quantity: 1,
                unit_price: 200.0,
            }],
            payment_method: PaymentMethod::Udhari,
            discount: 0.0,
            total_cost: 200.0,
            amount_paid,
            change: 0.0,
            is_debt: true,
        }
    }

    #[tokio::test]
    async fn credit_bill_books_minus_total_cost() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Rice 5kg", 10, 45000).await;
        let customer_id = seed_customer(&store, "Asha", "9876543210").await;

        // ₹80 tendered up front does not shrink the ledger entry: the
        // whole ₹200 bill goes on the book.
        let bill_id = engine
            .save_bill(credit_bill(customer_id, 80.0))
            .await
            .unwrap();

        assert_eq!(customer_udhari_paise(&store, customer_id).await, -20000);
        let (amount, entry_type, linked_bill): (i64, String, i64) = sqlx::query_as(
            "SELECT amount, entry_type, bill_id FROM udhari_entries WHERE customer_id = ?",
        )
        .bind(customer_id)
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(amount, -20000);
        assert_eq!(entry_type, "debt");
        assert_eq!(linked_bill, bill_id);
    }

    #[tokio::test]
    async fn fully_paid_debt_bill_still_books_the_full_amount() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Rice 5kg", 10, 45000).await;
        let customer_id = seed_customer(&store, "Asha", "9876543210").await;

        engine
            .save_bill(credit_bill(customer_id, 200.0))
            .await
            .unwrap();

        assert_eq!(customer_udhari_paise(&store, customer_id).await, -20000);
        assert_eq!(count(&store, "udhari_entries").await, 1);
    }

    #[tokio::test]
    async fn credit_sale_then_repayment_walks_the_balance() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Rice 5kg", 10, 45000).await;
        let customer_id = seed_customer(&store, "Asha", "9876543210").await;

        engine
            .save_bill(credit_bill(customer_id, 0.0))
            .await
            .unwrap();
        assert_eq!(customer_udhari_paise(&store, customer_id).await, -20000);

        engine
            .record_repayment(RepaymentRequest {
                customer_id,
                amount: 80.0,
                note: None,
                created_at: None,
            })
            .await
            .unwrap();

        assert_eq!(customer_udhari_paise(&store, customer_id).await, -12000);
        assert_eq!(count(&store, "udhari_entries").await, 2);
    }

    #[tokio::test]
    async fn debt_without_customer_is_rejected() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Rice 5kg", 10, 45000).await;

        let mut request = cash_bill(
            vec![BillLineRequest { barcode: "A1".into(), quantity: 1, unit_price: 450.0 }],
            450.0,
        );
        request.is_debt = true;

        let err = engine.save_bill(request).await.unwrap_err();
        assert!(err.to_string().contains("customer_id is required"));
        assert_eq!(item_stock(&store, "A1").await, 10);
    }

    #[tokio::test]
    async fn unknown_barcode_is_not_found() {
        let (store, engine) = engine().await;
        let _ = store;

        let err = engine
            .save_bill(cash_bill(
                vec![BillLineRequest { barcode: "NOPE".into(), quantity: 1, unit_price: 10.0 }],
                10.0,
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn empty_bill_is_rejected() {
        let (_store, engine) = engine().await;
        let err = engine.save_bill(cash_bill(vec![], 0.0)).await.unwrap_err();
        assert!(err.to_string().contains("lines is required"));
    }

    #[tokio::test]
    async fn bill_line_snapshots_survive_item_edits() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Rice 5kg", 10, 45000).await;

        let bill_id = engine
            .save_bill(cash_bill(
                vec![BillLineRequest { barcode: "A1".into(), quantity: 1, unit_price: 450.0 }],
                450.0,
            ))
            .await
            .unwrap();

        sqlx::query("UPDATE items SET name = 'Rice 10kg', selling_cost = 90000 WHERE barcode = 'A1'")
            .execute(store.pool())
            .await
            .unwrap();

        let (name, price): (String, i64) = sqlx::query_as(
            "SELECT name_snapshot, unit_price FROM bill_lines WHERE bill_id = ?",
        )
        .bind(bill_id)
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(name, "Rice 5kg");
        assert_eq!(price, 45000);
    }
}
