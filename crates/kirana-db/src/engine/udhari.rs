//! # Udhari Ledger Operations
//!
//! The customer credit ledger: repayments plus delete/restore of
//! individual entries.
//!
//! ## Balance Invariant
//! ```text
//! customers.udhari == SUM(udhari_entries.amount) for that customer
//!
//! Every operation that touches one side touches the other in the same
//! transaction:
//!   record_repayment   +amount entry      balance += amount
//!   delete_entry       remove entry       balance -= entry.amount
//!   restore_entry      re-insert entry    balance += entry.amount
//!
//! delete then restore is an exact round trip (new row id aside): the
//! restore request carries the deleted entry's paise amount verbatim,
//! never a re-rounded float.
//! ```

use chrono::Utc;
use tracing::{info, instrument};

use kirana_core::validation;
use kirana_core::{CoreError, CreditLedgerEntry, LedgerEntryType, RepaymentRequest, RestoreEntryRequest};

use crate::engine::{adjust_customer_udhari, require_customer, TransactionEngine};
use crate::error::StoreResult;
use crate::events::StoreEvent;

impl TransactionEngine {
    /// Records a repayment against a customer's udhari balance.
    /// Returns the new ledger entry id.
    #[instrument(skip(self, request), fields(customer_id = request.customer_id))]
    pub async fn record_repayment(&self, request: RepaymentRequest) -> StoreResult<i64> {
        let amount =
            validation::positive_currency("amount", request.amount).map_err(CoreError::from)?;
        let created_at = request.created_at.unwrap_or_else(Utc::now);

        let mut tx = self.pool().begin().await?;
        let customer_id = require_customer(&mut tx, request.customer_id).await?;

        let entry_id = sqlx::query(
            "INSERT INTO udhari_entries (customer_id, bill_id, amount, entry_type, note, created_at)
             VALUES (?, NULL, ?, ?, ?, ?)",
        )
        .bind(customer_id)
        .bind(amount)
        .bind(LedgerEntryType::Repayment)
        .bind(&request.note)
        .bind(created_at)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        adjust_customer_udhari(&mut tx, customer_id, amount).await?;
        tx.commit().await?;

        info!(customer_id, entry_id, amount = %amount, "Repayment recorded");
        self.events()
            .publish(StoreEvent::RepaymentRecorded { customer_id, entry_id });
        self.events()
            .publish(StoreEvent::CustomerChanged { customer_id });

        Ok(entry_id)
    }

    /// Deletes a ledger entry and reverses its effect on the balance.
    ///
    /// Returns the deleted entry so the caller can offer undo via
    /// [`restore_ledger_entry`](Self::restore_ledger_entry).
    #[instrument(skip(self))]
    pub async fn delete_ledger_entry(&self, entry_id: i64) -> StoreResult<CreditLedgerEntry> {
        let mut tx = self.pool().begin().await?;

        let entry = sqlx::query_as::<_, CreditLedgerEntry>(
            "SELECT id, customer_id, bill_id, amount, entry_type, note, created_at
             FROM udhari_entries WHERE id = ?",
        )
        .bind(entry_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| CoreError::NotFound {
            entity: "Ledger entry",
            key: entry_id.to_string(),
        })?;

        sqlx::query("DELETE FROM udhari_entries WHERE id = ?")
            .bind(entry_id)
            .execute(&mut *tx)
            .await?;

        adjust_customer_udhari(&mut tx, entry.customer_id, -entry.amount).await?;
        tx.commit().await?;

        info!(entry_id, customer_id = entry.customer_id, "Ledger entry deleted");
        self.events().publish(StoreEvent::LedgerEntryDeleted {
            customer_id: entry.customer_id,
            entry_id,
        });
        self.events()
            .publish(StoreEvent::CustomerChanged { customer_id: entry.customer_id });

        Ok(entry)
    }

    /// Re-inserts a previously deleted ledger entry with its original
    /// fields and re-applies its balance effect. Returns the new id.
    #[instrument(skip(self, request), fields(customer_id = request.customer_id))]
    pub async fn restore_ledger_entry(&self, request: RestoreEntryRequest) -> StoreResult<i64> {
        let mut tx = self.pool().begin().await?;
        let customer_id = require_customer(&mut tx, request.customer_id).await?;

        let entry_id = sqlx::query(
            "INSERT INTO udhari_entries (customer_id, bill_id, amount, entry_type, note, created_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(customer_id)
        .bind(request.bill_id)
        .bind(request.amount)
        .bind(request.entry_type)
        .bind(&request.note)
        .bind(request.created_at)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        adjust_customer_udhari(&mut tx, customer_id, request.amount).await?;
        tx.commit().await?;

        info!(customer_id, entry_id, "Ledger entry restored");
        self.events()
            .publish(StoreEvent::LedgerEntryRestored { customer_id, entry_id });
        self.events()
            .publish(StoreEvent::CustomerChanged { customer_id });

        Ok(entry_id)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use kirana_core::{
        BillLineRequest, CoreError, PaymentMethod, RepaymentRequest, RestoreEntryRequest,
        SaveBillRequest,
    };

    use crate::error::StoreError;
    use crate::testutil::{count, customer_udhari_paise, engine, seed_customer, seed_item};

    async fn debt_bill(
        engine: &crate::engine::TransactionEngine,
        customer_id: i64,
        total: f64,
    ) -> i64 {
        engine
            .save_bill(SaveBillRequest {
                customer_id: Some(customer_id),
                lines: vec![BillLineRequest {
                    barcode: "A1".into(),
                    quantity: 1,
                    unit_price: total,
                }],
                payment_method: PaymentMethod::Udhari,
                discount: 0.0,
                total_cost: total,
                amount_paid: 0.0,
                change: 0.0,
                is_debt: true,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn repayment_moves_balance_toward_zero() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Rice 5kg", 10, 20000).await;
        let customer_id = seed_customer(&store, "Asha", "9876543210").await;

        debt_bill(&engine, customer_id, 200.0).await;
        assert_eq!(customer_udhari_paise(&store, customer_id).await, -20000);

        engine
            .record_repayment(RepaymentRequest {
                customer_id,
                amount: 80.0,
                note: Some("cash".into()),
                created_at: None,
            })
            .await
            .unwrap();

        // -200 + 80 = -120
        assert_eq!(customer_udhari_paise(&store, customer_id).await, -12000);
    }

    #[tokio::test]
    async fn repayment_must_be_positive() {
        let (store, engine) = engine().await;
        let customer_id = seed_customer(&store, "Asha", "9876543210").await;

        for bad in [0.0, -5.0] {
            let err = engine
                .record_repayment(RepaymentRequest {
                    customer_id,
                    amount: bad,
                    note: None,
                    created_at: None,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::Core(CoreError::Validation(_))));
        }
        assert_eq!(count(&store, "udhari_entries").await, 0);
    }

    #[tokio::test]
    async fn repayment_for_unknown_customer_fails() {
        let (_store, engine) = engine().await;
        let err = engine
            .record_repayment(RepaymentRequest {
                customer_id: 999,
                amount: 50.0,
                note: None,
                created_at: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn delete_then_restore_is_an_exact_round_trip() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Rice 5kg", 10, 20000).await;
        let customer_id = seed_customer(&store, "Asha", "9876543210").await;
        debt_bill(&engine, customer_id, 200.0).await;

        let entry_id: i64 =
            sqlx::query_scalar("SELECT id FROM udhari_entries WHERE customer_id = ?")
                .bind(customer_id)
                .fetch_one(store.pool())
                .await
                .unwrap();

        let deleted = engine.delete_ledger_entry(entry_id).await.unwrap();
        assert_eq!(customer_udhari_paise(&store, customer_id).await, 0);
        assert_eq!(count(&store, "udhari_entries").await, 0);

        engine
            .restore_ledger_entry(RestoreEntryRequest {
                customer_id: deleted.customer_id,
                bill_id: deleted.bill_id,
                amount: deleted.amount,
                entry_type: deleted.entry_type,
                note: deleted.note.clone(),
                created_at: deleted.created_at,
            })
            .await
            .unwrap();

        // Balance and ledger row are back exactly as before.
        assert_eq!(customer_udhari_paise(&store, customer_id).await, -20000);
        let (amount, entry_type): (i64, String) =
            sqlx::query_as("SELECT amount, entry_type FROM udhari_entries WHERE customer_id = ?")
                .bind(customer_id)
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(amount, -20000);
        assert_eq!(entry_type, "debt");
    }

    #[tokio::test]
    async fn delete_missing_entry_is_not_found() {
        let (_store, engine) = engine().await;
        let err = engine.delete_ledger_entry(42).await.unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn balance_always_equals_entry_sum() {
        let (store, engine) = engine().await;
        seed_item(&store, "A1", "Rice 5kg", 10, 20000).await;
        let customer_id = seed_customer(&store, "Asha", "9876543210").await;

        debt_bill(&engine, customer_id, 200.0).await;
        engine
            .record_repayment(RepaymentRequest {
                customer_id,
                amount: 50.0,
                note: None,
                created_at: None,
            })
            .await
            .unwrap();
        engine
            .record_repayment(RepaymentRequest {
                customer_id,
                amount: 30.0,
                note: None,
                created_at: None,
            })
            .await
            .unwrap();

        let sum: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(amount), 0) FROM udhari_entries WHERE customer_id = ?",
        )
        .bind(customer_id)
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(customer_udhari_paise(&store, customer_id).await, sum);
        assert_eq!(sum, -12000);
    }
}
