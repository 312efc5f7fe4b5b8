//! Customer and udhari ledger reads.

use sqlx::SqlitePool;

use kirana_core::{CreditLedgerEntry, Customer};

use crate::error::StoreResult;
use crate::query::collect_rows;

const CUSTOMER_COLUMNS: &str = "id, name, mobile_number, udhari";
const ENTRY_COLUMNS: &str = "id, customer_id, bill_id, amount, entry_type, note, created_at";

#[derive(Debug, Clone)]
pub struct CustomerQueries {
    pool: SqlitePool,
}

impl CustomerQueries {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        CustomerQueries { pool }
    }

    /// All customers, name order.
    pub async fn all(&self) -> StoreResult<Vec<Customer>> {
        let rows = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers ORDER BY name COLLATE NOCASE"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_rows(rows))
    }

    /// Lookup by the natural key.
    pub async fn by_mobile(&self, mobile: &str) -> StoreResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE mobile_number = ?"
        ))
        .bind(mobile.trim())
        .fetch_optional(&self.pool)
        .await?;
        Ok(customer)
    }

    /// Substring search over name and mobile number.
    pub async fn search(&self, term: &str) -> StoreResult<Vec<Customer>> {
        let pattern = format!("%{}%", term.trim());
        let rows = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers
             WHERE name LIKE ? OR mobile_number LIKE ?
             ORDER BY name COLLATE NOCASE"
        ))
        .bind(&pattern)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_rows(rows))
    }

    /// Customers who currently owe the store (negative balance),
    /// deepest debt first.
    pub async fn debtors(&self) -> StoreResult<Vec<Customer>> {
        let rows = sqlx::query(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customers WHERE udhari < 0 ORDER BY udhari ASC"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_rows(rows))
    }

    /// A customer's full ledger, newest first.
    pub async fn ledger(&self, customer_id: i64) -> StoreResult<Vec<CreditLedgerEntry>> {
        let rows = sqlx::query(&format!(
            "SELECT {ENTRY_COLUMNS} FROM udhari_entries
             WHERE customer_id = ? ORDER BY created_at DESC, id DESC"
        ))
        .bind(customer_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(collect_rows(rows))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use kirana_core::{LedgerEntryType, RepaymentRequest};

    use crate::testutil::{engine, seed_customer};

    #[tokio::test]
    async fn by_mobile_and_search() {
        let (store, _engine) = engine().await;
        seed_customer(&store, "Asha Patel", "9876543210").await;
        seed_customer(&store, "Ravi Kumar", "9000000000").await;

        let asha = store.customers().by_mobile("9876543210").await.unwrap().unwrap();
        assert_eq!(asha.name, "Asha Patel");

        let hits = store.customers().search("kumar").await.unwrap();
        assert_eq!(hits.len(), 1);
        let hits = store.customers().search("987").await.unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn debtors_lists_negative_balances_deepest_first() {
        let (store, _engine) = engine().await;
        let a = seed_customer(&store, "Asha", "9876543210").await;
        let b = seed_customer(&store, "Ravi", "9000000000").await;
        seed_customer(&store, "Meena", "9111111111").await;

        sqlx::query("UPDATE customers SET udhari = -5000 WHERE id = ?")
            .bind(a)
            .execute(store.pool())
            .await
            .unwrap();
        sqlx::query("UPDATE customers SET udhari = -20000 WHERE id = ?")
            .bind(b)
            .execute(store.pool())
            .await
            .unwrap();

        let debtors = store.customers().debtors().await.unwrap();
        assert_eq!(
            debtors.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
            vec!["Ravi", "Asha"]
        );
    }

    #[tokio::test]
    async fn ledger_lists_entries_newest_first() {
        let (store, engine) = engine().await;
        let customer_id = seed_customer(&store, "Asha", "9876543210").await;

        for amount in [50.0, 30.0] {
            engine
                .record_repayment(RepaymentRequest {
                    customer_id,
                    amount,
                    note: None,
                    created_at: None,
                })
                .await
                .unwrap();
        }

        let ledger = store.customers().ledger(customer_id).await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert!(ledger.iter().all(|e| e.entry_type == LedgerEntryType::Repayment));
        // Same timestamp second; id breaks the tie newest-first.
        assert!(ledger[0].id > ledger[1].id);
    }
}
