//! # IPC Handlers
//!
//! One handler per operation the frontend can invoke. Handlers are the
//! ONLY boundary between the desktop shell and the engine/read layer,
//! and they never return `Err`: every outcome - success, business rule
//! violation, infrastructure failure - folds into a [`Reply`] envelope.
//!
//! Handlers add no business logic. Validation and mutation live in the
//! engine; handlers translate results into envelopes and nothing else.

use tracing::debug;

use kirana_core::{
    AddExpiredRequest, AddReturnRequest, Bill, CreditLedgerEntry, Customer, CustomerRequest, Item,
    ItemRequest, RepaymentRequest, RestoreEntryRequest, SaveBillRequest, SavePurchaseRequest,
    UpdateExpiredRequest, EditReturnRequest, Wholesaler, WholesalerLedgerEntry,
    WholesalerPurchase, WholesalerRequest,
};
use kirana_db::query::bills::BillView;
use kirana_db::query::expired::ExpiredView;
use kirana_db::query::returns::ReturnView;
use kirana_db::query::wholesalers::PurchaseView;
use kirana_db::{EventBus, Store, TransactionEngine};

use crate::reply::{
    Ack, BillSaved, EntryDeleted, EntrySaved, Listing, PurchaseSaved, Record, RecordSaved, Reply,
    ReturnSaved,
};

// =============================================================================
// Context
// =============================================================================

/// Shared state handed to every handler: the store for reads, the
/// engine for writes.
#[derive(Debug, Clone)]
pub struct ApiContext {
    store: Store,
    engine: TransactionEngine,
}

impl ApiContext {
    pub fn new(store: Store, events: EventBus) -> Self {
        let engine = TransactionEngine::new(store.clone(), events);
        ApiContext { store, engine }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn engine(&self) -> &TransactionEngine {
        &self.engine
    }
}

// =============================================================================
// Billing
// =============================================================================

pub async fn save_bill(ctx: &ApiContext, request: SaveBillRequest) -> Reply<BillSaved> {
    debug!("save_bill");
    Reply::from_result(
        ctx.engine
            .save_bill(request)
            .await
            .map(|bill_id| BillSaved { bill_id }),
    )
}

pub async fn get_bill(ctx: &ApiContext, bill_id: i64) -> Reply<Record<BillView>> {
    Reply::from_result(
        ctx.store
            .bills()
            .by_id(bill_id)
            .await
            .map(|record| Record { record }),
    )
}

pub async fn recent_bills(ctx: &ApiContext, limit: i64) -> Reply<Listing<Bill>> {
    Reply::from_result(ctx.store.bills().recent(limit).await.map(|items| Listing { items }))
}

pub async fn bills_for_customer(ctx: &ApiContext, customer_id: i64) -> Reply<Listing<Bill>> {
    Reply::from_result(
        ctx.store
            .bills()
            .for_customer(customer_id)
            .await
            .map(|items| Listing { items }),
    )
}

// =============================================================================
// Udhari
// =============================================================================

pub async fn record_repayment(ctx: &ApiContext, request: RepaymentRequest) -> Reply<EntrySaved> {
    debug!("record_repayment");
    Reply::from_result(
        ctx.engine
            .record_repayment(request)
            .await
            .map(|entry_id| EntrySaved { entry_id }),
    )
}

pub async fn delete_ledger_entry(ctx: &ApiContext, entry_id: i64) -> Reply<EntryDeleted> {
    debug!(entry_id, "delete_ledger_entry");
    Reply::from_result(
        ctx.engine
            .delete_ledger_entry(entry_id)
            .await
            .map(|deleted| EntryDeleted { entry_id, deleted }),
    )
}

pub async fn restore_ledger_entry(
    ctx: &ApiContext,
    request: RestoreEntryRequest,
) -> Reply<EntrySaved> {
    debug!("restore_ledger_entry");
    Reply::from_result(
        ctx.engine
            .restore_ledger_entry(request)
            .await
            .map(|entry_id| EntrySaved { entry_id }),
    )
}

pub async fn customer_ledger(
    ctx: &ApiContext,
    customer_id: i64,
) -> Reply<Listing<CreditLedgerEntry>> {
    Reply::from_result(
        ctx.store
            .customers()
            .ledger(customer_id)
            .await
            .map(|items| Listing { items }),
    )
}

// =============================================================================
// Returns
// =============================================================================

pub async fn add_return(ctx: &ApiContext, request: AddReturnRequest) -> Reply<ReturnSaved> {
    debug!("add_return");
    Reply::from_result(
        ctx.engine
            .add_return(request)
            .await
            .map(|return_id| ReturnSaved { return_id }),
    )
}

pub async fn edit_return(ctx: &ApiContext, request: EditReturnRequest) -> Reply<Ack> {
    debug!(return_id = request.id, "edit_return");
    Reply::from_result(ctx.engine.edit_return(request).await.map(|_| Ack {}))
}

pub async fn delete_return(ctx: &ApiContext, return_id: i64) -> Reply<Ack> {
    debug!(return_id, "delete_return");
    Reply::from_result(ctx.engine.delete_return(return_id).await.map(|_| Ack {}))
}

pub async fn get_returns(ctx: &ApiContext) -> Reply<Listing<ReturnView>> {
    Reply::from_result(ctx.store.returns().all().await.map(|items| Listing { items }))
}

pub async fn search_returns(ctx: &ApiContext, term: String) -> Reply<Listing<ReturnView>> {
    Reply::from_result(ctx.store.returns().search(&term).await.map(|items| Listing { items }))
}

// =============================================================================
// Wholesaler Purchases
// =============================================================================

pub async fn save_purchase(ctx: &ApiContext, request: SavePurchaseRequest) -> Reply<PurchaseSaved> {
    debug!("save_purchase");
    Reply::from_result(
        ctx.engine
            .save_purchase(request)
            .await
            .map(|purchase_id| PurchaseSaved { purchase_id }),
    )
}

pub async fn get_purchase(ctx: &ApiContext, purchase_id: i64) -> Reply<Record<PurchaseView>> {
    Reply::from_result(
        ctx.store
            .wholesalers()
            .purchase_by_id(purchase_id)
            .await
            .map(|record| Record { record }),
    )
}

pub async fn wholesaler_purchases(
    ctx: &ApiContext,
    wholesaler_id: i64,
) -> Reply<Listing<WholesalerPurchase>> {
    Reply::from_result(
        ctx.store
            .wholesalers()
            .purchases(wholesaler_id)
            .await
            .map(|items| Listing { items }),
    )
}

pub async fn wholesaler_ledger(
    ctx: &ApiContext,
    wholesaler_id: i64,
) -> Reply<Listing<WholesalerLedgerEntry>> {
    Reply::from_result(
        ctx.store
            .wholesalers()
            .ledger(wholesaler_id)
            .await
            .map(|items| Listing { items }),
    )
}

// =============================================================================
// Expired Stock
// =============================================================================

pub async fn add_expired_stock(ctx: &ApiContext, request: AddExpiredRequest) -> Reply<RecordSaved> {
    debug!("add_expired_stock");
    Reply::from_result(
        ctx.engine
            .add_expired_stock(request)
            .await
            .map(|id| RecordSaved { id }),
    )
}

pub async fn update_expired_stock(
    ctx: &ApiContext,
    request: UpdateExpiredRequest,
) -> Reply<Ack> {
    debug!(entry_id = request.id, "update_expired_stock");
    Reply::from_result(ctx.engine.update_expired_stock(request).await.map(|_| Ack {}))
}

pub async fn delete_expired_stock(ctx: &ApiContext, entry_id: i64) -> Reply<Ack> {
    debug!(entry_id, "delete_expired_stock");
    Reply::from_result(ctx.engine.delete_expired_stock(entry_id).await.map(|_| Ack {}))
}

pub async fn get_expired_stock(ctx: &ApiContext) -> Reply<Listing<ExpiredView>> {
    Reply::from_result(ctx.store.expired().all().await.map(|items| Listing { items }))
}

pub async fn search_expired_stock(ctx: &ApiContext, term: String) -> Reply<Listing<ExpiredView>> {
    Reply::from_result(ctx.store.expired().search(&term).await.map(|items| Listing { items }))
}

// =============================================================================
// Inventory
// =============================================================================

pub async fn add_item(ctx: &ApiContext, request: ItemRequest) -> Reply<RecordSaved> {
    debug!("add_item");
    Reply::from_result(ctx.engine.add_item(request).await.map(|id| RecordSaved { id }))
}

pub async fn update_item(ctx: &ApiContext, request: ItemRequest) -> Reply<Ack> {
    debug!("update_item");
    Reply::from_result(ctx.engine.update_item(request).await.map(|_| Ack {}))
}

pub async fn delete_item(ctx: &ApiContext, item_id: i64) -> Reply<Ack> {
    debug!(item_id, "delete_item");
    Reply::from_result(ctx.engine.delete_item(item_id).await.map(|_| Ack {}))
}

pub async fn get_items(ctx: &ApiContext) -> Reply<Listing<Item>> {
    Reply::from_result(ctx.store.items().all().await.map(|items| Listing { items }))
}

pub async fn get_item(ctx: &ApiContext, barcode: String) -> Reply<Record<Item>> {
    Reply::from_result(
        ctx.store
            .items()
            .by_barcode(&barcode)
            .await
            .map(|record| Record { record }),
    )
}

pub async fn search_items(ctx: &ApiContext, term: String) -> Reply<Listing<Item>> {
    Reply::from_result(ctx.store.items().search(&term).await.map(|items| Listing { items }))
}

pub async fn low_stock_items(ctx: &ApiContext) -> Reply<Listing<Item>> {
    Reply::from_result(ctx.store.items().low_stock().await.map(|items| Listing { items }))
}

pub async fn out_of_stock_items(ctx: &ApiContext) -> Reply<Listing<Item>> {
    Reply::from_result(ctx.store.items().out_of_stock().await.map(|items| Listing { items }))
}

// =============================================================================
// Customers
// =============================================================================

pub async fn add_customer(ctx: &ApiContext, request: CustomerRequest) -> Reply<RecordSaved> {
    debug!("add_customer");
    Reply::from_result(ctx.engine.add_customer(request).await.map(|id| RecordSaved { id }))
}

pub async fn update_customer(ctx: &ApiContext, request: CustomerRequest) -> Reply<Ack> {
    debug!("update_customer");
    Reply::from_result(ctx.engine.update_customer(request).await.map(|_| Ack {}))
}

pub async fn delete_customer(ctx: &ApiContext, customer_id: i64) -> Reply<Ack> {
    debug!(customer_id, "delete_customer");
    Reply::from_result(ctx.engine.delete_customer(customer_id).await.map(|_| Ack {}))
}

pub async fn get_customers(ctx: &ApiContext) -> Reply<Listing<Customer>> {
    Reply::from_result(ctx.store.customers().all().await.map(|items| Listing { items }))
}

pub async fn get_customer(ctx: &ApiContext, mobile: String) -> Reply<Record<Customer>> {
    Reply::from_result(
        ctx.store
            .customers()
            .by_mobile(&mobile)
            .await
            .map(|record| Record { record }),
    )
}

pub async fn search_customers(ctx: &ApiContext, term: String) -> Reply<Listing<Customer>> {
    Reply::from_result(ctx.store.customers().search(&term).await.map(|items| Listing { items }))
}

pub async fn get_debtors(ctx: &ApiContext) -> Reply<Listing<Customer>> {
    Reply::from_result(ctx.store.customers().debtors().await.map(|items| Listing { items }))
}

// =============================================================================
// Wholesalers
// =============================================================================

pub async fn add_wholesaler(ctx: &ApiContext, request: WholesalerRequest) -> Reply<RecordSaved> {
    debug!("add_wholesaler");
    Reply::from_result(ctx.engine.add_wholesaler(request).await.map(|id| RecordSaved { id }))
}

pub async fn update_wholesaler(ctx: &ApiContext, request: WholesalerRequest) -> Reply<Ack> {
    debug!("update_wholesaler");
    Reply::from_result(ctx.engine.update_wholesaler(request).await.map(|_| Ack {}))
}

pub async fn delete_wholesaler(ctx: &ApiContext, wholesaler_id: i64) -> Reply<Ack> {
    debug!(wholesaler_id, "delete_wholesaler");
    Reply::from_result(ctx.engine.delete_wholesaler(wholesaler_id).await.map(|_| Ack {}))
}

pub async fn get_wholesalers(ctx: &ApiContext) -> Reply<Listing<Wholesaler>> {
    Reply::from_result(ctx.store.wholesalers().all().await.map(|items| Listing { items }))
}

pub async fn get_wholesaler(ctx: &ApiContext, contact: String) -> Reply<Record<Wholesaler>> {
    Reply::from_result(
        ctx.store
            .wholesalers()
            .by_contact(&contact)
            .await
            .map(|record| Record { record }),
    )
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use kirana_core::{BillLineRequest, PaymentMethod, SaveBillRequest};
    use kirana_db::{EventBus, Store};

    use super::*;

    async fn context() -> ApiContext {
        let store = Store::in_memory().await.unwrap();
        ApiContext::new(store, EventBus::new())
    }

    async fn seed_item(ctx: &ApiContext, barcode: &str, stock: i64) {
        sqlx::query(
            "INSERT INTO items (name, barcode, gst_bps, buying_cost, selling_cost, mrp, stock, unit)
             VALUES ('Soap', ?, 0, 0, 5000, 5000, ?, 'pcs')",
        )
        .bind(barcode)
        .bind(stock)
        .execute(ctx.store().pool())
        .await
        .unwrap();
    }

    fn bill(barcode: &str, quantity: i64) -> SaveBillRequest {
        SaveBillRequest {
            customer_id: None,
            lines: vec![BillLineRequest {
                barcode: barcode.into(),
                quantity,
                unit_price: 50.0,
            }],
            payment_method: PaymentMethod::Cash,
            discount: 0.0,
            total_cost: 50.0 * quantity as f64,
            amount_paid: 50.0 * quantity as f64,
            change: 0.0,
            is_debt: false,
        }
    }

    #[tokio::test]
    async fn success_reply_carries_bill_id() {
        let ctx = context().await;
        seed_item(&ctx, "A1", 10).await;

        let reply = save_bill(&ctx, bill("A1", 2)).await;
        assert!(reply.is_success());

        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["success"], true);
        assert!(json["billId"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn failure_folds_into_envelope_never_err() {
        let ctx = context().await;
        seed_item(&ctx, "A1", 2).await;

        let reply = save_bill(&ctx, bill("A1", 5)).await;
        assert!(!reply.is_success());

        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"]["code"], "INSUFFICIENT_STOCK");
        assert_eq!(
            json["error"]["message"],
            "Insufficient stock for A1. Available: 2, Requested: 5"
        );
    }

    #[tokio::test]
    async fn query_miss_is_a_null_record_not_an_error() {
        let ctx = context().await;
        let reply = get_item(&ctx, "GHOST".into()).await;
        assert!(reply.is_success());

        let json = serde_json::to_value(&reply).unwrap();
        assert!(json["record"].is_null());
    }

    #[tokio::test]
    async fn delete_ledger_entry_reply_carries_the_deleted_entry() {
        let ctx = context().await;
        sqlx::query("INSERT INTO customers (name, mobile_number, udhari) VALUES ('Asha', '9876543210', 0)")
            .execute(ctx.store().pool())
            .await
            .unwrap();

        let reply = record_repayment(
            &ctx,
            kirana_core::RepaymentRequest {
                customer_id: 1,
                amount: 75.0,
                note: None,
                created_at: None,
            },
        )
        .await;
        let json = serde_json::to_value(&reply).unwrap();
        let entry_id = json["entryId"].as_i64().unwrap();

        let reply = delete_ledger_entry(&ctx, entry_id).await;
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["deleted"]["amount"], 7500);
    }
}
