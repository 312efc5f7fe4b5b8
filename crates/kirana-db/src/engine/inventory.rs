//! # Catalog Maintenance Operations
//!
//! Direct CRUD on items, customers and wholesalers from the inventory
//! and contacts screens.
//!
//! These are single-row writes, but they still run through the engine:
//! natural-key uniqueness is prechecked inside the transaction so the
//! caller gets a typed `Duplicate` error instead of a raw constraint
//! failure, and every change fans out the matching event.

use tracing::{info, instrument};

use kirana_core::validation;
use kirana_core::{CoreError, CustomerRequest, GstRate, ItemRequest, ValidationError, WholesalerRequest};

use crate::engine::TransactionEngine;
use crate::error::StoreResult;
use crate::events::StoreEvent;

impl TransactionEngine {
    // =========================================================================
    // Items
    // =========================================================================

    /// Adds a catalog item. Returns the new item id.
    #[instrument(skip(self, request), fields(barcode = %request.barcode))]
    pub async fn add_item(&self, request: ItemRequest) -> StoreResult<i64> {
        let item = validate_item(&request)?;

        let mut tx = self.pool().begin().await?;

        let clash: Option<i64> = sqlx::query_scalar("SELECT id FROM items WHERE barcode = ?")
            .bind(&item.barcode)
            .fetch_optional(&mut *tx)
            .await?;
        if clash.is_some() {
            return Err(CoreError::from(ValidationError::Duplicate {
                field: "barcode",
                value: item.barcode,
            })
            .into());
        }

        let item_id = sqlx::query(
            "INSERT INTO items (name, barcode, gst_bps, buying_cost, selling_cost, mrp, stock, unit)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&item.name)
        .bind(&item.barcode)
        .bind(item.gst)
        .bind(item.buying_cost)
        .bind(item.selling_cost)
        .bind(item.mrp)
        .bind(item.stock)
        .bind(&item.unit)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;

        info!(item_id, "Item added");
        self.events().publish(StoreEvent::InventoryChanged { item_id });
        Ok(item_id)
    }

    /// Updates a catalog item in place, stock included (stocktake
    /// corrections come through here).
    #[instrument(skip(self, request))]
    pub async fn update_item(&self, request: ItemRequest) -> StoreResult<()> {
        let item_id = request
            .id
            .ok_or(CoreError::Validation(ValidationError::Required { field: "id" }))?;
        let item = validate_item(&request)?;

        let mut tx = self.pool().begin().await?;

        require_row(&mut tx, "items", "Item", item_id).await?;

        let clash: Option<i64> =
            sqlx::query_scalar("SELECT id FROM items WHERE barcode = ? AND id != ?")
                .bind(&item.barcode)
                .bind(item_id)
                .fetch_optional(&mut *tx)
                .await?;
        if clash.is_some() {
            return Err(CoreError::from(ValidationError::Duplicate {
                field: "barcode",
                value: item.barcode,
            })
            .into());
        }

        sqlx::query(
            "UPDATE items
             SET name = ?, barcode = ?, gst_bps = ?, buying_cost = ?, selling_cost = ?, mrp = ?, stock = ?, unit = ?
             WHERE id = ?",
        )
        .bind(&item.name)
        .bind(&item.barcode)
        .bind(item.gst)
        .bind(item.buying_cost)
        .bind(item.selling_cost)
        .bind(item.mrp)
        .bind(item.stock)
        .bind(&item.unit)
        .bind(item_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(item_id, "Item updated");
        self.events().publish(StoreEvent::InventoryChanged { item_id });
        Ok(())
    }

    /// Deletes a catalog item. Fails with a foreign-key violation when
    /// bills or purchases still reference it; history wins over tidiness.
    #[instrument(skip(self))]
    pub async fn delete_item(&self, item_id: i64) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;
        require_row(&mut tx, "items", "Item", item_id).await?;

        sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(item_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(item_id, "Item deleted");
        self.events().publish(StoreEvent::InventoryChanged { item_id });
        Ok(())
    }

    // =========================================================================
    // Customers
    // =========================================================================

    /// Adds a customer. Returns the new customer id.
    #[instrument(skip(self, request))]
    pub async fn add_customer(&self, request: CustomerRequest) -> StoreResult<i64> {
        let name = validation::required_text("name", &request.name).map_err(CoreError::from)?;
        let mobile = validation::phone_number("mobile_number", &request.mobile_number)
            .map_err(CoreError::from)?;

        let mut tx = self.pool().begin().await?;

        let clash: Option<i64> =
            sqlx::query_scalar("SELECT id FROM customers WHERE mobile_number = ?")
                .bind(&mobile)
                .fetch_optional(&mut *tx)
                .await?;
        if clash.is_some() {
            return Err(CoreError::from(ValidationError::Duplicate {
                field: "mobile_number",
                value: mobile,
            })
            .into());
        }

        let customer_id =
            sqlx::query("INSERT INTO customers (name, mobile_number, udhari) VALUES (?, ?, 0)")
                .bind(&name)
                .bind(&mobile)
                .execute(&mut *tx)
                .await?
                .last_insert_rowid();

        tx.commit().await?;

        info!(customer_id, "Customer added");
        self.events().publish(StoreEvent::CustomerChanged { customer_id });
        Ok(customer_id)
    }

    /// Updates a customer's name/mobile. The udhari balance is owned by
    /// the ledger operations and never editable directly.
    #[instrument(skip(self, request))]
    pub async fn update_customer(&self, request: CustomerRequest) -> StoreResult<()> {
        let customer_id = request
            .id
            .ok_or(CoreError::Validation(ValidationError::Required { field: "id" }))?;
        let name = validation::required_text("name", &request.name).map_err(CoreError::from)?;
        let mobile = validation::phone_number("mobile_number", &request.mobile_number)
            .map_err(CoreError::from)?;

        let mut tx = self.pool().begin().await?;
        require_row(&mut tx, "customers", "Customer", customer_id).await?;

        let clash: Option<i64> =
            sqlx::query_scalar("SELECT id FROM customers WHERE mobile_number = ? AND id != ?")
                .bind(&mobile)
                .bind(customer_id)
                .fetch_optional(&mut *tx)
                .await?;
        if clash.is_some() {
            return Err(CoreError::from(ValidationError::Duplicate {
                field: "mobile_number",
                value: mobile,
            })
            .into());
        }

        sqlx::query("UPDATE customers SET name = ?, mobile_number = ? WHERE id = ?")
            .bind(&name)
            .bind(&mobile)
            .bind(customer_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(customer_id, "Customer updated");
        self.events().publish(StoreEvent::CustomerChanged { customer_id });
        Ok(())
    }

    /// Deletes a customer. Fails when bills or ledger entries still
    /// reference them.
    #[instrument(skip(self))]
    pub async fn delete_customer(&self, customer_id: i64) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;
        require_row(&mut tx, "customers", "Customer", customer_id).await?;

        sqlx::query("DELETE FROM customers WHERE id = ?")
            .bind(customer_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(customer_id, "Customer deleted");
        self.events().publish(StoreEvent::CustomerChanged { customer_id });
        Ok(())
    }

    // =========================================================================
    // Wholesalers
    // =========================================================================

    /// Adds a wholesaler. Returns the new wholesaler id.
    #[instrument(skip(self, request))]
    pub async fn add_wholesaler(&self, request: WholesalerRequest) -> StoreResult<i64> {
        let name = validation::required_text("name", &request.name).map_err(CoreError::from)?;
        let contact = validation::phone_number("contact_number", &request.contact_number)
            .map_err(CoreError::from)?;

        let mut tx = self.pool().begin().await?;

        let clash: Option<i64> =
            sqlx::query_scalar("SELECT id FROM wholesalers WHERE contact_number = ?")
                .bind(&contact)
                .fetch_optional(&mut *tx)
                .await?;
        if clash.is_some() {
            return Err(CoreError::from(ValidationError::Duplicate {
                field: "contact_number",
                value: contact,
            })
            .into());
        }

        let wholesaler_id = sqlx::query(
            "INSERT INTO wholesalers
                 (name, contact_number, email, address, tax_id, min_order_qty, specialty, total_amount, udhari)
             VALUES (?, ?, ?, ?, ?, ?, ?, 0, 0)",
        )
        .bind(&name)
        .bind(&contact)
        .bind(&request.email)
        .bind(&request.address)
        .bind(&request.tax_id)
        .bind(request.min_order_qty)
        .bind(&request.specialty)
        .execute(&mut *tx)
        .await?
        .last_insert_rowid();

        tx.commit().await?;

        info!(wholesaler_id, "Wholesaler added");
        self.events()
            .publish(StoreEvent::WholesalerChanged { wholesaler_id });
        Ok(wholesaler_id)
    }

    /// Updates a wholesaler's contact card. `total_amount` and `udhari`
    /// are owned by `save_purchase` and never editable directly.
    #[instrument(skip(self, request))]
    pub async fn update_wholesaler(&self, request: WholesalerRequest) -> StoreResult<()> {
        let wholesaler_id = request
            .id
            .ok_or(CoreError::Validation(ValidationError::Required { field: "id" }))?;
        let name = validation::required_text("name", &request.name).map_err(CoreError::from)?;
        let contact = validation::phone_number("contact_number", &request.contact_number)
            .map_err(CoreError::from)?;

        let mut tx = self.pool().begin().await?;
        require_row(&mut tx, "wholesalers", "Wholesaler", wholesaler_id).await?;

        let clash: Option<i64> =
            sqlx::query_scalar("SELECT id FROM wholesalers WHERE contact_number = ? AND id != ?")
                .bind(&contact)
                .bind(wholesaler_id)
                .fetch_optional(&mut *tx)
                .await?;
        if clash.is_some() {
            return Err(CoreError::from(ValidationError::Duplicate {
                field: "contact_number",
                value: contact,
            })
            .into());
        }

        sqlx::query(
            "UPDATE wholesalers
             SET name = ?, contact_number = ?, email = ?, address = ?, tax_id = ?, min_order_qty = ?, specialty = ?
             WHERE id = ?",
        )
        .bind(&name)
        .bind(&contact)
        .bind(&request.email)
        .bind(&request.address)
        .bind(&request.tax_id)
        .bind(request.min_order_qty)
        .bind(&request.specialty)
        .bind(wholesaler_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(wholesaler_id, "Wholesaler updated");
        self.events()
            .publish(StoreEvent::WholesalerChanged { wholesaler_id });
        Ok(())
    }

    /// Deletes a wholesaler. Fails when purchases still reference them.
    #[instrument(skip(self))]
    pub async fn delete_wholesaler(&self, wholesaler_id: i64) -> StoreResult<()> {
        let mut tx = self.pool().begin().await?;
        require_row(&mut tx, "wholesalers", "Wholesaler", wholesaler_id).await?;

        sqlx::query("DELETE FROM wholesalers WHERE id = ?")
            .bind(wholesaler_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(wholesaler_id, "Wholesaler deleted");
        self.events()
            .publish(StoreEvent::WholesalerChanged { wholesaler_id });
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

struct ValidItem {
    name: String,
    barcode: String,
    gst: GstRate,
    buying_cost: kirana_core::Money,
    selling_cost: kirana_core::Money,
    mrp: kirana_core::Money,
    stock: i64,
    unit: String,
}

fn validate_item(request: &ItemRequest) -> Result<ValidItem, CoreError> {
    if request.stock < 0 {
        return Err(ValidationError::NegativeAmount { field: "stock" }.into());
    }
    Ok(ValidItem {
        name: validation::required_text("name", &request.name)?,
        barcode: validation::required_text("barcode", &request.barcode)?,
        gst: GstRate::from_percentage(request.gst_percent),
        buying_cost: validation::currency("buying_cost", request.buying_cost)?,
        selling_cost: validation::currency("selling_cost", request.selling_cost)?,
        mrp: validation::currency("mrp", request.mrp)?,
        stock: request.stock,
        unit: validation::required_text("unit", &request.unit)?,
    })
}

async fn require_row(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    table: &str,
    entity: &'static str,
    id: i64,
) -> StoreResult<()> {
    let found: Option<i64> = sqlx::query_scalar(&format!("SELECT id FROM {table} WHERE id = ?"))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;
    found
        .map(|_| ())
        .ok_or_else(|| CoreError::NotFound { entity, key: id.to_string() }.into())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use kirana_core::{CoreError, CustomerRequest, ItemRequest, ValidationError, WholesalerRequest};

    use crate::error::StoreError;
    use crate::testutil::{engine, seed_customer, seed_item};

    fn item_req(barcode: &str) -> ItemRequest {
        ItemRequest {
            id: None,
            name: "Sugar 1kg".into(),
            barcode: barcode.into(),
            gst_percent: 5.0,
            buying_cost: 38.0,
            selling_cost: 45.0,
            mrp: 48.0,
            stock: 20,
            unit: "kg".into(),
        }
    }

    #[tokio::test]
    async fn add_item_stores_paise_and_bps() {
        let (store, engine) = engine().await;

        engine.add_item(item_req("S1")).await.unwrap();

        let (gst, buying, selling, mrp): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT gst_bps, buying_cost, selling_cost, mrp FROM items WHERE barcode = 'S1'",
        )
        .fetch_one(store.pool())
        .await
        .unwrap();
        assert_eq!(gst, 500);
        assert_eq!(buying, 3800);
        assert_eq!(selling, 4500);
        assert_eq!(mrp, 4800);
    }

    #[tokio::test]
    async fn duplicate_barcode_is_rejected() {
        let (store, engine) = engine().await;
        seed_item(&store, "S1", "Sugar 1kg", 5, 4500).await;

        let err = engine.add_item(item_req("S1")).await.unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));
    }

    #[tokio::test]
    async fn update_item_requires_an_existing_row() {
        let (_store, engine) = engine().await;

        let mut req = item_req("S1");
        req.id = Some(42);
        let err = engine.update_item(req).await.unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::NotFound { .. })));

        let err = engine.update_item(item_req("S1")).await.unwrap_err();
        assert!(err.to_string().contains("id is required"));
    }

    #[tokio::test]
    async fn update_item_changes_the_row() {
        let (store, engine) = engine().await;
        let item_id = seed_item(&store, "S1", "Sugar 1kg", 5, 4500).await;

        let mut req = item_req("S1");
        req.id = Some(item_id);
        req.selling_cost = 50.0;
        req.stock = 7;
        engine.update_item(req).await.unwrap();

        let (selling, stock): (i64, i64) =
            sqlx::query_as("SELECT selling_cost, stock FROM items WHERE id = ?")
                .bind(item_id)
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert_eq!(selling, 5000);
        assert_eq!(stock, 7);
    }

    #[tokio::test]
    async fn customer_mobile_must_be_unique_and_well_formed() {
        let (store, engine) = engine().await;
        seed_customer(&store, "Asha", "9876543210").await;

        let err = engine
            .add_customer(CustomerRequest {
                id: None,
                name: "Ravi".into(),
                mobile_number: "9876543210".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Core(CoreError::Validation(ValidationError::Duplicate { .. }))
        ));

        let err = engine
            .add_customer(CustomerRequest {
                id: None,
                name: "Ravi".into(),
                mobile_number: "98-76".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn wholesaler_round_trip() {
        let (store, engine) = engine().await;

        let wholesaler_id = engine
            .add_wholesaler(WholesalerRequest {
                id: None,
                name: "Mehta & Sons".into(),
                contact_number: "2212345678".into(),
                email: Some("orders@mehta.example".into()),
                address: None,
                tax_id: None,
                min_order_qty: Some(12),
                specialty: Some("dry goods".into()),
            })
            .await
            .unwrap();

        engine
            .update_wholesaler(WholesalerRequest {
                id: Some(wholesaler_id),
                name: "Mehta & Sons Pvt Ltd".into(),
                contact_number: "2212345678".into(),
                email: None,
                address: None,
                tax_id: None,
                min_order_qty: None,
                specialty: None,
            })
            .await
            .unwrap();

        let name: String = sqlx::query_scalar("SELECT name FROM wholesalers WHERE id = ?")
            .bind(wholesaler_id)
            .fetch_one(store.pool())
            .await
            .unwrap();
        assert_eq!(name, "Mehta & Sons Pvt Ltd");

        engine.delete_wholesaler(wholesaler_id).await.unwrap();
        let gone: Option<i64> = sqlx::query_scalar("SELECT id FROM wholesalers WHERE id = ?")
            .bind(wholesaler_id)
            .fetch_optional(store.pool())
            .await
            .unwrap();
        assert!(gone.is_none());
    }
}
