//! # Store Events
//!
//! Post-commit notification fan-out.
//!
//! ## Event Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Post-Commit Fan-Out                                │
//! │                                                                         │
//! │  TransactionEngine                                                      │
//! │       │  (transaction COMMITs)                                          │
//! │       ▼                                                                 │
//! │  EventBus::publish(StoreEvent::BillSaved { .. })                        │
//! │       │                                                                 │
//! │       ├──► POS window        (refresh item stock)                       │
//! │       ├──► Udhari window     (refresh customer balance)                 │
//! │       └──► Reports window    (refresh charts)                           │
//! │                                                                         │
//! │  Events are advisory. A subscriber that lags or has closed is           │
//! │  ignored; the committed transaction is the source of truth and a        │
//! │  missed event can always be recovered by re-querying.                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events fire strictly AFTER commit. An event must never describe a
//! state that rolled back.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Default capacity of the broadcast channel. Slow subscribers past
/// this many events see `Lagged` and re-query.
const EVENT_CHANNEL_CAPACITY: usize = 256;

// =============================================================================
// Event Types
// =============================================================================

/// A committed store mutation, for UI windows to react to.
///
/// Payloads carry ids only; subscribers re-query what they display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreEvent {
    BillSaved { bill_id: i64 },
    RepaymentRecorded { customer_id: i64, entry_id: i64 },
    LedgerEntryDeleted { customer_id: i64, entry_id: i64 },
    LedgerEntryRestored { customer_id: i64, entry_id: i64 },
    ReturnAdded { return_id: i64 },
    ReturnEdited { return_id: i64 },
    ReturnDeleted { return_id: i64 },
    PurchaseSaved { purchase_id: i64, wholesaler_id: i64 },
    ExpiredStockAdded { entry_id: i64, item_id: i64 },
    ExpiredStockUpdated { entry_id: i64, item_id: i64 },
    ExpiredStockDeleted { entry_id: i64, item_id: i64 },
    /// Any item row changed (stock, price, catalog fields).
    InventoryChanged { item_id: i64 },
    CustomerChanged { customer_id: i64 },
    WholesalerChanged { wholesaler_id: i64 },
}

// =============================================================================
// Event Bus
// =============================================================================

/// Broadcast bus for committed store mutations.
///
/// Cloning shares the same underlying channel. Publishing with zero
/// subscribers is a successful no-op.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl EventBus {
    /// Creates a bus with the default capacity.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        EventBus { sender }
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Publishes an event to every live subscriber.
    ///
    /// Fire-and-forget: `SendError` only means nobody is listening,
    /// which is normal at startup and during shutdown.
    pub fn publish(&self, event: StoreEvent) {
        debug!(?event, "Publishing store event");
        let _ = self.sender.send(event);
    }

    /// Number of live subscribers (diagnostics).
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        EventBus::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
