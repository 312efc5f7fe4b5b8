//! # kirana-ipc: IPC Facade
//!
//! The boundary between the desktop shell and the transaction core.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Desktop shell (out of scope)                                           │
//! │       │ invoke("save_bill", request)                                    │
//! │       ▼                                                                 │
//! │  ★ kirana-ipc (THIS CRATE) ★                                            │
//! │                                                                         │
//! │  handlers    one async fn per operation, NEVER returns Err              │
//! │  reply       { success, ... } envelopes                                 │
//! │  error       ApiError { code, message }                                 │
//! │  telemetry   tracing subscriber setup                                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  kirana-db (engine + read layer) ──► kirana-core (pure rules)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Wiring
//! ```rust,ignore
//! kirana_ipc::telemetry::init();
//! let store = Store::open(StoreConfig::new(db_path)).await?;
//! let ctx = ApiContext::new(store, EventBus::new());
//!
//! // shell command:
//! let reply = kirana_ipc::handlers::save_bill(&ctx, request).await;
//! ```

pub mod error;
pub mod handlers;
pub mod reply;
pub mod telemetry;

pub use error::{ApiError, ErrorCode};
pub use handlers::ApiContext;
pub use reply::Reply;
