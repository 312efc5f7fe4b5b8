//! # kirana-core: Pure Business Logic for kirana-ledger
//!
//! This crate is the heart of the billing/credit transaction core. It
//! contains domain types, request contracts and validation as pure code
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      kirana-ledger Architecture                         │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               Desktop shell (out of scope)                      │   │
//! │  │     POS UI ──► Udhari UI ──► Returns UI ──► Purchases UI       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ IPC                                    │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    kirana-ipc (facade)                          │   │
//! │  │      {success, ...} reply envelopes, error codes                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ kirana-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ requests  │  │ validation│  │   │
//! │  │   │ Item,Bill │  │   Money   │  │ SaveBill..│  │   rules   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                kirana-db (store + transaction engine)           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//!
//! 1. **Integer Money**: all monetary values are paise (i64); decimal
//!    rupee inputs are rounded to 2 decimals exactly once, on ingestion
//! 2. **Explicit Errors**: all errors are typed enum variants, never
//!    strings or panics
//! 3. **Explicit Contracts**: every engine operation has a tagged
//!    request struct - no open-ended key/value maps cross the boundary

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod requests;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use requests::*;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Stock level at or below which an item counts as "low stock" in the
/// stock status views (out-of-stock = exactly zero).
pub const LOW_STOCK_THRESHOLD: i64 = 5;

/// Maximum lines accepted on a single bill or purchase.
///
/// Guards against a runaway frontend loop; a real kirana bill never
/// comes close.
pub const MAX_LINES: usize = 200;
