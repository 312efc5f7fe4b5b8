//! # Store Pool Management
//!
//! Connection pool creation and configuration for the SQLite store.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Store Connection Pool                              │
//! │                                                                         │
//! │  App startup                                                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StoreConfig::new(path) ← configure pool settings                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Store::open(config).await ← create pool + apply schema migrations     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SqlitePool (WAL mode, foreign keys ON)                                │
//! │       │                                                                 │
//! │       ├──► TransactionEngine  (atomic mutations)                       │
//! │       └──► query::*           (read-only views)                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why a pool for a single-user desktop app?
//! WAL mode lets read queries (bill history, searches) run while a
//! mutation commits; the engine still behaves as a single logical
//! writer because every operation is one SQLite transaction.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{StoreError, StoreResult};
use crate::query::bills::BillQueries;
use crate::query::customers::CustomerQueries;
use crate::query::expired::ExpiredQueries;
use crate::query::items::ItemQueries;
use crate::query::returns::ReturnQueries;
use crate::query::wholesalers::WholesalerQueries;
use crate::schema;

// =============================================================================
// Configuration
// =============================================================================

/// Store configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = StoreConfig::new("/path/to/inventory.db").max_connections(5);
/// ```
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool.
    /// Default: 5 (plenty for a local desktop app)
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    pub min_connections: u32,

    /// Connection acquire timeout.
    pub connect_timeout: Duration,

    /// Whether to apply schema migrations on open.
    pub run_migrations: bool,
}

impl StoreConfig {
    /// Creates a configuration for the given database path. The file is
    /// created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        StoreConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets whether to apply migrations on open.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// In-memory store configuration for tests: isolated per instance,
    /// single connection (an in-memory database exists per connection).
    pub fn in_memory() -> Self {
        StoreConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }
}

// =============================================================================
// Store
// =============================================================================

/// Handle to the persistent store.
///
/// The store is injected explicitly into the transaction engine and
/// every query family - there is no ambient global connection, which is
/// what makes isolated test databases possible.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Opens the store.
    ///
    /// ## What This Does
    /// 1. Creates the database file if missing
    /// 2. Configures SQLite: WAL journal, NORMAL synchronous, foreign
    ///    keys ON
    /// 3. Builds the connection pool
    /// 4. Applies schema migrations (unless disabled)
    pub async fn open(config: StoreConfig) -> StoreResult<Self> {
        info!(path = %config.database_path.display(), "Opening store");

        // ":memory:" is understood by SQLite itself, so the in-memory
        // test config needs no special casing here.
        let connect_options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite ships with foreign keys off for backwards compat
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_with(connect_options)
            .await
            .map_err(|e| StoreError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Store pool created");

        let store = Store { pool };

        if config.run_migrations {
            schema::migrate(&store.pool).await?;
        }

        Ok(store)
    }

    /// Opens an isolated in-memory store with migrations applied.
    /// Test-focused convenience over `open(StoreConfig::in_memory())`.
    pub async fn in_memory() -> StoreResult<Self> {
        Store::open(StoreConfig::in_memory()).await
    }

    /// Returns a reference to the connection pool.
    ///
    /// Prefer the query accessors and the engine; this is for the rare
    /// query neither covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Bill history reads.
    pub fn bills(&self) -> BillQueries {
        BillQueries::new(self.pool.clone())
    }

    /// Customer / udhari ledger reads.
    pub fn customers(&self) -> CustomerQueries {
        CustomerQueries::new(self.pool.clone())
    }

    /// Inventory reads.
    pub fn items(&self) -> ItemQueries {
        ItemQueries::new(self.pool.clone())
    }

    /// Return reads and searches.
    pub fn returns(&self) -> ReturnQueries {
        ReturnQueries::new(self.pool.clone())
    }

    /// Wholesaler / purchase history reads.
    pub fn wholesalers(&self) -> WholesalerQueries {
        WholesalerQueries::new(self.pool.clone())
    }

    /// Expired stock reads.
    pub fn expired(&self) -> ExpiredQueries {
        ExpiredQueries::new(self.pool.clone())
    }

    /// Closes the pool. Call on application shutdown.
    pub async fn close(&self) {
        info!("Closing store connection pool");
        self.pool.close().await;
    }

    /// Checks that the store can execute queries.
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
