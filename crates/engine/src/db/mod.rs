//! Database operations for the fulfillment engine's `PostgreSQL` store.
//!
//! # Schema: `wms`
//!
//! ## Engine-owned tables
//!
//! - `transfer_order` - Transfer order headers and stage timestamps
//! - `transfer_order_event` - Append-only transition audit
//! - `transfer_order_line` - Demand lines (blueprint-bound and manual)
//! - `assignment_line` - The assignment ledger (append-only)
//! - `scan_confirmation` - Resumable scan-session state
//!
//! ## Consumed tables (owned by the catalog/ledger services)
//!
//! - `location`, `product`, `blueprint`, `blueprint_line`, `loadout`,
//!   `loadout_lot` - read-only here
//! - `inventory_lot` - read, plus reservation commits through the
//!   compare-and-commit statements in [`ledger`]
//!
//! # Concurrency discipline
//!
//! Every invariant-bearing operation runs in one transaction that first
//! takes `SELECT ... FOR UPDATE` on the transfer-order row, serializing
//! work per order. Lot availability is enforced by single-statement
//! compare-and-commit updates on the lot row, so two orders can never
//! jointly over-commit a lot even though they don't share the order lock.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/engine/migrations/` and run via:
//! ```bash
//! cargo run -p stockflow-cli -- migrate
//! ```

pub mod assignment;
pub mod catalog;
pub mod ledger;
pub mod scan_session;
pub mod transfer_order;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use assignment::AssignmentRepository;
pub use transfer_order::TransferOrderRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate reference).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
