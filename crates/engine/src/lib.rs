//! Stockflow transfer fulfillment engine library.
//!
//! Demand resolution, lot matching (automatic and manual), the
//! assignment ledger, the transfer order state machine, and barcode
//! scan reconciliation, exposed as an axum JSON API over PostgreSQL.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
