//! Stockflow Core - Shared types library.
//!
//! This crate provides common types used across all Stockflow components:
//! - `engine` - Transfer fulfillment engine and JSON API
//! - `cli` - Command-line tools for migrations and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no database
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere, including inside database transactions and unit tests.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, statuses, stages, and
//!   bin coordinates, plus the pure transfer-order state machine.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
