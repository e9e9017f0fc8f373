//! Integration tests for Stockflow.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p stockflow-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `transfer_state_machine` - Order lifecycle transition rules
//! - `lot_matcher` - Candidate ranking and auto-assignment planning
//! - `scan_reconciliation` - Scan board matching and resumable progress
//! - `demand_math` - Required/remaining quantity computation
//!
//! These exercise the engine's pure logic end to end and do not require
//! a live database.

#![cfg_attr(not(test), forbid(unsafe_code))]
