//! Business logic for the fulfillment engine.
//!
//! `demand` and `matcher` are pure and unit-tested in isolation;
//! `fulfillment` and `scan` orchestrate them against the database.

pub mod demand;
pub mod fulfillment;
pub mod matcher;
pub mod scan;

pub use fulfillment::FulfillmentService;
pub use scan::ScanService;
