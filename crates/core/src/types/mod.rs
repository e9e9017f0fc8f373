//! Core types for Stockflow.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod bin;
pub mod id;
pub mod status;

pub use bin::BinCoordinates;
pub use id::*;
pub use status::*;
