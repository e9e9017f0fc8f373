//! Assignment ledger domain models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockflow_core::{
    AssignmentLineId, BinCoordinates, InventoryLotId, LocationId, OperatorId, OrderLineId,
};

/// A committed binding of a lot quantity to an order line.
///
/// Append-only: rows are created and deleted, never edited. Re-assignment
/// deletes and recreates, preserving the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentLine {
    /// Unique assignment ID.
    pub id: AssignmentLineId,
    /// Order line this assignment satisfies.
    pub order_line_id: OrderLineId,
    /// Lot the quantity was committed against.
    pub lot_id: InventoryLotId,
    /// Lot number at assignment time.
    pub lot_number: String,
    /// Committed quantity.
    pub quantity: Decimal,
    /// Location of the lot at assignment time.
    pub location_id: LocationId,
    /// Bin coordinates captured at assignment time, for later display.
    pub bin: BinCoordinates,
    /// When the assignment was committed.
    pub created_at: DateTime<Utc>,
    /// Operator who committed it, when known.
    pub created_by: Option<OperatorId>,
}

/// Input for committing a manual assignment.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAssignment {
    /// Lot to commit against.
    pub lot_id: InventoryLotId,
    /// Quantity to commit.
    pub quantity: Decimal,
}

/// A lot offered to the matcher for one blueprint line.
///
/// `confirmed_at_source` is false for lots declared on the loadout but
/// absent from the live ledger query; such candidates are surfaced to
/// operators but never auto-committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateLot {
    /// Lot ID; absent for declared lots the live ledger no longer knows.
    pub lot_id: Option<InventoryLotId>,
    /// Lot number.
    pub lot_number: String,
    /// Quantity available at read time (`on_hand - reserved`).
    pub available: Decimal,
    /// Where the lot sits.
    pub bin: BinCoordinates,
    /// Whether the loadout declares a reservation on this lot.
    pub declared_on_loadout: bool,
    /// Whether the live ledger confirmed this lot at the origin.
    pub confirmed_at_source: bool,
}
