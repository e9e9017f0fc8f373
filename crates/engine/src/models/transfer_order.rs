//! Transfer order domain models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockflow_core::{
    BlueprintId, BlueprintLineId, DestinationMode, InventoryLotId, LoadoutId, LocationId,
    OrderLineId, ProductId, TransferOrderId, TransferPriority, TransferStatus,
};

/// A transfer order moving inventory from one location to another.
///
/// Origin and destination are immutable after creation; the order is
/// mutated only through status transitions and field patches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOrder {
    /// Unique order ID.
    pub id: TransferOrderId,
    /// Human-facing reference, e.g. `TO-9F2C41AB`.
    pub reference: String,
    /// Location the inventory is picked from.
    pub origin_location_id: LocationId,
    /// Location the inventory is delivered to.
    pub destination_location_id: LocationId,
    /// How the destination receives the inventory.
    pub destination_mode: DestinationMode,
    /// Loadout restocked at the destination (`loadout_restock` mode).
    pub destination_loadout_id: Option<LoadoutId>,
    /// Blueprint the order's demand lines are bound to.
    pub blueprint_id: Option<BlueprintId>,
    /// Operator-facing priority.
    pub priority: TransferPriority,
    /// Current lifecycle status.
    pub status: TransferStatus,
    /// Date the transfer was requested for.
    pub requested_date: Option<NaiveDate>,
    /// Free-text reason for the transfer.
    pub reason: Option<String>,
    /// Free-text operator notes.
    pub notes: Option<String>,
    /// Carrier name; required before the `Shipped` transition.
    pub carrier: Option<String>,
    /// Optional carrier tracking number.
    pub tracking_number: Option<String>,
    /// Stage transition timestamps.
    pub approved_at: Option<DateTime<Utc>>,
    pub picked_at: Option<DateTime<Utc>>,
    pub packed_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub received_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// When the order was created.
    pub created_at: DateTime<Utc>,
    /// When the order was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Whether an order line came from a blueprint or was entered manually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[derive(sqlx::Type)]
#[sqlx(type_name = "wms.order_line_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OrderLineKind {
    /// Bound to a blueprint line; demand is matched against lots.
    Blueprint,
    /// Created directly against a specific lot; not subject to matching.
    Manual,
}

/// One demand line of a transfer order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    /// Unique line ID.
    pub id: OrderLineId,
    /// Order this line belongs to.
    pub order_id: TransferOrderId,
    /// Blueprint-bound or manual.
    pub kind: OrderLineKind,
    /// Blueprint line this was derived from (blueprint kind only).
    pub blueprint_line_id: Option<BlueprintLineId>,
    /// Product required by this line.
    pub product_id: ProductId,
    /// Quantity required, fixed at line creation.
    pub required_quantity: Decimal,
    /// Display order within the order (blueprint declared order).
    pub position: i32,
}

/// An order line with its assignment progress, for operator display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineWithProgress {
    /// The line itself.
    pub line: OrderLine,
    /// Sum of committed assignment quantities.
    pub assigned_quantity: Decimal,
    /// `required - assigned`, floored at zero.
    pub remaining_quantity: Decimal,
}

/// Per-order quantity override for one blueprint line.
///
/// Honoured only when the blueprint allows overrides; the value is
/// clamped to the line's `[minimum, maximum]` range either way.
#[derive(Debug, Clone, Deserialize)]
pub struct LineOverrideInput {
    /// Blueprint line being overridden.
    pub blueprint_line_id: BlueprintLineId,
    /// Requested quantity.
    pub quantity: Decimal,
}

/// A manual line created directly against a specific lot.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateManualLineInput {
    /// Product being transferred.
    pub product_id: ProductId,
    /// Lot the quantity is taken from.
    pub lot_id: InventoryLotId,
    /// Quantity to transfer.
    pub quantity: Decimal,
}

/// Input for creating a transfer order.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTransferOrderInput {
    /// Location the inventory is picked from.
    pub origin_location_id: LocationId,
    /// Location the inventory is delivered to.
    pub destination_location_id: LocationId,
    /// How the destination receives the inventory.
    #[serde(default)]
    pub destination_mode: DestinationMode,
    /// Loadout restocked at the destination (`loadout_restock` mode).
    pub destination_loadout_id: Option<LoadoutId>,
    /// Blueprint to populate demand lines from.
    pub blueprint_id: Option<BlueprintId>,
    /// Operator-facing priority.
    #[serde(default)]
    pub priority: TransferPriority,
    /// Date the transfer is requested for.
    pub requested_date: Option<NaiveDate>,
    /// Free-text reason for the transfer.
    pub reason: Option<String>,
    /// Free-text operator notes.
    pub notes: Option<String>,
    /// Per-order blueprint line quantity overrides.
    #[serde(default)]
    pub line_overrides: Vec<LineOverrideInput>,
    /// Manual lines created against specific lots.
    #[serde(default)]
    pub manual_lines: Vec<CreateManualLineInput>,
}

/// Input for patching the mutable fields of a transfer order.
///
/// Origin, destination, and status are not patchable; status moves only
/// through transitions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTransferOrderInput {
    /// Operator-facing priority.
    pub priority: Option<TransferPriority>,
    /// Date the transfer is requested for.
    pub requested_date: Option<NaiveDate>,
    /// Free-text reason for the transfer.
    pub reason: Option<String>,
    /// Free-text operator notes.
    pub notes: Option<String>,
    /// Carrier name.
    pub carrier: Option<String>,
    /// Carrier tracking number.
    pub tracking_number: Option<String>,
}

/// Filter criteria for listing transfer orders.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransferFilter {
    /// Filter by status.
    pub status: Option<TransferStatus>,
    /// Filter by origin location.
    pub origin_location_id: Option<LocationId>,
    /// Filter by destination location.
    pub destination_location_id: Option<LocationId>,
    /// Filter by priority.
    pub priority: Option<TransferPriority>,
    /// Maximum number of results.
    pub limit: Option<i64>,
    /// Number of results to skip.
    pub offset: Option<i64>,
}
