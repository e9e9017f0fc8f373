//! Database operations for the assignment ledger.

use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use chrono::{DateTime, Utc};
use stockflow_core::{
    AssignmentLineId, BinCoordinates, InventoryLotId, LocationId, OperatorId, OrderLineId,
    TransferOrderId,
};

use super::RepositoryError;
use super::ledger::LotSnapshot;
use crate::models::assignment::AssignmentLine;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct AssignmentLineRow {
    id: i32,
    order_line_id: i32,
    lot_id: i32,
    lot_number: String,
    quantity: Decimal,
    location_id: i32,
    aisle: Option<String>,
    rack: Option<String>,
    shelf: Option<String>,
    bin: Option<String>,
    zone: Option<String>,
    created_at: DateTime<Utc>,
    created_by: Option<i32>,
}

impl From<AssignmentLineRow> for AssignmentLine {
    fn from(row: AssignmentLineRow) -> Self {
        Self {
            id: AssignmentLineId::new(row.id),
            order_line_id: OrderLineId::new(row.order_line_id),
            lot_id: InventoryLotId::new(row.lot_id),
            lot_number: row.lot_number,
            quantity: row.quantity,
            location_id: LocationId::new(row.location_id),
            bin: BinCoordinates {
                aisle: row.aisle,
                rack: row.rack,
                shelf: row.shelf,
                bin: row.bin,
                zone: row.zone,
            },
            created_at: row.created_at,
            created_by: row.created_by.map(OperatorId::new),
        }
    }
}

const ASSIGNMENT_COLUMNS: &str = r"
    id, order_line_id, lot_id, lot_number, quantity, location_id,
    aisle, rack, shelf, bin, zone, created_at, created_by
";

/// Lot and quantity freed by a deletion, to be released on the ledger.
#[derive(Debug, Clone, Copy)]
pub struct ReleasedReservation {
    pub lot_id: InventoryLotId,
    pub quantity: Decimal,
}

#[derive(Debug, sqlx::FromRow)]
struct ReleasedRow {
    lot_id: i32,
    quantity: Decimal,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for assignment ledger reads.
pub struct AssignmentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AssignmentRepository<'a> {
    /// Create a new assignment repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List every assignment on an order, grouped by line position.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_order(
        &self,
        order_id: TransferOrderId,
    ) -> Result<Vec<AssignmentLine>, RepositoryError> {
        let rows = sqlx::query_as::<_, AssignmentLineRow>(
            r"
            SELECT a.id, a.order_line_id, a.lot_id, a.lot_number, a.quantity,
                   a.location_id, a.aisle, a.rack, a.shelf, a.bin, a.zone,
                   a.created_at, a.created_by
            FROM wms.assignment_line a
            JOIN wms.transfer_order_line l ON l.id = a.order_line_id
            WHERE l.order_id = $1
            ORDER BY l.position ASC, a.id ASC
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// Insert an assignment, snapshotting the lot's number, location, and
/// bin coordinates as they stand at commit time.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_assignment_tx(
    conn: &mut PgConnection,
    order_line_id: OrderLineId,
    lot: &LotSnapshot,
    quantity: Decimal,
    created_by: Option<OperatorId>,
) -> Result<AssignmentLine, RepositoryError> {
    let sql = format!(
        r"
        INSERT INTO wms.assignment_line (
            order_line_id, lot_id, lot_number, quantity, location_id,
            aisle, rack, shelf, bin, zone, created_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {ASSIGNMENT_COLUMNS}
        "
    );
    let row = sqlx::query_as::<_, AssignmentLineRow>(&sql)
        .bind(order_line_id)
        .bind(lot.id)
        .bind(&lot.lot_number)
        .bind(quantity)
        .bind(lot.location_id)
        .bind(lot.bin.aisle.as_deref())
        .bind(lot.bin.rack.as_deref())
        .bind(lot.bin.shelf.as_deref())
        .bind(lot.bin.bin.as_deref())
        .bind(lot.bin.zone.as_deref())
        .bind(created_by)
        .fetch_one(conn)
        .await?;
    Ok(row.into())
}

/// Sum of quantities already assigned to a line.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn assigned_total_tx(
    conn: &mut PgConnection,
    order_line_id: OrderLineId,
) -> Result<Decimal, RepositoryError> {
    let (total,): (Decimal,) = sqlx::query_as(
        "SELECT COALESCE(SUM(quantity), 0) FROM wms.assignment_line WHERE order_line_id = $1",
    )
    .bind(order_line_id)
    .fetch_one(conn)
    .await?;
    Ok(total)
}

/// Delete one assignment on an order, returning the reservation it held.
///
/// Returns `None` if no such assignment exists on that order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn delete_assignment_tx(
    conn: &mut PgConnection,
    order_id: TransferOrderId,
    assignment_id: AssignmentLineId,
) -> Result<Option<ReleasedReservation>, RepositoryError> {
    let row = sqlx::query_as::<_, ReleasedRow>(
        r"
        DELETE FROM wms.assignment_line a
        USING wms.transfer_order_line l
        WHERE a.id = $1 AND a.order_line_id = l.id AND l.order_id = $2
        RETURNING a.lot_id, a.quantity
        ",
    )
    .bind(assignment_id)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|r| ReleasedReservation {
        lot_id: InventoryLotId::new(r.lot_id),
        quantity: r.quantity,
    }))
}

/// Delete every assignment on an order, returning the reservations they
/// held (cancellation path).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn delete_all_assignments_tx(
    conn: &mut PgConnection,
    order_id: TransferOrderId,
) -> Result<Vec<ReleasedReservation>, RepositoryError> {
    let rows = sqlx::query_as::<_, ReleasedRow>(
        r"
        DELETE FROM wms.assignment_line a
        USING wms.transfer_order_line l
        WHERE a.order_line_id = l.id AND l.order_id = $1
        RETURNING a.lot_id, a.quantity
        ",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| ReleasedReservation {
            lot_id: InventoryLotId::new(r.lot_id),
            quantity: r.quantity,
        })
        .collect())
}

/// Delete every assignment on an order's blueprint-bound lines,
/// returning the reservations they held (loadout reassignment path).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn delete_blueprint_assignments_tx(
    conn: &mut PgConnection,
    order_id: TransferOrderId,
) -> Result<Vec<ReleasedReservation>, RepositoryError> {
    let rows = sqlx::query_as::<_, ReleasedRow>(
        r"
        DELETE FROM wms.assignment_line a
        USING wms.transfer_order_line l
        WHERE a.order_line_id = l.id AND l.order_id = $1 AND l.kind = 'blueprint'
        RETURNING a.lot_id, a.quantity
        ",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(rows
        .into_iter()
        .map(|r| ReleasedReservation {
            lot_id: InventoryLotId::new(r.lot_id),
            quantity: r.quantity,
        })
        .collect())
}
