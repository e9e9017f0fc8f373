//! Reservation accounting against the inventory lot ledger.
//!
//! Availability is always derived as `quantity_on_hand - quantity_reserved`
//! inside the statement that commits, never from an earlier read. Two
//! commit flavours exist: [`commit_reservation_tx`] is strict (all or
//! nothing, for operator-chosen quantities) and [`commit_up_to_tx`] caps
//! at current availability (for planner commits racing other orders).

use rust_decimal::Decimal;
use sqlx::PgConnection;

use stockflow_core::{BinCoordinates, InventoryLotId, LocationId, ProductId};

use super::RepositoryError;
use crate::models::assignment::CandidateLot;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct LiveLotRow {
    id: i32,
    lot_number: String,
    available: Decimal,
    aisle: Option<String>,
    rack: Option<String>,
    shelf: Option<String>,
    bin: Option<String>,
    zone: Option<String>,
}

impl From<LiveLotRow> for CandidateLot {
    fn from(row: LiveLotRow) -> Self {
        Self {
            lot_id: Some(InventoryLotId::new(row.id)),
            lot_number: row.lot_number,
            available: row.available,
            bin: BinCoordinates {
                aisle: row.aisle,
                rack: row.rack,
                shelf: row.shelf,
                bin: row.bin,
                zone: row.zone,
            },
            // The matcher overlays loadout declarations afterwards.
            declared_on_loadout: false,
            confirmed_at_source: true,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LotSnapshotRow {
    id: i32,
    product_id: i32,
    location_id: i32,
    lot_number: String,
    available: Decimal,
    aisle: Option<String>,
    rack: Option<String>,
    shelf: Option<String>,
    bin: Option<String>,
    zone: Option<String>,
}

/// A locked view of one lot, read under `FOR UPDATE` before a strict commit.
#[derive(Debug, Clone)]
pub struct LotSnapshot {
    pub id: InventoryLotId,
    pub product_id: ProductId,
    pub location_id: LocationId,
    pub lot_number: String,
    pub available: Decimal,
    pub bin: BinCoordinates,
}

impl From<LotSnapshotRow> for LotSnapshot {
    fn from(row: LotSnapshotRow) -> Self {
        Self {
            id: InventoryLotId::new(row.id),
            product_id: ProductId::new(row.product_id),
            location_id: LocationId::new(row.location_id),
            lot_number: row.lot_number,
            available: row.available,
            bin: BinCoordinates {
                aisle: row.aisle,
                rack: row.rack,
                shelf: row.shelf,
                bin: row.bin,
                zone: row.zone,
            },
        }
    }
}

const AVAILABLE_LOTS_SQL: &str = r"
    SELECT id, lot_number,
           quantity_on_hand - quantity_reserved AS available,
           aisle, rack, shelf, bin, zone
    FROM wms.inventory_lot
    WHERE product_id = $1
      AND location_id = $2
      AND deleted_at IS NULL
      AND quantity_on_hand - quantity_reserved > 0
    ORDER BY created_at ASC, id ASC
";

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// List live lots with positive availability for a product at a
/// location, oldest first, inside the caller's transaction so planner
/// input and commits see one ledger.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn available_lots_tx(
    conn: &mut PgConnection,
    product_id: ProductId,
    location_id: LocationId,
) -> Result<Vec<CandidateLot>, RepositoryError> {
    let rows = sqlx::query_as::<_, LiveLotRow>(AVAILABLE_LOTS_SQL)
        .bind(product_id)
        .bind(location_id)
        .fetch_all(conn)
        .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Lock a live lot and return its snapshot.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_lot_tx(
    conn: &mut PgConnection,
    lot_id: InventoryLotId,
) -> Result<Option<LotSnapshot>, RepositoryError> {
    let row = sqlx::query_as::<_, LotSnapshotRow>(
        r"
        SELECT id, product_id, location_id, lot_number,
               quantity_on_hand - quantity_reserved AS available,
               aisle, rack, shelf, bin, zone
        FROM wms.inventory_lot
        WHERE id = $1 AND deleted_at IS NULL
        FOR UPDATE
        ",
    )
    .bind(lot_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Into::into))
}

/// Strictly reserve `quantity` against a lot. Returns `false` when the
/// lot no longer has that much available (nothing is reserved then).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn commit_reservation_tx(
    conn: &mut PgConnection,
    lot_id: InventoryLotId,
    quantity: Decimal,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE wms.inventory_lot
        SET quantity_reserved = quantity_reserved + $2, updated_at = now()
        WHERE id = $1
          AND deleted_at IS NULL
          AND quantity_on_hand - quantity_reserved >= $2
        ",
    )
    .bind(lot_id)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Reserve up to `quantity` against a lot, capped at its availability
/// at commit time. Returns the quantity actually reserved (possibly
/// zero, including when the lot has vanished).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn commit_up_to_tx(
    conn: &mut PgConnection,
    lot_id: InventoryLotId,
    quantity: Decimal,
) -> Result<Decimal, RepositoryError> {
    let committed: Option<(Decimal,)> = sqlx::query_as(
        r"
        WITH lot AS (
            SELECT id, quantity_on_hand - quantity_reserved AS available
            FROM wms.inventory_lot
            WHERE id = $1 AND deleted_at IS NULL
            FOR UPDATE
        )
        UPDATE wms.inventory_lot il
        SET quantity_reserved = il.quantity_reserved + LEAST($2, lot.available),
            updated_at = now()
        FROM lot
        WHERE il.id = lot.id AND lot.available > 0
        RETURNING LEAST($2, lot.available) AS committed
        ",
    )
    .bind(lot_id)
    .bind(quantity)
    .fetch_optional(conn)
    .await?;
    Ok(committed.map_or(Decimal::ZERO, |(qty,)| qty))
}

/// Release a previously committed reservation, e.g. when an assignment
/// is removed. Clamped so a lot shrunk by external adjustments cannot
/// drive the reservation negative.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn release_reservation_tx(
    conn: &mut PgConnection,
    lot_id: InventoryLotId,
    quantity: Decimal,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        UPDATE wms.inventory_lot
        SET quantity_reserved = GREATEST(quantity_reserved - $2, 0), updated_at = now()
        WHERE id = $1
        ",
    )
    .bind(lot_id)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(())
}
