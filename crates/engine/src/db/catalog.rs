//! Read access to the catalog tables owned by the wider warehouse
//! system: blueprints, blueprint lines, and loadouts.

use rust_decimal::Decimal;
use sqlx::PgConnection;

use stockflow_core::{
    BlueprintId, BlueprintLineId, InventoryLotId, LoadoutId, LocationId, ProductId,
};

use super::RepositoryError;
use crate::models::blueprint::{BlueprintLine, DeclaredLot};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct BlueprintRow {
    id: i32,
    allow_quantity_override: bool,
}

/// Blueprint header facts needed when instantiating order lines.
#[derive(Debug, Clone, Copy)]
pub struct BlueprintInfo {
    pub id: BlueprintId,
    pub allow_quantity_override: bool,
}

#[derive(Debug, sqlx::FromRow)]
struct BlueprintLineRow {
    id: i32,
    blueprint_id: i32,
    product_id: i32,
    minimum_quantity: Decimal,
    maximum_quantity: Decimal,
    default_quantity: Decimal,
    usage_notes: Option<String>,
    position: i32,
}

impl From<BlueprintLineRow> for BlueprintLine {
    fn from(row: BlueprintLineRow) -> Self {
        Self {
            id: BlueprintLineId::new(row.id),
            blueprint_id: BlueprintId::new(row.blueprint_id),
            product_id: ProductId::new(row.product_id),
            minimum_quantity: row.minimum_quantity,
            maximum_quantity: row.maximum_quantity,
            default_quantity: row.default_quantity,
            usage_notes: row.usage_notes,
            position: row.position,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct LoadoutRow {
    id: i32,
    location_id: i32,
    blueprint_id: i32,
}

/// Loadout header facts needed for destination validation.
#[derive(Debug, Clone, Copy)]
pub struct LoadoutInfo {
    pub id: LoadoutId,
    pub location_id: LocationId,
    pub blueprint_id: BlueprintId,
}

#[derive(Debug, sqlx::FromRow)]
struct DeclaredLotRow {
    product_id: i32,
    lot_id: Option<i32>,
    lot_number: Option<String>,
    quantity: Decimal,
}

impl From<DeclaredLotRow> for DeclaredLot {
    fn from(row: DeclaredLotRow) -> Self {
        Self {
            product_id: ProductId::new(row.product_id),
            lot_id: row.lot_id.map(InventoryLotId::new),
            lot_number: row.lot_number,
            quantity: row.quantity,
        }
    }
}

// =============================================================================
// Transaction-scoped operations
// =============================================================================

/// Fetch a blueprint's header facts inside the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn blueprint_tx(
    conn: &mut PgConnection,
    id: BlueprintId,
) -> Result<Option<BlueprintInfo>, RepositoryError> {
    let row = sqlx::query_as::<_, BlueprintRow>(
        "SELECT id, allow_quantity_override FROM wms.blueprint WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|r| BlueprintInfo {
        id: BlueprintId::new(r.id),
        allow_quantity_override: r.allow_quantity_override,
    }))
}

/// Fetch a blueprint's lines in position order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn blueprint_lines_tx(
    conn: &mut PgConnection,
    blueprint_id: BlueprintId,
) -> Result<Vec<BlueprintLine>, RepositoryError> {
    let rows = sqlx::query_as::<_, BlueprintLineRow>(
        r"
        SELECT id, blueprint_id, product_id, minimum_quantity,
               maximum_quantity, default_quantity, usage_notes, position
        FROM wms.blueprint_line
        WHERE blueprint_id = $1
        ORDER BY position ASC
        ",
    )
    .bind(blueprint_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Fetch the lots an operator declared on a loadout.
///
/// Declarations are operator intent, not ledger truth; rows may point
/// at lots that no longer exist or carry only a free-text lot number.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn loadout_declared_lots_tx(
    conn: &mut PgConnection,
    loadout_id: LoadoutId,
) -> Result<Vec<DeclaredLot>, RepositoryError> {
    let rows = sqlx::query_as::<_, DeclaredLotRow>(
        r"
        SELECT product_id, lot_id, lot_number, quantity
        FROM wms.loadout_lot
        WHERE loadout_id = $1
        ORDER BY id ASC
        ",
    )
    .bind(loadout_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Fetch a loadout's header facts inside the caller's transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn loadout_tx(
    conn: &mut PgConnection,
    id: LoadoutId,
) -> Result<Option<LoadoutInfo>, RepositoryError> {
    let row = sqlx::query_as::<_, LoadoutRow>(
        "SELECT id, location_id, blueprint_id FROM wms.loadout WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(|r| LoadoutInfo {
        id: LoadoutId::new(r.id),
        location_id: LocationId::new(r.location_id),
        blueprint_id: BlueprintId::new(r.blueprint_id),
    }))
}
