//! Database operations for transfer orders, order lines, and the
//! transition audit trail.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use stockflow_core::{
    BlueprintId, BlueprintLineId, DestinationMode, LoadoutId, LocationId, OperatorId, OrderLineId,
    ProductId, TransferOrderId, TransferPriority, TransferStatus,
};

use super::RepositoryError;
use crate::models::transfer_order::{
    OrderLine, OrderLineKind, OrderLineWithProgress, TransferFilter, TransferOrder,
    UpdateTransferOrderInput,
};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for transfer order queries.
#[derive(Debug, sqlx::FromRow)]
struct TransferOrderRow {
    id: i32,
    reference: String,
    origin_location_id: i32,
    destination_location_id: i32,
    destination_mode: DestinationMode,
    destination_loadout_id: Option<i32>,
    blueprint_id: Option<i32>,
    priority: TransferPriority,
    status: TransferStatus,
    requested_date: Option<NaiveDate>,
    reason: Option<String>,
    notes: Option<String>,
    carrier: Option<String>,
    tracking_number: Option<String>,
    approved_at: Option<DateTime<Utc>>,
    picked_at: Option<DateTime<Utc>>,
    packed_at: Option<DateTime<Utc>>,
    shipped_at: Option<DateTime<Utc>>,
    received_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    cancelled_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TransferOrderRow> for TransferOrder {
    fn from(row: TransferOrderRow) -> Self {
        Self {
            id: TransferOrderId::new(row.id),
            reference: row.reference,
            origin_location_id: LocationId::new(row.origin_location_id),
            destination_location_id: LocationId::new(row.destination_location_id),
            destination_mode: row.destination_mode,
            destination_loadout_id: row.destination_loadout_id.map(LoadoutId::new),
            blueprint_id: row.blueprint_id.map(BlueprintId::new),
            priority: row.priority,
            status: row.status,
            requested_date: row.requested_date,
            reason: row.reason,
            notes: row.notes,
            carrier: row.carrier,
            tracking_number: row.tracking_number,
            approved_at: row.approved_at,
            picked_at: row.picked_at,
            packed_at: row.packed_at,
            shipped_at: row.shipped_at,
            received_at: row.received_at,
            completed_at: row.completed_at,
            cancelled_at: row.cancelled_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const ORDER_COLUMNS: &str = r"
    id, reference, origin_location_id, destination_location_id,
    destination_mode, destination_loadout_id, blueprint_id,
    priority, status, requested_date, reason, notes,
    carrier, tracking_number,
    approved_at, picked_at, packed_at, shipped_at,
    received_at, completed_at, cancelled_at,
    created_at, updated_at
";

/// Internal row type for order line queries.
#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: i32,
    order_id: i32,
    kind: OrderLineKind,
    blueprint_line_id: Option<i32>,
    product_id: i32,
    required_quantity: Decimal,
    position: i32,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        Self {
            id: OrderLineId::new(row.id),
            order_id: TransferOrderId::new(row.order_id),
            kind: row.kind,
            blueprint_line_id: row.blueprint_line_id.map(BlueprintLineId::new),
            product_id: ProductId::new(row.product_id),
            required_quantity: row.required_quantity,
            position: row.position,
        }
    }
}

/// Internal row type for order lines with assignment progress.
#[derive(Debug, sqlx::FromRow)]
struct OrderLineProgressRow {
    id: i32,
    order_id: i32,
    kind: OrderLineKind,
    blueprint_line_id: Option<i32>,
    product_id: i32,
    required_quantity: Decimal,
    position: i32,
    assigned_quantity: Decimal,
}

impl From<OrderLineProgressRow> for OrderLineWithProgress {
    fn from(row: OrderLineProgressRow) -> Self {
        let remaining = (row.required_quantity - row.assigned_quantity).max(Decimal::ZERO);
        Self {
            line: OrderLine {
                id: OrderLineId::new(row.id),
                order_id: TransferOrderId::new(row.order_id),
                kind: row.kind,
                blueprint_line_id: row.blueprint_line_id.map(BlueprintLineId::new),
                product_id: ProductId::new(row.product_id),
                required_quantity: row.required_quantity,
                position: row.position,
            },
            assigned_quantity: row.assigned_quantity,
            remaining_quantity: remaining,
        }
    }
}

/// Fields for inserting a new transfer order header.
#[derive(Debug, Clone)]
pub struct NewOrderRecord {
    pub reference: String,
    pub origin_location_id: LocationId,
    pub destination_location_id: LocationId,
    pub destination_mode: DestinationMode,
    pub destination_loadout_id: Option<LoadoutId>,
    pub blueprint_id: Option<BlueprintId>,
    pub priority: TransferPriority,
    pub requested_date: Option<NaiveDate>,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

/// Fields for inserting one order line.
#[derive(Debug, Clone)]
pub struct NewLineRecord {
    pub kind: OrderLineKind,
    pub blueprint_line_id: Option<BlueprintLineId>,
    pub product_id: ProductId,
    pub required_quantity: Decimal,
    pub position: i32,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for transfer order database operations.
///
/// Pool-based methods are standalone reads/patches; `*_tx` functions take
/// a connection so the fulfillment service can compose them inside one
/// transaction with the order row locked.
pub struct TransferOrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> TransferOrderRepository<'a> {
    /// Create a new transfer order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a transfer order by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        id: TransferOrderId,
    ) -> Result<Option<TransferOrder>, RepositoryError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM wms.transfer_order WHERE id = $1");
        let row = sqlx::query_as::<_, TransferOrderRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        Ok(row.map(Into::into))
    }

    /// List transfer orders with filtering, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        filter: &TransferFilter,
    ) -> Result<Vec<TransferOrder>, RepositoryError> {
        let limit = filter.limit.unwrap_or(100);
        let offset = filter.offset.unwrap_or(0);

        let sql = format!(
            r"
            SELECT {ORDER_COLUMNS}
            FROM wms.transfer_order
            WHERE
                ($1::wms.transfer_status IS NULL OR status = $1)
                AND ($2::int IS NULL OR origin_location_id = $2)
                AND ($3::int IS NULL OR destination_location_id = $3)
                AND ($4::wms.transfer_priority IS NULL OR priority = $4)
            ORDER BY created_at DESC, id DESC
            LIMIT $5 OFFSET $6
            "
        );
        let rows = sqlx::query_as::<_, TransferOrderRow>(&sql)
            .bind(filter.status)
            .bind(filter.origin_location_id)
            .bind(filter.destination_location_id)
            .bind(filter.priority)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// Patch the mutable fields of an order.
    ///
    /// Origin, destination, and status are deliberately not touchable
    /// here; status moves only through [`set_status_tx`].
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: TransferOrderId,
        input: &UpdateTransferOrderInput,
    ) -> Result<TransferOrder, RepositoryError> {
        let sql = format!(
            r"
            UPDATE wms.transfer_order
            SET
                priority = COALESCE($2, priority),
                requested_date = COALESCE($3, requested_date),
                reason = COALESCE($4, reason),
                notes = COALESCE($5, notes),
                carrier = COALESCE($6, carrier),
                tracking_number = COALESCE($7, tracking_number),
                updated_at = now()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "
        );
        let row = sqlx::query_as::<_, TransferOrderRow>(&sql)
            .bind(id)
            .bind(input.priority)
            .bind(input.requested_date)
            .bind(input.reason.as_deref())
            .bind(input.notes.as_deref())
            .bind(input.carrier.as_deref())
            .bind(input.tracking_number.as_deref())
            .fetch_optional(self.pool)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        Ok(row.into())
    }

    /// List an order's lines with assignment progress, in position order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn lines_with_progress(
        &self,
        order_id: TransferOrderId,
    ) -> Result<Vec<OrderLineWithProgress>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderLineProgressRow>(
            r"
            SELECT
                l.id, l.order_id, l.kind, l.blueprint_line_id,
                l.product_id, l.required_quantity, l.position,
                COALESCE(SUM(a.quantity), 0) AS assigned_quantity
            FROM wms.transfer_order_line l
            LEFT JOIN wms.assignment_line a ON a.order_line_id = l.id
            WHERE l.order_id = $1
            GROUP BY l.id
            ORDER BY l.position ASC
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

/// Insert a transfer order header.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` on a duplicate reference.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn insert_order_tx(
    conn: &mut PgConnection,
    record: &NewOrderRecord,
) -> Result<TransferOrder, RepositoryError> {
    let sql = format!(
        r"
        INSERT INTO wms.transfer_order (
            reference, origin_location_id, destination_location_id,
            destination_mode, destination_loadout_id, blueprint_id,
            priority, requested_date, reason, notes
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {ORDER_COLUMNS}
        "
    );
    let row = sqlx::query_as::<_, TransferOrderRow>(&sql)
        .bind(&record.reference)
        .bind(record.origin_location_id)
        .bind(record.destination_location_id)
        .bind(record.destination_mode)
        .bind(record.destination_loadout_id)
        .bind(record.blueprint_id)
        .bind(record.priority)
        .bind(record.requested_date)
        .bind(record.reason.as_deref())
        .bind(record.notes.as_deref())
        .fetch_one(conn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("transfer_order_reference_key")
            {
                return RepositoryError::Conflict("Duplicate order reference".to_string());
            }
            RepositoryError::Database(e)
        })?;
    Ok(row.into())
}

/// Insert one order line.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_line_tx(
    conn: &mut PgConnection,
    order_id: TransferOrderId,
    record: &NewLineRecord,
) -> Result<OrderLine, RepositoryError> {
    let row = sqlx::query_as::<_, OrderLineRow>(
        r"
        INSERT INTO wms.transfer_order_line (
            order_id, kind, blueprint_line_id, product_id,
            required_quantity, position
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, order_id, kind, blueprint_line_id, product_id,
                  required_quantity, position
        ",
    )
    .bind(order_id)
    .bind(record.kind)
    .bind(record.blueprint_line_id)
    .bind(record.product_id)
    .bind(record.required_quantity)
    .bind(record.position)
    .fetch_one(conn)
    .await?;
    Ok(row.into())
}

/// Lock and fetch an order row for the duration of the transaction.
///
/// Serializes all invariant-bearing work per order; every mutation path
/// calls this first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_order_tx(
    conn: &mut PgConnection,
    id: TransferOrderId,
) -> Result<Option<TransferOrder>, RepositoryError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM wms.transfer_order WHERE id = $1 FOR UPDATE");
    let row = sqlx::query_as::<_, TransferOrderRow>(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await?;
    Ok(row.map(Into::into))
}

/// Fetch one order line belonging to an order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_line_tx(
    conn: &mut PgConnection,
    order_id: TransferOrderId,
    line_id: OrderLineId,
) -> Result<Option<OrderLine>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderLineRow>(
        r"
        SELECT id, order_id, kind, blueprint_line_id, product_id,
               required_quantity, position
        FROM wms.transfer_order_line
        WHERE id = $1 AND order_id = $2
        ",
    )
    .bind(line_id)
    .bind(order_id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Into::into))
}

/// Fetch all lines of an order, in position order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lines_tx(
    conn: &mut PgConnection,
    order_id: TransferOrderId,
) -> Result<Vec<OrderLine>, RepositoryError> {
    let rows = sqlx::query_as::<_, OrderLineRow>(
        r"
        SELECT id, order_id, kind, blueprint_line_id, product_id,
               required_quantity, position
        FROM wms.transfer_order_line
        WHERE order_id = $1
        ORDER BY position ASC
        ",
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Delete an order's blueprint-bound lines (used by loadout reassignment
/// after their assignments have been released).
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn delete_blueprint_lines_tx(
    conn: &mut PgConnection,
    order_id: TransferOrderId,
) -> Result<u64, RepositoryError> {
    let result = sqlx::query(
        "DELETE FROM wms.transfer_order_line WHERE order_id = $1 AND kind = 'blueprint'",
    )
    .bind(order_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// Move an order to a new status, stamping the stage timestamp.
///
/// The caller has already validated the transition against the state
/// machine; this only persists it.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order doesn't exist.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn set_status_tx(
    conn: &mut PgConnection,
    id: TransferOrderId,
    to: TransferStatus,
) -> Result<TransferOrder, RepositoryError> {
    // One static statement per stage keeps the timestamp columns honest.
    let stamp_column = match to {
        TransferStatus::Approved => "approved_at",
        TransferStatus::Picked => "picked_at",
        TransferStatus::Packed => "packed_at",
        TransferStatus::Shipped => "shipped_at",
        TransferStatus::Received => "received_at",
        TransferStatus::Completed => "completed_at",
        TransferStatus::Cancelled => "cancelled_at",
        TransferStatus::Pending => {
            return Err(RepositoryError::DataCorruption(
                "no transition targets pending".to_string(),
            ));
        }
    };
    let sql = format!(
        r"
        UPDATE wms.transfer_order
        SET status = $2, {stamp_column} = now(), updated_at = now()
        WHERE id = $1
        RETURNING {ORDER_COLUMNS}
        "
    );
    let row = sqlx::query_as::<_, TransferOrderRow>(&sql)
        .bind(id)
        .bind(to)
        .fetch_optional(conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    Ok(row.into())
}

/// Rebind an order's destination loadout and blueprint (loadout
/// reassignment, legal only while Pending/Approved - validated upstream).
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the order doesn't exist.
/// Returns `RepositoryError::Database` for other database errors.
pub async fn set_loadout_tx(
    conn: &mut PgConnection,
    id: TransferOrderId,
    loadout_id: LoadoutId,
    blueprint_id: BlueprintId,
) -> Result<TransferOrder, RepositoryError> {
    let sql = format!(
        r"
        UPDATE wms.transfer_order
        SET destination_loadout_id = $2, blueprint_id = $3, updated_at = now()
        WHERE id = $1
        RETURNING {ORDER_COLUMNS}
        "
    );
    let row = sqlx::query_as::<_, TransferOrderRow>(&sql)
        .bind(id)
        .bind(loadout_id)
        .bind(blueprint_id)
        .fetch_optional(conn)
        .await?
        .ok_or(RepositoryError::NotFound)?;
    Ok(row.into())
}

/// Record a transition in the append-only audit trail.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn insert_event_tx(
    conn: &mut PgConnection,
    order_id: TransferOrderId,
    from: TransferStatus,
    to: TransferStatus,
    via_scan: bool,
    actor: Option<OperatorId>,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO wms.transfer_order_event (order_id, from_status, to_status, via_scan, actor_id)
        VALUES ($1, $2, $3, $4, $5)
        ",
    )
    .bind(order_id)
    .bind(from)
    .bind(to)
    .bind(via_scan)
    .bind(actor)
    .execute(conn)
    .await?;
    Ok(())
}
