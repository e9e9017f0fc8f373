//! Persistence for scan confirmations.
//!
//! One row per order, stage, and line. Rows are created lazily on the
//! first scan against a stage, flipped to confirmed as tokens land, and
//! deleted when the order leaves the stage so a reopened stage starts
//! clean.

use rust_decimal::Decimal;
use sqlx::PgConnection;

use stockflow_core::{OrderLineId, ScanStage, TransferOrderId};

use super::RepositoryError;
use crate::models::scan::ExpectedLine;

#[derive(Debug, sqlx::FromRow)]
struct ExpectedLineRow {
    order_line_id: i32,
    sku: String,
    gtin: Option<String>,
    lot_numbers: Vec<String>,
    product_name: String,
    quantity: Decimal,
    confirmed: bool,
}

impl From<ExpectedLineRow> for ExpectedLine {
    fn from(row: ExpectedLineRow) -> Self {
        Self {
            order_line_id: OrderLineId::new(row.order_line_id),
            sku: row.sku,
            gtin: row.gtin,
            lot_numbers: row.lot_numbers,
            product_name: row.product_name,
            quantity: row.quantity,
            confirmed: row.confirmed,
        }
    }
}

/// Load the expected lines for an order at a stage, joined with any
/// confirmations already recorded, in pick-list order.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn expected_lines_tx(
    conn: &mut PgConnection,
    order_id: TransferOrderId,
    stage: ScanStage,
) -> Result<Vec<ExpectedLine>, RepositoryError> {
    let rows = sqlx::query_as::<_, ExpectedLineRow>(
        r"
        SELECT
            l.id AS order_line_id,
            p.sku,
            p.gtin,
            ARRAY_REMOVE(ARRAY_AGG(DISTINCT a.lot_number), NULL) AS lot_numbers,
            p.name AS product_name,
            l.required_quantity AS quantity,
            COALESCE(s.confirmed, FALSE) AS confirmed
        FROM wms.transfer_order_line l
        JOIN wms.product p ON p.id = l.product_id
        LEFT JOIN wms.assignment_line a ON a.order_line_id = l.id
        LEFT JOIN wms.scan_confirmation s
            ON s.order_line_id = l.id AND s.order_id = l.order_id AND s.stage = $2
        WHERE l.order_id = $1
        GROUP BY l.id, p.sku, p.gtin, p.name, l.required_quantity, l.position, s.confirmed
        ORDER BY l.position ASC
        ",
    )
    .bind(order_id)
    .bind(stage)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(Into::into).collect())
}

/// Record a confirmation for one line at a stage. Idempotent: a
/// re-scan of an already-confirmed line keeps the original timestamp.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn confirm_line_tx(
    conn: &mut PgConnection,
    order_id: TransferOrderId,
    stage: ScanStage,
    line_id: OrderLineId,
) -> Result<(), RepositoryError> {
    sqlx::query(
        r"
        INSERT INTO wms.scan_confirmation (order_id, stage, order_line_id, confirmed, confirmed_at)
        VALUES ($1, $2, $3, TRUE, now())
        ON CONFLICT (order_id, stage, order_line_id)
        DO UPDATE SET confirmed = TRUE,
                      confirmed_at = COALESCE(wms.scan_confirmation.confirmed_at, now())
        ",
    )
    .bind(order_id)
    .bind(stage)
    .bind(line_id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Drop every confirmation an order holds for a stage.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn clear_stage_tx(
    conn: &mut PgConnection,
    order_id: TransferOrderId,
    stage: ScanStage,
) -> Result<(), RepositoryError> {
    sqlx::query("DELETE FROM wms.scan_confirmation WHERE order_id = $1 AND stage = $2")
        .bind(order_id)
        .bind(stage)
        .execute(conn)
        .await?;
    Ok(())
}
