//! Barcode scan reconciliation orchestration.
//!
//! Wraps the pure [`ScanBoard`] with persistence: expected lines are
//! rebuilt from the order every call, and confirmations survive in
//! `scan_confirmation` rows so an interrupted session resumes where it
//! stopped. Completing a stage enables the forward transition but never
//! commits it; the operator drives that through the transition
//! operation with `via_scan` provenance.

use serde::Serialize;
use sqlx::PgPool;
use tracing::{info, instrument};

use stockflow_core::{OperatorId, ScanStage, TransferOrderId};

use crate::db::{RepositoryError, scan_session, transfer_order};
use crate::error::AppError;
use crate::models::scan::{ScanBoard, ScanMismatch, ScanOutcome, ScanProgress};
use crate::models::transfer_order::TransferOrder;

/// Result of submitting one scanned token.
#[derive(Debug, Serialize)]
pub struct ScanSubmission {
    pub outcome: ScanOutcome,
    /// Whether the stage's forward transition is now enabled (for
    /// shipping this also requires a carrier on the order).
    pub ready_to_transition: bool,
}

/// Service running scan sessions against transfer orders.
pub struct ScanService {
    pool: PgPool,
}

impl ScanService {
    /// Create a new scan service.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Current scan progress for an order's active stage.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when the order's status has no
    /// scan stage.
    pub async fn progress(&self, order_id: TransferOrderId) -> Result<ScanProgress, AppError> {
        let order = transfer_order::TransferOrderRepository::new(&self.pool)
            .get(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transfer order {order_id}")))?;
        let stage = active_stage(&order)?;
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        let lines = scan_session::expected_lines_tx(&mut conn, order_id, stage).await?;
        let board = ScanBoard::new(stage, lines);
        Ok(progress_of(&board, &order))
    }

    /// Submit one scanned token against the order's active stage.
    ///
    /// A match confirms the focused line and persists the confirmation;
    /// a mismatch changes nothing. Completing the stage never moves the
    /// order by itself: the submission reports readiness and the
    /// operator commits the transition separately, with `via_scan`
    /// provenance.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` on a token mismatch or when the
    /// order's status has no scan stage.
    #[instrument(skip(self, token))]
    pub async fn submit(
        &self,
        order_id: TransferOrderId,
        token: &str,
        actor: Option<OperatorId>,
    ) -> Result<ScanSubmission, AppError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let order = transfer_order::lock_order_tx(&mut tx, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transfer order {order_id}")))?;
        let stage = active_stage(&order)?;

        let lines = scan_session::expected_lines_tx(&mut tx, order_id, stage).await?;
        let mut board = ScanBoard::new(stage, lines);
        let outcome = board.confirm(token).map_err(|mismatch| match mismatch {
            ScanMismatch::TokenMismatch { .. } | ScanMismatch::NothingExpected => {
                AppError::validation(mismatch.to_string())
            }
        })?;

        scan_session::confirm_line_tx(&mut tx, order_id, stage, outcome.confirmed_line_id)
            .await?;
        tx.commit().await.map_err(RepositoryError::from)?;

        let ready_to_transition =
            outcome.stage_complete && stage_preconditions_met(stage, &order);
        info!(
            order_id = %order_id,
            stage = ?stage,
            actor = ?actor,
            confirmed_line_id = %outcome.confirmed_line_id,
            stage_complete = outcome.stage_complete,
            ready_to_transition,
            "Scan token accepted"
        );
        Ok(ScanSubmission {
            outcome,
            ready_to_transition,
        })
    }
}

fn active_stage(order: &TransferOrder) -> Result<ScanStage, AppError> {
    order.status.active_scan_stage().ok_or_else(|| {
        AppError::validation(format!(
            "Order is {}; no scan stage is active",
            order.status
        ))
    })
}

/// Shipping additionally needs a carrier before the stage may close.
fn stage_preconditions_met(stage: ScanStage, order: &TransferOrder) -> bool {
    stage != ScanStage::Shipping || order.carrier.as_deref().is_some_and(|c| !c.trim().is_empty())
}

fn progress_of(board: &ScanBoard, order: &TransferOrder) -> ScanProgress {
    let complete = board.is_complete();
    ScanProgress {
        stage: board.stage(),
        focused_line_id: board.focused().map(|l| l.order_line_id),
        complete,
        ready_to_transition: complete && stage_preconditions_met(board.stage(), order),
        lines: board.lines().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use stockflow_core::{
        DestinationMode, LocationId, OrderLineId, TransferPriority, TransferStatus,
    };

    use super::*;
    use crate::models::scan::ExpectedLine;

    fn order(status: TransferStatus, carrier: Option<&str>) -> TransferOrder {
        TransferOrder {
            id: TransferOrderId::new(1),
            reference: "TO-TEST0001".to_string(),
            origin_location_id: LocationId::new(1),
            destination_location_id: LocationId::new(2),
            destination_mode: DestinationMode::GeneralDelivery,
            destination_loadout_id: None,
            blueprint_id: None,
            priority: TransferPriority::Medium,
            status,
            requested_date: None,
            reason: None,
            notes: None,
            carrier: carrier.map(ToString::to_string),
            tracking_number: None,
            approved_at: None,
            picked_at: None,
            packed_at: None,
            shipped_at: None,
            received_at: None,
            completed_at: None,
            cancelled_at: None,
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    fn confirmed_line(id: i32) -> ExpectedLine {
        ExpectedLine {
            order_line_id: OrderLineId::new(id),
            sku: format!("SKU-{id}"),
            gtin: None,
            lot_numbers: vec![],
            product_name: format!("Product {id}"),
            quantity: Decimal::from(1),
            confirmed: true,
        }
    }

    #[test]
    fn test_shipping_needs_a_carrier_before_readiness() {
        let no_carrier = order(TransferStatus::Packed, None);
        let blank_carrier = order(TransferStatus::Packed, Some("  "));
        let with_carrier = order(TransferStatus::Packed, Some("DHL"));
        assert!(!stage_preconditions_met(ScanStage::Shipping, &no_carrier));
        assert!(!stage_preconditions_met(ScanStage::Shipping, &blank_carrier));
        assert!(stage_preconditions_met(ScanStage::Shipping, &with_carrier));
        // Picking and packing don't care about the carrier
        assert!(stage_preconditions_met(ScanStage::Picking, &no_carrier));
        assert!(stage_preconditions_met(ScanStage::Packing, &no_carrier));
    }

    #[test]
    fn test_completed_board_reports_readiness_but_keeps_status() {
        // Completing the stage only enables the transition; the order's
        // status is untouched until the operator commits it.
        let current = order(TransferStatus::Approved, None);
        let board = ScanBoard::new(
            ScanStage::Picking,
            vec![confirmed_line(1), confirmed_line(2)],
        );
        let progress = progress_of(&board, &current);
        assert!(progress.complete);
        assert!(progress.ready_to_transition);
        assert_eq!(current.status, TransferStatus::Approved);
    }

    #[test]
    fn test_completed_shipping_board_without_carrier_is_not_ready() {
        let current = order(TransferStatus::Packed, None);
        let board = ScanBoard::new(ScanStage::Shipping, vec![confirmed_line(1)]);
        let progress = progress_of(&board, &current);
        assert!(progress.complete);
        assert!(!progress.ready_to_transition);
    }
}
