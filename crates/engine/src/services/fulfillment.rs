//! Transfer fulfillment orchestration.
//!
//! Every mutation runs in one transaction with the order row locked
//! (`SELECT ... FOR UPDATE`), so per-order work is serialized while
//! lot-level safety comes from compare-and-commit updates on the
//! ledger. Planning is delegated to the pure matcher; this service
//! feeds it snapshots and executes the resulting commits.

use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{Acquire, PgPool};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use stockflow_core::{
    AssignmentLineId, DestinationMode, LoadoutId, OperatorId, OrderLineId, TransferOrderId,
    TransferStatus,
};

use crate::db::{
    self, RepositoryError,
    assignment::{self, AssignmentRepository},
    catalog, ledger,
    transfer_order::{self, NewLineRecord, NewOrderRecord, TransferOrderRepository},
};
use crate::error::{AppError, InvariantViolation};
use crate::models::{
    AssignmentLine, BlueprintLine, CandidateLot, CreateTransferOrderInput, DeclaredLot,
    NewAssignment, OrderLine, OrderLineKind, OrderLineWithProgress, TransferFilter, TransferOrder,
    UpdateTransferOrderInput,
};
use crate::services::{demand, matcher};

/// Upper bound on blueprint lines processed per auto-assign call.
const AUTO_ASSIGN_LINE_CAP: usize = 200;

/// A transfer order with its lines and assignments, as returned to
/// operators.
#[derive(Debug, Serialize)]
pub struct TransferDetail {
    pub order: TransferOrder,
    pub lines: Vec<OrderLineWithProgress>,
    pub assignments: Vec<AssignmentLine>,
}

/// Why an auto-assign pass left a line alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The line already carries at least one assignment.
    AlreadyAssigned,
    /// The line has no remaining demand.
    NothingRemaining,
    /// The candidate lookup failed; the line is reported, not the batch.
    LookupFailed,
    /// The line fell beyond the per-call cap.
    LineCapReached,
    /// Manual lines are never auto-assigned.
    ManualLine,
}

/// Per-line outcome of an auto-assign pass.
#[derive(Debug, Serialize)]
pub struct LineOutcome {
    pub order_line_id: OrderLineId,
    /// Quantity committed by this pass.
    pub committed: Decimal,
    /// Demand still unfilled after this pass.
    pub unfilled: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    /// Declared lot numbers with no live counterpart, skipped as stale.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stale_declared: Vec<String>,
}

/// Batch summary returned by auto-assign. Best effort: the batch never
/// fails because one line could not be served.
#[derive(Debug, Serialize)]
pub struct AutoAssignReport {
    pub order_id: TransferOrderId,
    pub assignments: Vec<AssignmentLine>,
    pub lines: Vec<LineOutcome>,
}

/// Service orchestrating transfer order fulfillment.
pub struct FulfillmentService {
    pool: PgPool,
}

impl FulfillmentService {
    /// Create a new fulfillment service.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // =========================================================================
    // Order lifecycle
    // =========================================================================

    /// Create a transfer order.
    ///
    /// Blueprint-bound lines are populated from the blueprint with
    /// computed required quantities; manual lines commit their lot
    /// assignment immediately, inside the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` for incoherent input,
    /// `AppError::Invariant` when a manual line overdraws its lot.
    #[instrument(skip(self, input), fields(origin = %input.origin_location_id))]
    pub async fn create_order(
        &self,
        input: CreateTransferOrderInput,
        actor: Option<OperatorId>,
    ) -> Result<TransferDetail, AppError> {
        if input.origin_location_id == input.destination_location_id {
            return Err(AppError::validation(
                "Origin and destination must be different locations",
            ));
        }

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        // Resolve destination mode and blueprint binding.
        let (loadout_id, blueprint_id) = match input.destination_mode {
            DestinationMode::LoadoutRestock => {
                let loadout_id = input.destination_loadout_id.ok_or_else(|| {
                    AppError::validation("loadout_restock requires destination_loadout_id")
                })?;
                let loadout = catalog::loadout_tx(&mut tx, loadout_id)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Loadout {loadout_id}")))?;
                if loadout.location_id != input.destination_location_id {
                    return Err(AppError::validation(
                        "Destination loadout does not live at the destination location",
                    ));
                }
                if input
                    .blueprint_id
                    .is_some_and(|id| id != loadout.blueprint_id)
                {
                    return Err(AppError::validation(
                        "blueprint_id does not match the destination loadout's blueprint",
                    ));
                }
                (Some(loadout_id), Some(loadout.blueprint_id))
            }
            DestinationMode::GeneralDelivery => {
                if input.destination_loadout_id.is_some() {
                    return Err(AppError::validation(
                        "general_delivery does not take destination_loadout_id",
                    ));
                }
                (None, input.blueprint_id)
            }
        };

        if blueprint_id.is_none() && input.manual_lines.is_empty() {
            return Err(AppError::validation(
                "An order needs a blueprint or at least one manual line",
            ));
        }

        let order = transfer_order::insert_order_tx(
            &mut tx,
            &NewOrderRecord {
                reference: generate_reference(),
                origin_location_id: input.origin_location_id,
                destination_location_id: input.destination_location_id,
                destination_mode: input.destination_mode,
                destination_loadout_id: loadout_id,
                blueprint_id,
                priority: input.priority,
                requested_date: input.requested_date,
                reason: input.reason.clone(),
                notes: input.notes.clone(),
            },
        )
        .await?;

        let mut position = 0_i32;

        if let Some(blueprint_id) = blueprint_id {
            let blueprint = catalog::blueprint_tx(&mut tx, blueprint_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Blueprint {blueprint_id}")))?;
            let lines = catalog::blueprint_lines_tx(&mut tx, blueprint_id).await?;

            for bp_line in lines {
                let override_qty = input
                    .line_overrides
                    .iter()
                    .find(|o| o.blueprint_line_id == bp_line.id)
                    .map(|o| o.quantity);
                let required = demand::required_quantity(
                    &bp_line,
                    override_qty,
                    blueprint.allow_quantity_override,
                );
                if required <= Decimal::ZERO {
                    continue;
                }
                transfer_order::insert_line_tx(
                    &mut tx,
                    order.id,
                    &NewLineRecord {
                        kind: OrderLineKind::Blueprint,
                        blueprint_line_id: Some(bp_line.id),
                        product_id: bp_line.product_id,
                        required_quantity: required,
                        position,
                    },
                )
                .await?;
                position += 1;
            }
        }

        for manual in &input.manual_lines {
            if manual.quantity <= Decimal::ZERO {
                return Err(AppError::validation("Manual line quantity must be positive"));
            }
            let lot = ledger::lock_lot_tx(&mut tx, manual.lot_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Inventory lot {}", manual.lot_id)))?;
            if lot.product_id != manual.product_id {
                return Err(AppError::validation(format!(
                    "Lot {} holds a different product",
                    manual.lot_id
                )));
            }
            if lot.location_id != input.origin_location_id {
                return Err(AppError::validation(format!(
                    "Lot {} is not at the origin location",
                    manual.lot_id
                )));
            }
            if !ledger::commit_reservation_tx(&mut tx, lot.id, manual.quantity).await? {
                return Err(InvariantViolation::InsufficientAvailability {
                    lot_id: lot.id,
                    requested: manual.quantity,
                    available: lot.available,
                }
                .into());
            }
            let line = transfer_order::insert_line_tx(
                &mut tx,
                order.id,
                &NewLineRecord {
                    kind: OrderLineKind::Manual,
                    blueprint_line_id: None,
                    product_id: manual.product_id,
                    required_quantity: manual.quantity,
                    position,
                },
            )
            .await?;
            position += 1;
            assignment::insert_assignment_tx(&mut tx, line.id, &lot, manual.quantity, actor)
                .await?;
        }

        tx.commit().await.map_err(RepositoryError::from)?;
        info!(order_id = %order.id, reference = %order.reference, "Transfer order created");

        self.detail(order.id).await
    }

    /// Fetch an order with lines and assignments.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order doesn't exist.
    pub async fn detail(&self, order_id: TransferOrderId) -> Result<TransferDetail, AppError> {
        let orders = TransferOrderRepository::new(&self.pool);
        let order = orders
            .get(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transfer order {order_id}")))?;
        let lines = orders.lines_with_progress(order_id).await?;
        let assignments = AssignmentRepository::new(&self.pool)
            .for_order(order_id)
            .await?;
        Ok(TransferDetail {
            order,
            lines,
            assignments,
        })
    }

    /// List orders matching a filter.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails.
    pub async fn list(&self, filter: &TransferFilter) -> Result<Vec<TransferOrder>, AppError> {
        Ok(TransferOrderRepository::new(&self.pool)
            .list(filter)
            .await?)
    }

    /// Patch an order's mutable fields. Rejected once the order is
    /// terminal.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order doesn't exist,
    /// `AppError::Validation` if it is terminal.
    pub async fn update(
        &self,
        order_id: TransferOrderId,
        input: &UpdateTransferOrderInput,
    ) -> Result<TransferOrder, AppError> {
        let orders = TransferOrderRepository::new(&self.pool);
        let order = orders
            .get(order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transfer order {order_id}")))?;
        if order.status.is_terminal() {
            return Err(AppError::validation(format!(
                "Order is {} and can no longer be edited",
                order.status
            )));
        }
        Ok(orders.update(order_id, input).await?)
    }

    // =========================================================================
    // Assignment
    // =========================================================================

    /// Auto-assign lots to every eligible blueprint-bound line.
    ///
    /// Best effort: lines that cannot be served (already assigned,
    /// lookup failure, beyond the per-call cap) are reported in the
    /// batch summary, never failed. Commits are capped at each lot's
    /// availability at commit time.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` unless the order is Pending or
    /// Approved.
    #[instrument(skip(self))]
    pub async fn auto_assign(
        &self,
        order_id: TransferOrderId,
        actor: Option<OperatorId>,
    ) -> Result<AutoAssignReport, AppError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let order = transfer_order::lock_order_tx(&mut tx, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transfer order {order_id}")))?;
        require_assignable(&order)?;

        let declared: Vec<DeclaredLot> = match order.destination_loadout_id {
            Some(loadout_id) => catalog::loadout_declared_lots_tx(&mut tx, loadout_id).await?,
            None => Vec::new(),
        };

        let lines = transfer_order::lines_tx(&mut tx, order_id).await?;
        let mut report = AutoAssignReport {
            order_id,
            assignments: Vec::new(),
            lines: Vec::new(),
        };

        for (index, line) in lines.iter().enumerate() {
            let assigned = assignment::assigned_total_tx(&mut tx, line.id).await?;
            let remaining = demand::remaining(line.required_quantity, assigned);
            if let Some(reason) = line_skip(line.kind, index, assigned, remaining) {
                let outcome = if reason == SkipReason::AlreadyAssigned {
                    skipped_with_unfilled(line, reason, remaining)
                } else {
                    skipped(line, reason)
                };
                report.lines.push(outcome);
                continue;
            }

            // Savepoint so a failed lookup aborts only this line's work,
            // not the batch transaction.
            let mut line_tx = tx.begin().await.map_err(RepositoryError::from)?;
            let live = match ledger::available_lots_tx(
                &mut line_tx,
                line.product_id,
                order.origin_location_id,
            )
            .await
            {
                Ok(live) => live,
                Err(err) => {
                    line_tx.rollback().await.map_err(RepositoryError::from)?;
                    warn!(
                        order_line_id = %line.id,
                        product_id = %line.product_id,
                        error = %err,
                        "Candidate lookup failed; skipping line"
                    );
                    report
                        .lines
                        .push(skipped_with_unfilled(line, SkipReason::LookupFailed, remaining));
                    continue;
                }
            };

            let line_declared: Vec<DeclaredLot> = declared
                .iter()
                .filter(|d| d.product_id == line.product_id)
                .cloned()
                .collect();
            let candidates = matcher::rank_candidates(&line_declared, live);
            let plan = matcher::plan_line(
                &matcher::LineDemand {
                    order_line_id: line.id,
                    product_id: line.product_id,
                    remaining,
                },
                &line_declared,
                &candidates,
            );

            let mut committed_total = Decimal::ZERO;
            for commit in &plan.commits {
                let Some(lot) = ledger::lock_lot_tx(&mut line_tx, commit.lot_id).await? else {
                    continue;
                };
                let committed =
                    ledger::commit_up_to_tx(&mut line_tx, commit.lot_id, commit.quantity).await?;
                if committed <= Decimal::ZERO {
                    continue;
                }
                let assignment =
                    assignment::insert_assignment_tx(&mut line_tx, line.id, &lot, committed, actor)
                        .await?;
                committed_total += committed;
                report.assignments.push(assignment);
            }
            line_tx.commit().await.map_err(RepositoryError::from)?;

            report.lines.push(LineOutcome {
                order_line_id: line.id,
                committed: committed_total,
                unfilled: demand::remaining(remaining, committed_total),
                skipped: None,
                stale_declared: plan.stale_declared,
            });
        }

        tx.commit().await.map_err(RepositoryError::from)?;
        info!(
            order_id = %order_id,
            assignments = report.assignments.len(),
            "Auto-assign pass complete"
        );
        Ok(report)
    }

    /// Ranked candidate lots for one line, freshly read.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the order or line doesn't exist.
    pub async fn candidates(
        &self,
        order_id: TransferOrderId,
        line_id: OrderLineId,
    ) -> Result<Vec<CandidateLot>, AppError> {
        let mut conn = self.pool.acquire().await.map_err(RepositoryError::from)?;
        let order = {
            let orders = TransferOrderRepository::new(&self.pool);
            orders
                .get(order_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Transfer order {order_id}")))?
        };
        let line = transfer_order::get_line_tx(&mut conn, order_id, line_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order line {line_id}")))?;

        let declared: Vec<DeclaredLot> = match order.destination_loadout_id {
            Some(loadout_id) => catalog::loadout_declared_lots_tx(&mut conn, loadout_id)
                .await?
                .into_iter()
                .filter(|d| d.product_id == line.product_id)
                .collect(),
            None => Vec::new(),
        };
        let live =
            ledger::available_lots_tx(&mut conn, line.product_id, order.origin_location_id).await?;
        Ok(matcher::rank_candidates(&declared, live))
    }

    /// Manually assign a lot quantity to a line.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Invariant` when the quantity exceeds the
    /// line's remaining demand or the lot's availability.
    #[instrument(skip(self, input))]
    pub async fn assign(
        &self,
        order_id: TransferOrderId,
        line_id: OrderLineId,
        input: &NewAssignment,
        actor: Option<OperatorId>,
    ) -> Result<AssignmentLine, AppError> {
        if input.quantity <= Decimal::ZERO {
            return Err(AppError::validation("Assignment quantity must be positive"));
        }

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let order = transfer_order::lock_order_tx(&mut tx, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transfer order {order_id}")))?;
        require_assignable(&order)?;

        let line = transfer_order::get_line_tx(&mut tx, order_id, line_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Order line {line_id}")))?;

        let lot = ledger::lock_lot_tx(&mut tx, input.lot_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Inventory lot {}", input.lot_id)))?;
        if lot.product_id != line.product_id {
            return Err(AppError::validation(format!(
                "Lot {} holds a different product than the line requires",
                lot.id
            )));
        }
        if lot.location_id != order.origin_location_id {
            return Err(AppError::validation(format!(
                "Lot {} is not at the order's origin location",
                lot.id
            )));
        }

        let assigned = assignment::assigned_total_tx(&mut tx, line.id).await?;
        let remaining = demand::remaining(line.required_quantity, assigned);
        check_within_demand(line.id, input.quantity, remaining)?;
        if !ledger::commit_reservation_tx(&mut tx, lot.id, input.quantity).await? {
            return Err(InvariantViolation::InsufficientAvailability {
                lot_id: lot.id,
                requested: input.quantity,
                available: lot.available,
            }
            .into());
        }

        let assignment =
            assignment::insert_assignment_tx(&mut tx, line.id, &lot, input.quantity, actor).await?;
        tx.commit().await.map_err(RepositoryError::from)?;
        info!(
            order_id = %order_id,
            order_line_id = %line_id,
            lot_id = %lot.id,
            quantity = %input.quantity,
            "Manual assignment committed"
        );
        Ok(assignment)
    }

    /// Remove an assignment and release its lot reservation.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the assignment doesn't belong to
    /// the order.
    #[instrument(skip(self))]
    pub async fn unassign(
        &self,
        order_id: TransferOrderId,
        assignment_id: AssignmentLineId,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let order = transfer_order::lock_order_tx(&mut tx, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transfer order {order_id}")))?;
        require_assignable(&order)?;

        let released = assignment::delete_assignment_tx(&mut tx, order_id, assignment_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Assignment {assignment_id}")))?;
        ledger::release_reservation_tx(&mut tx, released.lot_id, released.quantity).await?;

        tx.commit().await.map_err(RepositoryError::from)?;
        info!(
            order_id = %order_id,
            assignment_id = %assignment_id,
            "Assignment removed"
        );
        Ok(())
    }

    /// Rebind a loadout-restock order to a different destination loadout.
    ///
    /// Legal only while Pending or Approved. Drops the blueprint-bound
    /// lines and their assignments (releasing the reservations), then
    /// rebuilds lines from the new loadout's blueprint at default
    /// quantities. Manual lines are untouched.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Validation` when the order isn't in
    /// Pending/Approved, isn't in loadout-restock mode, or the loadout
    /// sits elsewhere.
    #[instrument(skip(self))]
    pub async fn reassign_loadout(
        &self,
        order_id: TransferOrderId,
        new_loadout_id: LoadoutId,
    ) -> Result<TransferDetail, AppError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let order = transfer_order::lock_order_tx(&mut tx, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transfer order {order_id}")))?;
        require_assignable(&order)?;
        require_loadout_restock(&order)?;

        let loadout = catalog::loadout_tx(&mut tx, new_loadout_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Loadout {new_loadout_id}")))?;
        if loadout.location_id != order.destination_location_id {
            return Err(AppError::validation(
                "New loadout does not live at the order's destination location",
            ));
        }

        for released in assignment::delete_blueprint_assignments_tx(&mut tx, order_id).await? {
            ledger::release_reservation_tx(&mut tx, released.lot_id, released.quantity).await?;
        }
        transfer_order::delete_blueprint_lines_tx(&mut tx, order_id).await?;
        transfer_order::set_loadout_tx(&mut tx, order_id, loadout.id, loadout.blueprint_id)
            .await?;

        let blueprint_lines = catalog::blueprint_lines_tx(&mut tx, loadout.blueprint_id).await?;
        let position = next_position(&transfer_order::lines_tx(&mut tx, order_id).await?);
        for record in blueprint_line_records(&blueprint_lines, position) {
            transfer_order::insert_line_tx(&mut tx, order_id, &record).await?;
        }

        tx.commit().await.map_err(RepositoryError::from)?;
        info!(
            order_id = %order_id,
            loadout_id = %new_loadout_id,
            "Loadout reassigned"
        );
        self.detail(order_id).await
    }

    // =========================================================================
    // Transitions
    // =========================================================================

    /// Move an order through the state machine.
    ///
    /// Stamps the stage timestamp, records the audit event with its
    /// `via_scan` provenance, clears the completed stage's scan session,
    /// and on cancellation releases every lot reservation the order
    /// holds.
    ///
    /// # Errors
    ///
    /// Returns `AppError::IllegalTransition` when the move is not
    /// permitted from the current status or the carrier precondition
    /// for `Shipped` is unmet.
    #[instrument(skip(self))]
    pub async fn transition(
        &self,
        order_id: TransferOrderId,
        to: TransferStatus,
        via_scan: bool,
        actor: Option<OperatorId>,
    ) -> Result<TransferOrder, AppError> {
        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;
        let order = transfer_order::lock_order_tx(&mut tx, order_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Transfer order {order_id}")))?;

        let from = order.status;
        if !from.can_transition_to(to) {
            return Err(AppError::IllegalTransition {
                current: from,
                requested: to,
                reason: "Not a permitted move".to_string(),
            });
        }
        if to == TransferStatus::Shipped
            && order.carrier.as_deref().is_none_or(|c| c.trim().is_empty())
        {
            return Err(AppError::IllegalTransition {
                current: from,
                requested: to,
                reason: "A carrier must be set before shipping".to_string(),
            });
        }

        if to == TransferStatus::Cancelled {
            // The reservations were created by this engine; cancellation
            // hands the stock back.
            for released in assignment::delete_all_assignments_tx(&mut tx, order_id).await? {
                ledger::release_reservation_tx(&mut tx, released.lot_id, released.quantity)
                    .await?;
            }
        }

        let updated = transfer_order::set_status_tx(&mut tx, order_id, to).await?;
        transfer_order::insert_event_tx(&mut tx, order_id, from, to, via_scan, actor).await?;

        // Scan progress for the stage just left is spent.
        if let Some(stage) = from.active_scan_stage() {
            db::scan_session::clear_stage_tx(&mut tx, order_id, stage).await?;
        }

        tx.commit().await.map_err(RepositoryError::from)?;
        info!(
            order_id = %order_id,
            from = %from,
            to = %to,
            via_scan,
            "Transfer order transitioned"
        );
        Ok(updated)
    }
}

/// Assignments can only change while the order is Pending or Approved.
fn require_assignable(order: &TransferOrder) -> Result<(), AppError> {
    match order.status {
        TransferStatus::Pending | TransferStatus::Approved => Ok(()),
        other => Err(AppError::validation(format!(
            "Order is {other}; assignments can only change while pending or approved"
        ))),
    }
}

/// Loadout rebinding only applies to loadout-restock orders; a
/// general-delivery order has no loadout for the header to carry.
fn require_loadout_restock(order: &TransferOrder) -> Result<(), AppError> {
    if order.destination_mode == DestinationMode::LoadoutRestock {
        Ok(())
    } else {
        Err(AppError::validation(
            "Only loadout-restock orders can be rebound to a loadout",
        ))
    }
}

/// Whether an auto-assign pass should leave a line alone, and why.
///
/// A second pass over an already-assigned line reports
/// `AlreadyAssigned` rather than stacking further assignments, so
/// repeated passes leave the ledger unchanged.
fn line_skip(
    kind: OrderLineKind,
    index: usize,
    assigned: Decimal,
    remaining: Decimal,
) -> Option<SkipReason> {
    if kind == OrderLineKind::Manual {
        return Some(SkipReason::ManualLine);
    }
    if index >= AUTO_ASSIGN_LINE_CAP {
        return Some(SkipReason::LineCapReached);
    }
    if assigned > Decimal::ZERO {
        return Some(SkipReason::AlreadyAssigned);
    }
    if remaining <= Decimal::ZERO {
        return Some(SkipReason::NothingRemaining);
    }
    None
}

/// Reject a manual assignment that would take a line past its demand.
fn check_within_demand(
    order_line_id: OrderLineId,
    requested: Decimal,
    remaining: Decimal,
) -> Result<(), AppError> {
    if requested > remaining {
        return Err(InvariantViolation::AssignmentExceedsDemand {
            order_line_id,
            requested,
            remaining,
        }
        .into());
    }
    Ok(())
}

/// Line records rebuilt from a blueprint at default quantities.
///
/// Lines defaulting to zero are omitted; positions continue from
/// `position`, after the order's surviving lines.
fn blueprint_line_records(lines: &[BlueprintLine], mut position: i32) -> Vec<NewLineRecord> {
    let mut records = Vec::with_capacity(lines.len());
    for line in lines {
        if line.default_quantity <= Decimal::ZERO {
            continue;
        }
        records.push(NewLineRecord {
            kind: OrderLineKind::Blueprint,
            blueprint_line_id: Some(line.id),
            product_id: line.product_id,
            required_quantity: line.default_quantity,
            position,
        });
        position += 1;
    }
    records
}

fn skipped(line: &OrderLine, reason: SkipReason) -> LineOutcome {
    skipped_with_unfilled(line, reason, Decimal::ZERO)
}

fn skipped_with_unfilled(line: &OrderLine, reason: SkipReason, unfilled: Decimal) -> LineOutcome {
    LineOutcome {
        order_line_id: line.id,
        committed: Decimal::ZERO,
        unfilled,
        skipped: Some(reason),
        stale_declared: Vec::new(),
    }
}

/// Human-facing order reference, e.g. `TO-9F2C41AB`.
fn generate_reference() -> String {
    let raw = Uuid::new_v4().simple().to_string();
    format!("TO-{}", raw[..8].to_ascii_uppercase())
}

/// First free position after the order's surviving (manual) lines.
fn next_position(lines: &[OrderLine]) -> i32 {
    lines.iter().map(|l| l.position + 1).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use stockflow_core::{
        BlueprintId, BlueprintLineId, LocationId, ProductId, TransferPriority,
    };

    use super::*;

    fn order_with_mode(mode: DestinationMode) -> TransferOrder {
        TransferOrder {
            id: TransferOrderId::new(1),
            reference: "TO-TEST0001".to_string(),
            origin_location_id: LocationId::new(1),
            destination_location_id: LocationId::new(2),
            destination_mode: mode,
            destination_loadout_id: None,
            blueprint_id: None,
            priority: TransferPriority::Medium,
            status: TransferStatus::Pending,
            requested_date: None,
            reason: None,
            notes: None,
            carrier: None,
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

    fn blueprint_line(id: i32, product: i32, default: i64) -> BlueprintLine {
        BlueprintLine {
            id: BlueprintLineId::new(id),
            blueprint_id: BlueprintId::new(1),
            product_id: ProductId::new(product),
            minimum_quantity: Decimal::ZERO,
            maximum_quantity: Decimal::from(default.max(1) * 2),
            default_quantity: Decimal::from(default),
            usage_notes: None,
            position: id,
        }
    }

    #[test]
    fn test_manual_lines_are_never_auto_assigned() {
        assert_eq!(
            line_skip(OrderLineKind::Manual, 0, Decimal::ZERO, Decimal::from(5)),
            Some(SkipReason::ManualLine)
        );
    }

    #[test]
    fn test_lines_past_the_cap_are_skipped() {
        assert_eq!(
            line_skip(
                OrderLineKind::Blueprint,
                AUTO_ASSIGN_LINE_CAP,
                Decimal::ZERO,
                Decimal::from(5)
            ),
            Some(SkipReason::LineCapReached)
        );
    }

    #[test]
    fn test_repeated_passes_leave_assigned_lines_alone() {
        // First pass assigns; a second pass over the same line sees the
        // existing assignment and stacks nothing on top.
        let first = line_skip(OrderLineKind::Blueprint, 0, Decimal::ZERO, Decimal::from(5));
        assert_eq!(first, None);
        let second = line_skip(OrderLineKind::Blueprint, 0, Decimal::from(5), Decimal::ZERO);
        assert_eq!(second, Some(SkipReason::AlreadyAssigned));
        // Partial fills are also left alone rather than topped up.
        let partial = line_skip(OrderLineKind::Blueprint, 0, Decimal::from(2), Decimal::from(3));
        assert_eq!(partial, Some(SkipReason::AlreadyAssigned));
    }

    #[test]
    fn test_lines_with_no_remaining_demand_are_skipped() {
        assert_eq!(
            line_skip(OrderLineKind::Blueprint, 0, Decimal::ZERO, Decimal::ZERO),
            Some(SkipReason::NothingRemaining)
        );
    }

    #[test]
    fn test_assignment_over_remaining_demand_is_rejected() {
        let line_id = OrderLineId::new(7);
        let err = check_within_demand(line_id, Decimal::from(6), Decimal::from(5))
            .expect_err("over-demand assignment must be rejected");
        match err {
            AppError::Invariant(InvariantViolation::AssignmentExceedsDemand {
                order_line_id,
                requested,
                remaining,
            }) => {
                assert_eq!(order_line_id, line_id);
                assert_eq!(requested, Decimal::from(6));
                assert_eq!(remaining, Decimal::from(5));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_assignment_up_to_remaining_demand_is_accepted() {
        let line_id = OrderLineId::new(7);
        assert!(check_within_demand(line_id, Decimal::from(5), Decimal::from(5)).is_ok());
        assert!(check_within_demand(line_id, Decimal::from(1), Decimal::from(5)).is_ok());
    }

    #[test]
    fn test_loadout_rebind_requires_loadout_restock_mode() {
        let general = order_with_mode(DestinationMode::GeneralDelivery);
        assert!(matches!(
            require_loadout_restock(&general),
            Err(AppError::Validation(_))
        ));
        let restock = order_with_mode(DestinationMode::LoadoutRestock);
        assert!(require_loadout_restock(&restock).is_ok());
    }

    #[test]
    fn test_rebuilt_lines_use_defaults_and_sequential_positions() {
        let lines = vec![
            blueprint_line(1, 10, 4),
            blueprint_line(2, 11, 0),
            blueprint_line(3, 12, 2),
        ];
        let records = blueprint_line_records(&lines, 5);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].blueprint_line_id, Some(BlueprintLineId::new(1)));
        assert_eq!(records[0].required_quantity, Decimal::from(4));
        assert_eq!(records[0].position, 5);
        assert_eq!(records[0].kind, OrderLineKind::Blueprint);
        assert_eq!(records[1].blueprint_line_id, Some(BlueprintLineId::new(3)));
        assert_eq!(records[1].required_quantity, Decimal::from(2));
        assert_eq!(records[1].position, 6);
    }

    #[test]
    fn reference_has_expected_shape() {
        let reference = generate_reference();
        assert!(reference.starts_with("TO-"));
        assert_eq!(reference.len(), 11);
        assert!(
            reference[3..]
                .chars()
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn references_are_unique_enough() {
        let a = generate_reference();
        let b = generate_reference();
        assert_ne!(a, b);
    }
}
