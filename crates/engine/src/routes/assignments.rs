//! Assignment routes: auto-assign, candidates, manual assign/unassign,
//! loadout reassignment.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use rust_decimal::Decimal;
use serde::Deserialize;

use stockflow_core::{
    AssignmentLineId, InventoryLotId, LoadoutId, OperatorId, OrderLineId, TransferOrderId,
};

use crate::error::AppError;
use crate::models::{AssignmentLine, CandidateLot, NewAssignment};
use crate::services::fulfillment::{AutoAssignReport, TransferDetail};
use crate::state::AppState;

/// Request body for an auto-assign pass.
#[derive(Debug, Default, Deserialize)]
pub struct AutoAssignRequest {
    /// Operator running the pass, when known.
    pub actor_id: Option<OperatorId>,
}

/// Auto-assign lots to every eligible blueprint-bound line.
///
/// POST /api/transfers/:id/auto-assign
///
/// # Errors
///
/// Returns `AppError::Validation` unless the order is Pending or Approved.
pub async fn auto_assign(
    State(state): State<AppState>,
    Path(id): Path<TransferOrderId>,
    request: Option<Json<AutoAssignRequest>>,
) -> Result<Json<AutoAssignReport>, AppError> {
    let actor = request.and_then(|Json(r)| r.actor_id);
    Ok(Json(state.fulfillment().auto_assign(id, actor).await?))
}

/// Ranked candidate lots for one line.
///
/// GET /api/transfers/:id/lines/:line_id/candidates
///
/// # Errors
///
/// Returns `AppError::NotFound` if the order or line doesn't exist.
pub async fn candidates(
    State(state): State<AppState>,
    Path((id, line_id)): Path<(TransferOrderId, OrderLineId)>,
) -> Result<Json<Vec<CandidateLot>>, AppError> {
    Ok(Json(state.fulfillment().candidates(id, line_id).await?))
}

/// Request body for a manual assignment.
#[derive(Debug, Deserialize)]
pub struct CreateAssignmentRequest {
    /// Lot to commit against.
    pub lot_id: InventoryLotId,
    /// Quantity to commit.
    pub quantity: Decimal,
    /// Operator committing it, when known.
    pub actor_id: Option<OperatorId>,
}

/// Manually assign a lot quantity to a line.
///
/// POST /api/transfers/:id/lines/:line_id/assignments
///
/// # Errors
///
/// Returns `AppError::Invariant` when the quantity exceeds remaining
/// demand or lot availability.
pub async fn create_assignment(
    State(state): State<AppState>,
    Path((id, line_id)): Path<(TransferOrderId, OrderLineId)>,
    Json(request): Json<CreateAssignmentRequest>,
) -> Result<(StatusCode, Json<AssignmentLine>), AppError> {
    let assignment = state
        .fulfillment()
        .assign(
            id,
            line_id,
            &NewAssignment {
                lot_id: request.lot_id,
                quantity: request.quantity,
            },
            request.actor_id,
        )
        .await?;
    Ok((StatusCode::CREATED, Json(assignment)))
}

/// Remove an assignment, releasing its lot reservation.
///
/// DELETE /api/transfers/:id/assignments/:assignment_id
///
/// # Errors
///
/// Returns `AppError::NotFound` if the assignment doesn't belong to the
/// order.
pub async fn delete_assignment(
    State(state): State<AppState>,
    Path((id, assignment_id)): Path<(TransferOrderId, AssignmentLineId)>,
) -> Result<StatusCode, AppError> {
    state.fulfillment().unassign(id, assignment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Request body for loadout reassignment.
#[derive(Debug, Deserialize)]
pub struct ReassignLoadoutRequest {
    /// Loadout to rebind the order to.
    pub loadout_id: LoadoutId,
}

/// Rebind an order to a different destination loadout.
///
/// POST /api/transfers/:id/reassign-loadout
///
/// # Errors
///
/// Returns `AppError::Validation` outside Pending/Approved.
pub async fn reassign_loadout(
    State(state): State<AppState>,
    Path(id): Path<TransferOrderId>,
    Json(request): Json<ReassignLoadoutRequest>,
) -> Result<Json<TransferDetail>, AppError> {
    Ok(Json(
        state
            .fulfillment()
            .reassign_loadout(id, request.loadout_id)
            .await?,
    ))
}
