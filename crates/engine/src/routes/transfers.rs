//! Transfer order CRUD and transition routes.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use stockflow_core::{OperatorId, TransferOrderId, TransferStatus};

use crate::error::AppError;
use crate::models::{CreateTransferOrderInput, TransferFilter, TransferOrder, UpdateTransferOrderInput};
use crate::services::fulfillment::TransferDetail;
use crate::state::AppState;

/// Request body for creating a transfer order.
#[derive(Debug, Deserialize)]
pub struct CreateTransferRequest {
    #[serde(flatten)]
    pub input: CreateTransferOrderInput,
    /// Operator creating the order, when known.
    pub actor_id: Option<OperatorId>,
}

/// Create a transfer order.
///
/// POST /api/transfers
///
/// # Errors
///
/// Returns `AppError` on validation or invariant failures.
pub async fn create_transfer(
    State(state): State<AppState>,
    Json(request): Json<CreateTransferRequest>,
) -> Result<Json<TransferDetail>, AppError> {
    let detail = state
        .fulfillment()
        .create_order(request.input, request.actor_id)
        .await?;
    Ok(Json(detail))
}

/// List transfer orders.
///
/// GET /api/transfers
///
/// # Errors
///
/// Returns `AppError::Database` if the query fails.
pub async fn list_transfers(
    State(state): State<AppState>,
    Query(filter): Query<TransferFilter>,
) -> Result<Json<Vec<TransferOrder>>, AppError> {
    Ok(Json(state.fulfillment().list(&filter).await?))
}

/// Fetch one order with lines and assignments.
///
/// GET /api/transfers/:id
///
/// # Errors
///
/// Returns `AppError::NotFound` if the order doesn't exist.
pub async fn get_transfer(
    State(state): State<AppState>,
    Path(id): Path<TransferOrderId>,
) -> Result<Json<TransferDetail>, AppError> {
    Ok(Json(state.fulfillment().detail(id).await?))
}

/// Patch an order's mutable fields.
///
/// PATCH /api/transfers/:id
///
/// # Errors
///
/// Returns `AppError::NotFound` if the order doesn't exist,
/// `AppError::Validation` if it is terminal.
pub async fn update_transfer(
    State(state): State<AppState>,
    Path(id): Path<TransferOrderId>,
    Json(input): Json<UpdateTransferOrderInput>,
) -> Result<Json<TransferOrder>, AppError> {
    Ok(Json(state.fulfillment().update(id, &input).await?))
}

/// Request body for a status transition.
#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    /// Target status.
    pub status: TransferStatus,
    /// Whether the move was driven by scan completion.
    #[serde(default)]
    pub via_scan: bool,
    /// Operator performing the move, when known.
    pub actor_id: Option<OperatorId>,
}

/// Move an order through the state machine.
///
/// POST /api/transfers/:id/transition
///
/// # Errors
///
/// Returns `AppError::IllegalTransition` when the move is not permitted.
pub async fn transition_transfer(
    State(state): State<AppState>,
    Path(id): Path<TransferOrderId>,
    Json(request): Json<TransitionRequest>,
) -> Result<Json<TransferOrder>, AppError> {
    let order = state
        .fulfillment()
        .transition(id, request.status, request.via_scan, request.actor_id)
        .await?;
    Ok(Json(order))
}
