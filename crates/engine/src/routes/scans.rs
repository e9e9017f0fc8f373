//! Scan reconciliation routes.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use stockflow_core::{OperatorId, TransferOrderId};

use crate::error::AppError;
use crate::models::scan::ScanProgress;
use crate::services::scan::ScanSubmission;
use crate::state::AppState;

/// Session progress for the order's active stage.
///
/// GET /api/transfers/:id/scan
///
/// # Errors
///
/// Returns `AppError::Validation` when the order's status has no scan
/// stage.
pub async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<TransferOrderId>,
) -> Result<Json<ScanProgress>, AppError> {
    Ok(Json(state.scan().progress(id).await?))
}

/// Request body for a scanned token.
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    /// Raw token as scanned.
    pub token: String,
    /// Operator scanning, when known.
    pub actor_id: Option<OperatorId>,
}

/// Submit one scanned token against the focused line.
///
/// POST /api/transfers/:id/scan
///
/// # Errors
///
/// Returns `AppError::Validation` on a token mismatch; nothing changes.
pub async fn submit_token(
    State(state): State<AppState>,
    Path(id): Path<TransferOrderId>,
    Json(request): Json<ScanRequest>,
) -> Result<Json<ScanSubmission>, AppError> {
    Ok(Json(
        state
            .scan()
            .submit(id, &request.token, request.actor_id)
            .await?,
    ))
}
