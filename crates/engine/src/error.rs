//! Unified error handling for the fulfillment engine.
//!
//! Error taxonomy:
//! - `Validation` - missing/invalid input, rejected before any state change
//! - `InvariantViolation` - an assignment would exceed demand or availability;
//!   rejected with no partial write
//! - `IllegalTransition` - status transition not permitted from the current
//!   state, or a precondition (e.g. missing carrier) unmet; the current state
//!   is surfaced so the caller can reconcile
//! - transient per-line lookup failures during auto-assign are NOT errors;
//!   they are skipped and reported in the batch summary

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde_json::json;
use thiserror::Error;

use stockflow_core::{InventoryLotId, OrderLineId, TransferStatus};

use crate::db::RepositoryError;

/// An assignment that would break a ledger invariant.
///
/// Rejected atomically; no partial write occurs.
#[derive(Debug, Clone, Error)]
pub enum InvariantViolation {
    /// The quantity exceeds the line's remaining demand.
    #[error(
        "assignment of {requested} to line {order_line_id} exceeds remaining demand {remaining}"
    )]
    AssignmentExceedsDemand {
        order_line_id: OrderLineId,
        requested: Decimal,
        remaining: Decimal,
    },

    /// The quantity exceeds the lot's available quantity.
    #[error("lot {lot_id} has {available} available, cannot commit {requested}")]
    InsufficientAvailability {
        lot_id: InventoryLotId,
        requested: Decimal,
        available: Decimal,
    },
}

/// Application-level error type for the engine.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Invalid input, rejected before any state change.
    #[error("Validation error: {0}")]
    Validation(String),

    /// An assignment would exceed demand or availability.
    #[error("Invariant violation: {0}")]
    Invariant(#[from] InvariantViolation),

    /// Status transition not permitted from the current state.
    #[error("Illegal transition from {current} to {requested}: {reason}")]
    IllegalTransition {
        current: TransferStatus,
        requested: TransferStatus,
        reason: String,
    },

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convenience constructor for validation failures.
    #[must_use]
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log server errors with Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Engine request error"
            );
        }

        let status = match &self {
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Invariant(_) | Self::IllegalTransition { .. } => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
        };

        // Don't expose internal error details to clients
        let body = match &self {
            Self::Database(_) | Self::Internal(_) => json!({
                "error": "internal_error",
                "message": "Internal server error",
            }),
            Self::Validation(msg) => json!({
                "error": "validation_error",
                "message": msg,
            }),
            Self::Invariant(violation) => json!({
                "error": match violation {
                    InvariantViolation::AssignmentExceedsDemand { .. } => {
                        "assignment_exceeds_demand"
                    }
                    InvariantViolation::InsufficientAvailability { .. } => {
                        "insufficient_availability"
                    }
                },
                "message": violation.to_string(),
            }),
            Self::IllegalTransition { current, requested, reason } => json!({
                "error": "illegal_transition",
                "message": self.to_string(),
                "current_status": current,
                "requested_status": requested,
                "reason": reason,
            }),
            Self::NotFound(msg) => json!({
                "error": "not_found",
                "message": msg,
            }),
        };

        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(RepositoryError::Database(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("transfer order 123".to_string());
        assert_eq!(err.to_string(), "Not found: transfer order 123");

        let err = AppError::validation("missing origin location");
        assert_eq!(err.to_string(), "Validation error: missing origin location");
    }

    #[test]
    fn test_invariant_violation_display() {
        let err = InvariantViolation::InsufficientAvailability {
            lot_id: InventoryLotId::new(9),
            requested: Decimal::from(5),
            available: Decimal::from(3),
        };
        assert_eq!(err.to_string(), "lot 9 has 3 available, cannot commit 5");
    }

    #[test]
    fn test_app_error_status_codes() {
        fn get_status(err: AppError) -> StatusCode {
            err.into_response().status()
        }

        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::validation("test")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Invariant(
                InvariantViolation::AssignmentExceedsDemand {
                    order_line_id: OrderLineId::new(1),
                    requested: Decimal::from(5),
                    remaining: Decimal::from(3),
                }
            )),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::IllegalTransition {
                current: TransferStatus::Completed,
                requested: TransferStatus::Pending,
                reason: "terminal state".to_string(),
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
