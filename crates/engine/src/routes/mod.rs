//! HTTP route handlers for the fulfillment engine.
//!
//! # Route Structure
//!
//! ```text
//! # Transfer orders
//! POST   /api/transfers                 - Create order
//! GET    /api/transfers                 - List orders (filterable)
//! GET    /api/transfers/:id             - Order with lines and assignments
//! PATCH  /api/transfers/:id             - Patch mutable fields
//! POST   /api/transfers/:id/transition  - Move through the state machine
//!
//! # Assignment
//! POST   /api/transfers/:id/auto-assign                    - Batch auto-assign
//! GET    /api/transfers/:id/lines/:line_id/candidates      - Ranked candidate lots
//! POST   /api/transfers/:id/lines/:line_id/assignments     - Manual assign
//! DELETE /api/transfers/:id/assignments/:assignment_id     - Unassign
//! POST   /api/transfers/:id/reassign-loadout               - Rebind destination loadout
//!
//! # Scan reconciliation
//! GET    /api/transfers/:id/scan        - Session progress for the active stage
//! POST   /api/transfers/:id/scan        - Submit one scanned token
//! ```

pub mod assignments;
pub mod scans;
pub mod transfers;

use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

/// Build the engine's API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/transfers",
            post(transfers::create_transfer).get(transfers::list_transfers),
        )
        .route(
            "/api/transfers/{id}",
            get(transfers::get_transfer).patch(transfers::update_transfer),
        )
        .route(
            "/api/transfers/{id}/transition",
            post(transfers::transition_transfer),
        )
        .route(
            "/api/transfers/{id}/auto-assign",
            post(assignments::auto_assign),
        )
        .route(
            "/api/transfers/{id}/lines/{line_id}/candidates",
            get(assignments::candidates),
        )
        .route(
            "/api/transfers/{id}/lines/{line_id}/assignments",
            post(assignments::create_assignment),
        )
        .route(
            "/api/transfers/{id}/assignments/{assignment_id}",
            delete(assignments::delete_assignment),
        )
        .route(
            "/api/transfers/{id}/reassign-loadout",
            post(assignments::reassign_loadout),
        )
        .route(
            "/api/transfers/{id}/scan",
            get(scans::get_progress).post(scans::submit_token),
        )
}
