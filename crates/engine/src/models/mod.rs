//! Domain models for the transfer fulfillment engine.

pub mod assignment;
pub mod blueprint;
pub mod scan;
pub mod transfer_order;

pub use assignment::{AssignmentLine, CandidateLot, NewAssignment};
pub use blueprint::{BlueprintLine, DeclaredLot};
pub use scan::{ExpectedLine, ScanBoard, ScanMismatch, ScanOutcome, ScanProgress};
pub use transfer_order::{
    CreateManualLineInput, CreateTransferOrderInput, LineOverrideInput, OrderLine, OrderLineKind,
    OrderLineWithProgress, TransferFilter, TransferOrder, UpdateTransferOrderInput,
};
