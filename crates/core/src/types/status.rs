//! Status enums and the pure transfer-order state machine.
//!
//! The transition table lives here, away from any I/O, so the same rules
//! apply whether a transition is driven by scan completion or by an
//! operator override. Precondition checks that need order fields (for
//! example the carrier requirement before `Shipped`) belong to the engine
//! service layer.

use serde::{Deserialize, Serialize};

/// Lifecycle status of a transfer order.
///
/// Forward transitions never skip a stage and never regress. `Cancelled`
/// is reachable only from `Pending` and `Approved`. `Completed` and
/// `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "wms.transfer_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TransferStatus {
    #[default]
    Pending,
    Approved,
    Picked,
    Packed,
    Shipped,
    Received,
    Completed,
    Cancelled,
}

impl TransferStatus {
    /// The next forward stage, if any.
    #[must_use]
    pub const fn successor(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Approved),
            Self::Approved => Some(Self::Picked),
            Self::Picked => Some(Self::Packed),
            Self::Packed => Some(Self::Shipped),
            Self::Shipped => Some(Self::Received),
            Self::Received => Some(Self::Completed),
            Self::Completed | Self::Cancelled => None,
        }
    }

    /// Whether a transition from `self` to `to` is legal.
    ///
    /// Cancellation is only legal before picking starts. Everything else
    /// must follow the forward chain one stage at a time.
    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        if to == Self::Cancelled {
            return matches!(self, Self::Pending | Self::Approved);
        }
        self.successor() == Some(to)
    }

    /// Whether no further transitions are defined out of this status.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// The scan workflow stage active while an order sits in this status.
    ///
    /// Picking runs while `Approved`, packing while `Picked`, shipping
    /// while `Packed`. Other statuses have no scan workflow.
    #[must_use]
    pub const fn active_scan_stage(self) -> Option<ScanStage> {
        match self {
            Self::Approved => Some(ScanStage::Picking),
            Self::Picked => Some(ScanStage::Packing),
            Self::Packed => Some(ScanStage::Shipping),
            _ => None,
        }
    }

    /// Lowercase wire name, matching the database enum labels.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Picked => "picked",
            Self::Packed => "packed",
            Self::Shipped => "shipped",
            Self::Received => "received",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for TransferStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scan workflow stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "wms.scan_stage", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ScanStage {
    Picking,
    Packing,
    Shipping,
}

impl ScanStage {
    /// The status an order moves to when this stage's scan completes.
    #[must_use]
    pub const fn completion_status(self) -> TransferStatus {
        match self {
            Self::Picking => TransferStatus::Picked,
            Self::Packing => TransferStatus::Packed,
            Self::Shipping => TransferStatus::Shipped,
        }
    }
}

/// How the destination receives transferred inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "wms.destination_mode", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DestinationMode {
    /// Delivered to the destination location's general stock.
    #[default]
    GeneralDelivery,
    /// Restocks a specific loadout at the destination location.
    LoadoutRestock,
}

/// Operator-facing priority of a transfer order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "wms.transfer_priority", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TransferPriority {
    Low,
    #[default]
    Medium,
    High,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_chain_is_single_step() {
        use TransferStatus::*;
        let chain = [Pending, Approved, Picked, Packed, Shipped, Received, Completed];
        for pair in chain.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{} -> {}", pair[0], pair[1]);
        }
        // Skipping a stage is never legal
        assert!(!Pending.can_transition_to(Picked));
        assert!(!Approved.can_transition_to(Packed));
        assert!(!Picked.can_transition_to(Shipped));
    }

    #[test]
    fn test_no_regression() {
        use TransferStatus::*;
        assert!(!Approved.can_transition_to(Pending));
        assert!(!Packed.can_transition_to(Picked));
        assert!(!Received.can_transition_to(Shipped));
    }

    #[test]
    fn test_cancellation_window() {
        use TransferStatus::*;
        assert!(Pending.can_transition_to(Cancelled));
        assert!(Approved.can_transition_to(Cancelled));
        for from in [Picked, Packed, Shipped, Received, Completed, Cancelled] {
            assert!(!from.can_transition_to(Cancelled), "{from} -> cancelled");
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        use TransferStatus::*;
        let all = [
            Pending, Approved, Picked, Packed, Shipped, Received, Completed, Cancelled,
        ];
        for from in [Completed, Cancelled] {
            assert!(from.is_terminal());
            assert_eq!(from.successor(), None);
            for to in all {
                assert!(!from.can_transition_to(to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_scan_stage_mapping() {
        assert_eq!(
            TransferStatus::Approved.active_scan_stage(),
            Some(ScanStage::Picking)
        );
        assert_eq!(
            TransferStatus::Picked.active_scan_stage(),
            Some(ScanStage::Packing)
        );
        assert_eq!(
            TransferStatus::Packed.active_scan_stage(),
            Some(ScanStage::Shipping)
        );
        assert_eq!(TransferStatus::Pending.active_scan_stage(), None);
        assert_eq!(TransferStatus::Shipped.active_scan_stage(), None);
    }

    #[test]
    fn test_scan_completion_lines_up_with_transitions() {
        for stage in [ScanStage::Picking, ScanStage::Packing, ScanStage::Shipping] {
            let target = stage.completion_status();
            // Completing a stage enables exactly the forward transition
            // from the status in which that stage runs.
            let from = match stage {
                ScanStage::Picking => TransferStatus::Approved,
                ScanStage::Packing => TransferStatus::Picked,
                ScanStage::Shipping => TransferStatus::Packed,
            };
            assert!(from.can_transition_to(target));
        }
    }

    #[test]
    fn test_priority_ordering() {
        assert!(TransferPriority::Low < TransferPriority::Medium);
        assert!(TransferPriority::Medium < TransferPriority::High);
    }

    #[test]
    fn test_status_serde_snake_case() {
        let json = serde_json::to_string(&TransferStatus::Packed).unwrap();
        assert_eq!(json, "\"packed\"");
        let back: TransferStatus = serde_json::from_str("\"picked\"").unwrap();
        assert_eq!(back, TransferStatus::Picked);
    }
}
