//! Scan reconciliation domain models.
//!
//! [`ScanBoard`] is the pure, in-memory view of one order's scan session
//! for one stage: which lines are expected, which are confirmed, and which
//! line currently has focus. Persistence (loading and saving confirmation
//! rows) lives in the scan-session repository; everything here is
//! side-effect free and unit-testable.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockflow_core::{OrderLineId, ScanStage};

/// One order line as the scanner expects to see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpectedLine {
    /// Order line being confirmed.
    pub order_line_id: OrderLineId,
    /// Product SKU; always an accepted token.
    pub sku: String,
    /// Product GTIN, when the catalog has one.
    pub gtin: Option<String>,
    /// Lot numbers committed to this line; each is an accepted token.
    pub lot_numbers: Vec<String>,
    /// Product name, for operator display.
    pub product_name: String,
    /// Quantity the operator should handle.
    pub quantity: Decimal,
    /// Whether this line has been confirmed.
    pub confirmed: bool,
}

impl ExpectedLine {
    /// Whether a scanned token identifies this line.
    ///
    /// Accepts SKU, GTIN, or any assigned lot number, case-insensitively
    /// and ignoring surrounding whitespace.
    #[must_use]
    pub fn matches_token(&self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() {
            return false;
        }
        if self.sku.eq_ignore_ascii_case(token) {
            return true;
        }
        if self.gtin.as_deref().is_some_and(|g| g.eq_ignore_ascii_case(token)) {
            return true;
        }
        self.lot_numbers.iter().any(|n| n.eq_ignore_ascii_case(token))
    }
}

/// Outcome of submitting one scanned token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanOutcome {
    /// Line the token confirmed.
    pub confirmed_line_id: OrderLineId,
    /// Line now holding focus, if any remain unconfirmed.
    pub next_line_id: Option<OrderLineId>,
    /// Whether every expected line is now confirmed.
    pub stage_complete: bool,
}

/// The in-memory scan session for one order and stage.
#[derive(Debug, Clone)]
pub struct ScanBoard {
    stage: ScanStage,
    lines: Vec<ExpectedLine>,
}

impl ScanBoard {
    /// Build a board from expected lines, in pick-list order.
    #[must_use]
    pub const fn new(stage: ScanStage, lines: Vec<ExpectedLine>) -> Self {
        Self { stage, lines }
    }

    /// The stage this board applies to.
    #[must_use]
    pub const fn stage(&self) -> ScanStage {
        self.stage
    }

    /// All expected lines, in order.
    #[must_use]
    pub fn lines(&self) -> &[ExpectedLine] {
        &self.lines
    }

    /// The currently-focused line: the first unconfirmed one.
    #[must_use]
    pub fn focused(&self) -> Option<&ExpectedLine> {
        self.lines.iter().find(|l| !l.confirmed)
    }

    /// Whether every expected line is confirmed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.lines.iter().all(|l| l.confirmed)
    }

    /// Lines still awaiting confirmation.
    #[must_use]
    pub fn unconfirmed(&self) -> Vec<OrderLineId> {
        self.lines
            .iter()
            .filter(|l| !l.confirmed)
            .map(|l| l.order_line_id)
            .collect()
    }

    /// Submit one scanned token against the focused line.
    ///
    /// A match confirms the line and advances focus; a mismatch leaves the
    /// board untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ScanMismatch`] when the token does not identify the
    /// focused line, or when no line remains unconfirmed.
    pub fn confirm(&mut self, token: &str) -> Result<ScanOutcome, ScanMismatch> {
        let Some(focused) = self.lines.iter_mut().find(|l| !l.confirmed) else {
            return Err(ScanMismatch::NothingExpected);
        };
        if !focused.matches_token(token) {
            return Err(ScanMismatch::TokenMismatch {
                token: token.trim().to_string(),
                expected_line_id: focused.order_line_id,
            });
        }
        focused.confirmed = true;
        let confirmed_line_id = focused.order_line_id;
        let next_line_id = self.focused().map(|l| l.order_line_id);
        Ok(ScanOutcome {
            confirmed_line_id,
            next_line_id,
            stage_complete: self.is_complete(),
        })
    }
}

/// A rejected scan; transient, no session state was changed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanMismatch {
    /// Token does not identify the focused line.
    #[error("scanned token {token:?} does not match the expected line {expected_line_id}")]
    TokenMismatch {
        token: String,
        expected_line_id: OrderLineId,
    },

    /// Every line is already confirmed.
    #[error("no unconfirmed line remains in this stage")]
    NothingExpected,
}

/// Persisted progress summary for one order and stage.
#[derive(Debug, Clone, Serialize)]
pub struct ScanProgress {
    /// Stage the session applies to.
    pub stage: ScanStage,
    /// Expected lines, in order, with confirmation flags.
    pub lines: Vec<ExpectedLine>,
    /// Currently-focused line, if any.
    pub focused_line_id: Option<OrderLineId>,
    /// Whether every line is confirmed.
    pub complete: bool,
    /// Whether the forward transition is ready (for shipping this also
    /// requires a carrier on the order).
    pub ready_to_transition: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(id: i32, sku: &str, lots: &[&str]) -> ExpectedLine {
        ExpectedLine {
            order_line_id: OrderLineId::new(id),
            sku: sku.to_string(),
            gtin: Some(format!("0{sku}9")),
            lot_numbers: lots.iter().map(ToString::to_string).collect(),
            product_name: format!("Product {sku}"),
            quantity: Decimal::from(1),
            confirmed: false,
        }
    }

    #[test]
    fn test_token_matching_accepts_sku_gtin_and_lot() {
        let l = line(1, "SKU-100", &["LOT-7"]);
        assert!(l.matches_token("SKU-100"));
        assert!(l.matches_token("sku-100 "));
        assert!(l.matches_token("0SKU-1009"));
        assert!(l.matches_token("lot-7"));
        assert!(!l.matches_token("SKU-200"));
        assert!(!l.matches_token(""));
    }

    #[test]
    fn test_confirming_all_lines_completes_stage() {
        let mut board = ScanBoard::new(
            ScanStage::Picking,
            vec![line(1, "A", &["L1"]), line(2, "B", &["L2"])],
        );
        let first = board.confirm("A").unwrap();
        assert_eq!(first.confirmed_line_id, OrderLineId::new(1));
        assert_eq!(first.next_line_id, Some(OrderLineId::new(2)));
        assert!(!first.stage_complete);

        let second = board.confirm("L2").unwrap();
        assert!(second.stage_complete);
        assert!(board.is_complete());
        assert!(board.unconfirmed().is_empty());
    }

    #[test]
    fn test_partial_confirmation_reports_difference() {
        let mut board = ScanBoard::new(
            ScanStage::Packing,
            vec![line(1, "A", &[]), line(2, "B", &[]), line(3, "C", &[])],
        );
        board.confirm("A").unwrap();
        assert!(!board.is_complete());
        assert_eq!(
            board.unconfirmed(),
            vec![OrderLineId::new(2), OrderLineId::new(3)]
        );
    }

    #[test]
    fn test_mismatch_mutates_nothing() {
        let mut board = ScanBoard::new(ScanStage::Picking, vec![line(1, "A", &["L1"])]);
        let err = board.confirm("WRONG").unwrap_err();
        assert!(matches!(err, ScanMismatch::TokenMismatch { .. }));
        assert!(!board.is_complete());
        assert_eq!(board.focused().unwrap().order_line_id, OrderLineId::new(1));
    }

    #[test]
    fn test_focus_targets_first_unconfirmed_line() {
        let mut board = ScanBoard::new(
            ScanStage::Picking,
            vec![line(1, "A", &[]), line(2, "B", &[])],
        );
        // Token for line 2 while line 1 has focus is a mismatch
        let err = board.confirm("B").unwrap_err();
        assert!(matches!(err, ScanMismatch::TokenMismatch { .. }));
        board.confirm("A").unwrap();
        board.confirm("B").unwrap();
        let err = board.confirm("B").unwrap_err();
        assert_eq!(err, ScanMismatch::NothingExpected);
    }
}
