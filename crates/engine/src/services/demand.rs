//! Demand computation for blueprint-bound order lines.
//!
//! Pure math, side-effect free: required quantities are fixed when a line
//! is created, and remaining demand is `required - assigned`, floored at
//! zero. Assigned sums are read from the assignment ledger inside the
//! same transaction as any subsequent commit.

use rust_decimal::Decimal;

use crate::models::BlueprintLine;

/// The quantity a new order line requires from a blueprint line.
///
/// The per-order `override_quantity` is honoured only when the blueprint
/// permits overrides, and is clamped to the line's `[minimum, maximum]`
/// range; otherwise the template default applies.
#[must_use]
pub fn required_quantity(
    line: &BlueprintLine,
    override_quantity: Option<Decimal>,
    allow_override: bool,
) -> Decimal {
    let requested = match override_quantity {
        Some(qty) if allow_override => qty,
        _ => line.default_quantity,
    };
    requested.clamp(line.minimum_quantity, line.maximum_quantity)
}

/// Outstanding demand for a line: `required - assigned`, never negative.
#[must_use]
pub fn remaining(required: Decimal, assigned: Decimal) -> Decimal {
    (required - assigned).max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockflow_core::{BlueprintId, BlueprintLineId, ProductId};

    fn blueprint_line(min: i64, default: i64, max: i64) -> BlueprintLine {
        BlueprintLine {
            id: BlueprintLineId::new(1),
            blueprint_id: BlueprintId::new(1),
            product_id: ProductId::new(1),
            minimum_quantity: Decimal::from(min),
            maximum_quantity: Decimal::from(max),
            default_quantity: Decimal::from(default),
            usage_notes: None,
            position: 1,
        }
    }

    #[test]
    fn test_default_applies_without_override() {
        let line = blueprint_line(2, 6, 10);
        assert_eq!(required_quantity(&line, None, true), Decimal::from(6));
        assert_eq!(required_quantity(&line, None, false), Decimal::from(6));
    }

    #[test]
    fn test_override_clamped_to_range() {
        let line = blueprint_line(2, 6, 10);
        assert_eq!(
            required_quantity(&line, Some(Decimal::from(8)), true),
            Decimal::from(8)
        );
        assert_eq!(
            required_quantity(&line, Some(Decimal::from(50)), true),
            Decimal::from(10)
        );
        assert_eq!(
            required_quantity(&line, Some(Decimal::from(1)), true),
            Decimal::from(2)
        );
    }

    #[test]
    fn test_override_ignored_when_blueprint_forbids_it() {
        let line = blueprint_line(2, 6, 10);
        assert_eq!(
            required_quantity(&line, Some(Decimal::from(9)), false),
            Decimal::from(6)
        );
    }

    #[test]
    fn test_remaining_floors_at_zero() {
        assert_eq!(
            remaining(Decimal::from(10), Decimal::from(4)),
            Decimal::from(6)
        );
        assert_eq!(
            remaining(Decimal::from(10), Decimal::from(10)),
            Decimal::ZERO
        );
        // Over-assignment can't happen through the engine, but the math
        // still never reports negative demand.
        assert_eq!(
            remaining(Decimal::from(10), Decimal::from(12)),
            Decimal::ZERO
        );
    }
}
