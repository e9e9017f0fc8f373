//! Integration tests for demand computation: required-quantity
//! clamping, override permission, and remaining-demand floors.

use rust_decimal::Decimal;

use stockflow_core::{BlueprintId, BlueprintLineId, ProductId};
use stockflow_engine::models::BlueprintLine;
use stockflow_engine::services::demand::{remaining, required_quantity};

fn bp_line(min: i64, default: i64, max: i64) -> BlueprintLine {
    BlueprintLine {
        id: BlueprintLineId::new(1),
        blueprint_id: BlueprintId::new(1),
        product_id: ProductId::new(1),
        minimum_quantity: Decimal::from(min),
        maximum_quantity: Decimal::from(max),
        default_quantity: Decimal::from(default),
        usage_notes: None,
        position: 0,
    }
}

#[test]
fn test_default_applies_without_an_override() {
    let line = bp_line(2, 10, 24);
    assert_eq!(required_quantity(&line, None, true), Decimal::from(10));
    assert_eq!(required_quantity(&line, None, false), Decimal::from(10));
}

#[test]
fn test_override_is_ignored_unless_the_blueprint_permits_it() {
    let line = bp_line(2, 10, 24);
    assert_eq!(
        required_quantity(&line, Some(Decimal::from(15)), false),
        Decimal::from(10)
    );
    assert_eq!(
        required_quantity(&line, Some(Decimal::from(15)), true),
        Decimal::from(15)
    );
}

#[test]
fn test_override_is_clamped_to_the_line_range() {
    let line = bp_line(2, 10, 24);
    assert_eq!(
        required_quantity(&line, Some(Decimal::from(100)), true),
        Decimal::from(24)
    );
    assert_eq!(
        required_quantity(&line, Some(Decimal::ONE), true),
        Decimal::from(2)
    );
}

#[test]
fn test_remaining_never_goes_negative() {
    assert_eq!(
        remaining(Decimal::from(10), Decimal::from(4)),
        Decimal::from(6)
    );
    assert_eq!(remaining(Decimal::from(10), Decimal::from(10)), Decimal::ZERO);
    assert_eq!(remaining(Decimal::from(10), Decimal::from(12)), Decimal::ZERO);
}
