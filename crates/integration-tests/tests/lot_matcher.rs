//! Integration tests for lot-matcher planning: candidate ranking,
//! declared-then-fallback commits, and partial fulfilment.

use rust_decimal::Decimal;

use stockflow_core::{BinCoordinates, InventoryLotId, OrderLineId, ProductId};
use stockflow_engine::models::{CandidateLot, DeclaredLot};
use stockflow_engine::services::matcher::{CommitSource, LineDemand, plan_line, rank_candidates};

fn live(id: i32, number: &str, available: i64) -> CandidateLot {
    CandidateLot {
        lot_id: Some(InventoryLotId::new(id)),
        lot_number: number.to_string(),
        available: Decimal::from(available),
        bin: BinCoordinates::default(),
        declared_on_loadout: false,
        confirmed_at_source: true,
    }
}

fn declared(product: i32, lot_id: Option<i32>, number: &str, quantity: i64) -> DeclaredLot {
    DeclaredLot {
        product_id: ProductId::new(product),
        lot_id: lot_id.map(InventoryLotId::new),
        lot_number: Some(number.to_string()),
        quantity: Decimal::from(quantity),
    }
}

fn demand(line: i32, product: i32, remaining: i64) -> LineDemand {
    LineDemand {
        order_line_id: OrderLineId::new(line),
        product_id: ProductId::new(product),
        remaining: Decimal::from(remaining),
    }
}

// =============================================================================
// Candidate Ranking
// =============================================================================

#[test]
fn test_ranking_prefers_declared_live_then_live_then_stale() {
    let declarations = vec![
        declared(1, Some(2), "LOT-B", 4),
        declared(1, None, "LOT-GONE", 3),
    ];
    let ranked = rank_candidates(
        &declarations,
        vec![live(1, "LOT-A", 10), live(2, "LOT-B", 5)],
    );

    assert_eq!(ranked.len(), 3);
    // Declared + live first.
    assert_eq!(ranked[0].lot_number, "LOT-B");
    assert!(ranked[0].declared_on_loadout && ranked[0].confirmed_at_source);
    // Other live next.
    assert_eq!(ranked[1].lot_number, "LOT-A");
    assert!(!ranked[1].declared_on_loadout);
    // Declared-but-missing trails, flagged unconfirmed with zero availability.
    assert_eq!(ranked[2].lot_number, "LOT-GONE");
    assert!(ranked[2].declared_on_loadout);
    assert!(!ranked[2].confirmed_at_source);
    assert_eq!(ranked[2].available, Decimal::ZERO);
}

// =============================================================================
// Worked Scenario
// =============================================================================

/// Blueprint line requires 10 of P; loadout declares L1 (4) and L2 (4);
/// live ledger shows L1 avail 4, L2 avail 2, undeclared L3 avail 20.
/// Expected commits: 4 from L1, 2 from L2 (capped by availability),
/// then 4 from L3 via fallback - exactly three commits, zero leftover.
#[test]
fn test_declared_commits_then_fallback_fills_the_rest() {
    let declarations = vec![
        declared(7, Some(1), "L1", 4),
        declared(7, Some(2), "L2", 4),
    ];
    let candidates = rank_candidates(
        &declarations,
        vec![live(1, "L1", 4), live(2, "L2", 2), live(3, "L3", 20)],
    );
    let plan = plan_line(&demand(42, 7, 10), &declarations, &candidates);

    assert_eq!(plan.commits.len(), 3);
    assert_eq!(plan.leftover, Decimal::ZERO);

    assert_eq!(plan.commits[0].lot_id, InventoryLotId::new(1));
    assert_eq!(plan.commits[0].quantity, Decimal::from(4));
    assert_eq!(plan.commits[0].source, CommitSource::Declared);

    assert_eq!(plan.commits[1].lot_id, InventoryLotId::new(2));
    assert_eq!(plan.commits[1].quantity, Decimal::from(2));
    assert_eq!(plan.commits[1].source, CommitSource::Declared);

    assert_eq!(plan.commits[2].lot_id, InventoryLotId::new(3));
    assert_eq!(plan.commits[2].quantity, Decimal::from(4));
    assert_eq!(plan.commits[2].source, CommitSource::Fallback);
}

#[test]
fn test_unfilled_demand_is_left_for_the_operator() {
    let candidates = rank_candidates(&[], vec![live(1, "L1", 3)]);
    let plan = plan_line(&demand(1, 7, 10), &[], &candidates);

    assert_eq!(plan.commits.len(), 1);
    assert_eq!(plan.commits[0].quantity, Decimal::from(3));
    assert_eq!(plan.leftover, Decimal::from(7));
}

#[test]
fn test_stale_declared_lots_are_reported_not_committed() {
    let declarations = vec![declared(7, None, "LOT-GONE", 5)];
    let candidates = rank_candidates(&declarations, vec![live(1, "L1", 10)]);
    let plan = plan_line(&demand(1, 7, 5), &declarations, &candidates);

    assert_eq!(plan.stale_declared, vec!["LOT-GONE".to_string()]);
    // Fallback still fills from the live lot.
    assert_eq!(plan.commits.len(), 1);
    assert_eq!(plan.commits[0].lot_id, InventoryLotId::new(1));
    assert_eq!(plan.commits[0].quantity, Decimal::from(5));
    assert_eq!(plan.leftover, Decimal::ZERO);
}

#[test]
fn test_unconfirmed_candidates_never_receive_auto_commits() {
    let declarations = vec![declared(7, Some(9), "LOT-GHOST", 5)];
    // No live lots at all: the only candidate is the unconfirmed one.
    let candidates = rank_candidates(&declarations, vec![]);
    assert_eq!(candidates.len(), 1);
    assert!(!candidates[0].confirmed_at_source);

    let plan = plan_line(&demand(1, 7, 5), &declarations, &candidates);
    assert!(plan.commits.is_empty());
    assert_eq!(plan.leftover, Decimal::from(5));
}

#[test]
fn test_zero_remaining_demand_plans_nothing() {
    let candidates = rank_candidates(&[], vec![live(1, "L1", 10)]);
    let plan = plan_line(&demand(1, 7, 0), &[], &candidates);
    assert!(plan.commits.is_empty());
    assert_eq!(plan.leftover, Decimal::ZERO);
}

#[test]
fn test_declarations_for_other_products_are_ignored() {
    let declarations = vec![declared(99, Some(1), "L1", 4)];
    let candidates = rank_candidates(&[], vec![live(1, "L1", 10)]);
    let plan = plan_line(&demand(1, 7, 4), &declarations, &candidates);

    // The declared pass skips the other product; fallback serves demand.
    assert_eq!(plan.commits.len(), 1);
    assert_eq!(plan.commits[0].source, CommitSource::Fallback);
}
