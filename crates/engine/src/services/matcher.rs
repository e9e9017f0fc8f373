//! Lot matching: candidate ranking and automatic-assignment planning.
//!
//! Everything here is pure: the planner works over a snapshot of demand,
//! declared loadout reservations, and live candidates, and returns the
//! commits it would make. Execution - atomic, per-lot capped commits and
//! ledger inserts - happens in the fulfillment service, so concurrent
//! stock movement can only shrink a planned commit, never grow it.

use rust_decimal::Decimal;

use stockflow_core::{InventoryLotId, OrderLineId, ProductId};

use crate::models::{CandidateLot, DeclaredLot};

/// Snapshot of one blueprint-bound line's demand, as the planner sees it.
#[derive(Debug, Clone)]
pub struct LineDemand {
    /// Order line the demand belongs to.
    pub order_line_id: OrderLineId,
    /// Product required.
    pub product_id: ProductId,
    /// Outstanding demand (`required - assigned`, floored at zero).
    pub remaining: Decimal,
}

/// Where a planned commit came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitSource {
    /// Matched a loadout-declared lot reservation.
    Declared,
    /// Fallback against live availability after the declared pass.
    Fallback,
}

/// One commit the planner wants executed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedCommit {
    /// Line being satisfied.
    pub order_line_id: OrderLineId,
    /// Lot to commit against.
    pub lot_id: InventoryLotId,
    /// Quantity to commit (already capped by snapshot availability).
    pub quantity: Decimal,
    /// Declared-pass or fallback commit.
    pub source: CommitSource,
}

/// Result of planning one line.
#[derive(Debug, Clone, Default)]
pub struct LinePlan {
    /// Commits, in execution order.
    pub commits: Vec<PlannedCommit>,
    /// Demand left unsatisfied after both passes.
    pub leftover: Decimal,
    /// Declared reservations with no live counterpart (stale matches);
    /// skipped, reported for operator visibility.
    pub stale_declared: Vec<String>,
}

/// Merge declared loadout reservations with live ledger candidates into a
/// ranked candidate list for one product.
///
/// Ranking: lots both declared and live first, then the remaining live
/// lots in ledger order, then declared lots absent from the live query -
/// flagged `confirmed_at_source = false` and never auto-committed, but
/// still offered so eventual-consistency lag between loadout reservation
/// and ledger availability surfaces instead of silently hiding stock.
#[must_use]
pub fn rank_candidates(declared: &[DeclaredLot], live: Vec<CandidateLot>) -> Vec<CandidateLot> {
    let mut declared_live = Vec::new();
    let mut other_live = Vec::new();

    for mut lot in live {
        let is_declared = lot.lot_id.is_some_and(|id| {
            declared.iter().any(|d| d.matches(id, &lot.lot_number))
        });
        lot.declared_on_loadout = is_declared;
        lot.confirmed_at_source = true;
        if is_declared {
            declared_live.push(lot);
        } else {
            other_live.push(lot);
        }
    }

    let mut ranked = declared_live;
    let live_confirmed: Vec<(Option<InventoryLotId>, String)> = ranked
        .iter()
        .chain(other_live.iter())
        .map(|c| (c.lot_id, c.lot_number.clone()))
        .collect();
    ranked.extend(other_live);

    // Declared reservations with no live counterpart become unconfirmed
    // trailing candidates.
    for d in declared {
        let known_live = live_confirmed.iter().any(|(id, number)| {
            id.is_some_and(|id| d.matches(id, number))
        });
        if !known_live {
            ranked.push(CandidateLot {
                lot_id: d.lot_id,
                lot_number: d.lot_number.clone().unwrap_or_default(),
                available: Decimal::ZERO,
                bin: stockflow_core::BinCoordinates::default(),
                declared_on_loadout: true,
                confirmed_at_source: false,
            });
        }
    }

    ranked
}

/// Plan commits for one line against its ranked candidates.
///
/// Declared pass first: each loadout reservation for the line's product is
/// matched to a live candidate by lot identity or lot number and committed
/// at `min(remaining, declared, available)`. While demand remains after
/// that, the fallback pass walks the untouched live candidates in rank
/// order. Lines that already carry assignments, or have no remaining
/// demand, must be filtered out by the caller (idempotence lives there).
#[must_use]
pub fn plan_line(
    line: &LineDemand,
    declared: &[DeclaredLot],
    candidates: &[CandidateLot],
) -> LinePlan {
    let mut plan = LinePlan::default();
    let mut remaining = line.remaining;
    if remaining <= Decimal::ZERO {
        return plan;
    }

    // Per-candidate quantity still uncommitted within this plan.
    let mut headroom: Vec<Decimal> = candidates.iter().map(|c| c.available).collect();
    let mut touched: Vec<bool> = vec![false; candidates.len()];

    for d in declared.iter().filter(|d| d.product_id == line.product_id) {
        if remaining <= Decimal::ZERO {
            break;
        }
        let slot = candidates.iter().enumerate().find(|(_, c)| {
            c.confirmed_at_source
                && c.lot_id.is_some_and(|id| d.matches(id, &c.lot_number))
        });
        let Some((idx, candidate)) = slot else {
            plan.stale_declared.push(
                d.lot_number
                    .clone()
                    .or_else(|| d.lot_id.map(|id| id.to_string()))
                    .unwrap_or_default(),
            );
            continue;
        };
        let Some(lot_id) = candidate.lot_id else { continue };
        let Some(available) = headroom.get_mut(idx) else { continue };
        let quantity = remaining.min(d.quantity).min(*available);
        if quantity <= Decimal::ZERO {
            continue;
        }
        *available -= quantity;
        remaining -= quantity;
        if let Some(t) = touched.get_mut(idx) {
            *t = true;
        }
        plan.commits.push(PlannedCommit {
            order_line_id: line.order_line_id,
            lot_id,
            quantity,
            source: CommitSource::Declared,
        });
    }

    // Fallback: remaining demand is served from live candidates the
    // declared pass did not touch, in rank order.
    for (idx, candidate) in candidates.iter().enumerate() {
        if remaining <= Decimal::ZERO {
            break;
        }
        if !candidate.confirmed_at_source || touched.get(idx).copied().unwrap_or(true) {
            continue;
        }
        let Some(lot_id) = candidate.lot_id else { continue };
        let Some(available) = headroom.get_mut(idx) else { continue };
        let quantity = remaining.min(*available);
        if quantity <= Decimal::ZERO {
            continue;
        }
        *available -= quantity;
        remaining -= quantity;
        plan.commits.push(PlannedCommit {
            order_line_id: line.order_line_id,
            lot_id,
            quantity,
            source: CommitSource::Fallback,
        });
    }

    plan.leftover = remaining;
    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockflow_core::BinCoordinates;

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

    fn declared(product: i32, lot_id: Option<i32>, number: Option<&str>, qty: i64) -> DeclaredLot {
        DeclaredLot {
            product_id: ProductId::new(product),
            lot_id: lot_id.map(InventoryLotId::new),
            lot_number: number.map(ToString::to_string),
            quantity: Decimal::from(qty),
        }
    }

    fn demand(line: i32, product: i32, remaining: i64) -> LineDemand {
        LineDemand {
            order_line_id: OrderLineId::new(line),
            product_id: ProductId::new(product),
            remaining: Decimal::from(remaining),
        }
    }

    #[test]
    fn test_ranking_prefers_declared_live_lots() {
        let declared = vec![declared(1, Some(2), None, 4)];
        let live_lots = vec![live(1, "L1", 10), live(2, "L2", 5)];
        let ranked = rank_candidates(&declared, live_lots);
        assert_eq!(ranked[0].lot_id, Some(InventoryLotId::new(2)));
        assert!(ranked[0].declared_on_loadout);
        assert!(ranked[0].confirmed_at_source);
        assert_eq!(ranked[1].lot_id, Some(InventoryLotId::new(1)));
        assert!(!ranked[1].declared_on_loadout);
    }

    #[test]
    fn test_ranking_keeps_missing_declared_lots_as_unconfirmed() {
        let declared = vec![declared(1, None, Some("GONE-1"), 4)];
        let ranked = rank_candidates(&declared, vec![live(1, "L1", 10)]);
        assert_eq!(ranked.len(), 2);
        let trailing = &ranked[1];
        assert_eq!(trailing.lot_number, "GONE-1");
        assert!(trailing.declared_on_loadout);
        assert!(!trailing.confirmed_at_source);
        assert_eq!(trailing.available, Decimal::ZERO);
    }

    /// Worked scenario: line requires 10 of product P; loadout declares
    /// L1 (qty 4) and L2 (qty 4); live ledger shows L1 available 4, L2
    /// available 2, L3 (undeclared) available 20. Expect commits of 4
    /// from L1, 2 from L2 (capped by availability), then 4 from L3 via
    /// fallback - exactly three commits, zero leftover.
    #[test]
    fn test_declared_pass_then_fallback() {
        let decls = vec![
            declared(1, Some(1), Some("L1"), 4),
            declared(1, Some(2), Some("L2"), 4),
        ];
        let ranked =
            rank_candidates(&decls, vec![live(1, "L1", 4), live(2, "L2", 2), live(3, "L3", 20)]);
        let plan = plan_line(&demand(10, 1, 10), &decls, &ranked);

        assert_eq!(plan.commits.len(), 3);
        assert_eq!(plan.leftover, Decimal::ZERO);
        assert_eq!(
            plan.commits[0],
            PlannedCommit {
                order_line_id: OrderLineId::new(10),
                lot_id: InventoryLotId::new(1),
                quantity: Decimal::from(4),
                source: CommitSource::Declared,
            }
        );
        assert_eq!(
            plan.commits[1],
            PlannedCommit {
                order_line_id: OrderLineId::new(10),
                lot_id: InventoryLotId::new(2),
                quantity: Decimal::from(2),
                source: CommitSource::Declared,
            }
        );
        assert_eq!(
            plan.commits[2],
            PlannedCommit {
                order_line_id: OrderLineId::new(10),
                lot_id: InventoryLotId::new(3),
                quantity: Decimal::from(4),
                source: CommitSource::Fallback,
            }
        );
    }

    #[test]
    fn test_stale_declared_lot_is_skipped_not_fatal() {
        let decls = vec![
            declared(1, None, Some("GONE-9"), 4),
            declared(1, Some(2), Some("L2"), 4),
        ];
        let ranked = rank_candidates(&decls, vec![live(2, "L2", 4)]);
        let plan = plan_line(&demand(10, 1, 6), &decls, &ranked);

        assert_eq!(plan.stale_declared, vec!["GONE-9".to_string()]);
        assert_eq!(plan.commits.len(), 1);
        assert_eq!(plan.commits[0].lot_id, InventoryLotId::new(2));
        assert_eq!(plan.commits[0].quantity, Decimal::from(4));
        assert_eq!(plan.leftover, Decimal::from(2));
    }

    #[test]
    fn test_partial_fulfillment_leaves_remainder() {
        let ranked = rank_candidates(&[], vec![live(1, "L1", 3)]);
        let plan = plan_line(&demand(10, 1, 10), &[], &ranked);
        assert_eq!(plan.commits.len(), 1);
        assert_eq!(plan.commits[0].quantity, Decimal::from(3));
        assert_eq!(plan.leftover, Decimal::from(7));
    }

    #[test]
    fn test_no_candidates_leaves_full_demand() {
        let plan = plan_line(&demand(10, 1, 5), &[], &[]);
        assert!(plan.commits.is_empty());
        assert_eq!(plan.leftover, Decimal::from(5));
    }

    #[test]
    fn test_declared_commit_caps_at_declared_quantity() {
        let decls = vec![declared(1, Some(1), Some("L1"), 4)];
        let ranked = rank_candidates(&decls, vec![live(1, "L1", 100)]);
        let plan = plan_line(&demand(10, 1, 10), &decls, &ranked);
        // 4 via the declaration, then nothing: the declared pass touched
        // L1, so fallback skips it rather than double-committing.
        assert_eq!(plan.commits.len(), 1);
        assert_eq!(plan.commits[0].quantity, Decimal::from(4));
        assert_eq!(plan.leftover, Decimal::from(6));
    }

    #[test]
    fn test_unconfirmed_candidates_never_auto_commit() {
        let decls = vec![declared(1, None, Some("GONE-1"), 4)];
        let ranked = rank_candidates(&decls, vec![]);
        let plan = plan_line(&demand(10, 1, 4), &decls, &ranked);
        assert!(plan.commits.is_empty());
        assert_eq!(plan.leftover, Decimal::from(4));
    }

    #[test]
    fn test_declarations_for_other_products_are_ignored() {
        let decls = vec![declared(2, Some(1), Some("L1"), 4)];
        let ranked = rank_candidates(&[], vec![live(1, "L1", 4)]);
        let plan = plan_line(&demand(10, 1, 4), &decls, &ranked);
        // Product 2's declaration is irrelevant; fallback serves demand.
        assert_eq!(plan.commits.len(), 1);
        assert_eq!(plan.commits[0].source, CommitSource::Fallback);
    }
}
