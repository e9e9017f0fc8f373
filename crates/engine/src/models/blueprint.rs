//! Read-side views of the blueprint catalog.
//!
//! The catalog itself (CRUD over blueprints, loadouts, products) is owned
//! by an external service; the engine only reads the shapes it needs for
//! demand computation and lot matching.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use stockflow_core::{BlueprintId, BlueprintLineId, InventoryLotId, ProductId};

/// One product requirement row of a blueprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueprintLine {
    /// Unique blueprint line ID.
    pub id: BlueprintLineId,
    /// Blueprint this line belongs to.
    pub blueprint_id: BlueprintId,
    /// Required product.
    pub product_id: ProductId,
    /// Minimum quantity (`0 <= min <= default <= max`).
    pub minimum_quantity: Decimal,
    /// Maximum quantity.
    pub maximum_quantity: Decimal,
    /// Default quantity used when no override is given.
    pub default_quantity: Decimal,
    /// Optional usage notes.
    pub usage_notes: Option<String>,
    /// Declared order within the blueprint.
    pub position: i32,
}

/// A lot reservation declared at loadout level.
///
/// Declared independently of live ledger availability, so a declared lot
/// may reference stock that no longer exists; the matcher treats such
/// entries as unconfirmed fallback candidates, never hard errors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclaredLot {
    /// Product the reservation is for.
    pub product_id: ProductId,
    /// Lot ID, when the reservation was recorded against a known lot.
    pub lot_id: Option<InventoryLotId>,
    /// Lot number, when only the number was recorded.
    pub lot_number: Option<String>,
    /// Reserved quantity.
    pub quantity: Decimal,
}

impl DeclaredLot {
    /// Whether a live candidate matches this declaration, by lot identity
    /// or lot number.
    #[must_use]
    pub fn matches(&self, lot_id: InventoryLotId, lot_number: &str) -> bool {
        if let Some(declared_id) = self.lot_id {
            return declared_id == lot_id;
        }
        self.lot_number
            .as_deref()
            .is_some_and(|n| n.eq_ignore_ascii_case(lot_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_lot_matches_by_id() {
        let declared = DeclaredLot {
            product_id: ProductId::new(1),
            lot_id: Some(InventoryLotId::new(5)),
            lot_number: None,
            quantity: Decimal::from(4),
        };
        assert!(declared.matches(InventoryLotId::new(5), "anything"));
        assert!(!declared.matches(InventoryLotId::new(6), "anything"));
    }

    #[test]
    fn test_declared_lot_matches_by_number() {
        let declared = DeclaredLot {
            product_id: ProductId::new(1),
            lot_id: None,
            lot_number: Some("LOT-A1".into()),
            quantity: Decimal::from(4),
        };
        assert!(declared.matches(InventoryLotId::new(9), "lot-a1"));
        assert!(!declared.matches(InventoryLotId::new(9), "LOT-B2"));
    }

    #[test]
    fn test_declared_id_takes_precedence_over_number() {
        let declared = DeclaredLot {
            product_id: ProductId::new(1),
            lot_id: Some(InventoryLotId::new(5)),
            lot_number: Some("LOT-A1".into()),
            quantity: Decimal::from(4),
        };
        // Same number but different id is not a match
        assert!(!declared.matches(InventoryLotId::new(6), "LOT-A1"));
    }
}
