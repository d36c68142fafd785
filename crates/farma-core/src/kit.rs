//! # Kit Cost Allocator
//!
//! Builds a kit out of products and splits its price across the components.
//!
//! ## Allocation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  per component                                                          │
//! │    boxes   = units_to_use / units_per_container     (3 of 10 → 0.3)     │
//! │    cost    = unit sale price × boxes                                    │
//! │                                                                         │
//! │  per kit                                                                │
//! │    total_cost = Σ cost                                                  │
//! │    kit_price  = operator override, or total_cost (zero margin)          │
//! │    profit     = kit_price − total_cost                                  │
//! │    margin %   = profit / kit_price × 100     (0 when kit_price is 0)    │
//! │                                                                         │
//! │  profit is split EQUALLY across components, not by cost share:          │
//! │    allocated price = cost + profit / component_count                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! All arithmetic is exact; nothing here rounds.
//!
//! ## Example
//! ```rust
//! use farma_core::{KitDraft, KitSelection, Money, Product, Quantity};
//! use rust_decimal::Decimal;
//!
//! let gauze = Product::new("G1", "Gasa", Quantity::from_units(5),
//!                          Money::zero(), Money::from_units(1000));
//! let tape = Product::new("T1", "Esparadrapo", Quantity::from_units(5),
//!                         Money::zero(), Money::from_units(2000));
//!
//! let mut draft = KitDraft::new("Kit curacion");
//! draft.add(KitSelection::new(&gauze, Decimal::from(2), Decimal::ONE).unwrap());
//! draft.add(KitSelection::new(&tape, Decimal::from(4), Decimal::ONE).unwrap());
//! draft.set_price(Some(Money::from_units(4000)));
//!
//! let kit = draft.allocate().unwrap();
//! assert_eq!(kit.total_cost, Money::from_units(1000));
//! assert_eq!(kit.profit, Money::from_units(3000));
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::line_item::{KitComponent, KitLine, LineItem};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::Product;
use crate::validation::{validate_description, validate_price};
use crate::MIN_KIT_COMPONENTS;

// =============================================================================
// Component Selection
// =============================================================================

/// "Use this many units out of a container of that many" for one product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitSelection {
    pub barcode: String,
    pub description: String,
    /// The product's sale price, used as its unit cost inside the kit.
    pub unit_price: Money,
    pub units_per_container: Decimal,
    pub units_to_use: Decimal,
    /// Fraction of a box deducted from stock.
    pub boxes: Quantity,
}

impl KitSelection {
    /// Selects `units_to_use` units of `product`, sold in containers of
    /// `units_per_container`.
    ///
    /// ## Errors
    /// - `units_to_use` not positive, or `units_per_container` below 1
    /// - [`CoreError::InsufficientStock`] if the product has fewer boxes in
    ///   stock than the selection needs
    pub fn new(
        product: &Product,
        units_per_container: Decimal,
        units_to_use: Decimal,
    ) -> CoreResult<Self> {
        let selection = Self::unchecked(product, units_per_container, units_to_use)?;

        if !product.can_sell(selection.boxes) {
            return Err(CoreError::InsufficientStock {
                barcode: product.barcode.clone(),
                description: product.description.clone(),
                available: product.quantity,
                requested: selection.boxes,
            });
        }

        Ok(selection)
    }

    /// Like [`KitSelection::new`] without the stock check.
    ///
    /// The sale processor checks stock again at checkout, so drafts built
    /// from stale product data are still safe to submit.
    pub fn unchecked(
        product: &Product,
        units_per_container: Decimal,
        units_to_use: Decimal,
    ) -> CoreResult<Self> {
        if units_to_use <= Decimal::ZERO {
            return Err(ValidationError::must_be_positive("units to use").into());
        }
        if units_per_container < Decimal::ONE {
            return Err(ValidationError::OutOfRange {
                field: "units per container".to_string(),
                min: "1".to_string(),
                max: "unbounded".to_string(),
            }
            .into());
        }

        let boxes = Quantity::ratio(units_to_use, units_per_container)
            .ok_or_else(|| ValidationError::must_be_positive("units per container"))?;

        Ok(KitSelection {
            barcode: product.barcode.clone(),
            description: product.description.clone(),
            unit_price: product.sale_price,
            units_per_container,
            units_to_use,
            boxes,
        })
    }

    /// unit price × boxes.
    pub fn cost(&self) -> Money {
        self.unit_price * self.boxes
    }
}

// =============================================================================
// Allocation Result
// =============================================================================

/// The cost/profit breakdown of a kit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KitAllocation {
    pub kit_price: Money,
    pub total_cost: Money,
    pub profit: Money,
    /// Profit as a percentage of the kit price; 0 when the price is 0.
    pub margin_pct: Decimal,
    pub components: Vec<KitComponent>,
}

/// Allocates cost and profit across `selections`.
///
/// ## Errors
/// - [`CoreError::KitTooSmall`] with fewer than two components
/// - a negative override price
pub fn allocate(selections: &[KitSelection], price: Option<Money>) -> CoreResult<KitAllocation> {
    if selections.len() < MIN_KIT_COMPONENTS {
        return Err(CoreError::KitTooSmall {
            count: selections.len(),
            min: MIN_KIT_COMPONENTS,
        });
    }

    let costs: Vec<Money> = selections.iter().map(KitSelection::cost).collect();
    let total_cost: Money = costs.iter().copied().sum();

    let kit_price = price.unwrap_or(total_cost);
    validate_price(kit_price)?;

    let profit = kit_price - total_cost;
    let margin_pct = if kit_price.is_zero() {
        Decimal::ZERO
    } else {
        (profit.amount() * Decimal::ONE_HUNDRED)
            .checked_div(kit_price.amount())
            .unwrap_or(Decimal::ZERO)
    };

    let components = selections
        .iter()
        .zip(costs)
        .zip(profit.split_evenly(selections.len()))
        .map(|((sel, cost), profit_share)| KitComponent {
            barcode: sel.barcode.clone(),
            description: sel.description.clone(),
            boxes: sel.boxes,
            cost,
            profit_share,
        })
        .collect();

    Ok(KitAllocation {
        kit_price,
        total_cost,
        profit,
        margin_pct,
        components,
    })
}

// =============================================================================
// Kit Draft
// =============================================================================

/// A kit being assembled by the operator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KitDraft {
    pub name: String,
    selections: Vec<KitSelection>,
    price: Option<Money>,
}

impl KitDraft {
    pub fn new(name: impl Into<String>) -> Self {
        KitDraft {
            name: name.into(),
            selections: Vec::new(),
            price: None,
        }
    }

    /// Adds a component. Selecting a product already in the kit replaces it.
    pub fn add(&mut self, selection: KitSelection) {
        match self
            .selections
            .iter_mut()
            .find(|s| s.barcode == selection.barcode)
        {
            Some(existing) => *existing = selection,
            None => self.selections.push(selection),
        }
    }

    /// Removes a component; returns whether it was present.
    pub fn remove(&mut self, barcode: &str) -> bool {
        let before = self.selections.len();
        self.selections.retain(|s| s.barcode != barcode);
        self.selections.len() != before
    }

    /// Overrides the kit price. `None` goes back to pricing at cost.
    pub fn set_price(&mut self, price: Option<Money>) {
        self.price = price;
    }

    pub fn selections(&self) -> &[KitSelection] {
        &self.selections
    }

    pub fn is_empty(&self) -> bool {
        self.selections.is_empty()
    }

    pub fn allocate(&self) -> CoreResult<KitAllocation> {
        allocate(&self.selections, self.price)
    }

    /// Turns the draft into a sale line.
    pub fn into_line_item(self) -> CoreResult<LineItem> {
        validate_description(&self.name)?;
        let allocation = self.allocate()?;
        Ok(LineItem::Kit(KitLine {
            description: self.name.trim().to_string(),
            price: allocation.kit_price,
            cost: allocation.total_cost,
            components: allocation.components,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(barcode: &str, stock: i64, price: i64) -> Product {
        Product::new(
            barcode,
            format!("Product {barcode}"),
            Quantity::from_units(stock),
            Money::zero(),
            Money::from_units(price),
        )
    }

    fn select(p: &Product, per_container: i64, use_units: i64) -> KitSelection {
        KitSelection::new(p, Decimal::from(per_container), Decimal::from(use_units)).unwrap()
    }

    fn qty(s: &str) -> Quantity {
        Quantity::from_str_exact(s).unwrap()
    }

    #[test]
    fn test_two_component_kit_with_override() {
        let a = product("A", 10, 1000);
        let b = product("B", 10, 2000);

        let mut draft = KitDraft::new("Kit gripa");
        draft.add(select(&a, 2, 1));
        draft.add(select(&b, 4, 1));
        draft.set_price(Some(Money::from_units(4000)));

        let kit = draft.allocate().unwrap();
        assert_eq!(kit.total_cost, Money::from_units(1000));
        assert_eq!(kit.profit, Money::from_units(3000));
        assert_eq!(kit.margin_pct, Decimal::from(75));

        assert_eq!(kit.components[0].boxes, qty("0.5"));
        assert_eq!(kit.components[1].boxes, qty("0.25"));
        for c in &kit.components {
            assert_eq!(c.cost, Money::from_units(500));
            assert_eq!(c.profit_share, Money::from_units(1500));
            assert_eq!(c.allocated_price(), Money::from_units(2000));
        }
    }

    #[test]
    fn test_default_price_is_cost() {
        let a = product("A", 10, 1000);
        let b = product("B", 10, 300);

        let kit = allocate(&[select(&a, 10, 3), select(&b, 1, 1)], None).unwrap();
        assert_eq!(kit.total_cost, Money::from_units(600));
        assert_eq!(kit.kit_price, kit.total_cost);
        assert!(kit.profit.is_zero());
    }

    #[test]
    fn test_zero_price_has_zero_margin() {
        let a = product("A", 10, 0);
        let b = product("B", 10, 0);
        let kit = allocate(&[select(&a, 1, 1), select(&b, 1, 1)], None).unwrap();
        assert_eq!(kit.margin_pct, Decimal::ZERO);
    }

    #[test]
    fn test_allocation_conserves_price() {
        let products = [product("A", 10, 999), product("B", 10, 1333), product("C", 10, 17)];
        let selections: Vec<_> = products.iter().map(|p| select(p, 3, 1)).collect();

        let kit = allocate(&selections, Some(Money::from_units(1000))).unwrap();

        let cost: Money = kit.components.iter().map(|c| c.cost).sum();
        let shares: Money = kit.components.iter().map(|c| c.profit_share).sum();
        let allocated: Money = kit.components.iter().map(KitComponent::allocated_price).sum();

        assert_eq!(cost + kit.profit, kit.kit_price);
        assert_eq!(shares, kit.profit);
        assert_eq!(allocated, kit.kit_price);
    }

    #[test]
    fn test_singleton_kit_rejected() {
        let a = product("A", 10, 1000);
        let err = allocate(&[select(&a, 1, 1)], None).unwrap_err();
        assert!(matches!(err, CoreError::KitTooSmall { count: 1, min: 2 }));
    }

    #[test]
    fn test_selection_checks_stock_and_units() {
        let a = product("A", 1, 1000);

        assert!(KitSelection::new(&a, Decimal::from(10), Decimal::from(10)).is_ok());
        assert!(matches!(
            KitSelection::new(&a, Decimal::from(10), Decimal::from(11)),
            Err(CoreError::InsufficientStock { .. })
        ));
        assert!(KitSelection::new(&a, Decimal::from(10), Decimal::ZERO).is_err());
        assert!(KitSelection::new(&a, Decimal::ZERO, Decimal::ONE).is_err());
    }

    #[test]
    fn test_draft_add_replaces_and_remove() {
        let a = product("A", 10, 1000);
        let b = product("B", 10, 1000);

        let mut draft = KitDraft::new("Kit");
        draft.add(select(&a, 2, 1));
        draft.add(select(&a, 4, 1));
        assert_eq!(draft.selections().len(), 1);
        assert_eq!(draft.selections()[0].boxes, qty("0.25"));

        draft.add(select(&b, 1, 1));
        assert!(draft.remove("A"));
        assert!(!draft.remove("A"));
        assert_eq!(draft.selections().len(), 1);
    }

    #[test]
    fn test_into_line_item() {
        let a = product("A", 10, 1000);
        let b = product("B", 10, 2000);

        let mut draft = KitDraft::new("  Kit gripa ");
        draft.add(select(&a, 2, 1));
        draft.add(select(&b, 4, 1));
        draft.set_price(Some(Money::from_units(4000)));

        let item = draft.into_line_item().unwrap();
        assert_eq!(item.description(), "Kit gripa");
        assert_eq!(item.subtotal(), Money::from_units(4000));
        assert_eq!(item.stored_barcode(), crate::KIT_BARCODE);

        let demands = item.stock_demands();
        assert_eq!(demands[0].amount, qty("0.5"));
        assert_eq!(demands[1].amount, qty("0.25"));
        assert!(item.validate().is_ok());
    }
}
