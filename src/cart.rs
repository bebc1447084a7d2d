//! In-memory cart store.
//!
//! One cart per app instance, keyed by product id, mutated only through the
//! cart commands. Nothing here touches the network or disk; the cart lives
//! and dies with the process.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::debug;

/// Flat POS tax rate applied on top of the subtotal.
pub const TAX_RATE: f64 = 0.10;

/// Round a money amount to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One product entry in the cart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub image: String,
    pub quantity: i64,
}

/// Product identity handed to `add_item`. Quantity travels separately as the
/// signed delta.
#[derive(Debug, Clone, Deserialize)]
pub struct CartProduct {
    #[serde(alias = "pro_id")]
    pub id: i64,
    #[serde(alias = "pro_name")]
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub image: String,
}

/// The cart projection served to the frontend: lines plus derived totals.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSummary {
    pub items: Vec<CartLine>,
    pub count: i64,
    pub subtotal: f64,
    pub tax: f64,
    pub total: f64,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Managed cart state. Lines keep insertion order, unique by product id.
#[derive(Debug, Default)]
pub struct CartState {
    lines: Mutex<Vec<CartLine>>,
}

impl CartState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a signed quantity change for a product.
    ///
    /// Existing line: the delta is added to its quantity, and the line is
    /// removed outright when the result drops to zero or below; name, price
    /// and image are refreshed from the product argument. Absent line: a
    /// positive delta inserts it, a non-positive delta is a no-op.
    pub fn add_item(&self, product: &CartProduct, delta: i64) {
        let mut lines = self.lines.lock().unwrap();
        if let Some(pos) = lines.iter().position(|l| l.id == product.id) {
            let new_quantity = lines[pos].quantity + delta;
            if new_quantity <= 0 {
                let removed = lines.remove(pos);
                debug!(product_id = removed.id, "cart line removed");
            } else {
                lines[pos] = CartLine {
                    id: product.id,
                    name: product.name.clone(),
                    price: product.price,
                    image: product.image.clone(),
                    quantity: new_quantity,
                };
                debug!(
                    product_id = product.id,
                    quantity = new_quantity,
                    "cart line updated"
                );
            }
        } else if delta > 0 {
            lines.push(CartLine {
                id: product.id,
                name: product.name.clone(),
                price: product.price,
                image: product.image.clone(),
                quantity: delta,
            });
            debug!(product_id = product.id, quantity = delta, "cart line added");
        }
    }

    /// Remove a line by product id. Removing an absent id is a no-op.
    pub fn remove_item(&self, id: i64) {
        let mut lines = self.lines.lock().unwrap();
        if let Some(pos) = lines.iter().position(|l| l.id == id) {
            lines.remove(pos);
            debug!(product_id = id, "cart line removed");
        }
    }

    /// Empty the cart.
    pub fn clear(&self) {
        let mut lines = self.lines.lock().unwrap();
        if !lines.is_empty() {
            debug!(lines = lines.len(), "cart cleared");
            lines.clear();
        }
    }

    pub fn lines(&self) -> Vec<CartLine> {
        self.lines.lock().unwrap().clone()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.lock().unwrap().is_empty()
    }

    /// Total number of units across all lines.
    pub fn count(&self) -> i64 {
        self.lines.lock().unwrap().iter().map(|l| l.quantity).sum()
    }

    /// Sum of price x quantity across all lines, before tax.
    pub fn subtotal(&self) -> f64 {
        self.lines
            .lock()
            .unwrap()
            .iter()
            .map(|l| l.price * l.quantity as f64)
            .sum()
    }

    /// Lines plus derived POS totals (flat tax, no shipping).
    pub fn summary(&self) -> CartSummary {
        let items = self.lines();
        let count = items.iter().map(|l| l.quantity).sum();
        let subtotal: f64 = items.iter().map(|l| l.price * l.quantity as f64).sum();
        let tax = subtotal * TAX_RATE;
        CartSummary {
            items,
            count,
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: i64, name: &str, price: f64) -> CartProduct {
        CartProduct {
            id,
            name: name.to_string(),
            price,
            image: format!("/assets/products/{id}.png"),
        }
    }

    #[test]
    fn add_inserts_a_new_line_with_the_given_fields() {
        let cart = CartState::new();
        cart.add_item(&product(7, "Espresso", 2.50), 3);

        let lines = cart.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].id, 7);
        assert_eq!(lines[0].name, "Espresso");
        assert_eq!(lines[0].price, 2.50);
        assert_eq!(lines[0].quantity, 3);
        assert_eq!(cart.count(), 3);
    }

    #[test]
    fn add_merges_quantity_and_refreshes_line_fields() {
        let cart = CartState::new();
        cart.add_item(&product(7, "Espresso", 2.50), 1);
        cart.add_item(&product(7, "Espresso Doppio", 2.80), 2);

        let lines = cart.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].quantity, 3);
        assert_eq!(lines[0].name, "Espresso Doppio");
        assert_eq!(lines[0].price, 2.80);
    }

    #[test]
    fn quantity_dropping_to_zero_removes_the_line() {
        let cart = CartState::new();
        cart.add_item(&product(7, "Espresso", 2.50), 2);
        cart.add_item(&product(7, "Espresso", 2.50), -2);

        assert!(cart.is_empty());
        assert_eq!(cart.count(), 0);
    }

    #[test]
    fn quantity_dropping_below_zero_also_removes_the_line() {
        let cart = CartState::new();
        cart.add_item(&product(7, "Espresso", 2.50), 1);
        cart.add_item(&product(7, "Espresso", 2.50), -5);

        assert!(cart.is_empty());
    }

    #[test]
    fn negative_delta_for_an_absent_id_is_a_no_op() {
        let cart = CartState::new();
        cart.add_item(&product(7, "Espresso", 2.50), -1);
        assert!(cart.is_empty());
    }

    #[test]
    fn count_always_equals_the_sum_of_line_quantities() {
        let cart = CartState::new();
        cart.add_item(&product(1, "Espresso", 2.50), 2);
        cart.add_item(&product(2, "Latte", 3.75), 1);
        cart.add_item(&product(1, "Espresso", 2.50), -1);
        cart.add_item(&product(3, "Croissant", 1.80), 4);
        cart.add_item(&product(2, "Latte", 3.75), -1);

        let lines = cart.lines();
        let summed: i64 = lines.iter().map(|l| l.quantity).sum();
        assert_eq!(cart.count(), summed);
        assert!(lines.iter().all(|l| l.quantity >= 1));
    }

    #[test]
    fn remove_deletes_by_id_and_ignores_unknown_ids() {
        let cart = CartState::new();
        cart.add_item(&product(1, "Espresso", 2.50), 1);
        cart.add_item(&product(2, "Latte", 3.75), 1);

        cart.remove_item(1);
        cart.remove_item(99);

        let lines = cart.lines();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].id, 2);
    }

    #[test]
    fn clear_empties_the_cart() {
        let cart = CartState::new();
        cart.add_item(&product(1, "Espresso", 2.50), 2);
        cart.add_item(&product(2, "Latte", 3.75), 1);
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), 0.0);
    }

    #[test]
    fn lines_keep_insertion_order() {
        let cart = CartState::new();
        cart.add_item(&product(3, "Croissant", 1.80), 1);
        cart.add_item(&product(1, "Espresso", 2.50), 1);
        cart.add_item(&product(2, "Latte", 3.75), 1);
        cart.add_item(&product(3, "Croissant", 1.80), 1);

        let ids: Vec<i64> = cart.lines().iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn summary_totals_follow_the_flat_tax_rule() {
        let cart = CartState::new();
        cart.add_item(&product(1, "Espresso", 10.00), 2);

        let summary = cart.summary();
        assert_eq!(summary.subtotal, 20.00);
        assert_eq!(summary.tax, 2.00);
        assert_eq!(summary.total, 22.00);
        assert_eq!(summary.count, 2);
    }

    #[test]
    fn round2_rounds_half_up_at_two_decimals() {
        assert_eq!(round2(1.005_000_1), 1.01);
        assert_eq!(round2(2.444), 2.44);
        assert_eq!(round2(2.446), 2.45);
        assert_eq!(round2(10.0), 10.0);
    }
}
