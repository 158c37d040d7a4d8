//! Cart

use rust_decimal::Decimal;
use smallvec::SmallVec;

use crate::products::{Product, ProductId};

/// One cart entry: a product and how many units of it are being bought.
///
/// The line total is derived from the unit price and quantity rather than
/// stored, so it cannot drift out of sync with either.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    product_id: ProductId,
    name: String,
    unit_price: Decimal,
    quantity: u32,
}

impl CartLine {
    fn new(product: &Product) -> Self {
        Self {
            product_id: product.id,
            name: product.name.clone(),
            unit_price: product.price,
            quantity: 1,
        }
    }

    /// The product this line refers to.
    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    /// Display name captured when the product was added.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Price of a single unit.
    pub fn unit_price(&self) -> Decimal {
        self.unit_price
    }

    /// Number of units on this line, always at least 1.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// Unit price × quantity.
    pub fn line_total(&self) -> Decimal {
        self.unit_price * Decimal::from(self.quantity)
    }
}

/// An insertion-ordered cart of line items.
///
/// Adding a product that is already present merges into its existing line;
/// lines keep their position for display, so the order items were first
/// added is the order they are shown.
#[derive(Debug, Clone, Default)]
pub struct Cart {
    lines: SmallVec<[CartLine; 8]>,
}

impl Cart {
    /// Create an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one unit of `product`.
    ///
    /// If the product is already in the cart its quantity is incremented;
    /// otherwise a new line is appended. Callers are expected to have
    /// rejected out-of-stock products before adding them.
    pub fn add(&mut self, product: &Product) {
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|line| line.product_id == product.id)
        {
            line.quantity += 1;
        } else {
            self.lines.push(CartLine::new(product));
        }
    }

    /// Remove one unit of the given product.
    ///
    /// When the last unit is removed the line is dropped entirely. Removing
    /// a product that is not in the cart is a no-op.
    pub fn remove_one(&mut self, product_id: ProductId) {
        let Some(index) = self
            .lines
            .iter()
            .position(|line| line.product_id == product_id)
        else {
            return;
        };

        if let Some(line) = self.lines.get_mut(index) {
            if line.quantity > 1 {
                line.quantity -= 1;
            } else {
                self.lines.remove(index);
            }
        }
    }

    /// Sum of all line totals, before any discount.
    pub fn subtotal(&self) -> Decimal {
        self.lines
            .iter()
            .fold(Decimal::ZERO, |acc, line| acc + line.line_total())
    }

    /// The cart lines in display order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Number of lines (not units) in the cart.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Check if the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}
