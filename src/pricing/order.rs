//! Order Totals
//!
//! Aggregates a checkout selection into subtotal, savings and grand total.
//! Unit prices are the prices actually charged, so the subtotal is already
//! net of discounts and the savings are measured against market price.

use serde::{Deserialize, Serialize};

use super::helpers::deserialize_id;
use super::models::{Amount, LineBreakdown, OrderTotals};

/// A line that can be priced for checkout.
pub trait PricedLine {
    /// Identifier echoed in the per-line breakdown.
    fn line_id(&self) -> &str;
    /// Price charged per unit.
    fn unit_price(&self) -> f64;
    /// Reference market price per unit, if known.
    fn market_price(&self) -> Option<f64>;
    /// Units selected.
    fn quantity(&self) -> u32;
}

/// A loosely-typed line whose prices may still be display strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLine {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    pub price: Amount,
    #[serde(default)]
    pub market_price: Option<Amount>,
    pub quantity: u32,
}

impl PricedLine for CheckoutLine {
    fn line_id(&self) -> &str {
        &self.id
    }

    fn unit_price(&self) -> f64 {
        self.price.value()
    }

    fn market_price(&self) -> Option<f64> {
        self.market_price.as_ref().map(Amount::value)
    }

    fn quantity(&self) -> u32 {
        self.quantity
    }
}

impl<L: PricedLine + ?Sized> PricedLine for &L {
    fn line_id(&self) -> &str {
        (**self).line_id()
    }

    fn unit_price(&self) -> f64 {
        (**self).unit_price()
    }

    fn market_price(&self) -> Option<f64> {
        (**self).market_price()
    }

    fn quantity(&self) -> u32 {
        (**self).quantity()
    }
}

/// Prices a single line.
///
/// A missing or zero market price means the line carries no discount, and a
/// market price below the charged price never produces a negative discount.
pub fn line_breakdown<L: PricedLine>(line: &L) -> LineBreakdown {
    let quantity = line.quantity();
    let unit_price = line.unit_price();
    let market_price = line
        .market_price()
        .filter(|price| *price > 0.0)
        .unwrap_or(unit_price);

    let line_subtotal = unit_price * f64::from(quantity);
    let line_market_total = market_price * f64::from(quantity);

    LineBreakdown {
        id: line.line_id().to_string(),
        quantity,
        unit_price,
        market_price,
        line_subtotal,
        line_market_total,
        line_discount: (line_market_total - line_subtotal).max(0.0),
    }
}

/// Computes totals over the selected lines plus a flat delivery fee.
///
/// Every total is a plain sum of the per-line figures, so splitting a
/// selection and adding the parts gives the same subtotal, market total and
/// discount.
pub fn compute_order_totals<L: PricedLine>(selected: &[L], delivery_fee: f64) -> OrderTotals {
    let lines: Vec<LineBreakdown> = selected.iter().map(line_breakdown).collect();

    let subtotal = lines.iter().map(|line| line.line_subtotal).sum::<f64>();
    let total_market_price = lines.iter().map(|line| line.line_market_total).sum::<f64>();
    let total_discount = lines.iter().map(|line| line.line_discount).sum::<f64>();

    OrderTotals {
        lines,
        subtotal,
        total_market_price,
        total_discount,
        delivery_fee,
        grand_total: subtotal + delivery_fee,
    }
}
