//! Discount Calculation
//!
//! Pure functions that turn a product's selling price, market price and
//! discount records into a final price and a savings breakdown.

use super::helpers::format_price;
use super::models::{
    amount_or_zero, AppliedDiscount, DiscountInfo, DiscountSource, DiscountTerms, DiscountType,
    Product,
};

/// Price remaining after applying `discount` to `original_price`.
///
/// Percentage discounts remove `price * value / 100`; fixed discounts remove
/// `value` but never take the price below zero. A missing discount, or one
/// without a usable type and value, leaves the price unchanged.
pub fn discounted_price<D>(original_price: f64, discount: Option<&D>) -> f64
where
    D: DiscountTerms + ?Sized,
{
    match discount.and_then(DiscountTerms::terms) {
        Some((DiscountType::Percentage, value)) => original_price - original_price * value / 100.0,
        Some((DiscountType::Fixed, value)) => (original_price - value).max(0.0),
        Some((DiscountType::Unknown, _)) | None => original_price,
    }
}

/// Amount `discount` removes from `original_price`.
///
/// Fixed amounts are capped at the original price.
pub fn discount_amount<D>(original_price: f64, discount: Option<&D>) -> f64
where
    D: DiscountTerms + ?Sized,
{
    match discount.and_then(DiscountTerms::terms) {
        Some((DiscountType::Percentage, value)) => original_price * value / 100.0,
        Some((DiscountType::Fixed, value)) => value.min(original_price),
        Some((DiscountType::Unknown, _)) | None => 0.0,
    }
}

/// Aggregates every discount that applies to `product`.
///
/// Active product discounts and active event discounts listing the product
/// are summed against the selling price. The market discount is the positive
/// gap between market and selling price and only affects the savings figures,
/// not the final price.
pub fn total_discount(product: &Product) -> DiscountInfo {
    let original_price = amount_or_zero(product.selling_price.as_ref());
    let market_price = product
        .market_price
        .as_ref()
        .map_or(original_price, |price| price.value());

    let product_discounts = product
        .discounts
        .iter()
        .filter(|discount| discount.is_active())
        .filter_map(|discount| {
            let description = discount.description.clone();
            applied(original_price, discount, DiscountSource::Product, description)
        });

    let event_discounts = product
        .event_discounts
        .iter()
        .filter(|event| event.is_active() && event.covers(&product.id))
        .filter_map(|event| {
            applied(original_price, event, DiscountSource::Event, event.name.clone())
        });

    let applied_discounts: Vec<AppliedDiscount> = product_discounts.chain(event_discounts).collect();

    let active_discount_amount: f64 = applied_discounts.iter().map(|d| d.amount).sum();
    let market_discount_amount = (market_price - original_price).max(0.0);
    let total_amount = active_discount_amount + market_discount_amount;

    let reference_price = market_price.max(original_price);
    let total_percentage = if reference_price > 0.0 {
        (total_amount / reference_price * 100.0).round() as i64
    } else {
        0
    };

    DiscountInfo {
        original_price,
        market_price,
        final_price: (original_price - active_discount_amount).max(0.0),
        active_discount_amount,
        market_discount_amount,
        total_amount,
        total_percentage,
        has_discounts: !applied_discounts.is_empty() || market_discount_amount > 0.0,
        applied_discounts,
    }
}

/// Rounded percentage saved going from `old_price` to `new_price`.
///
/// Returns 0 when either price is zero or not a number.
pub fn discount_percentage(old_price: f64, new_price: f64) -> i64 {
    let falsy = |price: f64| price == 0.0 || price.is_nan();
    if falsy(old_price) || falsy(new_price) {
        return 0;
    }

    ((old_price - new_price) / old_price * 100.0).round() as i64
}

/// Builds the applied-discount descriptor, skipping zero-effect discounts.
fn applied<D>(
    original_price: f64,
    discount: &D,
    source: DiscountSource,
    description: Option<String>,
) -> Option<AppliedDiscount>
where
    D: DiscountTerms,
{
    let (discount_type, discount_value) = discount.terms()?;
    let amount = discount_amount(original_price, Some(discount));
    if amount <= 0.0 {
        return None;
    }

    let description = description
        .filter(|text| !text.trim().is_empty())
        .unwrap_or_else(|| describe(source, discount_type, discount_value));

    Some(AppliedDiscount {
        source,
        description,
        discount_type,
        discount_value,
        amount,
    })
}

fn describe(source: DiscountSource, discount_type: DiscountType, value: f64) -> String {
    let off = match discount_type {
        DiscountType::Percentage => format!("{value}% off"),
        _ => format!("{} off", format_price(value)),
    };

    match source {
        DiscountSource::Product => off,
        DiscountSource::Event => format!("Event: {off}"),
    }
}
