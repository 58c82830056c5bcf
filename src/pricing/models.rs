//! Pricing Domain Models
//!
//! Catalog records as the remote API sends them, and the derived discount and
//! order-total views computed from them.

use serde::{Deserialize, Serialize};

use super::helpers::{deserialize_count, deserialize_id, deserialize_ids, null_as_default, parse_price};

// =============================================================================
// Wire Values
// =============================================================================

/// A monetary value sent either as a JSON number or as a (display) string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    /// Bare JSON number.
    Number(f64),
    /// String such as `"8990"` or `"LKR 8,990.00"`.
    Text(String),
}

impl Amount {
    /// Numeric value, parsed tolerantly for strings.
    pub fn value(&self) -> f64 {
        match self {
            Self::Number(number) if number.is_finite() => *number,
            Self::Number(_) => 0.0,
            Self::Text(text) => parse_price(text),
        }
    }
}

impl From<f64> for Amount {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Value of an optional amount, `0.0` when absent.
pub(crate) fn amount_or_zero(amount: Option<&Amount>) -> f64 {
    amount.map_or(0.0, Amount::value)
}

// =============================================================================
// Discounts
// =============================================================================

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    /// Value is a percentage of the price.
    #[serde(alias = "Percentage", alias = "PERCENTAGE")]
    Percentage,
    /// Value is an absolute amount off the price.
    #[serde(alias = "Fixed", alias = "FIXED")]
    Fixed,
    /// Anything else; such discounts have no effect.
    #[serde(other)]
    Unknown,
}

/// Read access shared by product and event discounts.
pub trait DiscountTerms {
    /// Raw status string, `"active"` when the discount applies.
    fn status(&self) -> Option<&str>;
    /// Declared discount type.
    fn discount_type(&self) -> Option<DiscountType>;
    /// Declared discount value.
    fn discount_value(&self) -> Option<&Amount>;

    /// Whether the status is exactly `"active"`.
    fn is_active(&self) -> bool {
        self.status() == Some("active")
    }

    /// Type and numeric value, or `None` when either is missing or unusable.
    fn terms(&self) -> Option<(DiscountType, f64)> {
        let kind = self.discount_type()?;
        let value = self.discount_value()?.value();

        match kind {
            DiscountType::Percentage | DiscountType::Fixed => Some((kind, value)),
            DiscountType::Unknown => None,
        }
    }
}

/// A discount attached directly to a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Discount {
    #[serde(rename = "Status", alias = "status", default)]
    pub status: Option<String>,

    #[serde(rename = "Discount_Type", alias = "discountType", alias = "discount_type", default)]
    pub discount_type: Option<DiscountType>,

    #[serde(rename = "Discount_Value", alias = "discountValue", alias = "discount_value", default)]
    pub discount_value: Option<Amount>,

    #[serde(rename = "Description", alias = "description", default)]
    pub description: Option<String>,
}

impl DiscountTerms for Discount {
    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn discount_type(&self) -> Option<DiscountType> {
        self.discount_type
    }

    fn discount_value(&self) -> Option<&Amount> {
        self.discount_value.as_ref()
    }
}

/// A storewide event discount that lists the products it covers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDiscount {
    #[serde(alias = "Status", default)]
    pub status: Option<String>,

    #[serde(rename = "discountType", alias = "Discount_Type", alias = "discount_type", default)]
    pub discount_type: Option<DiscountType>,

    #[serde(rename = "discountValue", alias = "Discount_Value", alias = "discount_value", default)]
    pub discount_value: Option<Amount>,

    #[serde(alias = "Event_Name", alias = "eventName", default)]
    pub name: Option<String>,

    #[serde(rename = "productIds", alias = "product_ids", default, deserialize_with = "deserialize_ids")]
    pub product_ids: Vec<String>,
}

impl EventDiscount {
    /// Whether this event lists the given product.
    pub fn covers(&self, product_id: &str) -> bool {
        self.product_ids.iter().any(|id| id == product_id)
    }
}

impl DiscountTerms for EventDiscount {
    fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn discount_type(&self) -> Option<DiscountType> {
        self.discount_type
    }

    fn discount_value(&self) -> Option<&Amount> {
        self.discount_value.as_ref()
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// A product as served by the catalog API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "Product_ID", alias = "id", alias = "productId", deserialize_with = "deserialize_id")]
    pub id: String,

    #[serde(rename = "Description", alias = "description", alias = "name", default)]
    pub description: String,

    #[serde(rename = "Selling_Price", alias = "sellingPrice", default)]
    pub selling_price: Option<Amount>,

    #[serde(rename = "Market_Price", alias = "marketPrice", default)]
    pub market_price: Option<Amount>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub discounts: Vec<Discount>,

    #[serde(rename = "eventDiscounts", alias = "event_discounts", default, deserialize_with = "null_as_default")]
    pub event_discounts: Vec<EventDiscount>,

    #[serde(alias = "Variations", default, deserialize_with = "null_as_default")]
    pub variations: Vec<Variation>,
}

/// One purchasable colour/size combination of a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    #[serde(rename = "Variation_ID", alias = "id", alias = "variationId", deserialize_with = "deserialize_id")]
    pub id: String,

    #[serde(rename = "Colour", alias = "color", alias = "Color", default)]
    pub colour: Option<String>,

    #[serde(rename = "Size", alias = "size", default)]
    pub size: Option<String>,

    #[serde(rename = "Qty", alias = "stock", alias = "qty", default, deserialize_with = "deserialize_count")]
    pub stock: u32,
}

// =============================================================================
// Derived Views
// =============================================================================

/// Where an applied discount came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscountSource {
    Product,
    Event,
}

/// One discount that contributed to a product's final price.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscount {
    #[serde(rename = "type")]
    pub source: DiscountSource,
    pub description: String,
    pub discount_type: DiscountType,
    pub discount_value: f64,
    pub amount: f64,
}

/// Price and savings breakdown for a single product.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountInfo {
    pub original_price: f64,
    pub market_price: f64,
    pub final_price: f64,
    pub active_discount_amount: f64,
    pub market_discount_amount: f64,
    pub total_amount: f64,
    pub total_percentage: i64,
    pub has_discounts: bool,
    pub applied_discounts: Vec<AppliedDiscount>,
}

/// Itemised totals for one selected line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineBreakdown {
    pub id: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub market_price: f64,
    pub line_subtotal: f64,
    pub line_market_total: f64,
    pub line_discount: f64,
}

/// Totals for a checkout selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub lines: Vec<LineBreakdown>,
    pub subtotal: f64,
    pub total_market_price: f64,
    pub total_discount: f64,
    pub delivery_fee: f64,
    pub grand_total: f64,
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn product_accepts_api_field_names() -> TestResult {
        let product: Product = serde_json::from_value(json!({
            "Product_ID": 42,
            "Description": "Linen Shirt",
            "Selling_Price": "8990.00",
            "Market_Price": 12000,
            "discounts": [
                { "Status": "active", "Discount_Type": "percentage", "Discount_Value": "10" }
            ],
            "eventDiscounts": [
                { "status": "inactive", "discountType": "fixed", "discountValue": 500, "productIds": [42, "7"] }
            ],
            "variations": [{ "Variation_ID": "V1", "Colour": "Blue", "Size": "M", "Qty": "3" }]
        }))?;

        assert_eq!(product.id, "42");
        assert_eq!(product.selling_price.as_ref().map(Amount::value), Some(8990.0));
        assert_eq!(product.discounts[0].terms(), Some((DiscountType::Percentage, 10.0)));
        assert!(product.event_discounts[0].covers("7"));
        assert!(!product.event_discounts[0].is_active());
        assert_eq!(product.variations[0].stock, 3);

        Ok(())
    }

    #[test]
    fn null_lists_become_empty() -> TestResult {
        let product: Product = serde_json::from_value(json!({
            "Product_ID": "P1",
            "discounts": null,
            "eventDiscounts": null
        }))?;

        assert!(product.discounts.is_empty());
        assert!(product.event_discounts.is_empty());

        Ok(())
    }

    #[test]
    fn unknown_discount_type_has_no_terms() -> TestResult {
        let discount: Discount = serde_json::from_value(json!({
            "Status": "active", "Discount_Type": "bogo", "Discount_Value": 1
        }))?;

        assert_eq!(discount.discount_type, Some(DiscountType::Unknown));
        assert_eq!(discount.terms(), None);

        Ok(())
    }
}
