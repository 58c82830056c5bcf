//! Price Parsing and Formatting Helpers
//!
//! Prices reach the storefront as bare numbers, numeric strings or display
//! strings such as `"LKR 1,234.00"`. Parsing is tolerant: anything that is not
//! a number becomes `0.0` instead of an error.

use serde::{Deserialize, Deserializer};

use super::models::Amount;

/// Currency label used for every displayed price.
pub const CURRENCY_PREFIX: &str = "LKR";

/// Parses a price string, ignoring every character except digits, `.` and `-`.
///
/// After stripping, the longest leading decimal number is used, so
/// `"LKR 1,234.50"` becomes `1234.5` and `"1.2.3"` becomes `1.2`.
/// Inputs with no leading number parse to `0.0`.
pub fn parse_price(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    leading_number(&cleaned)
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

/// Reads the longest `-?digits(.digits)?` prefix of an already-cleaned string.
fn leading_number(cleaned: &str) -> Option<f64> {
    let bytes = cleaned.as_bytes();
    let is_digit = |i: usize| bytes.get(i).is_some_and(u8::is_ascii_digit);

    let mut end = usize::from(bytes.first() == Some(&b'-'));
    let int_start = end;
    while is_digit(end) {
        end += 1;
    }
    let mut has_digits = end > int_start;

    if bytes.get(end) == Some(&b'.') {
        let mut frac_end = end + 1;
        while is_digit(frac_end) {
            frac_end += 1;
        }
        if frac_end > end + 1 {
            has_digits = true;
            end = frac_end;
        }
    }

    if !has_digits {
        return None;
    }

    cleaned.get(..end)?.parse().ok()
}

/// Formats a price for display, e.g. `1234.5` becomes `"LKR 1,234.50"`.
pub fn format_price(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{CURRENCY_PREFIX} {sign}{grouped}.{cents}")
}

/// Accepts identifiers sent either as JSON strings or numbers.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Identifier::deserialize(deserializer)?.into_string())
}

/// Accepts a list of string-or-number identifiers; `null` becomes empty.
pub fn deserialize_ids<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let ids = Option::<Vec<Identifier>>::deserialize(deserializer)?;
    Ok(ids
        .unwrap_or_default()
        .into_iter()
        .map(Identifier::into_string)
        .collect())
}

/// Treats an explicit `null` the same as a missing field.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Reads a count that may arrive as a number or a numeric string.
///
/// Negative and non-numeric values clamp to zero.
pub fn deserialize_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let amount = Option::<Amount>::deserialize(deserializer)?;
    Ok(amount.map_or(0, |amount| to_count(amount.value())))
}

/// Converts a parsed amount into a non-negative whole count.
pub fn to_count(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Identifier {
    Text(String),
    Integer(i64),
    Float(f64),
}

impl Identifier {
    fn into_string(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Integer(number) => number.to_string(),
            Self::Float(number) => number.to_string(),
        }
    }
}
