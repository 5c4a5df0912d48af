//! Unit conversion between decimal display amounts and the ledger's base unit.
//!
//! The ledger measures value in an integer base unit with [`UNIT_DECIMALS`]
//! decimal places. Conversion is exact: no floating point is involved.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::{AtmError, AtmResult};

pub const UNIT_DECIMALS: u32 = 18;
pub const UNIT_SYMBOL: &str = "ETH";
pub const ONE_UNIT: u128 = 10u128.pow(UNIT_DECIMALS);

static AMOUNT_GRAMMAR: OnceLock<Regex> = OnceLock::new();

fn amount_grammar() -> &'static Regex {
    AMOUNT_GRAMMAR.get_or_init(|| Regex::new(r"^([0-9]*)(?:\.([0-9]*))?$").expect("static amount regex"))
}

/// Parse a non-negative decimal string into base units.
pub fn to_smallest_unit(input: &str) -> AtmResult<u128> {
    let malformed = || AtmError::MalformedAmount(input.to_string());
    let trimmed = input.trim();
    let caps = amount_grammar().captures(trimmed).ok_or_else(malformed)?;
    let whole = caps.get(1).map_or("", |m| m.as_str());
    let fraction = caps.get(2).map_or("", |m| m.as_str());
    if whole.is_empty() && fraction.is_empty() {
        return Err(malformed());
    }

    // Zeros past the precision carry no value; anything else would be truncated.
    let fraction = fraction.trim_end_matches('0');
    if fraction.len() > UNIT_DECIMALS as usize {
        return Err(malformed());
    }

    let whole_units = if whole.is_empty() { 0 } else { whole.parse::<u128>().map_err(|_| malformed())? };
    let fraction_units = if fraction.is_empty() {
        0
    } else {
        let scale = 10u128.pow(UNIT_DECIMALS - fraction.len() as u32);
        fraction.parse::<u128>().map_err(|_| malformed())? * scale
    };

    whole_units
        .checked_mul(ONE_UNIT)
        .and_then(|v| v.checked_add(fraction_units))
        .ok_or_else(malformed)
}

/// Render base units in canonical decimal form (`2`, `0.5`, `1.000000000000000001`).
pub fn to_decimal_display(value: u128) -> String {
    let whole = value / ONE_UNIT;
    let fraction = value % ONE_UNIT;
    if fraction == 0 {
        return whole.to_string();
    }
    let digits = format!("{:0width$}", fraction, width = UNIT_DECIMALS as usize);
    format!("{}.{}", whole, digits.trim_end_matches('0'))
}

/// Display form with the unit symbol appended.
pub fn format_amount(value: u128) -> String {
    format!("{} {}", to_decimal_display(value), UNIT_SYMBOL)
}

/// Serde adapter writing base-unit amounts as decimal strings; `u128` exceeds
/// what JSON numbers carry safely.
pub mod base_units {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(D::Error::custom)
    }

    pub mod option {
        use serde::Serializer;

        pub fn serialize<S: Serializer>(value: &Option<u128>, s: S) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => s.collect_str(v),
                None => s.serialize_none(),
            }
        }
    }
}
