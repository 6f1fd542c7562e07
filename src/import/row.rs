//! Row types for the unit spreadsheet.
//!
//! [`RawUnitRow`] mirrors the CSV header verbatim; [`UnitRow`] is the
//! validated form the importer works with.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ImportError;

/// Header names every import file must carry.
pub const REQUIRED_COLUMNS: [&str; 10] = [
    "address",
    "city",
    "state",
    "zipCode",
    "unitNumber",
    "numberOfUnits",
    "price",
    "haveKeys",
    "squareFeet",
    "numberOfBathrooms",
];

/// One CSV record keyed by header name, all values as written in the file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUnitRow {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub unit_number: String,
    pub number_of_units: String,
    pub price: String,
    pub have_keys: String,
    pub square_feet: String,
    pub number_of_bathrooms: String,
}

/// A validated spreadsheet row: building attributes plus one unit.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRow {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub unit_number: i32,
    pub number_of_units: i32,
    pub price: Decimal,
    pub have_keys: bool,
    pub square_feet: Decimal,
    pub number_of_bathrooms: Decimal,
}

impl UnitRow {
    /// Validates a raw record. `line` is the record's line in the source and
    /// is reported in [`ImportError::InvalidField`].
    pub fn try_from_raw(raw: RawUnitRow, line: u64) -> Result<Self, ImportError> {
        if raw.address.trim().is_empty() {
            return Err(invalid(line, "address", &raw.address, "must not be empty"));
        }

        Ok(Self {
            unit_number: parse_integer(line, "unitNumber", &raw.unit_number)?,
            number_of_units: parse_integer(line, "numberOfUnits", &raw.number_of_units)?,
            price: parse_amount(line, "price", &raw.price)?,
            have_keys: parse_bool(line, "haveKeys", &raw.have_keys)?,
            square_feet: parse_amount(line, "squareFeet", &raw.square_feet)?,
            number_of_bathrooms: parse_amount(line, "numberOfBathrooms", &raw.number_of_bathrooms)?,
            address: raw.address,
            city: raw.city,
            state: raw.state,
            zip_code: raw.zip_code,
        })
    }

    /// Free-text query sent to the geocoder for this row's building.
    pub fn geocode_query(&self) -> String {
        format!("{} {} {}", self.address, self.city, self.zip_code)
    }
}

fn invalid(line: u64, field: &'static str, value: &str, reason: &str) -> ImportError {
    ImportError::InvalidField {
        line,
        field,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_integer(line: u64, field: &'static str, value: &str) -> Result<i32, ImportError> {
    value
        .trim()
        .parse::<i32>()
        .map_err(|_| invalid(line, field, value, "expected an integer"))
}

/// Amounts pass through a REAL column on SQLite, which keeps 15 significant
/// digits exactly.
const MAX_SIGNIFICANT_DIGITS: usize = 15;

fn parse_amount(line: u64, field: &'static str, value: &str) -> Result<Decimal, ImportError> {
    let amount = Decimal::from_str(value.trim())
        .map_err(|_| invalid(line, field, value, "expected a decimal number"))?;
    if amount.is_sign_negative() {
        return Err(invalid(line, field, value, "must not be negative"));
    }
    if significant_digits(amount) > MAX_SIGNIFICANT_DIGITS {
        return Err(invalid(
            line,
            field,
            value,
            "more than 15 significant digits",
        ));
    }
    Ok(amount)
}

fn significant_digits(amount: Decimal) -> usize {
    amount.normalize().mantissa().unsigned_abs().to_string().len()
}

fn parse_bool(line: u64, field: &'static str, value: &str) -> Result<bool, ImportError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(invalid(line, field, value, "expected true or false")),
    }
}
