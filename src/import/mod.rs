//! # Unit Import
//!
//! Bulk import of rental units from a CSV spreadsheet:
//!
//! 1. [`parse_csv`] reads the file, validates every row into a typed
//!    [`UnitRow`] and groups rows by building address.
//! 2. [`Importer::import_units`] resolves (find-or-create) one building per
//!    address group, geocoding addresses it has not seen, then creates the
//!    units whose numbers are not already stored for that building.

pub mod parse;
pub mod reconciler;
pub mod row;

pub use parse::{AddressGroup, GroupedRows, group_rows, parse_csv, parse_csv_str};
pub use reconciler::{
    FailureMode, GroupFailure, GroupReport, ImportOptions, ImportReport, Importer,
};
pub use row::{RawUnitRow, UnitRow};
