//! CSV parsing and grouping of unit rows by building address.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, instrument};

use super::row::{REQUIRED_COLUMNS, RawUnitRow, UnitRow};
use crate::error::ImportError;

const DELIMITER: u8 = b',';

/// Rows sharing one building address, in input order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressGroup {
    pub address: String,
    pub rows: Vec<UnitRow>,
}

/// Rows grouped by address, addresses kept in first-seen order.
///
/// Serializes as a JSON object `{ address: [rows...] }`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedRows {
    groups: Vec<AddressGroup>,
}

impl GroupedRows {
    /// Number of distinct addresses.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn get(&self, address: &str) -> Option<&[UnitRow]> {
        self.groups
            .iter()
            .find(|group| group.address == address)
            .map(|group| group.rows.as_slice())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, AddressGroup> {
        self.groups.iter()
    }

    /// Total number of rows across all groups.
    pub fn row_count(&self) -> usize {
        self.groups.iter().map(|group| group.rows.len()).sum()
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|group| group.address.as_str())
    }
}

impl FromIterator<UnitRow> for GroupedRows {
    fn from_iter<I: IntoIterator<Item = UnitRow>>(rows: I) -> Self {
        let mut groups: Vec<AddressGroup> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for row in rows {
            match index.get(&row.address) {
                Some(&position) => groups[position].rows.push(row),
                None => {
                    index.insert(row.address.clone(), groups.len());
                    groups.push(AddressGroup {
                        address: row.address.clone(),
                        rows: vec![row],
                    });
                }
            }
        }

        Self { groups }
    }
}

impl<'a> IntoIterator for &'a GroupedRows {
    type Item = &'a AddressGroup;
    type IntoIter = std::slice::Iter<'a, AddressGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

impl Serialize for GroupedRows {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.groups.len()))?;
        for group in &self.groups {
            map.serialize_entry(&group.address, &group.rows)?;
        }
        map.end()
    }
}

/// Groups validated rows by their `address` value.
pub fn group_rows(rows: Vec<UnitRow>) -> GroupedRows {
    rows.into_iter().collect()
}

/// Reads and parses a CSV file into rows grouped by address.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub async fn parse_csv(path: impl AsRef<Path>) -> Result<GroupedRows, ImportError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ImportError::Io {
            path: path.to_path_buf(),
            source,
        })?;

    let grouped = parse_csv_str(&text)?;
    debug!(
        addresses = grouped.len(),
        rows = grouped.row_count(),
        "Parsed unit spreadsheet"
    );
    Ok(grouped)
}

/// Parses CSV text (header row first) into rows grouped by address.
pub fn parse_csv_str(text: &str) -> Result<GroupedRows, ImportError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    check_quotes(text)?;

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(true)
        .flexible(false)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|error| map_csv_error(text, error))?
        .clone();
    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !headers.iter().any(|header| header == *column))
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::Parse {
            line: Some(1),
            message: format!("Missing required columns: {}", missing.join(", ")),
        });
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|error| map_csv_error(text, error))?;
        let line = record
            .position()
            .map(|pos| line_at(text, pos.byte()))
            .unwrap_or_default();
        let raw: RawUnitRow = record
            .deserialize(Some(&headers))
            .map_err(|error| map_csv_error(text, error))?;
        rows.push(UnitRow::try_from_raw(raw, line)?);
    }

    Ok(group_rows(rows))
}

/// 1-based line of the byte offset `byte` in `text`. Counts `\n` only, so
/// CRLF and LF input agree.
fn line_at(text: &str, byte: u64) -> u64 {
    let end = usize::try_from(byte).unwrap_or(usize::MAX).min(text.len());
    let newlines = text.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count();
    newlines as u64 + 1
}

fn map_csv_error(text: &str, error: csv::Error) -> ImportError {
    let line = error.position().map(|pos| line_at(text, pos.byte()));
    let message = match error.kind() {
        csv::ErrorKind::UnequalLengths { pos, .. } => {
            let line = pos
                .as_ref()
                .map(|pos| line_at(text, pos.byte()))
                .or(line)
                .unwrap_or_default();
            return ImportError::Parse {
                line: Some(line),
                message: format!("Number of columns on line {line} does not match header"),
            };
        }
        csv::ErrorKind::Utf8 { .. } => "Invalid UTF-8 in CSV data".to_string(),
        _ => error.to_string(),
    };
    ImportError::Parse { line, message }
}

/// Strict quote check run before the `csv` reader, which tolerates stray
/// quotes. Reports the line of the first offending quote.
fn check_quotes(text: &str) -> Result<(), ImportError> {
    let delimiter = char::from(DELIMITER);
    let mut line: u64 = 1;
    let mut quote_opened_at: Option<u64> = None;
    let mut at_field_start = true;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if quote_opened_at.is_some() {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                }
                '"' => {
                    quote_opened_at = None;
                    match chars.peek() {
                        None | Some('\n') | Some('\r') => {}
                        Some(&next) if next == delimiter => {}
                        Some(&next) => {
                            return Err(ImportError::Parse {
                                line: Some(line),
                                message: format!(
                                    "Invalid closing quote at line {line}; found '{next}' instead of delimiter '{delimiter}'"
                                ),
                            });
                        }
                    }
                }
                '\n' => line += 1,
                _ => {}
            }
            continue;
        }

        match c {
            '"' if at_field_start => {
                quote_opened_at = Some(line);
                at_field_start = false;
            }
            '"' => {
                return Err(ImportError::Parse {
                    line: Some(line),
                    message: format!("Invalid opening quote at line {line}"),
                });
            }
            '\n' => {
                line += 1;
                at_field_start = true;
            }
            '\r' => at_field_start = true,
            _ if c == delimiter => at_field_start = true,
            _ => at_field_start = false,
        }
    }

    match quote_opened_at {
        Some(opened) => Err(ImportError::Parse {
            line: Some(opened),
            message: format!("Quote not closed at line {opened}"),
        }),
        None => Ok(()),
    }
}
