//! Import reconciler
//!
//! Turns grouped spreadsheet rows into stored buildings and units. Each
//! address group is resolved independently and concurrently:
//!
//! - the building is looked up by address and reused when present, otherwise
//!   the address is geocoded and a new building is created;
//! - the building's existing units are fetched once and every row whose unit
//!   number is not among them is created.
//!
//! Nothing is wrapped in a transaction. Records created before a failure stay
//! in place, and a re-run picks them up through the same find-or-create path.

use futures::future::{join_all, try_join_all};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::future::Future;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::parse::{AddressGroup, GroupedRows, parse_csv};
use super::row::UnitRow;
use crate::error::{ImportError, ImportErrorKind, StoreError};
use crate::geocoding::{GeoPoint, Geocoder, GeocodingError};
use crate::models::{building::Model as BuildingModel, unit::Model as UnitModel};
use crate::repositories::{BuildingStore, NewBuilding, NewUnit, UnitStore};

/// How a failing address group affects the rest of the import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    /// Return the first group error. Groups still in flight are dropped and
    /// records already written are kept.
    #[default]
    FailFast,
    /// Run every group to completion and collect failures in the report.
    Isolate,
}

impl FromStr for FailureMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "fail_fast" | "fail-fast" | "failfast" => Ok(FailureMode::FailFast),
            "isolate" => Ok(FailureMode::Isolate),
            other => Err(format!(
                "unknown failure mode '{other}' (expected fail_fast or isolate)"
            )),
        }
    }
}

/// Tuning for a single import run.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOptions {
    pub failure_mode: FailureMode,
    /// Keep only the first row for a unit number repeated within one group.
    pub dedupe_within_batch: bool,
    pub geocode_timeout: Duration,
    pub store_timeout: Duration,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            failure_mode: FailureMode::FailFast,
            dedupe_within_batch: false,
            geocode_timeout: Duration::from_secs(10),
            store_timeout: Duration::from_secs(5),
        }
    }
}

/// Outcome for one address group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupReport {
    pub address: String,
    pub building_id: i32,
    pub building_created: bool,
    /// Unit numbers created in this run, in input order.
    pub units_created: Vec<i32>,
    /// Unit numbers skipped because they already existed.
    pub units_skipped: Vec<i32>,
}

/// A group that failed under [`FailureMode::Isolate`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupFailure {
    pub address: String,
    pub kind: ImportErrorKind,
    pub message: String,
}

/// Aggregate counts for an import run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportTotals {
    pub groups: usize,
    pub buildings_created: usize,
    pub buildings_reused: usize,
    pub units_created: usize,
    pub units_skipped: usize,
    pub failed_groups: usize,
}

/// Result of [`Importer::import_units`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    pub run_id: Uuid,
    pub groups: Vec<GroupReport>,
    pub failures: Vec<GroupFailure>,
    pub totals: ImportTotals,
}

impl ImportReport {
    fn new(run_id: Uuid, groups: Vec<GroupReport>, failures: Vec<GroupFailure>) -> Self {
        let buildings_created = groups.iter().filter(|g| g.building_created).count();
        let totals = ImportTotals {
            groups: groups.len() + failures.len(),
            buildings_created,
            buildings_reused: groups.len() - buildings_created,
            units_created: groups.iter().map(|g| g.units_created.len()).sum(),
            units_skipped: groups.iter().map(|g| g.units_skipped.len()).sum(),
            failed_groups: failures.len(),
        };
        Self {
            run_id,
            groups,
            failures,
            totals,
        }
    }

    /// Report for `address`, if that group succeeded.
    pub fn group(&self, address: &str) -> Option<&GroupReport> {
        self.groups.iter().find(|group| group.address == address)
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Reconciles grouped rows against the building and unit stores.
#[derive(Clone)]
pub struct Importer {
    buildings: Arc<dyn BuildingStore>,
    units: Arc<dyn UnitStore>,
    geocoder: Arc<dyn Geocoder>,
    options: ImportOptions,
}

impl Importer {
    pub fn new(
        buildings: Arc<dyn BuildingStore>,
        units: Arc<dyn UnitStore>,
        geocoder: Arc<dyn Geocoder>,
        options: ImportOptions,
    ) -> Self {
        Self {
            buildings,
            units,
            geocoder,
            options,
        }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Parses `path` and imports its rows.
    pub async fn import_file(&self, path: impl AsRef<Path>) -> Result<ImportReport, ImportError> {
        let grouped = parse_csv(path).await?;
        self.import_units(&grouped).await
    }

    /// Imports every address group concurrently.
    #[instrument(skip_all, fields(groups = grouped.len(), rows = grouped.row_count(), run_id = tracing::field::Empty))]
    pub async fn import_units(&self, grouped: &GroupedRows) -> Result<ImportReport, ImportError> {
        let run_id = Uuid::new_v4();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));
        info!(failure_mode = ?self.options.failure_mode, "Starting unit import");

        let report = match self.options.failure_mode {
            FailureMode::FailFast => {
                let groups = try_join_all(grouped.iter().map(|group| self.import_group(group)))
                    .await
                    .inspect_err(|error| {
                        counter!("listings_import_group_failures_total").increment(1);
                        warn!(error = %error, kind = ?error.kind(), "Import aborted");
                    })?;
                ImportReport::new(run_id, groups, Vec::new())
            }
            FailureMode::Isolate => {
                let outcomes =
                    join_all(grouped.iter().map(|group| self.import_group(group))).await;
                let mut groups = Vec::with_capacity(outcomes.len());
                let mut failures = Vec::new();
                for (group, outcome) in grouped.iter().zip(outcomes) {
                    match outcome {
                        Ok(report) => groups.push(report),
                        Err(error) => {
                            counter!("listings_import_group_failures_total").increment(1);
                            warn!(
                                address = %group.address,
                                error = %error,
                                kind = ?error.kind(),
                                "Address group failed"
                            );
                            failures.push(GroupFailure {
                                address: group.address.clone(),
                                kind: error.kind(),
                                message: error.to_string(),
                            });
                        }
                    }
                }
                ImportReport::new(run_id, groups, failures)
            }
        };

        info!(
            buildings_created = report.totals.buildings_created,
            buildings_reused = report.totals.buildings_reused,
            units_created = report.totals.units_created,
            units_skipped = report.totals.units_skipped,
            failed_groups = report.totals.failed_groups,
            "Unit import finished"
        );
        Ok(report)
    }

    #[instrument(skip_all, fields(address = %group.address, rows = group.rows.len()))]
    async fn import_group(&self, group: &AddressGroup) -> Result<GroupReport, ImportError> {
        let Some(first) = group.rows.first() else {
            return Err(ImportError::Parse {
                line: None,
                message: format!("no rows for address '{}'", group.address),
            });
        };

        let (building, building_created) = self.find_or_create_building(first).await?;
        let (units_created, units_skipped) =
            self.find_or_create_units(building.id, &group.rows).await?;

        Ok(GroupReport {
            address: group.address.clone(),
            building_id: building.id,
            building_created,
            units_created,
            units_skipped,
        })
    }

    async fn find_or_create_building(
        &self,
        row: &UnitRow,
    ) -> Result<(BuildingModel, bool), ImportError> {
        let existing = self
            .store_call("find building", self.buildings.find_by_address(&row.address))
            .await?;

        if let Some(building) = existing {
            if building.city != row.city
                || building.state != row.state
                || building.zip_code != row.zip_code
            {
                warn!(
                    building_id = building.id,
                    stored_city = %building.city,
                    stored_state = %building.state,
                    stored_zip_code = %building.zip_code,
                    row_city = %row.city,
                    row_state = %row.state,
                    row_zip_code = %row.zip_code,
                    "Existing building differs from spreadsheet; keeping stored values"
                );
            }
            counter!("listings_buildings_reused_total").increment(1);
            debug!(building_id = building.id, "Reusing existing building");
            return Ok((building, false));
        }

        let location = self.geocode(row).await?;
        let building = self
            .store_call(
                "create building",
                self.buildings.create(NewBuilding {
                    address: row.address.clone(),
                    city: row.city.clone(),
                    state: row.state.clone(),
                    zip_code: row.zip_code.clone(),
                    latitude: location.latitude,
                    longitude: location.longitude,
                    number_of_units: row.number_of_units,
                }),
            )
            .await?;

        counter!("listings_buildings_created_total").increment(1);
        info!(
            building_id = building.id,
            latitude = building.latitude,
            longitude = building.longitude,
            "Created building"
        );
        Ok((building, true))
    }

    async fn geocode(&self, row: &UnitRow) -> Result<GeoPoint, ImportError> {
        let query = row.geocode_query();
        let started = Instant::now();
        let outcome = tokio::time::timeout(
            self.options.geocode_timeout,
            self.geocoder.geocode(&query),
        )
        .await;
        histogram!("listings_geocode_latency_ms").record(started.elapsed().as_secs_f64() * 1_000.0);

        let points = match outcome {
            Err(_) => {
                return Err(ImportError::Timeout {
                    operation: format!("geocode '{}'", row.address),
                    timeout_ms: millis(self.options.geocode_timeout),
                });
            }
            Ok(result) => result.map_err(|source| ImportError::Geocoding {
                address: row.address.clone(),
                source,
            })?,
        };

        points
            .into_iter()
            .next()
            .ok_or_else(|| ImportError::Geocoding {
                address: row.address.clone(),
                source: GeocodingError::NoResults { query },
            })
    }

    /// Creates the rows whose unit number is not yet stored for the building.
    /// Returns the created and skipped unit numbers.
    async fn find_or_create_units(
        &self,
        building_id: i32,
        rows: &[UnitRow],
    ) -> Result<(Vec<i32>, Vec<i32>), ImportError> {
        let existing: Vec<UnitModel> = self
            .store_call("find units", self.units.find_by_building(building_id))
            .await?;
        let mut known: HashSet<i32> = existing.iter().map(|unit| unit.unit_number).collect();

        let mut to_create = Vec::new();
        let mut skipped = Vec::new();
        for row in rows {
            let is_new = if self.options.dedupe_within_batch {
                known.insert(row.unit_number)
            } else {
                !known.contains(&row.unit_number)
            };
            if is_new {
                to_create.push(row);
            } else {
                skipped.push(row.unit_number);
            }
        }

        if !skipped.is_empty() {
            counter!("listings_units_skipped_total").increment(skipped.len() as u64);
            debug!(building_id, skipped = ?skipped, "Skipping units that already exist");
        }

        let created =
            try_join_all(to_create.into_iter().map(|row| self.create_unit(building_id, row)))
                .await?;

        Ok((
            created.into_iter().map(|unit| unit.unit_number).collect(),
            skipped,
        ))
    }

    async fn create_unit(&self, building_id: i32, row: &UnitRow) -> Result<UnitModel, ImportError> {
        let unit = self
            .store_call(
                "create unit",
                self.units.create(NewUnit {
                    building_id,
                    unit_number: row.unit_number,
                    price: row.price,
                    have_keys: row.have_keys,
                    square_feet: row.square_feet,
                    number_of_bathrooms: row.number_of_bathrooms,
                }),
            )
            .await?;
        counter!("listings_units_created_total").increment(1);
        debug!(unit_id = unit.id, unit_number = unit.unit_number, "Created unit");
        Ok(unit)
    }

    async fn store_call<T, F>(&self, operation: &str, call: F) -> Result<T, ImportError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        match tokio::time::timeout(self.options.store_timeout, call).await {
            Ok(result) => result.map_err(ImportError::from),
            Err(_) => Err(ImportError::Timeout {
                operation: operation.to_string(),
                timeout_ms: millis(self.options.store_timeout),
            }),
        }
    }
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
