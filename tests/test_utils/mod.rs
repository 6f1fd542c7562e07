//! Test utilities for database and import testing.
//!
//! Provides an in-memory SQLite database with migrations applied, a scripted
//! geocoder that records its queries, and helpers for writing CSV fixtures.

#![allow(dead_code)]

use anyhow::Result;
use async_trait::async_trait;
use listings::geocoding::{GeoPoint, Geocoder, GeocodingError};
use listings::import::{ImportOptions, Importer};
use listings::models::{building, unit};
use listings::repositories::{
    BuildingRepository, BuildingStore, NewBuilding, NewUnit, UnitRepository, UnitStore,
};
use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;

pub const HEADER: &str =
    "address,city,state,zipCode,unitNumber,numberOfUnits,price,haveKeys,squareFeet,numberOfBathrooms";

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;
    Migrator::up(&db, None).await?;
    Ok(db)
}

/// Same as [`setup_test_db`], wrapped in an `Arc` for the repositories.
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    Ok(Arc::new(setup_test_db().await?))
}

/// What [`FakeGeocoder`] answers for a query.
#[derive(Debug, Clone)]
pub enum FakeResponse {
    Point(GeoPoint),
    Empty,
    Fail,
    Delay(Duration, GeoPoint),
}

/// Scripted geocoder. Answers `default` unless a registered address prefix
/// matches the query; every query is recorded.
pub struct FakeGeocoder {
    default: FakeResponse,
    overrides: Vec<(String, FakeResponse)>,
    calls: Mutex<Vec<String>>,
}

impl FakeGeocoder {
    pub fn new() -> Self {
        Self::answering(FakeResponse::Point(GeoPoint {
            latitude: 40.7128,
            longitude: -74.006,
        }))
    }

    pub fn answering(default: FakeResponse) -> Self {
        Self {
            default,
            overrides: Vec::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_response(mut self, address: &str, response: FakeResponse) -> Self {
        self.overrides.push((address.to_string(), response));
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn geocode(&self, query: &str) -> Result<Vec<GeoPoint>, GeocodingError> {
        self.calls.lock().unwrap().push(query.to_string());
        let response = self
            .overrides
            .iter()
            .find(|(address, _)| query.starts_with(address.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| self.default.clone());

        match response {
            FakeResponse::Point(point) => Ok(vec![point]),
            FakeResponse::Empty => Ok(Vec::new()),
            FakeResponse::Fail => Err(GeocodingError::Provider {
                status: "REQUEST_DENIED".to_string(),
                message: "scripted failure".to_string(),
            }),
            FakeResponse::Delay(delay, point) => {
                tokio::time::sleep(delay).await;
                Ok(vec![point])
            }
        }
    }
}

/// Repositories and geocoder wired to one in-memory database.
pub struct Harness {
    pub db: Arc<DatabaseConnection>,
    pub buildings: Arc<BuildingRepository>,
    pub units: Arc<UnitRepository>,
    pub geocoder: Arc<FakeGeocoder>,
}

impl Harness {
    pub async fn new() -> Result<Self> {
        Self::with_geocoder(FakeGeocoder::new()).await
    }

    pub async fn with_geocoder(geocoder: FakeGeocoder) -> Result<Self> {
        let db = setup_test_db_arc().await?;
        Ok(Self {
            buildings: Arc::new(BuildingRepository::new(db.clone())),
            units: Arc::new(UnitRepository::new(db.clone())),
            geocoder: Arc::new(geocoder),
            db,
        })
    }

    pub fn importer(&self, options: ImportOptions) -> Importer {
        Importer::new(
            self.buildings.clone(),
            self.units.clone(),
            self.geocoder.clone(),
            options,
        )
    }

    pub async fn insert_building(&self, address: &str) -> Result<building::Model> {
        Ok(self
            .buildings
            .create(NewBuilding {
                address: address.to_string(),
                city: "New York".to_string(),
                state: "NY".to_string(),
                zip_code: "10036".to_string(),
                latitude: 40.7549,
                longitude: -73.9865,
                number_of_units: 10,
            })
            .await?)
    }

    pub async fn insert_unit(&self, building_id: i32, unit_number: i32) -> Result<unit::Model> {
        Ok(self
            .units
            .create(NewUnit {
                building_id,
                unit_number,
                price: Decimal::new(1000, 0),
                have_keys: true,
                square_feet: Decimal::new(800, 0),
                number_of_bathrooms: Decimal::ONE,
            })
            .await?)
    }

    pub async fn building(&self, address: &str) -> Result<Option<building::Model>> {
        Ok(self.buildings.find_by_address(address).await?)
    }

    pub async fn all_buildings(&self) -> Result<Vec<building::Model>> {
        Ok(self.buildings.find_all().await?)
    }

    pub async fn all_units(&self) -> Result<Vec<unit::Model>> {
        Ok(self.units.find_all().await?)
    }
}

/// A CSV data line for `address` in New York.
pub fn csv_row(address: &str, zip_code: &str, unit_number: i32) -> String {
    format!("{address},New York,NY,{zip_code},{unit_number},10,1500,true,750,1")
}

/// Header plus `rows`, newline-terminated.
pub fn csv_text(rows: &[String]) -> String {
    let mut text = format!("{HEADER}\n");
    for row in rows {
        text.push_str(row);
        text.push('\n');
    }
    text
}

/// Writes `contents` to a temporary `.csv` file kept alive by the handle.
pub fn write_csv(contents: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile()?;
    file.write_all(contents.as_bytes())?;
    file.flush()?;
    Ok(file)
}
