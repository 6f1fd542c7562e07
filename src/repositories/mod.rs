//! # Repository Layer
//!
//! Store traits used by the importer and their SeaORM implementations. The
//! importer only depends on [`BuildingStore`] and [`UnitStore`], so tests and
//! alternative backends can supply their own implementations.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::StoreError;
use crate::models::{building::Model as BuildingModel, unit::Model as UnitModel};

pub mod building;
pub mod unit;

pub use building::BuildingRepository;
pub use unit::UnitRepository;

/// Attributes for a building about to be created
#[derive(Debug, Clone, PartialEq)]
pub struct NewBuilding {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub latitude: f64,
    pub longitude: f64,
    pub number_of_units: i32,
}

/// Attributes for a unit about to be created
#[derive(Debug, Clone, PartialEq)]
pub struct NewUnit {
    pub building_id: i32,
    pub unit_number: i32,
    pub price: Decimal,
    pub have_keys: bool,
    pub square_feet: Decimal,
    pub number_of_bathrooms: Decimal,
}

/// Find/create capabilities over the building collection
#[async_trait]
pub trait BuildingStore: Send + Sync {
    /// Returns the oldest building stored under `address`, if any.
    async fn find_by_address(&self, address: &str) -> Result<Option<BuildingModel>, StoreError>;

    async fn find_all(&self) -> Result<Vec<BuildingModel>, StoreError>;

    async fn create(&self, building: NewBuilding) -> Result<BuildingModel, StoreError>;
}

/// Find/create capabilities over the unit collection
#[async_trait]
pub trait UnitStore: Send + Sync {
    async fn find_by_building(&self, building_id: i32) -> Result<Vec<UnitModel>, StoreError>;

    async fn find_all(&self) -> Result<Vec<UnitModel>, StoreError>;

    async fn create(&self, unit: NewUnit) -> Result<UnitModel, StoreError>;
}
