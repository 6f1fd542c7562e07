//! Building repository for database operations
//!
//! SeaORM-backed [`BuildingStore`].

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;

use super::{BuildingStore, NewBuilding};
use crate::error::StoreError;
use crate::models::building::{self, Entity as Building};

/// Repository for building database operations
#[derive(Debug, Clone)]
pub struct BuildingRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl BuildingRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a building by its primary key
    pub async fn find_by_id(&self, id: i32) -> Result<Option<building::Model>, StoreError> {
        Ok(Building::find_by_id(id).one(&*self.db).await?)
    }
}

#[async_trait]
impl BuildingStore for BuildingRepository {
    async fn find_by_address(&self, address: &str) -> Result<Option<building::Model>, StoreError> {
        let building = Building::find()
            .filter(building::Column::Address.eq(address))
            .order_by_asc(building::Column::Id)
            .one(&*self.db)
            .await?;
        Ok(building)
    }

    async fn find_all(&self) -> Result<Vec<building::Model>, StoreError> {
        let buildings = Building::find()
            .order_by_asc(building::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(buildings)
    }

    async fn create(&self, building: NewBuilding) -> Result<building::Model, StoreError> {
        let now = Utc::now();
        let active = building::ActiveModel {
            id: NotSet,
            address: Set(building.address),
            city: Set(building.city),
            state: Set(building.state),
            zip_code: Set(building.zip_code),
            latitude: Set(building.latitude),
            longitude: Set(building.longitude),
            number_of_units: Set(building.number_of_units),
            status: Set(0),
            approval_date: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        Ok(active.insert(&*self.db).await?)
    }
}
