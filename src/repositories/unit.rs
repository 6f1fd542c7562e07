//! Unit repository for database operations
//!
//! SeaORM-backed [`UnitStore`].

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;

use super::{NewUnit, UnitStore};
use crate::error::StoreError;
use crate::models::unit::{self, Entity as Unit};

/// Repository for unit database operations
#[derive(Debug, Clone)]
pub struct UnitRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl UnitRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UnitStore for UnitRepository {
    async fn find_by_building(&self, building_id: i32) -> Result<Vec<unit::Model>, StoreError> {
        let units = Unit::find()
            .filter(unit::Column::BuildingId.eq(building_id))
            .order_by_asc(unit::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(units)
    }

    async fn find_all(&self) -> Result<Vec<unit::Model>, StoreError> {
        let units = Unit::find()
            .order_by_asc(unit::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(units)
    }

    async fn create(&self, unit: NewUnit) -> Result<unit::Model, StoreError> {
        let now = Utc::now();
        let active = unit::ActiveModel {
            id: NotSet,
            building_id: Set(unit.building_id),
            unit_number: Set(unit.unit_number),
            price: Set(unit.price),
            have_keys: Set(unit.have_keys),
            square_feet: Set(unit.square_feet),
            number_of_bathrooms: Set(unit.number_of_bathrooms),
            approval_date: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        Ok(active.insert(&*self.db).await?)
    }
}
