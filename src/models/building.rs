//! Building entity model
//!
//! SeaORM entity for the `buildings` table. A building is created once per
//! distinct address by the importer and is never updated afterwards.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Building entity representing one street address with rentable units
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "buildings")]
pub struct Model {
    /// Generated identifier (primary key)
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Street address; natural key used for grouping and lookup
    pub address: String,

    pub city: String,

    pub state: String,

    pub zip_code: String,

    /// Latitude resolved by the geocoder when the building was created
    #[sea_orm(column_type = "Double")]
    pub latitude: f64,

    /// Longitude resolved by the geocoder when the building was created
    #[sea_orm(column_type = "Double")]
    pub longitude: f64,

    /// Number of units the building advertises (not the number of unit rows)
    pub number_of_units: i32,

    /// Review status, 0 until approved
    pub status: i32,

    pub approval_date: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::unit::Entity")]
    Units,
}

impl Related<super::unit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Units.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
