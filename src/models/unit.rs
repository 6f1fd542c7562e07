//! Unit entity model
//!
//! SeaORM entity for the `units` table. Each unit is owned by exactly one
//! building.

use super::building::Entity as Building;
use rust_decimal::Decimal;
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;

/// Unit entity representing a rentable unit inside a building
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "units")]
pub struct Model {
    /// Generated identifier (primary key)
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Owning building
    pub building_id: i32,

    /// Unit number within the building
    pub unit_number: i32,

    /// Monthly asking price
    pub price: Decimal,

    /// Whether the agent holds keys for the unit
    pub have_keys: bool,

    pub square_feet: Decimal,

    pub number_of_bathrooms: Decimal,

    pub approval_date: Option<DateTimeWithTimeZone>,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "Building",
        from = "Column::BuildingId",
        to = "super::building::Column::Id"
    )]
    Building,
}

impl Related<Building> for Entity {
    fn to() -> RelationDef {
        Relation::Building.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
