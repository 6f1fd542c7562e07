//! Migration to create the units table.
//!
//! Units belong to exactly one building. `(building_id, unit_number)` is
//! indexed for the importer's existing-unit lookup; the index is not unique.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Units::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Units::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Units::BuildingId).integer().not_null())
                    .col(ColumnDef::new(Units::UnitNumber).integer().not_null())
                    .col(ColumnDef::new(Units::Price).decimal().not_null())
                    .col(ColumnDef::new(Units::HaveKeys).boolean().not_null())
                    .col(ColumnDef::new(Units::SquareFeet).decimal().not_null())
                    .col(ColumnDef::new(Units::NumberOfBathrooms).decimal().not_null())
                    .col(
                        ColumnDef::new(Units::ApprovalDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Units::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Units::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_units_building_id")
                            .from(Units::Table, Units::BuildingId)
                            .to(Buildings::Table, Buildings::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_units_building_unit_number")
                    .table(Units::Table)
                    .col(Units::BuildingId)
                    .col(Units::UnitNumber)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_units_building_unit_number")
                    .to_owned(),
            )
            .await?;

        manager
            .drop_table(Table::drop().table(Units::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Units {
    Table,
    Id,
    BuildingId,
    UnitNumber,
    Price,
    HaveKeys,
    SquareFeet,
    NumberOfBathrooms,
    ApprovalDate,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Buildings {
    Table,
    Id,
}
