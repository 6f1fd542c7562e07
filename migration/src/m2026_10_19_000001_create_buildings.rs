//! Migration to create the buildings table.
//!
//! Buildings are keyed by an auto-increment id; `address` is the natural key
//! used by the importer and gets a plain (non-unique) lookup index.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Buildings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Buildings::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Buildings::Address).text().not_null())
                    .col(ColumnDef::new(Buildings::City).text().not_null())
                    .col(ColumnDef::new(Buildings::State).text().not_null())
                    .col(ColumnDef::new(Buildings::ZipCode).text().not_null())
                    .col(ColumnDef::new(Buildings::Latitude).double().not_null())
                    .col(ColumnDef::new(Buildings::Longitude).double().not_null())
                    .col(ColumnDef::new(Buildings::NumberOfUnits).integer().not_null())
                    .col(
                        ColumnDef::new(Buildings::Status)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Buildings::ApprovalDate)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Buildings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Buildings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_buildings_address")
                    .table(Buildings::Table)
                    .col(Buildings::Address)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_buildings_address").to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Buildings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Buildings {
    Table,
    Id,
    Address,
    City,
    State,
    ZipCode,
    Latitude,
    Longitude,
    NumberOfUnits,
    Status,
    ApprovalDate,
    CreatedAt,
    UpdatedAt,
}
