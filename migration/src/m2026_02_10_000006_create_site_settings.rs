//! Migration to create the site_settings table.
//!
//! The table is a singleton: the application always reads and updates one
//! row, creating it with defaults on first access.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SiteSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SiteSettings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SiteSettings::SiteName).text().not_null())
                    .col(ColumnDef::new(SiteSettings::Tagline).text().null())
                    .col(ColumnDef::new(SiteSettings::ContactEmail).text().null())
                    .col(ColumnDef::new(SiteSettings::SocialLinks).json_binary().null())
                    .col(
                        ColumnDef::new(SiteSettings::MaintenanceMode)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(SiteSettings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SiteSettings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SiteSettings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SiteSettings {
    Table,
    Id,
    SiteName,
    Tagline,
    ContactEmail,
    SocialLinks,
    MaintenanceMode,
    CreatedAt,
    UpdatedAt,
}
