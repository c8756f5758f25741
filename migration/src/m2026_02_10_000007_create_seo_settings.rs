//! Migration to create the seo_settings table.
//!
//! Several configurations can be stored but at most one may be active.
//! Activation deactivates all other rows before flipping the target row on.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SeoSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SeoSettings::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SeoSettings::IsActive)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(SeoSettings::MetaTitle).text().null())
                    .col(ColumnDef::new(SeoSettings::MetaDescription).text().null())
                    .col(ColumnDef::new(SeoSettings::MetaKeywords).json_binary().null())
                    .col(ColumnDef::new(SeoSettings::OgImage).text().null())
                    .col(ColumnDef::new(SeoSettings::RobotsExtra).text().null())
                    .col(
                        ColumnDef::new(SeoSettings::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(SeoSettings::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Index on is_active for the single-active lookup
        manager
            .create_index(
                Index::create()
                    .name("idx_seo_settings_is_active")
                    .table(SeoSettings::Table)
                    .col(SeoSettings::IsActive)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop index first
        manager
            .drop_index(Index::drop().name("idx_seo_settings_is_active").to_owned())
            .await?;

        // Then drop table
        manager
            .drop_table(Table::drop().table(SeoSettings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SeoSettings {
    Table,
    Id,
    IsActive,
    MetaTitle,
    MetaDescription,
    MetaKeywords,
    OgImage,
    RobotsExtra,
    CreatedAt,
    UpdatedAt,
}
