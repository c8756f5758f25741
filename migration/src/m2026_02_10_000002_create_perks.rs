//! Migration to create the perks table.
//!
//! Perks are the core catalog entity: vendor offers with lifecycle status,
//! an approval workflow, engagement counters and per-perk SEO overrides.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Perks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Perks::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Perks::Title).text().not_null())
                    .col(ColumnDef::new(Perks::Slug).text().not_null())
                    .col(ColumnDef::new(Perks::Description).text().null())
                    .col(ColumnDef::new(Perks::Summary).text().null())
                    .col(ColumnDef::new(Perks::VendorName).text().null())
                    .col(ColumnDef::new(Perks::WebsiteUrl).text().null())
                    .col(ColumnDef::new(Perks::DiscountLabel).text().null())
                    .col(ColumnDef::new(Perks::CategoryId).uuid().null())
                    .col(ColumnDef::new(Perks::ClientId).uuid().null())
                    .col(
                        ColumnDef::new(Perks::Status)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(
                        ColumnDef::new(Perks::ApprovalStatus)
                            .text()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(Perks::ApprovalNote).text().null())
                    .col(
                        ColumnDef::new(Perks::IsVisible)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Perks::StartsAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Perks::EndsAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(Perks::Quantity).integer().null())
                    .col(
                        ColumnDef::new(Perks::RedemptionCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Perks::ViewCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Perks::ClickCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Perks::LeadCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Perks::ConversionRate)
                            .double()
                            .not_null()
                            .default(0.0),
                    )
                    .col(ColumnDef::new(Perks::MainImage).text().null())
                    .col(ColumnDef::new(Perks::VendorLogo).text().null())
                    .col(ColumnDef::new(Perks::Gallery).json_binary().null())
                    .col(ColumnDef::new(Perks::SeoTitle).text().null())
                    .col(ColumnDef::new(Perks::SeoDescription).text().null())
                    .col(ColumnDef::new(Perks::SeoKeywords).json_binary().null())
                    .col(ColumnDef::new(Perks::CreatedBy).uuid().null())
                    .col(ColumnDef::new(Perks::UpdatedBy).uuid().null())
                    .col(
                        ColumnDef::new(Perks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Perks::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_perks_category_id")
                            .from(Perks::Table, Perks::CategoryId)
                            .to(Categories::Table, Categories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Slugs are the public lookup key and must be unique
        manager
            .create_index(
                Index::create()
                    .name("idx_perks_slug")
                    .table(Perks::Table)
                    .col(Perks::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index on status for public listing filters
        manager
            .create_index(
                Index::create()
                    .name("idx_perks_status")
                    .table(Perks::Table)
                    .col(Perks::Status)
                    .to_owned(),
            )
            .await?;

        // Index on category_id for per-category listings and counter recounts
        manager
            .create_index(
                Index::create()
                    .name("idx_perks_category_id")
                    .table(Perks::Table)
                    .col(Perks::CategoryId)
                    .to_owned(),
            )
            .await?;

        // Index on client_id for ownership checks on admin edits
        manager
            .create_index(
                Index::create()
                    .name("idx_perks_client_id")
                    .table(Perks::Table)
                    .col(Perks::ClientId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop indexes first
        manager
            .drop_index(Index::drop().name("idx_perks_slug").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_perks_status").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_perks_category_id").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_perks_client_id").to_owned())
            .await?;

        // Then drop table
        manager
            .drop_table(Table::drop().table(Perks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Perks {
    Table,
    Id,
    Title,
    Slug,
    Description,
    Summary,
    VendorName,
    WebsiteUrl,
    DiscountLabel,
    CategoryId,
    ClientId,
    Status,
    ApprovalStatus,
    ApprovalNote,
    IsVisible,
    StartsAt,
    EndsAt,
    Quantity,
    RedemptionCount,
    ViewCount,
    ClickCount,
    LeadCount,
    ConversionRate,
    MainImage,
    VendorLogo,
    Gallery,
    SeoTitle,
    SeoDescription,
    SeoKeywords,
    CreatedBy,
    UpdatedBy,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Categories {
    Table,
    Id,
}
