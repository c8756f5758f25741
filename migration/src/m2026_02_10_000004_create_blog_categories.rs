//! Migration to create the blog_categories table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BlogCategories::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BlogCategories::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BlogCategories::Name).text().not_null())
                    .col(ColumnDef::new(BlogCategories::Slug).text().not_null())
                    .col(ColumnDef::new(BlogCategories::Description).text().null())
                    .col(
                        ColumnDef::new(BlogCategories::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(BlogCategories::PostCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BlogCategories::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(BlogCategories::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        // Slugs are the public lookup key and must be unique
        manager
            .create_index(
                Index::create()
                    .name("idx_blog_categories_slug")
                    .table(BlogCategories::Table)
                    .col(BlogCategories::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop index first
        manager
            .drop_index(Index::drop().name("idx_blog_categories_slug").to_owned())
            .await?;

        // Then drop table
        manager
            .drop_table(Table::drop().table(BlogCategories::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BlogCategories {
    Table,
    Id,
    Name,
    Slug,
    Description,
    IsActive,
    PostCount,
    CreatedAt,
    UpdatedAt,
}
