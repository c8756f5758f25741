//! Migration to create the blog_posts table.
//!
//! published_at is set once on the first transition to published and is
//! never reset afterwards, so the original publication date survives
//! unpublish and republish cycles.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(BlogPosts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(BlogPosts::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(BlogPosts::Title).text().not_null())
                    .col(ColumnDef::new(BlogPosts::Slug).text().not_null())
                    .col(ColumnDef::new(BlogPosts::Excerpt).text().null())
                    .col(ColumnDef::new(BlogPosts::Content).text().not_null())
                    .col(ColumnDef::new(BlogPosts::AuthorName).text().null())
                    .col(ColumnDef::new(BlogPosts::BlogCategoryId).uuid().null())
                    .col(ColumnDef::new(BlogPosts::Tags).json_binary().null())
                    .col(
                        ColumnDef::new(BlogPosts::Status)
                            .text()
                            .not_null()
                            .default("draft"),
                    )
                    .col(
                        ColumnDef::new(BlogPosts::PublishedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(ColumnDef::new(BlogPosts::FeaturedImage).text().null())
                    .col(ColumnDef::new(BlogPosts::SeoTitle).text().null())
                    .col(ColumnDef::new(BlogPosts::SeoDescription).text().null())
                    .col(ColumnDef::new(BlogPosts::OgImage).text().null())
                    .col(
                        ColumnDef::new(BlogPosts::ViewCount)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(BlogPosts::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(BlogPosts::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_blog_posts_blog_category_id")
                            .from(BlogPosts::Table, BlogPosts::BlogCategoryId)
                            .to(BlogCategories::Table, BlogCategories::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Slugs are the public lookup key and must be unique
        manager
            .create_index(
                Index::create()
                    .name("idx_blog_posts_slug")
                    .table(BlogPosts::Table)
                    .col(BlogPosts::Slug)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Index on status for public listing filters
        manager
            .create_index(
                Index::create()
                    .name("idx_blog_posts_status")
                    .table(BlogPosts::Table)
                    .col(BlogPosts::Status)
                    .to_owned(),
            )
            .await?;

        // Index on published_at for chronological listings
        manager
            .create_index(
                Index::create()
                    .name("idx_blog_posts_published_at")
                    .table(BlogPosts::Table)
                    .col(BlogPosts::PublishedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Drop indexes first
        manager
            .drop_index(Index::drop().name("idx_blog_posts_slug").to_owned())
            .await?;

        manager
            .drop_index(Index::drop().name("idx_blog_posts_status").to_owned())
            .await?;

        manager
            .drop_index(
                Index::drop()
                    .name("idx_blog_posts_published_at")
                    .to_owned(),
            )
            .await?;

        // Then drop table
        manager
            .drop_table(Table::drop().table(BlogPosts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum BlogPosts {
    Table,
    Id,
    Title,
    Slug,
    Excerpt,
    Content,
    AuthorName,
    BlogCategoryId,
    Tags,
    Status,
    PublishedAt,
    FeaturedImage,
    SeoTitle,
    SeoDescription,
    OgImage,
    ViewCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum BlogCategories {
    Table,
    Id,
}
