//! Blog post repository for database operations
//!
//! This module provides the BlogPostRepository struct which encapsulates
//! SeaORM operations for the blog_posts table. `published_at` is a latch:
//! set on the first transition to published, never rewritten afterwards.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::blog_post::{self, Entity as BlogPost};

/// Sort orders accepted by the post listing endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlogSort {
    /// Newest first by creation time (default)
    #[default]
    Newest,
    /// Most recently published first
    RecentlyPublished,
}

impl BlogSort {
    /// Parses a query-string sort key, falling back to newest-first
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("published") => BlogSort::RecentlyPublished,
            _ => BlogSort::Newest,
        }
    }
}

/// Filters applied to post listings
#[derive(Debug, Clone, Default)]
pub struct BlogPostFilter {
    /// Restrict to one publication status
    pub status: Option<String>,
    /// Restrict to one blog category
    pub blog_category_id: Option<Uuid>,
    /// Case-insensitive substring match over title and excerpt
    pub search: Option<String>,
    /// Result ordering
    pub sort: BlogSort,
}

/// Repository for blog post database operations
#[derive(Debug, Clone)]
pub struct BlogPostRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl BlogPostRepository {
    /// Creates a new BlogPostRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a post by its ID
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<blog_post::Model>> {
        Ok(BlogPost::find_by_id(*id).one(&*self.db).await?)
    }

    /// Finds a post by its slug
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<blog_post::Model>> {
        Ok(BlogPost::find()
            .filter(blog_post::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?)
    }

    /// Checks whether a slug is already in use, optionally ignoring one row
    pub async fn slug_taken(&self, slug: &str, exclude: Option<&Uuid>) -> Result<bool> {
        let mut query = BlogPost::find().filter(blog_post::Column::Slug.eq(slug));
        if let Some(id) = exclude {
            query = query.filter(blog_post::Column::Id.ne(*id));
        }
        Ok(query.count(&*self.db).await? > 0)
    }

    /// Creates a new post record
    ///
    /// A post created directly as published gets its `published_at` set now.
    pub async fn create(&self, post: blog_post::ActiveModel) -> Result<blog_post::Model> {
        let id = post
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("blog post id must be set"))?;

        let mut active = post;
        if active.status.clone().take().as_deref() == Some("published") {
            active.published_at = Set(Some(Utc::now().into()));
        }
        active.insert(&*self.db).await?;

        // For SQLite, query the record directly since we already know the ID
        let fetched = BlogPost::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("blog post not persisted"))
    }

    /// Lists posts matching `filter`, returning one page plus the total count
    pub async fn list(
        &self,
        filter: &BlogPostFilter,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<blog_post::Model>, u64)> {
        let condition = Self::filter_condition(filter);

        let total = BlogPost::find()
            .filter(condition.clone())
            .count(&*self.db)
            .await?;

        let mut query = BlogPost::find().filter(condition);
        query = match filter.sort {
            BlogSort::Newest => query
                .order_by_desc(blog_post::Column::CreatedAt)
                .order_by_desc(blog_post::Column::Id),
            BlogSort::RecentlyPublished => query
                .order_by_desc(blog_post::Column::PublishedAt)
                .order_by_desc(blog_post::Column::Id),
        };
        let page = query.offset(offset).limit(limit).all(&*self.db).await?;

        Ok((page, total))
    }

    fn filter_condition(filter: &BlogPostFilter) -> Condition {
        let mut condition = Condition::all();
        if let Some(status) = &filter.status {
            condition = condition.add(blog_post::Column::Status.eq(status.as_str()));
        }
        if let Some(blog_category_id) = filter.blog_category_id {
            condition = condition.add(blog_post::Column::BlogCategoryId.eq(blog_category_id));
        }
        if let Some(term) = &filter.search {
            let pattern = format!("%{}%", term.to_lowercase());
            condition = condition.add(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            blog_post::Entity,
                            blog_post::Column::Title,
                        ))))
                        .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            blog_post::Entity,
                            blog_post::Column::Excerpt,
                        ))))
                        .like(pattern),
                    ),
            );
        }
        condition
    }

    /// Updates mutable fields on a post
    ///
    /// `published_at` is never merged from the caller; it latches when the
    /// merged status first becomes published.
    pub async fn update(
        &self,
        id: &Uuid,
        update: blog_post::ActiveModel,
    ) -> Result<blog_post::Model> {
        let existing = BlogPost::find_by_id(*id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Blog post with ID '{}' not found", id))?;

        let mut model: blog_post::ActiveModel = existing.clone().into();
        if let Some(title) = update.title.clone().take() {
            model.title = Set(title);
        }
        if let Some(slug) = update.slug.clone().take() {
            model.slug = Set(slug);
        }
        if let Some(excerpt) = update.excerpt.clone().take() {
            model.excerpt = Set(excerpt);
        }
        if let Some(content) = update.content.clone().take() {
            model.content = Set(content);
        }
        if let Some(author_name) = update.author_name.clone().take() {
            model.author_name = Set(author_name);
        }
        if let Some(blog_category_id) = update.blog_category_id.clone().take() {
            model.blog_category_id = Set(blog_category_id);
        }
        if let Some(tags) = update.tags.clone().take() {
            model.tags = Set(tags);
        }
        if let Some(featured_image) = update.featured_image.clone().take() {
            model.featured_image = Set(featured_image);
        }
        if let Some(seo_title) = update.seo_title.clone().take() {
            model.seo_title = Set(seo_title);
        }
        if let Some(seo_description) = update.seo_description.clone().take() {
            model.seo_description = Set(seo_description);
        }
        if let Some(og_image) = update.og_image.clone().take() {
            model.og_image = Set(og_image);
        }
        if let Some(status) = update.status.clone().take() {
            if status == "published" && existing.published_at.is_none() {
                model.published_at = Set(Some(Utc::now().into()));
            }
            model.status = Set(status);
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }

    /// Sets only the publication status, honoring the `published_at` latch
    pub async fn set_status(&self, id: &Uuid, status: &str) -> Result<blog_post::Model> {
        let existing = BlogPost::find_by_id(*id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Blog post with ID '{}' not found", id))?;

        let mut model: blog_post::ActiveModel = existing.clone().into();
        model.status = Set(status.to_string());
        if status == "published" && existing.published_at.is_none() {
            model.published_at = Set(Some(Utc::now().into()));
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }

    /// Deletes a post, returning the removed row so callers can clean up media
    pub async fn delete(&self, id: &Uuid) -> Result<Option<blog_post::Model>> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        BlogPost::delete_by_id(*id).exec(&*self.db).await?;
        Ok(Some(existing))
    }

    /// Adds `count` page views in a single atomic UPDATE
    pub async fn bump_view_counts(&self, id: &Uuid, count: i64) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        BlogPost::update_many()
            .col_expr(
                blog_post::Column::ViewCount,
                Expr::value(Expr::col(blog_post::Column::ViewCount).add(count)),
            )
            .filter(blog_post::Column::Id.eq(*id))
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    /// Counts all posts
    pub async fn count_total(&self) -> Result<u64> {
        Ok(BlogPost::find().count(&*self.db).await?)
    }

    /// Counts posts in one publication status
    pub async fn count_by_status(&self, status: &str) -> Result<u64> {
        Ok(BlogPost::find()
            .filter(blog_post::Column::Status.eq(status))
            .count(&*self.db)
            .await?)
    }

    /// Published posts for the sitemap, oldest first
    pub async fn find_for_sitemap(&self) -> Result<Vec<blog_post::Model>> {
        Ok(BlogPost::find()
            .filter(blog_post::Column::Status.eq("published"))
            .order_by_asc(blog_post::Column::PublishedAt)
            .all(&*self.db)
            .await?)
    }
}
