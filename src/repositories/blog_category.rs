//! Blog category repository for database operations
//!
//! Flat taxonomy companion to the hierarchical perk categories; the
//! `post_count` counter follows the same explicit-recompute contract.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::blog_category::{self, Entity as BlogCategory};
use crate::models::blog_post;

/// Repository for blog category database operations
#[derive(Debug, Clone)]
pub struct BlogCategoryRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl BlogCategoryRepository {
    /// Creates a new BlogCategoryRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists blog categories ordered by name
    pub async fn find_all(&self, include_inactive: bool) -> Result<Vec<blog_category::Model>> {
        let mut query = BlogCategory::find();
        if !include_inactive {
            query = query.filter(blog_category::Column::IsActive.eq(true));
        }
        Ok(query
            .order_by_asc(blog_category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Finds a blog category by its ID
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<blog_category::Model>> {
        Ok(BlogCategory::find_by_id(*id).one(&*self.db).await?)
    }

    /// Finds a blog category by its slug
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<blog_category::Model>> {
        Ok(BlogCategory::find()
            .filter(blog_category::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?)
    }

    /// Checks whether a slug is already in use, optionally ignoring one row
    pub async fn slug_taken(&self, slug: &str, exclude: Option<&Uuid>) -> Result<bool> {
        let mut query = BlogCategory::find().filter(blog_category::Column::Slug.eq(slug));
        if let Some(id) = exclude {
            query = query.filter(blog_category::Column::Id.ne(*id));
        }
        Ok(query.count(&*self.db).await? > 0)
    }

    /// Creates a new blog category record
    pub async fn create(
        &self,
        category: blog_category::ActiveModel,
    ) -> Result<blog_category::Model> {
        let id = category
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("blog category id must be set"))?;

        let active = category;
        active.insert(&*self.db).await?;

        // For SQLite, query the record directly since we already know the ID
        let fetched = BlogCategory::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("blog category not persisted"))
    }

    /// Updates mutable fields on a blog category
    pub async fn update(
        &self,
        id: &Uuid,
        update: blog_category::ActiveModel,
    ) -> Result<blog_category::Model> {
        let existing = BlogCategory::find_by_id(*id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Blog category with ID '{}' not found", id))?;

        let mut model: blog_category::ActiveModel = existing.into();
        if let Some(name) = update.name.clone().take() {
            model.name = Set(name);
        }
        if let Some(slug) = update.slug.clone().take() {
            model.slug = Set(slug);
        }
        if let Some(description) = update.description.clone().take() {
            model.description = Set(description);
        }
        if let Some(is_active) = update.is_active.clone().take() {
            model.is_active = Set(is_active);
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }

    /// Deletes a blog category; posts keep existing with a cleared reference
    pub async fn delete(&self, id: &Uuid) -> Result<()> {
        BlogCategory::delete_by_id(*id).exec(&*self.db).await?;
        Ok(())
    }

    /// Overwrites the denormalized post counter with a recomputed value
    async fn set_post_count(&self, id: &Uuid, count: i32) -> Result<()> {
        BlogCategory::update_many()
            .col_expr(blog_category::Column::PostCount, Expr::value(count))
            .filter(blog_category::Column::Id.eq(*id))
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    /// Recomputes every blog category's post counter from the posts table
    ///
    /// Batch recompute path for drift repair. Returns the number of
    /// categories whose counter changed.
    pub async fn recount_posts(&self) -> Result<u64> {
        let categories = self.find_all(true).await?;
        let mut corrected = 0u64;
        for category in categories {
            let actual = blog_post::Entity::find()
                .filter(blog_post::Column::BlogCategoryId.eq(category.id))
                .count(&*self.db)
                .await? as i32;
            if actual != category.post_count {
                self.set_post_count(&category.id, actual).await?;
                corrected += 1;
            }
        }
        Ok(corrected)
    }

    /// Counts all blog categories
    pub async fn count_total(&self) -> Result<u64> {
        Ok(BlogCategory::find().count(&*self.db).await?)
    }
}
