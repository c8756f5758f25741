//! Category repository for database operations
//!
//! This module provides the CategoryRepository struct which encapsulates
//! SeaORM operations for the categories table, including the tree helpers
//! used to validate and apply reparenting.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::category::{self, Entity as Category};
use crate::models::perk;

/// Repository for category database operations
#[derive(Debug, Clone)]
pub struct CategoryRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl CategoryRepository {
    /// Creates a new CategoryRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Lists categories ordered for tree assembly (level, display order, name)
    pub async fn find_all(&self, include_inactive: bool) -> Result<Vec<category::Model>> {
        let mut query = Category::find();
        if !include_inactive {
            query = query.filter(category::Column::IsActive.eq(true));
        }
        Ok(query
            .order_by_asc(category::Column::Level)
            .order_by_asc(category::Column::DisplayOrder)
            .order_by_asc(category::Column::Name)
            .all(&*self.db)
            .await?)
    }

    /// Finds a category by its ID
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<category::Model>> {
        Ok(Category::find_by_id(*id).one(&*self.db).await?)
    }

    /// Finds a category by its slug
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<category::Model>> {
        Ok(Category::find()
            .filter(category::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?)
    }

    /// Checks whether a slug is already in use, optionally ignoring one row
    pub async fn slug_taken(&self, slug: &str, exclude: Option<&Uuid>) -> Result<bool> {
        let mut query = Category::find().filter(category::Column::Slug.eq(slug));
        if let Some(id) = exclude {
            query = query.filter(category::Column::Id.ne(*id));
        }
        Ok(query.count(&*self.db).await? > 0)
    }

    /// Creates a new category record
    pub async fn create(&self, category: category::ActiveModel) -> Result<category::Model> {
        let id = category
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("category id must be set"))?;

        let active = category;
        active.insert(&*self.db).await?;

        // For SQLite, query the record directly since we already know the ID
        let fetched = Category::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("category not persisted"))
    }

    /// Updates mutable fields on a category
    ///
    /// Parent and level changes go through [`CategoryRepository::move_to`] so
    /// the subtree stays consistent.
    pub async fn update(&self, id: &Uuid, update: category::ActiveModel) -> Result<category::Model> {
        let existing = Category::find_by_id(*id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Category with ID '{}' not found", id))?;

        let mut model: category::ActiveModel = existing.into();
        if let Some(name) = update.name.clone().take() {
            model.name = Set(name);
        }
        if let Some(slug) = update.slug.clone().take() {
            model.slug = Set(slug);
        }
        if let Some(description) = update.description.clone().take() {
            model.description = Set(description);
        }
        if let Some(display_order) = update.display_order.clone().take() {
            model.display_order = Set(display_order);
        }
        if let Some(is_active) = update.is_active.clone().take() {
            model.is_active = Set(is_active);
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }

    /// Walks the parent chain starting from `start`, returning ancestor IDs
    ///
    /// The visited set guards against pre-existing cycles in the data so the
    /// walk always terminates.
    pub async fn ancestor_chain(&self, start: Option<Uuid>) -> Result<Vec<Uuid>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = start;
        while let Some(id) = cursor {
            if !seen.insert(id) {
                break;
            }
            chain.push(id);
            cursor = Category::find_by_id(id)
                .one(&*self.db)
                .await?
                .and_then(|parent| parent.parent_id);
        }
        Ok(chain)
    }

    /// Collects every descendant of `root` breadth-first
    pub async fn descendants(&self, root: &Uuid) -> Result<Vec<category::Model>> {
        let mut result = Vec::new();
        let mut seen = HashSet::from([*root]);
        let mut frontier = vec![*root];
        while let Some(parent_id) = frontier.pop() {
            let children = Category::find()
                .filter(category::Column::ParentId.eq(parent_id))
                .all(&*self.db)
                .await?;
            for child in children {
                if seen.insert(child.id) {
                    frontier.push(child.id);
                    result.push(child);
                }
            }
        }
        Ok(result)
    }

    /// Height of the subtree rooted at `root`: max descendant level minus root level
    pub async fn subtree_height(&self, root: &category::Model) -> Result<i32> {
        let descendants = self.descendants(&root.id).await?;
        let max_level = descendants
            .iter()
            .map(|node| node.level)
            .max()
            .unwrap_or(root.level);
        Ok(max_level - root.level)
    }

    /// Reparents a category and shifts its entire subtree by the level delta
    ///
    /// Depth and cycle validation happen in the handler before this is called.
    pub async fn move_to(
        &self,
        id: &Uuid,
        new_parent: Option<Uuid>,
        new_level: i32,
    ) -> Result<category::Model> {
        let existing = Category::find_by_id(*id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Category with ID '{}' not found", id))?;
        let delta = new_level - existing.level;

        let descendant_ids: Vec<Uuid> = self
            .descendants(id)
            .await?
            .into_iter()
            .map(|node| node.id)
            .collect();

        let mut model: category::ActiveModel = existing.into();
        model.parent_id = Set(new_parent);
        model.level = Set(new_level);
        model.updated_at = Set(Utc::now().into());
        let moved = model.update(&*self.db).await?;

        if delta != 0 && !descendant_ids.is_empty() {
            Category::update_many()
                .col_expr(
                    category::Column::Level,
                    Expr::col(category::Column::Level).add(delta),
                )
                .filter(category::Column::Id.is_in(descendant_ids))
                .exec(&*self.db)
                .await?;
        }

        Ok(moved)
    }

    /// Deletes a category after detaching its direct children
    ///
    /// Each child becomes a new root (parent cleared, level 0) and its own
    /// subtree is shifted up accordingly, so no orphan keeps a stale depth.
    pub async fn delete(&self, id: &Uuid) -> Result<()> {
        let children = Category::find()
            .filter(category::Column::ParentId.eq(*id))
            .all(&*self.db)
            .await?;
        for child in children {
            self.move_to(&child.id, None, 0).await?;
        }
        Category::delete_by_id(*id).exec(&*self.db).await?;
        Ok(())
    }

    /// Overwrites the denormalized perk counter with a recomputed value
    pub async fn set_perk_count(&self, id: &Uuid, count: i32) -> Result<()> {
        Category::update_many()
            .col_expr(category::Column::PerkCount, Expr::value(count))
            .filter(category::Column::Id.eq(*id))
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    /// Recomputes every category's perk counter from the perks table
    ///
    /// The counter is never touched on perk writes; callers trigger this
    /// batch recompute after membership changes. Returns the number of
    /// categories whose counter changed.
    pub async fn recount_perks(&self) -> Result<u64> {
        let categories = self.find_all(true).await?;
        let mut corrected = 0u64;
        for category in categories {
            let actual = perk::Entity::find()
                .filter(perk::Column::CategoryId.eq(category.id))
                .count(&*self.db)
                .await? as i32;
            if actual != category.perk_count {
                self.set_perk_count(&category.id, actual).await?;
                corrected += 1;
            }
        }
        Ok(corrected)
    }

    /// Counts all categories
    pub async fn count_total(&self) -> Result<u64> {
        Ok(Category::find().count(&*self.db).await?)
    }

    /// Counts active categories
    pub async fn count_active(&self) -> Result<u64> {
        Ok(Category::find()
            .filter(category::Column::IsActive.eq(true))
            .count(&*self.db)
            .await?)
    }

    /// Categories created since `since`, newest first
    pub async fn created_since(
        &self,
        since: chrono::DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<category::Model>> {
        Ok(Category::find()
            .filter(category::Column::CreatedAt.gte(since))
            .order_by_desc(category::Column::CreatedAt)
            .order_by_desc(category::Column::Id)
            .limit(limit)
            .all(&*self.db)
            .await?)
    }
}
