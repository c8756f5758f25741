//! SEO settings repository for database operations
//!
//! At most one configuration row is active at a time. `replace_active`
//! merges incoming values into the active row (or inserts one) and then
//! deactivates every other row inside the same transaction.

use anyhow::Result;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::seo_setting::{self, Entity as SeoSetting};

/// Repository for the SEO settings single-active configuration
#[derive(Debug, Clone)]
pub struct SeoSettingRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl SeoSettingRepository {
    /// Creates a new SeoSettingRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Returns the currently active configuration, if any
    pub async fn active(&self) -> Result<Option<seo_setting::Model>> {
        Ok(SeoSetting::find()
            .filter(seo_setting::Column::IsActive.eq(true))
            .order_by_desc(seo_setting::Column::UpdatedAt)
            .one(&*self.db)
            .await?)
    }

    /// Returns the active configuration, creating an empty one on first access
    pub async fn get_or_create_active(&self) -> Result<seo_setting::Model> {
        if let Some(active) = self.active().await? {
            return Ok(active);
        }

        let now = Utc::now();
        let defaults = seo_setting::ActiveModel {
            id: Set(Uuid::new_v4()),
            is_active: Set(true),
            meta_title: Set(None),
            meta_description: Set(None),
            meta_keywords: Set(None),
            og_image: Set(None),
            robots_extra: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        Ok(defaults.insert(&*self.db).await?)
    }

    /// Replaces the active configuration
    ///
    /// Merges `update` into the active row, inserting one when none exists,
    /// then deactivates every other row in the same transaction so exactly
    /// one row ends up active.
    pub async fn replace_active(
        &self,
        update: seo_setting::ActiveModel,
    ) -> Result<seo_setting::Model> {
        let txn = self.db.begin().await?;
        let now = Utc::now();

        let current = SeoSetting::find()
            .filter(seo_setting::Column::IsActive.eq(true))
            .order_by_desc(seo_setting::Column::UpdatedAt)
            .one(&txn)
            .await?;

        let target = match current {
            Some(existing) => {
                let mut model: seo_setting::ActiveModel = existing.into();
                if let Some(meta_title) = update.meta_title.clone().take() {
                    model.meta_title = Set(meta_title);
                }
                if let Some(meta_description) = update.meta_description.clone().take() {
                    model.meta_description = Set(meta_description);
                }
                if let Some(meta_keywords) = update.meta_keywords.clone().take() {
                    model.meta_keywords = Set(meta_keywords);
                }
                if let Some(og_image) = update.og_image.clone().take() {
                    model.og_image = Set(og_image);
                }
                if let Some(robots_extra) = update.robots_extra.clone().take() {
                    model.robots_extra = Set(robots_extra);
                }
                model.is_active = Set(true);
                model.updated_at = Set(now.into());
                model.update(&txn).await?
            }
            None => {
                let fresh = seo_setting::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    is_active: Set(true),
                    meta_title: Set(update.meta_title.clone().take().flatten()),
                    meta_description: Set(update.meta_description.clone().take().flatten()),
                    meta_keywords: Set(update.meta_keywords.clone().take().flatten()),
                    og_image: Set(update.og_image.clone().take().flatten()),
                    robots_extra: Set(update.robots_extra.clone().take().flatten()),
                    created_at: Set(now.into()),
                    updated_at: Set(now.into()),
                };
                fresh.insert(&txn).await?
            }
        };

        SeoSetting::update_many()
            .col_expr(seo_setting::Column::IsActive, Expr::value(false))
            .filter(seo_setting::Column::Id.ne(target.id))
            .filter(seo_setting::Column::IsActive.eq(true))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(target)
    }
}
