//! Perk repository for database operations
//!
//! This module provides the PerkRepository struct which encapsulates SeaORM
//! operations for the perks table: filtered listings, the moderation and SEO
//! edit paths, and the atomic counter updates applied by the tracking worker.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Alias, Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::perk::{self, Entity as Perk, compute_conversion_rate};

/// Sort orders accepted by the perk listing endpoints
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PerkSort {
    /// Newest first (default)
    #[default]
    Newest,
    /// Alphabetical by title
    Title,
    /// Most viewed first
    Views,
}

impl PerkSort {
    /// Parses a query-string sort key, falling back to newest-first
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("title") => PerkSort::Title,
            Some("views") => PerkSort::Views,
            _ => PerkSort::Newest,
        }
    }
}

/// Filters applied to perk listings
#[derive(Debug, Clone, Default)]
pub struct PerkFilter {
    /// Restrict to one lifecycle status
    pub status: Option<String>,
    /// Restrict to one approval state
    pub approval_status: Option<String>,
    /// Restrict to one category
    pub category_id: Option<Uuid>,
    /// Restrict to one owning client
    pub client_id: Option<Uuid>,
    /// Case-insensitive substring match over title and description
    pub search: Option<String>,
    /// Drop perks with `is_visible = false`
    pub visible_only: bool,
    /// Result ordering
    pub sort: PerkSort,
}

/// Repository for perk database operations
#[derive(Debug, Clone)]
pub struct PerkRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl PerkRepository {
    /// Creates a new PerkRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a perk by its ID
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<perk::Model>> {
        Ok(Perk::find_by_id(*id).one(&*self.db).await?)
    }

    /// Finds a perk by its slug
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<perk::Model>> {
        Ok(Perk::find()
            .filter(perk::Column::Slug.eq(slug))
            .one(&*self.db)
            .await?)
    }

    /// Checks whether a slug is already in use, optionally ignoring one row
    pub async fn slug_taken(&self, slug: &str, exclude: Option<&Uuid>) -> Result<bool> {
        let mut query = Perk::find().filter(perk::Column::Slug.eq(slug));
        if let Some(id) = exclude {
            query = query.filter(perk::Column::Id.ne(*id));
        }
        Ok(query.count(&*self.db).await? > 0)
    }

    /// Lists perks matching `filter`, returning one page plus the total count
    pub async fn list(
        &self,
        filter: &PerkFilter,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<perk::Model>, u64)> {
        let condition = Self::filter_condition(filter);

        let total = Perk::find()
            .filter(condition.clone())
            .count(&*self.db)
            .await?;

        let mut query = Perk::find().filter(condition);
        query = match filter.sort {
            PerkSort::Newest => query
                .order_by_desc(perk::Column::CreatedAt)
                .order_by_desc(perk::Column::Id),
            PerkSort::Title => query
                .order_by_asc(perk::Column::Title)
                .order_by_asc(perk::Column::Id),
            PerkSort::Views => query
                .order_by_desc(perk::Column::ViewCount)
                .order_by_desc(perk::Column::Id),
        };
        let page = query.offset(offset).limit(limit).all(&*self.db).await?;

        Ok((page, total))
    }

    fn filter_condition(filter: &PerkFilter) -> Condition {
        let mut condition = Condition::all();
        if let Some(status) = &filter.status {
            condition = condition.add(perk::Column::Status.eq(status.as_str()));
        }
        if let Some(approval) = &filter.approval_status {
            condition = condition.add(perk::Column::ApprovalStatus.eq(approval.as_str()));
        }
        if let Some(category_id) = filter.category_id {
            condition = condition.add(perk::Column::CategoryId.eq(category_id));
        }
        if let Some(client_id) = filter.client_id {
            condition = condition.add(perk::Column::ClientId.eq(client_id));
        }
        if filter.visible_only {
            condition = condition.add(perk::Column::IsVisible.eq(true));
        }
        if let Some(term) = &filter.search {
            let pattern = format!("%{}%", term.to_lowercase());
            condition = condition.add(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col((perk::Entity, perk::Column::Title))))
                            .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            perk::Entity,
                            perk::Column::Description,
                        ))))
                        .like(pattern),
                    ),
            );
        }
        condition
    }

    /// Creates a new perk record
    pub async fn create(&self, perk: perk::ActiveModel) -> Result<perk::Model> {
        let id = perk
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("perk id must be set"))?;

        let active = perk;
        active.insert(&*self.db).await?;

        // For SQLite, query the record directly since we already know the ID
        let fetched = Perk::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("perk not persisted"))
    }

    /// Updates mutable fields on a perk
    ///
    /// `conversion_rate` is recomputed from the stored counters on every
    /// save; counter bumps themselves do not rewrite it.
    pub async fn update(&self, id: &Uuid, update: perk::ActiveModel) -> Result<perk::Model> {
        let existing = Perk::find_by_id(*id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Perk with ID '{}' not found", id))?;

        let mut model: perk::ActiveModel = existing.clone().into();
        if let Some(title) = update.title.clone().take() {
            model.title = Set(title);
        }
        if let Some(slug) = update.slug.clone().take() {
            model.slug = Set(slug);
        }
        if let Some(description) = update.description.clone().take() {
            model.description = Set(description);
        }
        if let Some(summary) = update.summary.clone().take() {
            model.summary = Set(summary);
        }
        if let Some(vendor_name) = update.vendor_name.clone().take() {
            model.vendor_name = Set(vendor_name);
        }
        if let Some(website_url) = update.website_url.clone().take() {
            model.website_url = Set(website_url);
        }
        if let Some(discount_label) = update.discount_label.clone().take() {
            model.discount_label = Set(discount_label);
        }
        if let Some(category_id) = update.category_id.clone().take() {
            model.category_id = Set(category_id);
        }
        if let Some(status) = update.status.clone().take() {
            model.status = Set(status);
        }
        if let Some(is_visible) = update.is_visible.clone().take() {
            model.is_visible = Set(is_visible);
        }
        if let Some(starts_at) = update.starts_at.clone().take() {
            model.starts_at = Set(starts_at);
        }
        if let Some(ends_at) = update.ends_at.clone().take() {
            model.ends_at = Set(ends_at);
        }
        if let Some(quantity) = update.quantity.clone().take() {
            model.quantity = Set(quantity);
        }
        if let Some(main_image) = update.main_image.clone().take() {
            model.main_image = Set(main_image);
        }
        if let Some(vendor_logo) = update.vendor_logo.clone().take() {
            model.vendor_logo = Set(vendor_logo);
        }
        if let Some(gallery) = update.gallery.clone().take() {
            model.gallery = Set(gallery);
        }
        if let Some(seo_title) = update.seo_title.clone().take() {
            model.seo_title = Set(seo_title);
        }
        if let Some(seo_description) = update.seo_description.clone().take() {
            model.seo_description = Set(seo_description);
        }
        if let Some(seo_keywords) = update.seo_keywords.clone().take() {
            model.seo_keywords = Set(seo_keywords);
        }
        if let Some(updated_by) = update.updated_by.clone().take() {
            model.updated_by = Set(updated_by);
        }
        model.conversion_rate = Set(compute_conversion_rate(
            existing.click_count,
            existing.view_count,
        ));
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }

    /// Sets the lifecycle status
    pub async fn set_status(
        &self,
        id: &Uuid,
        status: &str,
        updated_by: Option<Uuid>,
    ) -> Result<perk::Model> {
        let existing = Perk::find_by_id(*id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Perk with ID '{}' not found", id))?;

        let mut model: perk::ActiveModel = existing.clone().into();
        model.status = Set(status.to_string());
        if updated_by.is_some() {
            model.updated_by = Set(updated_by);
        }
        model.conversion_rate = Set(compute_conversion_rate(
            existing.click_count,
            existing.view_count,
        ));
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }

    /// Records a moderation decision, replacing any previous reviewer note
    pub async fn set_approval(
        &self,
        id: &Uuid,
        approval_status: &str,
        note: Option<String>,
        updated_by: Option<Uuid>,
    ) -> Result<perk::Model> {
        let existing = Perk::find_by_id(*id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Perk with ID '{}' not found", id))?;

        let mut model: perk::ActiveModel = existing.clone().into();
        model.approval_status = Set(approval_status.to_string());
        model.approval_note = Set(note);
        if updated_by.is_some() {
            model.updated_by = Set(updated_by);
        }
        model.conversion_rate = Set(compute_conversion_rate(
            existing.click_count,
            existing.view_count,
        ));
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }

    /// Updates only the SEO override fields
    pub async fn update_seo(
        &self,
        id: &Uuid,
        seo_title: Option<String>,
        seo_description: Option<String>,
        seo_keywords: Option<JsonValue>,
        updated_by: Option<Uuid>,
    ) -> Result<perk::Model> {
        let existing = Perk::find_by_id(*id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Perk with ID '{}' not found", id))?;

        let mut model: perk::ActiveModel = existing.clone().into();
        model.seo_title = Set(seo_title);
        model.seo_description = Set(seo_description);
        model.seo_keywords = Set(seo_keywords);
        if updated_by.is_some() {
            model.updated_by = Set(updated_by);
        }
        model.conversion_rate = Set(compute_conversion_rate(
            existing.click_count,
            existing.view_count,
        ));
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }

    /// Deletes a perk, returning the removed row so callers can clean up media
    pub async fn delete(&self, id: &Uuid) -> Result<Option<perk::Model>> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        Perk::delete_by_id(*id).exec(&*self.db).await?;
        Ok(Some(existing))
    }

    /// Adds `count` page views in a single atomic UPDATE
    ///
    /// Applied by the tracking worker; does not touch `updated_at` or
    /// `conversion_rate`.
    pub async fn bump_view_counts(&self, id: &Uuid, count: i64) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        Perk::update_many()
            .col_expr(
                perk::Column::ViewCount,
                Expr::value(Expr::col(perk::Column::ViewCount).add(count)),
            )
            .filter(perk::Column::Id.eq(*id))
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    /// Adds `count` outbound clicks in a single atomic UPDATE
    pub async fn bump_click_counts(&self, id: &Uuid, count: i64) -> Result<()> {
        if count == 0 {
            return Ok(());
        }
        Perk::update_many()
            .col_expr(
                perk::Column::ClickCount,
                Expr::value(Expr::col(perk::Column::ClickCount).add(count)),
            )
            .filter(perk::Column::Id.eq(*id))
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    /// Adjusts the denormalized lead counter
    pub async fn bump_lead_count(&self, id: &Uuid, delta: i32) -> Result<()> {
        if delta == 0 {
            return Ok(());
        }
        Perk::update_many()
            .col_expr(
                perk::Column::LeadCount,
                Expr::value(Expr::col(perk::Column::LeadCount).add(delta)),
            )
            .filter(perk::Column::Id.eq(*id))
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    /// Consumes one redemption, honoring the quantity cap at the SQL level
    pub async fn bump_redemption_count(&self, id: &Uuid) -> Result<()> {
        Perk::update_many()
            .col_expr(
                perk::Column::RedemptionCount,
                Expr::value(Expr::col(perk::Column::RedemptionCount).add(1)),
            )
            .filter(perk::Column::Id.eq(*id))
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    /// Overwrites the lead counter with a recomputed value
    pub async fn set_lead_count(&self, id: &Uuid, count: i32) -> Result<()> {
        Perk::update_many()
            .col_expr(perk::Column::LeadCount, Expr::value(count))
            .filter(perk::Column::Id.eq(*id))
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    /// Counts all perks
    pub async fn count_total(&self) -> Result<u64> {
        Ok(Perk::find().count(&*self.db).await?)
    }

    /// Counts perks in one lifecycle status
    pub async fn count_by_status(&self, status: &str) -> Result<u64> {
        Ok(Perk::find()
            .filter(perk::Column::Status.eq(status))
            .count(&*self.db)
            .await?)
    }

    /// Counts perks waiting for a moderation decision
    pub async fn count_pending_approval(&self) -> Result<u64> {
        Ok(Perk::find()
            .filter(perk::Column::ApprovalStatus.eq("pending"))
            .count(&*self.db)
            .await?)
    }

    /// Most viewed perks, for the dashboard
    pub async fn top_viewed(&self, limit: u64) -> Result<Vec<perk::Model>> {
        Ok(Perk::find()
            .order_by_desc(perk::Column::ViewCount)
            .order_by_desc(perk::Column::Id)
            .limit(limit)
            .all(&*self.db)
            .await?)
    }

    /// Total views and clicks across the catalog
    ///
    /// SUM over a bigint column yields NUMERIC on Postgres, so the result is
    /// cast back to BIGINT to decode as i64 on both backends.
    pub async fn sum_views_clicks(&self) -> Result<(i64, i64)> {
        let row: Option<(Option<i64>, Option<i64>)> = Perk::find()
            .select_only()
            .column_as(
                perk::Column::ViewCount.sum().cast_as(Alias::new("BIGINT")),
                "total_views",
            )
            .column_as(
                perk::Column::ClickCount.sum().cast_as(Alias::new("BIGINT")),
                "total_clicks",
            )
            .into_tuple()
            .one(&*self.db)
            .await?;
        let (views, clicks) = row.unwrap_or((None, None));
        Ok((views.unwrap_or(0), clicks.unwrap_or(0)))
    }

    /// Perks created since `since`, newest first
    pub async fn created_since(
        &self,
        since: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<perk::Model>> {
        Ok(Perk::find()
            .filter(perk::Column::CreatedAt.gte(since))
            .order_by_desc(perk::Column::CreatedAt)
            .order_by_desc(perk::Column::Id)
            .limit(limit)
            .all(&*self.db)
            .await?)
    }

    /// Candidate rows for the sitemap: active, visible, approved
    ///
    /// Window and quantity availability is evaluated in Rust by the caller
    /// since it depends on the current time.
    pub async fn find_for_sitemap(&self) -> Result<Vec<perk::Model>> {
        Ok(Perk::find()
            .filter(perk::Column::Status.eq("active"))
            .filter(perk::Column::IsVisible.eq(true))
            .filter(perk::Column::ApprovalStatus.eq("approved"))
            .order_by_asc(perk::Column::CreatedAt)
            .all(&*self.db)
            .await?)
    }
}
