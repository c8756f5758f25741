//! Site settings repository for database operations
//!
//! The settings table is a singleton. The invariant lives in the store, not
//! in process memory: every read goes through `get_or_create`, which returns
//! the one row and creates it with defaults on first access.

use anyhow::Result;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::site_settings::{self, Entity as SiteSettings};

/// Site name used until an admin saves their own
pub const DEFAULT_SITE_NAME: &str = "Perks Marketplace";

/// Repository for the site settings singleton
#[derive(Debug, Clone)]
pub struct SiteSettingsRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl SiteSettingsRepository {
    /// Creates a new SiteSettingsRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Returns the settings row, creating it with defaults on first access
    pub async fn get_or_create(&self) -> Result<site_settings::Model> {
        if let Some(settings) = SiteSettings::find()
            .order_by_asc(site_settings::Column::CreatedAt)
            .one(&*self.db)
            .await?
        {
            return Ok(settings);
        }

        let now = Utc::now();
        let defaults = site_settings::ActiveModel {
            id: Set(Uuid::new_v4()),
            site_name: Set(DEFAULT_SITE_NAME.to_string()),
            tagline: Set(None),
            contact_email: Set(None),
            social_links: Set(None),
            maintenance_mode: Set(false),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        Ok(defaults.insert(&*self.db).await?)
    }

    /// Updates mutable fields on the singleton row
    pub async fn update(
        &self,
        update: site_settings::ActiveModel,
    ) -> Result<site_settings::Model> {
        let existing = self.get_or_create().await?;

        let mut model: site_settings::ActiveModel = existing.into();
        if let Some(site_name) = update.site_name.clone().take() {
            model.site_name = Set(site_name);
        }
        if let Some(tagline) = update.tagline.clone().take() {
            model.tagline = Set(tagline);
        }
        if let Some(contact_email) = update.contact_email.clone().take() {
            model.contact_email = Set(contact_email);
        }
        if let Some(social_links) = update.social_links.clone().take() {
            model.social_links = Set(social_links);
        }
        if let Some(maintenance_mode) = update.maintenance_mode.clone().take() {
            model.maintenance_mode = Set(maintenance_mode);
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }

    /// Whether the public lead intake is currently locked
    pub async fn maintenance_mode(&self) -> Result<bool> {
        Ok(self.get_or_create().await?.maintenance_mode)
    }
}
