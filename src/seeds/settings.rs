//! Settings seeding functionality
//!
//! This module seeds the singleton configuration rows: the site settings
//! row and one active SEO configuration. Both use get-or-create, so
//! running the seed against a populated database changes nothing.

use anyhow::Result;
use sea_orm::DatabaseConnection;
use std::sync::Arc;

use crate::repositories::{SeoSettingRepository, SiteSettingsRepository};

/// Seeds the settings singletons
///
/// Ensures the site settings row and an active SEO configuration exist so
/// later reads never have to handle their absence. Existing rows are left
/// untouched.
pub async fn seed_settings(db: &DatabaseConnection) -> Result<()> {
    let db = Arc::new(db.clone());

    let site = SiteSettingsRepository::new(db.clone());
    match site.get_or_create().await {
        Ok(settings) => {
            log::info!(
                "Site settings ready: '{}' (maintenance_mode={})",
                settings.site_name,
                settings.maintenance_mode
            );
        }
        Err(e) => {
            log::error!("Failed to seed site settings: {}", e);
            return Err(e);
        }
    }

    let seo = SeoSettingRepository::new(db);
    match seo.get_or_create_active().await {
        Ok(active) => {
            log::info!("Active SEO configuration ready: {}", active.id);
        }
        Err(e) => {
            log::error!("Failed to seed SEO configuration: {}", e);
            return Err(e);
        }
    }

    log::info!("Settings seeding completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, EntityTrait, PaginatorTrait};

    use crate::models::{seo_setting, site_settings};

    #[tokio::test]
    async fn test_seeding_twice_leaves_one_row_each() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        seed_settings(&db).await.unwrap();
        seed_settings(&db).await.unwrap();

        let settings_rows = site_settings::Entity::find().count(&db).await.unwrap();
        let seo_rows = seo_setting::Entity::find().count(&db).await.unwrap();
        assert_eq!(settings_rows, 1);
        assert_eq!(seo_rows, 1);
    }

    #[tokio::test]
    async fn test_seed_does_not_overwrite_saved_settings() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        seed_settings(&db).await.unwrap();

        let repo = SiteSettingsRepository::new(Arc::new(db.clone()));
        repo.update(site_settings::ActiveModel {
            site_name: sea_orm::Set("Deals Hub".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();

        seed_settings(&db).await.unwrap();
        assert_eq!(repo.get_or_create().await.unwrap().site_name, "Deals Hub");
    }
}
