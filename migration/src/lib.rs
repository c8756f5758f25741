//! Database migrations for the Perks API.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2026_02_10_000001_create_categories;
mod m2026_02_10_000002_create_perks;
mod m2026_02_10_000003_create_leads;
mod m2026_02_10_000004_create_blog_categories;
mod m2026_02_10_000005_create_blog_posts;
mod m2026_02_10_000006_create_site_settings;
mod m2026_02_10_000007_create_seo_settings;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2026_02_10_000001_create_categories::Migration),
            Box::new(m2026_02_10_000002_create_perks::Migration),
            Box::new(m2026_02_10_000003_create_leads::Migration),
            Box::new(m2026_02_10_000004_create_blog_categories::Migration),
            Box::new(m2026_02_10_000005_create_blog_posts::Migration),
            Box::new(m2026_02_10_000006_create_site_settings::Migration),
            Box::new(m2026_02_10_000007_create_seo_settings::Migration),
        ]
    }
}
