//! # Repository Layer
//!
//! This module contains repository implementations that encapsulate SeaORM
//! operations for database entities. Repositories hold an `Arc` to the
//! connection pool and return `anyhow::Result`, leaving HTTP error mapping
//! to the handler layer.

pub mod blog_category;
pub mod blog_post;
pub mod category;
pub mod lead;
pub mod perk;
pub mod seo_setting;
pub mod site_settings;

pub use blog_category::BlogCategoryRepository;
pub use blog_post::{BlogPostFilter, BlogPostRepository};
pub use category::CategoryRepository;
pub use lead::{LeadFilter, LeadRepository};
pub use perk::{PerkFilter, PerkRepository};
pub use seo_setting::SeoSettingRepository;
pub use site_settings::SiteSettingsRepository;
