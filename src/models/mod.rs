//! # Data Models
//!
//! This module contains all the data models used throughout the Perks API.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub mod blog_category;
pub mod blog_post;
pub mod category;
pub mod lead;
pub mod perk;
pub mod seo_setting;
pub mod site_settings;

pub use blog_category::Entity as BlogCategory;
pub use blog_post::Entity as BlogPost;
pub use category::Entity as Category;
pub use lead::Entity as Lead;
pub use perk::Entity as Perk;
pub use seo_setting::Entity as SeoSetting;
pub use site_settings::Entity as SiteSettings;

/// Basic service information response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ServiceInfo {
    /// The name of the service
    pub service: String,
    /// The version of the service
    pub version: String,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            service: "perks-api".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
