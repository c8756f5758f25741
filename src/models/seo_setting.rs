//! SEO settings entity model
//!
//! Several configurations can exist side by side but at most one is active;
//! activation deactivates all other rows first.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// SEO settings entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "seo_settings")]
pub struct Model {
    /// Unique identifier (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Whether this is the configuration currently served
    pub is_active: bool,

    /// Site-wide default meta title
    pub meta_title: Option<String>,

    /// Site-wide default meta description
    pub meta_description: Option<String>,

    /// Site-wide default keywords (JSON array of strings)
    #[sea_orm(column_type = "JsonBinary")]
    pub meta_keywords: Option<JsonValue>,

    /// Default Open Graph share image path
    pub og_image: Option<String>,

    /// Extra lines appended verbatim to robots.txt
    pub robots_extra: Option<String>,

    /// Timestamp when the configuration was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the configuration was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
