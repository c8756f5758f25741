//! Blog post entity model
//!
//! The `published_at` column is a latch: it is set on the first transition
//! to published and survives later unpublish and republish cycles.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Publication statuses a post can be in.
pub const STATUSES: &[&str] = &["draft", "published", "archived"];

/// Blog post entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "blog_posts")]
pub struct Model {
    /// Unique identifier for the post (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display title
    pub title: String,

    /// URL-safe unique slug derived from the title
    pub slug: String,

    /// Short teaser shown in listings
    pub excerpt: Option<String>,

    /// Full post body, may contain HTML
    pub content: String,

    /// Author display name
    pub author_name: Option<String>,

    /// Blog category the post is filed under
    pub blog_category_id: Option<Uuid>,

    /// Free-form tags (JSON array of strings)
    #[sea_orm(column_type = "JsonBinary")]
    pub tags: Option<JsonValue>,

    /// Publication status (draft|published|archived)
    pub status: String,

    /// First publication time, never reset once set
    pub published_at: Option<DateTimeWithTimeZone>,

    /// Featured image path under the media store
    pub featured_image: Option<String>,

    /// SEO title override
    pub seo_title: Option<String>,

    /// SEO description override
    pub seo_description: Option<String>,

    /// Open Graph share image path
    pub og_image: Option<String>,

    /// Post views, flushed from the tracking queue
    pub view_count: i64,

    /// Timestamp when the post was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the post was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::blog_category::Entity",
        from = "Column::BlogCategoryId",
        to = "super::blog_category::Column::Id"
    )]
    Category,
}

impl Related<super::blog_category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Tag list as a plain vector, tolerating a missing or malformed column.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_ref()
            .and_then(|value| value.as_array())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}
