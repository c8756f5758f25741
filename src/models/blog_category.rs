//! Blog category entity model

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Blog category entity, a flat grouping for posts
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "blog_categories")]
pub struct Model {
    /// Unique identifier for the blog category (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// URL-safe unique slug derived from the name
    pub slug: String,

    /// Optional description
    pub description: Option<String>,

    /// Inactive categories are hidden from public listings
    pub is_active: bool,

    /// Denormalized count of posts filed here, recomputed on demand
    pub post_count: i32,

    /// Timestamp when the blog category was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the blog category was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::blog_post::Entity")]
    Posts,
}

impl Related<super::blog_post::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Posts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
