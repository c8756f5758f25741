//! Category entity model
//!
//! This module contains the SeaORM entity model for the categories table.
//! Categories form a tree at most [`MAX_DEPTH`] + 1 levels deep; a node's
//! `level` is its distance from the root.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// Deepest allowed category level (levels run 0 through 3).
pub const MAX_DEPTH: i32 = 3;

/// Category entity representing a node in the perk category tree
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "categories")]
pub struct Model {
    /// Unique identifier for the category (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// URL-safe unique slug derived from the name
    pub slug: String,

    /// Optional description shown on category pages
    pub description: Option<String>,

    /// Parent category, `None` for roots
    pub parent_id: Option<Uuid>,

    /// Depth in the tree, 0 for roots
    pub level: i32,

    /// Manual ordering among siblings
    pub display_order: i32,

    /// Inactive categories are hidden from public listings
    pub is_active: bool,

    /// Denormalized count of perks in this category, recomputed on demand
    pub perk_count: i32,

    /// Timestamp when the category was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the category was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(belongs_to = "Entity", from = "Column::ParentId", to = "Column::Id")]
    Parent,
    #[sea_orm(has_many = "super::perk::Entity")]
    Perks,
}

impl Related<super::perk::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Perks.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
