//! Site settings entity model
//!
//! Singleton table: the repository always reads and updates one row,
//! creating it with defaults on first access.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Site settings entity
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "site_settings")]
pub struct Model {
    /// Unique identifier (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Site display name
    pub site_name: String,

    /// Short tagline shown under the name
    pub tagline: Option<String>,

    /// Public contact email
    pub contact_email: Option<String>,

    /// Social profile links (JSON object of platform to URL)
    #[sea_orm(column_type = "JsonBinary")]
    pub social_links: Option<JsonValue>,

    /// While on, public lead submission returns 423
    pub maintenance_mode: bool,

    /// Timestamp when the settings row was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the settings row was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
