//! Perk entity model
//!
//! This module contains the SeaORM entity model for the perks table, the
//! core catalog entity of the marketplace.

use chrono::{DateTime, Utc};
use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Lifecycle statuses a perk can be in.
pub const STATUSES: &[&str] = &["active", "inactive", "pending", "rejected", "expired"];

/// Approval workflow states.
pub const APPROVAL_STATUSES: &[&str] = &["pending", "approved", "rejected", "needs_revision"];

/// Click-through rate in percent, the stored `conversion_rate` value.
///
/// Zero views means a zero rate rather than a division error.
pub fn compute_conversion_rate(click_count: i64, view_count: i64) -> f64 {
    if view_count > 0 {
        (click_count as f64 / view_count as f64) * 100.0
    } else {
        0.0
    }
}

/// Perk entity representing a vendor offer in the catalog
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "perks")]
pub struct Model {
    /// Unique identifier for the perk (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Display title
    pub title: String,

    /// URL-safe unique slug derived from the title
    pub slug: String,

    /// Full description, may contain HTML
    pub description: Option<String>,

    /// Short one-line summary for cards and lists
    pub summary: Option<String>,

    /// Vendor offering the perk
    pub vendor_name: Option<String>,

    /// Vendor or offer landing page
    pub website_url: Option<String>,

    /// Human-readable discount label, e.g. "50% off first year"
    pub discount_label: Option<String>,

    /// Category the perk is filed under
    pub category_id: Option<Uuid>,

    /// Owning client account, used for edit ownership checks
    pub client_id: Option<Uuid>,

    /// Lifecycle status (active|inactive|pending|rejected|expired)
    pub status: String,

    /// Approval workflow state (pending|approved|rejected|needs_revision)
    pub approval_status: String,

    /// Reviewer note recorded on approval or rejection
    pub approval_note: Option<String>,

    /// Visibility toggle independent of status
    pub is_visible: bool,

    /// Offer window start, `None` means immediately
    pub starts_at: Option<DateTimeWithTimeZone>,

    /// Offer window end, `None` means open-ended
    pub ends_at: Option<DateTimeWithTimeZone>,

    /// Total redemptions available, `None` means unlimited
    pub quantity: Option<i32>,

    /// Redemptions consumed so far
    pub redemption_count: i32,

    /// Detail page views, flushed from the tracking queue
    pub view_count: i64,

    /// Outbound clicks, flushed from the tracking queue
    pub click_count: i64,

    /// Denormalized count of leads referencing this perk
    pub lead_count: i32,

    /// clicks / views ratio in percent, recomputed before each save
    pub conversion_rate: f64,

    /// Main image path under the media store
    pub main_image: Option<String>,

    /// Vendor logo path under the media store
    pub vendor_logo: Option<String>,

    /// Additional gallery image paths (JSON array of strings)
    #[sea_orm(column_type = "JsonBinary")]
    pub gallery: Option<JsonValue>,

    /// Per-perk SEO title override
    pub seo_title: Option<String>,

    /// Per-perk SEO description override
    pub seo_description: Option<String>,

    /// Per-perk SEO keywords (JSON array of strings)
    #[sea_orm(column_type = "JsonBinary")]
    pub seo_keywords: Option<JsonValue>,

    /// Admin who created the record, accounts live outside this service
    pub created_by: Option<Uuid>,

    /// Admin who last edited the record
    pub updated_by: Option<Uuid>,

    /// Timestamp when the perk was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the perk was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether the perk can currently be redeemed.
    ///
    /// Computed on read, never stored: the perk must be active and visible,
    /// inside its offer window, and not sold out.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        if self.status != "active" || !self.is_visible {
            return false;
        }

        if let Some(starts_at) = self.starts_at
            && now < starts_at
        {
            return false;
        }

        if let Some(ends_at) = self.ends_at
            && now >= ends_at
        {
            return false;
        }

        match self.quantity {
            Some(quantity) => self.redemption_count < quantity,
            None => true,
        }
    }

    /// Gallery paths as a plain vector, tolerating a missing or malformed column.
    pub fn gallery_paths(&self) -> Vec<String> {
        self.gallery
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

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn base_perk(now: DateTime<Utc>) -> Model {
        Model {
            id: Uuid::new_v4(),
            title: "Cloud credits".to_string(),
            slug: "cloud-credits".to_string(),
            description: None,
            summary: None,
            vendor_name: None,
            website_url: None,
            discount_label: None,
            category_id: None,
            client_id: None,
            status: "active".to_string(),
            approval_status: "approved".to_string(),
            approval_note: None,
            is_visible: true,
            starts_at: None,
            ends_at: None,
            quantity: None,
            redemption_count: 0,
            view_count: 0,
            click_count: 0,
            lead_count: 0,
            conversion_rate: 0.0,
            main_image: None,
            vendor_logo: None,
            gallery: None,
            seo_title: None,
            seo_description: None,
            seo_keywords: None,
            created_by: None,
            updated_by: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[test]
    fn test_available_when_active_and_visible() {
        let now = Utc::now();
        assert!(base_perk(now).is_available(now));
    }

    #[test]
    fn test_unavailable_outside_window() {
        let now = Utc::now();

        let not_started = Model {
            starts_at: Some((now + Duration::days(1)).into()),
            ..base_perk(now)
        };
        assert!(!not_started.is_available(now));

        let ended = Model {
            ends_at: Some((now - Duration::days(1)).into()),
            ..base_perk(now)
        };
        assert!(!ended.is_available(now));
    }

    #[test]
    fn test_unavailable_when_hidden_or_inactive() {
        let now = Utc::now();

        let hidden = Model {
            is_visible: false,
            ..base_perk(now)
        };
        assert!(!hidden.is_available(now));

        let inactive = Model {
            status: "inactive".to_string(),
            ..base_perk(now)
        };
        assert!(!inactive.is_available(now));
    }

    #[test]
    fn test_conversion_rate_handles_zero_views() {
        assert_eq!(compute_conversion_rate(10, 0), 0.0);
        assert_eq!(compute_conversion_rate(0, 100), 0.0);
        assert_eq!(compute_conversion_rate(25, 100), 25.0);
    }

    #[test]
    fn test_unavailable_when_sold_out() {
        let now = Utc::now();
        let sold_out = Model {
            quantity: Some(10),
            redemption_count: 10,
            ..base_perk(now)
        };
        assert!(!sold_out.is_available(now));

        let one_left = Model {
            quantity: Some(10),
            redemption_count: 9,
            ..base_perk(now)
        };
        assert!(one_left.is_available(now));
    }

    #[test]
    fn test_gallery_paths_tolerates_malformed_column() {
        let now = Utc::now();

        let missing = base_perk(now);
        assert!(missing.gallery_paths().is_empty());

        let malformed = Model {
            gallery: Some(serde_json::json!({"not": "an array"})),
            ..base_perk(now)
        };
        assert!(malformed.gallery_paths().is_empty());

        let mixed = Model {
            gallery: Some(serde_json::json!(["a.webp", 42, "b.webp"])),
            ..base_perk(now)
        };
        assert_eq!(mixed.gallery_paths(), vec!["a.webp", "b.webp"]);
    }
}
