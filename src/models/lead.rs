//! Lead entity model
//!
//! This module contains the SeaORM entity model for the leads table. Leads
//! carry denormalized perk and category names so their history survives
//! catalog deletions.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::scoring::LeadScoreInput;

/// Pipeline statuses a lead moves through.
pub const STATUSES: &[&str] = &["new", "contacted", "qualified", "converted", "closed"];

/// Manual priority levels.
pub const PRIORITIES: &[&str] = &["low", "medium", "high", "urgent"];

/// Accepted acquisition sources.
pub const SOURCES: &[&str] = &[
    "website",
    "form",
    "email",
    "phone",
    "referral",
    "social",
    "advertising",
    "other",
];

/// Lead entity representing an inbound interest submission
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "leads")]
pub struct Model {
    /// Unique identifier for the lead (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Submitter name
    pub name: String,

    /// Submitter email, unique together with perk_id
    pub email: String,

    /// Optional phone number
    pub phone: Option<String>,

    /// Optional company name
    pub company_name: Option<String>,

    /// Free-form message from the submitter
    pub message: Option<String>,

    /// Interest tags (JSON array of strings)
    #[sea_orm(column_type = "JsonBinary")]
    pub interests: Option<JsonValue>,

    /// Declared budget bracket, `not-specified` when omitted
    pub budget_range: String,

    /// Declared timeline, `flexible` when omitted
    pub timeline: String,

    /// Acquisition source, one of [`SOURCES`]
    pub source: String,

    /// Pipeline status (new|contacted|qualified|converted|closed)
    pub status: String,

    /// Manual priority (low|medium|high|urgent), derived from the score on intake
    pub priority: String,

    /// Completeness score 0..=100, recomputed on every save
    pub lead_score: i32,

    /// Perk the lead was submitted against (weak reference)
    pub perk_id: Option<Uuid>,

    /// Perk title captured at submission time
    pub perk_title: Option<String>,

    /// Category of that perk at submission time (weak reference)
    pub category_id: Option<Uuid>,

    /// Category name captured at submission time
    pub category_name: Option<String>,

    /// Staff member the lead is assigned to
    pub assigned_to: Option<Uuid>,

    /// Internal notes (JSON array of `{body, created_at}` objects)
    #[sea_orm(column_type = "JsonBinary")]
    pub notes: Option<JsonValue>,

    /// Number of contact attempts made so far
    pub contact_attempts: i32,

    /// When the lead was last contacted
    pub last_contacted_at: Option<DateTimeWithTimeZone>,

    /// Scheduled follow-up time
    pub follow_up_at: Option<DateTimeWithTimeZone>,

    /// When the lead converted, set by the status transition
    pub converted_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the lead was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the lead was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Number of interest tags, tolerating a missing or malformed column.
    pub fn interest_count(&self) -> usize {
        self.interests
            .as_ref()
            .and_then(|value| value.as_array())
            .map(|entries| entries.len())
            .unwrap_or(0)
    }

    /// Whether any internal notes have been recorded.
    pub fn has_notes(&self) -> bool {
        self.notes
            .as_ref()
            .and_then(|value| value.as_array())
            .is_some_and(|entries| !entries.is_empty())
    }

    /// Borrowed scoring view over this lead's fields.
    pub fn score_input(&self) -> LeadScoreInput<'_> {
        LeadScoreInput {
            name: &self.name,
            email: &self.email,
            phone: self.phone.as_deref(),
            company_name: self.company_name.as_deref(),
            message: self.message.as_deref(),
            budget_range: &self.budget_range,
            timeline: &self.timeline,
            source: &self.source,
            interest_count: self.interest_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::lead_score;
    use chrono::Utc;

    fn base_lead() -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            name: "Ada Lovelace".to_string(),
            email: "ada@example.com".to_string(),
            phone: None,
            company_name: None,
            message: None,
            interests: None,
            budget_range: "not-specified".to_string(),
            timeline: "flexible".to_string(),
            source: "website".to_string(),
            status: "new".to_string(),
            priority: "medium".to_string(),
            lead_score: 0,
            perk_id: None,
            perk_title: None,
            category_id: None,
            category_name: None,
            assigned_to: None,
            notes: None,
            contact_attempts: 0,
            last_contacted_at: None,
            follow_up_at: None,
            converted_at: None,
            created_at: now.into(),
            updated_at: now.into(),
        }
    }

    #[test]
    fn test_interest_count_handles_malformed_json() {
        let mut lead = base_lead();
        assert_eq!(lead.interest_count(), 0);

        lead.interests = Some(serde_json::json!(["saas", "cloud"]));
        assert_eq!(lead.interest_count(), 2);

        lead.interests = Some(serde_json::json!("not-an-array"));
        assert_eq!(lead.interest_count(), 0);
    }

    #[test]
    fn test_has_notes() {
        let mut lead = base_lead();
        assert!(!lead.has_notes());

        lead.notes = Some(serde_json::json!([]));
        assert!(!lead.has_notes());

        lead.notes = Some(serde_json::json!([
            {"body": "called, no answer", "created_at": "2026-01-05T10:00:00Z"}
        ]));
        assert!(lead.has_notes());
    }

    #[test]
    fn test_score_input_reflects_fields() {
        let mut lead = base_lead();
        lead.phone = Some("555-0101".to_string());
        lead.source = "referral".to_string();
        lead.interests = Some(serde_json::json!(["saas"]));

        let input = lead.score_input();
        assert_eq!(input.phone, Some("555-0101"));
        assert_eq!(input.source, "referral");
        assert_eq!(input.interest_count, 1);

        // name 10 + email 15 + phone 10 + interests 5 + referral 20
        assert_eq!(lead_score(&input), 60);
    }
}
