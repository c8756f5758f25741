//! Lead repository for database operations
//!
//! This module provides the LeadRepository struct which encapsulates SeaORM
//! operations for the leads table. The completeness score is recomputed on
//! every save so it can never drift from the stored field values, and
//! creation probes for an existing `(email, perk_id)` pair before insert.

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::lead::{self, Entity as Lead};
use crate::scoring::lead_score;

/// Returned by [`LeadRepository::create`] when the `(email, perk_id)` pair
/// already exists; handlers map it to 409 `DUPLICATE_SUBMISSION`.
#[derive(Debug, thiserror::Error)]
#[error("a lead for this email and perk already exists")]
pub struct DuplicateSubmission;

/// Sort orders accepted by the lead listing endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LeadSort {
    /// Newest first (default)
    #[default]
    Newest,
    /// Highest score first
    Score,
    /// Soonest follow-up first
    FollowUp,
}

impl LeadSort {
    /// Parses a query-string sort key, falling back to newest-first
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("score") => LeadSort::Score,
            Some("follow_up") => LeadSort::FollowUp,
            _ => LeadSort::Newest,
        }
    }
}

/// Filters applied to lead listings
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    /// Restrict to one pipeline status
    pub status: Option<String>,
    /// Restrict to one acquisition source
    pub source: Option<String>,
    /// Restrict to one priority
    pub priority: Option<String>,
    /// Restrict to leads assigned to one admin
    pub assigned_to: Option<Uuid>,
    /// Lower score bound, inclusive
    pub min_score: Option<i32>,
    /// Upper score bound, inclusive
    pub max_score: Option<i32>,
    /// Only leads whose follow-up time has passed
    pub needs_follow_up: bool,
    /// Case-insensitive substring match over name, email and company
    pub search: Option<String>,
    /// Result ordering
    pub sort: LeadSort,
}

/// Repository for lead database operations
#[derive(Debug, Clone)]
pub struct LeadRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl LeadRepository {
    /// Creates a new LeadRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Finds a lead by its ID
    pub async fn find_by_id(&self, id: &Uuid) -> Result<Option<lead::Model>> {
        Ok(Lead::find_by_id(*id).one(&*self.db).await?)
    }

    /// Finds an existing lead with the same email for the same perk
    pub async fn find_duplicate(
        &self,
        email: &str,
        perk_id: &Uuid,
    ) -> Result<Option<lead::Model>> {
        Ok(Lead::find()
            .filter(lead::Column::Email.eq(email))
            .filter(lead::Column::PerkId.eq(*perk_id))
            .one(&*self.db)
            .await?)
    }

    /// Creates a new lead record
    ///
    /// Probes for a duplicate `(email, perk_id)` pair first and scores the
    /// incoming values before insert. The composite unique index backstops
    /// the probe under concurrent submissions.
    pub async fn create(&self, lead: lead::ActiveModel) -> Result<lead::Model> {
        let id = lead
            .id
            .clone()
            .take()
            .ok_or_else(|| anyhow!("lead id must be set"))?;
        let email = lead
            .email
            .clone()
            .take()
            .ok_or_else(|| anyhow!("lead email must be set"))?;
        let perk_id = lead.perk_id.clone().take().flatten();

        if let Some(perk_id) = perk_id
            && self.find_duplicate(&email, &perk_id).await?.is_some()
        {
            return Err(DuplicateSubmission.into());
        }

        let now = Utc::now();
        // Temporary model carrying the incoming values so the scorer can run
        // before the row exists
        let temp = lead::Model {
            id,
            name: lead.name.clone().take().unwrap_or_default(),
            email: email.clone(),
            phone: lead.phone.clone().take().flatten(),
            company_name: lead.company_name.clone().take().flatten(),
            message: lead.message.clone().take().flatten(),
            interests: lead.interests.clone().take().flatten(),
            budget_range: lead
                .budget_range
                .clone()
                .take()
                .unwrap_or_else(|| "not-specified".to_string()),
            timeline: lead
                .timeline
                .clone()
                .take()
                .unwrap_or_else(|| "flexible".to_string()),
            source: lead
                .source
                .clone()
                .take()
                .unwrap_or_else(|| "website".to_string()),
            status: "new".to_string(),
            priority: "medium".to_string(),
            lead_score: 0,
            perk_id,
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
        };

        let mut active = lead;
        active.lead_score = Set(lead_score(&temp.score_input()));
        active.insert(&*self.db).await?;

        // For SQLite, query the record directly since we already know the ID
        let fetched = Lead::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("lead not persisted"))
    }

    /// Lists leads matching `filter`, returning one page plus the total count
    pub async fn list(
        &self,
        filter: &LeadFilter,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<lead::Model>, u64)> {
        let condition = Self::filter_condition(filter);

        let total = Lead::find()
            .filter(condition.clone())
            .count(&*self.db)
            .await?;

        let mut query = Lead::find().filter(condition);
        query = match filter.sort {
            LeadSort::Newest => query
                .order_by_desc(lead::Column::CreatedAt)
                .order_by_desc(lead::Column::Id),
            LeadSort::Score => query
                .order_by_desc(lead::Column::LeadScore)
                .order_by_desc(lead::Column::Id),
            LeadSort::FollowUp => query
                .order_by_asc(lead::Column::FollowUpAt)
                .order_by_asc(lead::Column::Id),
        };
        let page = query.offset(offset).limit(limit).all(&*self.db).await?;

        Ok((page, total))
    }

    fn filter_condition(filter: &LeadFilter) -> Condition {
        let mut condition = Condition::all();
        if let Some(status) = &filter.status {
            condition = condition.add(lead::Column::Status.eq(status.as_str()));
        }
        if let Some(source) = &filter.source {
            condition = condition.add(lead::Column::Source.eq(source.as_str()));
        }
        if let Some(priority) = &filter.priority {
            condition = condition.add(lead::Column::Priority.eq(priority.as_str()));
        }
        if let Some(assigned_to) = filter.assigned_to {
            condition = condition.add(lead::Column::AssignedTo.eq(assigned_to));
        }
        if let Some(min_score) = filter.min_score {
            condition = condition.add(lead::Column::LeadScore.gte(min_score));
        }
        if let Some(max_score) = filter.max_score {
            condition = condition.add(lead::Column::LeadScore.lte(max_score));
        }
        if filter.needs_follow_up {
            condition = condition
                .add(lead::Column::FollowUpAt.is_not_null())
                .add(lead::Column::FollowUpAt.lte(Utc::now()));
        }
        if let Some(term) = &filter.search {
            let pattern = format!("%{}%", term.to_lowercase());
            condition = condition.add(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col((lead::Entity, lead::Column::Name))))
                            .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((lead::Entity, lead::Column::Email))))
                            .like(pattern.clone()),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col((
                            lead::Entity,
                            lead::Column::CompanyName,
                        ))))
                        .like(pattern),
                    ),
            );
        }
        condition
    }

    /// Sets the pipeline status, latching `converted_at` on first conversion
    pub async fn update_status(&self, id: &Uuid, status: &str) -> Result<lead::Model> {
        let existing = Lead::find_by_id(*id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Lead with ID '{}' not found", id))?;

        let mut model: lead::ActiveModel = existing.clone().into();
        model.status = Set(status.to_string());
        if status == "converted" && existing.converted_at.is_none() {
            model.converted_at = Set(Some(Utc::now().into()));
        }
        model.lead_score = Set(lead_score(&existing.score_input()));
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }

    /// Assigns the lead to an admin, or unassigns with `None`
    pub async fn assign(&self, id: &Uuid, assigned_to: Option<Uuid>) -> Result<lead::Model> {
        let existing = Lead::find_by_id(*id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Lead with ID '{}' not found", id))?;

        let mut model: lead::ActiveModel = existing.clone().into();
        model.assigned_to = Set(assigned_to);
        model.lead_score = Set(lead_score(&existing.score_input()));
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }

    /// Appends one entry to the note history
    pub async fn append_note(
        &self,
        id: &Uuid,
        content: &str,
        added_by: Option<Uuid>,
        note_type: &str,
    ) -> Result<lead::Model> {
        let existing = Lead::find_by_id(*id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Lead with ID '{}' not found", id))?;

        let mut notes = existing
            .notes
            .as_ref()
            .and_then(|value| value.as_array())
            .cloned()
            .unwrap_or_default();
        notes.push(serde_json::json!({
            "content": content,
            "added_by": added_by,
            "added_at": Utc::now(),
            "note_type": note_type,
        }));

        let mut model: lead::ActiveModel = existing.clone().into();
        model.notes = Set(Some(JsonValue::Array(notes)));
        model.lead_score = Set(lead_score(&existing.score_input()));
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }

    /// Schedules the next follow-up, or clears it with `None`
    pub async fn schedule_follow_up(
        &self,
        id: &Uuid,
        follow_up_at: Option<DateTimeWithTimeZone>,
    ) -> Result<lead::Model> {
        let existing = Lead::find_by_id(*id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Lead with ID '{}' not found", id))?;

        let mut model: lead::ActiveModel = existing.clone().into();
        model.follow_up_at = Set(follow_up_at);
        model.lead_score = Set(lead_score(&existing.score_input()));
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }

    /// Records one outreach attempt
    pub async fn record_contact_attempt(&self, id: &Uuid) -> Result<lead::Model> {
        let existing = Lead::find_by_id(*id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Lead with ID '{}' not found", id))?;

        let mut model: lead::ActiveModel = existing.clone().into();
        model.contact_attempts = Set(existing.contact_attempts + 1);
        model.last_contacted_at = Set(Some(Utc::now().into()));
        model.lead_score = Set(lead_score(&existing.score_input()));
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }

    /// Marks the lead converted
    ///
    /// Returns the updated row and whether this call performed the first
    /// conversion, so callers can consume a perk redemption exactly once.
    pub async fn convert(&self, id: &Uuid) -> Result<(lead::Model, bool)> {
        let existing = Lead::find_by_id(*id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Lead with ID '{}' not found", id))?;
        let newly_converted = existing.converted_at.is_none();

        let updated = self.update_status(id, "converted").await?;
        Ok((updated, newly_converted))
    }

    /// Deletes a lead, returning the removed row
    pub async fn delete(&self, id: &Uuid) -> Result<Option<lead::Model>> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        Lead::delete_by_id(*id).exec(&*self.db).await?;
        Ok(Some(existing))
    }

    /// Counts all leads
    pub async fn count_total(&self) -> Result<u64> {
        Ok(Lead::find().count(&*self.db).await?)
    }

    /// Counts leads in one pipeline status
    pub async fn count_by_status(&self, status: &str) -> Result<u64> {
        Ok(Lead::find()
            .filter(lead::Column::Status.eq(status))
            .count(&*self.db)
            .await?)
    }

    /// Counts leads from one acquisition source
    pub async fn count_by_source(&self, source: &str) -> Result<u64> {
        Ok(Lead::find()
            .filter(lead::Column::Source.eq(source))
            .count(&*self.db)
            .await?)
    }

    /// Counts leads referencing one perk, for counter recomputes
    pub async fn count_for_perk(&self, perk_id: &Uuid) -> Result<u64> {
        Ok(Lead::find()
            .filter(lead::Column::PerkId.eq(*perk_id))
            .count(&*self.db)
            .await?)
    }

    /// Mean score across all leads, 0.0 when there are none
    pub async fn average_score(&self) -> Result<f64> {
        let total = self.count_total().await?;
        if total == 0 {
            return Ok(0.0);
        }
        let sum: Option<Option<i64>> = Lead::find()
            .select_only()
            .column_as(lead::Column::LeadScore.sum(), "score_sum")
            .into_tuple()
            .one(&*self.db)
            .await?;
        let sum = sum.flatten().unwrap_or(0);
        Ok(sum as f64 / total as f64)
    }

    /// Leads created since `since`, newest first
    pub async fn created_since(
        &self,
        since: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<lead::Model>> {
        Ok(Lead::find()
            .filter(lead::Column::CreatedAt.gte(since))
            .order_by_desc(lead::Column::CreatedAt)
            .order_by_desc(lead::Column::Id)
            .limit(limit)
            .all(&*self.db)
            .await?)
    }
}
