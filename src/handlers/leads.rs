//! # Lead Handlers
//!
//! Public lead intake plus the admin pipeline endpoints. Intake is gated by
//! maintenance mode and a per-submitter fixed-window rate limit; the
//! completeness score and derived priority are computed at save time.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use chrono::{DateTime, Utc};
use metrics::counter;
use regex::Regex;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use tracing::warn;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::ClientExtension;
use crate::error::{ApiError, FieldError, locked, not_found, validation_error};
use crate::handlers::{ApiResponse, string_list};
use crate::models::lead;
use crate::notify::{NotifyEvent, notify_best_effort};
use crate::pagination::{Pagination, clamp_limit, clamp_page};
use crate::repositories::{
    CategoryRepository, LeadFilter, LeadRepository, PerkRepository, SiteSettingsRepository,
    lead::LeadSort,
};
use crate::scoring::{self, ConversionInput, LeadScoreInput};
use crate::server::AppState;

/// Entries kept in the rate limit map before stale windows are swept
const RATE_LIMIT_MAX_KEYS: usize = 10_000;

// In-memory fixed-window rate limiter per submitter, keyed by the client
// address. Window unit: epoch seconds rounded to the minute.
static LEAD_RL: OnceLock<Mutex<HashMap<String, (u64, u32)>>> = OnceLock::new();

/// Checks one submission against the fixed-window allowance. Returns the
/// seconds until the window resets when the submitter is over the limit.
fn check_rate_limit(key: &str, allowance: u32, now_secs: u64) -> Result<(), u64> {
    let minute = now_secs / 60;
    let map = LEAD_RL.get_or_init(|| Mutex::new(HashMap::new()));
    let mut guard = map.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

    if guard.len() > RATE_LIMIT_MAX_KEYS {
        guard.retain(|_, (window, _)| *window == minute);
    }

    let entry = guard.entry(key.to_string()).or_insert((minute, 0));
    if entry.0 != minute {
        *entry = (minute, 0);
    }
    if entry.1 >= allowance {
        Err(60 - (now_secs % 60))
    } else {
        entry.1 += 1;
        Ok(())
    }
}

/// Rate limit key for a request: first `X-Forwarded-For` address when the
/// service runs behind a proxy, otherwise a shared bucket.
fn submitter_key(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|address| address.trim().to_string())
        .filter(|address| !address.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn email_is_valid(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
    re.is_match(email)
}

/// Query parameters for the admin lead listing
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct LeadQuery {
    /// Page number (1-based)
    pub page: Option<u64>,
    /// Items per page (max 100)
    pub limit: Option<u64>,
    /// Filter by pipeline status
    pub status: Option<String>,
    /// Filter by acquisition source
    pub source: Option<String>,
    /// Filter by priority
    pub priority: Option<String>,
    /// Filter by assigned admin
    pub assigned_to: Option<Uuid>,
    /// Lower score bound, inclusive
    pub min_score: Option<i32>,
    /// Upper score bound, inclusive
    pub max_score: Option<i32>,
    /// Only leads whose follow-up time has passed
    pub needs_follow_up: Option<bool>,
    /// Case-insensitive search over name, email and company
    pub search: Option<String>,
    /// Sort order: `newest` (default), `score` or `follow_up`
    pub sort: Option<String>,
}

/// Lead details returned by every lead endpoint
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LeadInfo {
    /// Unique lead identifier
    pub id: Uuid,
    /// Submitter name
    pub name: String,
    /// Submitter email
    pub email: String,
    /// Phone number
    pub phone: Option<String>,
    /// Company name
    pub company_name: Option<String>,
    /// Free-form message from the submitter
    pub message: Option<String>,
    /// Interest tags
    pub interests: Vec<String>,
    /// Declared budget bracket
    pub budget_range: String,
    /// Declared timeline
    pub timeline: String,
    /// Acquisition source
    pub source: String,
    /// Pipeline status
    pub status: String,
    /// Priority, derived from the score at intake
    pub priority: String,
    /// Completeness score 0..=100
    pub lead_score: i32,
    /// Perk the lead was submitted against
    pub perk_id: Option<Uuid>,
    /// Perk title captured at submission time
    pub perk_title: Option<String>,
    /// Category of that perk at submission time
    pub category_id: Option<Uuid>,
    /// Category name captured at submission time
    pub category_name: Option<String>,
    /// Staff member the lead is assigned to
    pub assigned_to: Option<Uuid>,
    /// Internal note history
    pub notes: Option<JsonValue>,
    /// Contact attempts made so far
    pub contact_attempts: i32,
    /// When the lead was last contacted
    pub last_contacted_at: Option<DateTime<Utc>>,
    /// Scheduled follow-up time
    pub follow_up_at: Option<DateTime<Utc>>,
    /// When the lead converted
    pub converted_at: Option<DateTime<Utc>>,
    /// Days since the lead was submitted
    pub days_since_creation: i64,
    /// Age bucket: `fresh`, `warm`, `aging` or `cold`
    pub age_category: &'static str,
    /// Estimated conversion probability 0..=100, derived on read
    pub conversion_probability: i32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl From<lead::Model> for LeadInfo {
    fn from(model: lead::Model) -> Self {
        let now = Utc::now();
        let created_at = model.created_at.with_timezone(&Utc);
        let days_since_creation = (now - created_at).num_days();
        let conversion_probability = scoring::conversion_probability(
            &ConversionInput {
                lead_score: model.lead_score,
                contact_attempts: model.contact_attempts,
                has_notes: model.has_notes(),
                has_company: model.company_name.is_some(),
                has_phone: model.phone.is_some(),
                created_at,
            },
            now,
        );
        let interests = string_list(model.interests.as_ref());

        Self {
            id: model.id,
            name: model.name,
            email: model.email,
            phone: model.phone,
            company_name: model.company_name,
            message: model.message,
            interests,
            budget_range: model.budget_range,
            timeline: model.timeline,
            source: model.source,
            status: model.status,
            priority: model.priority,
            lead_score: model.lead_score,
            perk_id: model.perk_id,
            perk_title: model.perk_title,
            category_id: model.category_id,
            category_name: model.category_name,
            assigned_to: model.assigned_to,
            notes: model.notes,
            contact_attempts: model.contact_attempts,
            last_contacted_at: model.last_contacted_at.map(|t| t.with_timezone(&Utc)),
            follow_up_at: model.follow_up_at.map(|t| t.with_timezone(&Utc)),
            converted_at: model.converted_at.map(|t| t.with_timezone(&Utc)),
            days_since_creation,
            age_category: scoring::age_category(days_since_creation),
            conversion_probability,
            created_at,
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// Public lead submission body
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LeadSubmission {
    /// Submitter name (required, non-empty)
    pub name: String,
    /// Submitter email (required)
    pub email: String,
    /// Phone number
    pub phone: Option<String>,
    /// Company name
    pub company_name: Option<String>,
    /// Free-form message
    pub message: Option<String>,
    /// Interest tags
    pub interests: Option<Vec<String>>,
    /// Declared budget bracket, defaults to `not-specified`
    pub budget_range: Option<String>,
    /// Declared timeline, defaults to `flexible`
    pub timeline: Option<String>,
    /// Acquisition source, defaults to `website`
    pub source: Option<String>,
    /// Perk the submission is about
    pub perk_id: Option<Uuid>,
}

/// Request body for a status change
#[derive(Debug, Deserialize, ToSchema)]
pub struct LeadStatusPayload {
    /// One of `new`, `contacted`, `qualified`, `converted`, `closed`
    pub status: String,
}

/// Request body for assigning a lead
#[derive(Debug, Deserialize, ToSchema)]
pub struct LeadAssignPayload {
    /// Admin to assign the lead to; `null` unassigns
    pub assigned_to: Option<Uuid>,
}

/// Request body for appending an internal note
#[derive(Debug, Deserialize, ToSchema)]
pub struct LeadNotePayload {
    /// Note content (required, non-empty)
    pub content: String,
    /// Note kind, defaults to `general`
    pub note_type: Option<String>,
}

/// Request body for scheduling a follow-up
#[derive(Debug, Deserialize, ToSchema)]
pub struct FollowUpPayload {
    /// Next follow-up time; `null` clears the schedule
    pub follow_up_at: Option<DateTime<Utc>>,
}

fn validate_submission(payload: &LeadSubmission) -> Result<(), ApiError> {
    let mut field_errors = Vec::new();

    if payload.name.trim().is_empty() {
        field_errors.push(FieldError::new("name", "Name is required"));
    }
    if payload.email.trim().is_empty() {
        field_errors.push(FieldError::new("email", "Email is required"));
    } else if !email_is_valid(payload.email.trim()) {
        field_errors.push(FieldError::new("email", "Must be a valid email address"));
    }
    if let Some(source) = &payload.source
        && !lead::SOURCES.contains(&source.as_str())
    {
        field_errors.push(FieldError::new(
            "source",
            format!("Source must be one of: {}", lead::SOURCES.join(", ")),
        ));
    }

    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(validation_error("Invalid lead submission", field_errors))
    }
}

async fn ensure_exists(repo: &LeadRepository, id: &Uuid) -> Result<(), ApiError> {
    repo.find_by_id(id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| not_found("LEAD_NOT_FOUND", "Lead not found"))?;
    Ok(())
}

/// Converts a lead, consuming one perk redemption the first time only.
async fn convert_lead(state: &AppState, id: &Uuid) -> Result<lead::Model, ApiError> {
    let repo = LeadRepository::new(state.db.clone());
    ensure_exists(&repo, id).await?;

    let (converted, newly_converted) = repo.convert(id).await.map_err(ApiError::from_repo)?;
    if newly_converted && let Some(perk_id) = converted.perk_id {
        let perks = PerkRepository::new(state.db.clone());
        if let Err(err) = perks.bump_redemption_count(&perk_id).await {
            warn!(error = ?err, perk_id = %perk_id, "Failed to bump perk redemption count");
        }
        counter!("leads_converted_total").increment(1);
    }

    Ok(converted)
}

/// Submit a lead
///
/// Public intake endpoint. Rejected with 423 while maintenance mode is on,
/// 429 when the submitter exceeds the per-minute allowance, and 409 when
/// the same email already submitted for the same perk. The completeness
/// score and priority are computed at save time; high-scoring leads emit a
/// notification without blocking the response.
#[utoipa::path(
    post,
    path = "/api/leads",
    request_body = LeadSubmission,
    responses(
        (status = 201, description = "Lead recorded", body = ApiResponse<LeadInfo>),
        (status = 400, description = "Invalid submission", body = ApiError),
        (status = 409, description = "Duplicate submission for this perk", body = ApiError),
        (status = 423, description = "Maintenance mode is on", body = ApiError),
        (status = 429, description = "Submitter over the rate limit", body = ApiError)
    ),
    tag = "leads"
)]
pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<LeadSubmission>,
) -> Result<(StatusCode, Json<ApiResponse<LeadInfo>>), ApiError> {
    let allowance =
        state.config.lead_rate_limit_per_minute + state.config.lead_rate_limit_burst_size;
    if let Err(retry_after) = check_rate_limit(&submitter_key(&headers), allowance, epoch_secs()) {
        counter!("leads_rate_limited_total").increment(1);
        return Err(ApiError::new(
            StatusCode::TOO_MANY_REQUESTS,
            "RATE_LIMITED",
            "Too many submissions, slow down",
        )
        .with_retry_after(retry_after));
    }

    let maintenance = SiteSettingsRepository::new(state.db.clone())
        .maintenance_mode()
        .await
        .map_err(ApiError::from_repo)?;
    if maintenance {
        return Err(locked("Submissions are temporarily disabled for maintenance"));
    }

    validate_submission(&payload)?;

    // Snapshot the perk and category names so the lead survives catalog
    // deletions
    let mut perk_title = None;
    let mut category_id = None;
    let mut category_name = None;
    if let Some(perk_id) = payload.perk_id {
        let perk = PerkRepository::new(state.db.clone())
            .find_by_id(&perk_id)
            .await
            .map_err(ApiError::from_repo)?
            .ok_or_else(|| {
                validation_error(
                    "Unknown perk",
                    vec![FieldError::new("perk_id", "No perk with this ID")],
                )
            })?;
        perk_title = Some(perk.title.clone());
        category_id = perk.category_id;
        if let Some(parent) = perk.category_id {
            category_name = CategoryRepository::new(state.db.clone())
                .find_by_id(&parent)
                .await
                .map_err(ApiError::from_repo)?
                .map(|category| category.name);
        }
    }

    let name = payload.name.trim().to_string();
    let email = payload.email.trim().to_lowercase();
    let budget_range = payload
        .budget_range
        .unwrap_or_else(|| "not-specified".to_string());
    let timeline = payload.timeline.unwrap_or_else(|| "flexible".to_string());
    let source = payload.source.unwrap_or_else(|| "website".to_string());
    let interest_count = payload.interests.as_ref().map_or(0, |tags| tags.len());

    // Score up front so the stored priority matches what the repository
    // recomputes at save time
    let score = scoring::lead_score(&LeadScoreInput {
        name: &name,
        email: &email,
        phone: payload.phone.as_deref(),
        company_name: payload.company_name.as_deref(),
        message: payload.message.as_deref(),
        budget_range: &budget_range,
        timeline: &timeline,
        source: &source,
        interest_count,
    });
    let priority = scoring::priority_for_score(score);

    let now = Utc::now();
    let model = lead::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        email: Set(email),
        phone: Set(payload.phone),
        company_name: Set(payload.company_name),
        message: Set(payload.message),
        interests: Set(payload.interests.map(|tags| json!(tags))),
        budget_range: Set(budget_range),
        timeline: Set(timeline),
        source: Set(source),
        status: Set("new".to_string()),
        priority: Set(priority.to_string()),
        lead_score: Set(score),
        perk_id: Set(payload.perk_id),
        perk_title: Set(perk_title),
        category_id: Set(category_id),
        category_name: Set(category_name),
        assigned_to: Set(None),
        notes: Set(None),
        contact_attempts: Set(0),
        last_contacted_at: Set(None),
        follow_up_at: Set(None),
        converted_at: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let created = LeadRepository::new(state.db.clone())
        .create(model)
        .await
        .map_err(ApiError::from_repo)?;

    if let Some(perk_id) = created.perk_id {
        let perks = PerkRepository::new(state.db.clone());
        if let Err(err) = perks.bump_lead_count(&perk_id, 1).await {
            warn!(error = ?err, perk_id = %perk_id, "Failed to bump perk lead count");
        }
    }

    counter!("leads_submitted_total", "source" => created.source.clone()).increment(1);
    tracing::info!(lead_id = %created.id, score = created.lead_score, "Recorded lead");

    if created.lead_score >= state.config.notify.min_score {
        notify_best_effort(&state.notifier, NotifyEvent::high_score_lead(&created)).await;
    }

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            LeadInfo::from(created),
            "Thank you for your interest",
        )),
    ))
}

/// List leads
///
/// Full filter set: status, source, priority, assignee, score bounds,
/// overdue follow-ups and a search over name, email and company.
#[utoipa::path(
    get,
    path = "/api/admin/leads",
    params(LeadQuery),
    responses(
        (status = 200, description = "Paginated list of leads", body = ApiResponse<Vec<LeadInfo>>),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "leads"
)]
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<LeadQuery>,
) -> Result<Json<ApiResponse<Vec<LeadInfo>>>, ApiError> {
    let filter = LeadFilter {
        status: query.status.clone(),
        source: query.source.clone(),
        priority: query.priority.clone(),
        assigned_to: query.assigned_to,
        min_score: query.min_score,
        max_score: query.max_score,
        needs_follow_up: query.needs_follow_up.unwrap_or(false),
        search: query.search.clone(),
        sort: LeadSort::parse(query.sort.as_deref()),
    };

    let page = clamp_page(query.page);
    let limit = clamp_limit(query.limit);
    let (leads, total) = LeadRepository::new(state.db.clone())
        .list(&filter, (page - 1) * limit, limit)
        .await
        .map_err(ApiError::from_repo)?;

    let pagination = Pagination::calculate(Some(page), Some(limit), total);
    let items = leads.into_iter().map(LeadInfo::from).collect();
    Ok(Json(ApiResponse::page(items, pagination)))
}

/// Get a lead by ID
#[utoipa::path(
    get,
    path = "/api/admin/leads/{id}",
    params(
        ("id" = String, Path, description = "Lead ID")
    ),
    responses(
        (status = 200, description = "Lead details with computed fields", body = ApiResponse<LeadInfo>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Lead not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "leads"
)]
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LeadInfo>>, ApiError> {
    let lead = LeadRepository::new(state.db.clone())
        .find_by_id(&id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| not_found("LEAD_NOT_FOUND", "Lead not found"))?;

    Ok(Json(ApiResponse::data(LeadInfo::from(lead))))
}

/// Delete a lead
#[utoipa::path(
    delete,
    path = "/api/admin/leads/{id}",
    params(
        ("id" = String, Path, description = "Lead ID")
    ),
    responses(
        (status = 200, description = "Lead deleted"),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Lead not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "leads"
)]
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let removed = LeadRepository::new(state.db.clone())
        .delete(&id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| not_found("LEAD_NOT_FOUND", "Lead not found"))?;

    if let Some(perk_id) = removed.perk_id {
        let perks = PerkRepository::new(state.db.clone());
        if let Err(err) = perks.bump_lead_count(&perk_id, -1).await {
            warn!(error = ?err, perk_id = %perk_id, "Failed to bump perk lead count");
        }
    }
    tracing::info!(lead_id = %id, "Deleted lead");

    Ok(Json(ApiResponse::ack("Lead deleted")))
}

/// Change a lead's pipeline status
///
/// Any transition is permitted. Moving to `converted` goes through the
/// conversion path so the perk redemption is consumed exactly once.
#[utoipa::path(
    patch,
    path = "/api/admin/leads/{id}/status",
    params(
        ("id" = String, Path, description = "Lead ID")
    ),
    request_body = LeadStatusPayload,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<LeadInfo>),
        (status = 400, description = "Unknown status", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Lead not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "leads"
)]
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<LeadStatusPayload>,
) -> Result<Json<ApiResponse<LeadInfo>>, ApiError> {
    if !lead::STATUSES.contains(&body.status.as_str()) {
        return Err(validation_error(
            "Unknown status",
            vec![FieldError::new(
                "status",
                format!("Status must be one of: {}", lead::STATUSES.join(", ")),
            )],
        ));
    }

    let updated = if body.status == "converted" {
        convert_lead(&state, &id).await?
    } else {
        let repo = LeadRepository::new(state.db.clone());
        ensure_exists(&repo, &id).await?;
        repo.update_status(&id, &body.status)
            .await
            .map_err(ApiError::from_repo)?
    };
    tracing::info!(lead_id = %id, status = %body.status, "Changed lead status");

    Ok(Json(ApiResponse::data(LeadInfo::from(updated))))
}

/// Assign a lead to an admin
#[utoipa::path(
    patch,
    path = "/api/admin/leads/{id}/assign",
    params(
        ("id" = String, Path, description = "Lead ID")
    ),
    request_body = LeadAssignPayload,
    responses(
        (status = 200, description = "Assignment updated", body = ApiResponse<LeadInfo>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Lead not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "leads"
)]
pub async fn assign(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<LeadAssignPayload>,
) -> Result<Json<ApiResponse<LeadInfo>>, ApiError> {
    let repo = LeadRepository::new(state.db.clone());
    ensure_exists(&repo, &id).await?;

    let updated = repo
        .assign(&id, body.assigned_to)
        .await
        .map_err(ApiError::from_repo)?;

    Ok(Json(ApiResponse::data(LeadInfo::from(updated))))
}

/// Append an internal note
#[utoipa::path(
    post,
    path = "/api/admin/leads/{id}/notes",
    params(
        ("id" = String, Path, description = "Lead ID")
    ),
    request_body = LeadNotePayload,
    responses(
        (status = 200, description = "Note appended", body = ApiResponse<LeadInfo>),
        (status = 400, description = "Empty note", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Lead not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "leads"
)]
pub async fn add_note(
    State(state): State<AppState>,
    client: ClientExtension,
    Path(id): Path<Uuid>,
    Json(body): Json<LeadNotePayload>,
) -> Result<Json<ApiResponse<LeadInfo>>, ApiError> {
    if body.content.trim().is_empty() {
        return Err(validation_error(
            "Empty note",
            vec![FieldError::new("content", "Note content is required")],
        ));
    }

    let repo = LeadRepository::new(state.db.clone());
    ensure_exists(&repo, &id).await?;

    let note_type = body.note_type.as_deref().unwrap_or("general");
    let actor = client.0.map(|client_id| client_id.0);
    let updated = repo
        .append_note(&id, body.content.trim(), actor, note_type)
        .await
        .map_err(ApiError::from_repo)?;

    Ok(Json(ApiResponse::data(LeadInfo::from(updated))))
}

/// Schedule or clear a follow-up
#[utoipa::path(
    patch,
    path = "/api/admin/leads/{id}/follow-up",
    params(
        ("id" = String, Path, description = "Lead ID")
    ),
    request_body = FollowUpPayload,
    responses(
        (status = 200, description = "Follow-up updated", body = ApiResponse<LeadInfo>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Lead not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "leads"
)]
pub async fn schedule_follow_up(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<FollowUpPayload>,
) -> Result<Json<ApiResponse<LeadInfo>>, ApiError> {
    let repo = LeadRepository::new(state.db.clone());
    ensure_exists(&repo, &id).await?;

    let updated = repo
        .schedule_follow_up(&id, body.follow_up_at.map(Into::into))
        .await
        .map_err(ApiError::from_repo)?;

    Ok(Json(ApiResponse::data(LeadInfo::from(updated))))
}

/// Record a contact attempt
#[utoipa::path(
    post,
    path = "/api/admin/leads/{id}/contact-attempt",
    params(
        ("id" = String, Path, description = "Lead ID")
    ),
    responses(
        (status = 200, description = "Attempt recorded", body = ApiResponse<LeadInfo>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Lead not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "leads"
)]
pub async fn record_contact_attempt(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LeadInfo>>, ApiError> {
    let repo = LeadRepository::new(state.db.clone());
    ensure_exists(&repo, &id).await?;

    let updated = repo
        .record_contact_attempt(&id)
        .await
        .map_err(ApiError::from_repo)?;

    Ok(Json(ApiResponse::data(LeadInfo::from(updated))))
}

/// Convert a lead
///
/// Marks the lead converted and consumes one perk redemption on the first
/// conversion only; repeating the call is harmless.
#[utoipa::path(
    post,
    path = "/api/admin/leads/{id}/convert",
    params(
        ("id" = String, Path, description = "Lead ID")
    ),
    responses(
        (status = 200, description = "Lead converted", body = ApiResponse<LeadInfo>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Lead not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "leads"
)]
pub async fn convert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<LeadInfo>>, ApiError> {
    let converted = convert_lead(&state, &id).await?;
    tracing::info!(lead_id = %id, "Converted lead");

    Ok(Json(ApiResponse::data(LeadInfo::from(converted))))
}
