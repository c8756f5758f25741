//! # Perk Handlers
//!
//! Public catalog endpoints plus the admin CRUD, moderation and SEO edit
//! surface. Create and update accept `multipart/form-data`: a required JSON
//! `payload` part and optional `main_image`, `vendor_logo` and `gallery`
//! image parts that are validated and persisted by the media store.

use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::ClientExtension;
use crate::error::{ApiError, FieldError, conflict, forbidden, not_found, validation_error};
use crate::handlers::{ApiResponse, string_list};
use crate::media::MediaStore;
use crate::models::perk;
use crate::notify::{NotifyEvent, notify_best_effort};
use crate::pagination::{Pagination, clamp_limit, clamp_page};
use crate::repositories::{CategoryRepository, PerkFilter, PerkRepository, perk::PerkSort};
use crate::server::AppState;
use crate::slug;
use crate::tracking::TrackEvent;

/// Most gallery images accepted per perk
const MAX_GALLERY_ITEMS: usize = 5;

/// Query parameters for perk listings
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PerkQuery {
    /// Page number (1-based)
    pub page: Option<u64>,
    /// Items per page (max 100)
    pub limit: Option<u64>,
    /// Filter by lifecycle status (admin listing only)
    pub status: Option<String>,
    /// Filter by approval state (admin listing only)
    pub approval_status: Option<String>,
    /// Filter by category ID or slug
    pub category: Option<String>,
    /// Filter by owning client ID (admin listing only)
    pub client_id: Option<Uuid>,
    /// Case-insensitive search over title and description
    pub search: Option<String>,
    /// Sort order: `newest` (default), `title` or `views`
    pub sort: Option<String>,
}

/// Perk details returned by every perk endpoint
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PerkInfo {
    /// Unique perk identifier
    pub id: Uuid,
    /// Display title
    pub title: String,
    /// URL-safe unique slug
    pub slug: String,
    /// Full description, may contain HTML
    pub description: Option<String>,
    /// Short one-line summary
    pub summary: Option<String>,
    /// Vendor offering the perk
    pub vendor_name: Option<String>,
    /// Vendor or offer landing page
    pub website_url: Option<String>,
    /// Human-readable discount label
    pub discount_label: Option<String>,
    /// Category the perk is filed under
    pub category_id: Option<Uuid>,
    /// Owning client account
    pub client_id: Option<Uuid>,
    /// Lifecycle status
    pub status: String,
    /// Approval workflow state
    pub approval_status: String,
    /// Reviewer note from the last moderation decision
    pub approval_note: Option<String>,
    /// Visibility toggle independent of status
    pub is_visible: bool,
    /// Whether the perk can be redeemed right now
    pub is_available: bool,
    /// Offer window start
    pub starts_at: Option<DateTime<Utc>>,
    /// Offer window end
    pub ends_at: Option<DateTime<Utc>>,
    /// Total redemptions available, absent means unlimited
    pub quantity: Option<i32>,
    /// Redemptions consumed so far
    pub redemption_count: i32,
    /// Detail page views
    pub view_count: i64,
    /// Outbound clicks
    pub click_count: i64,
    /// Leads referencing this perk
    pub lead_count: i32,
    /// Clicks as a percentage of views
    pub conversion_rate: f64,
    /// Main image path
    pub main_image: Option<String>,
    /// Vendor logo path
    pub vendor_logo: Option<String>,
    /// Gallery image paths
    pub gallery: Vec<String>,
    /// Per-perk SEO title override
    pub seo_title: Option<String>,
    /// Per-perk SEO description override
    pub seo_description: Option<String>,
    /// Per-perk SEO keywords
    pub seo_keywords: Vec<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl From<perk::Model> for PerkInfo {
    fn from(model: perk::Model) -> Self {
        let is_available = model.is_available(Utc::now());
        let gallery = model.gallery_paths();
        let seo_keywords = string_list(model.seo_keywords.as_ref());

        Self {
            id: model.id,
            title: model.title,
            slug: model.slug,
            description: model.description,
            summary: model.summary,
            vendor_name: model.vendor_name,
            website_url: model.website_url,
            discount_label: model.discount_label,
            category_id: model.category_id,
            client_id: model.client_id,
            status: model.status,
            approval_status: model.approval_status,
            approval_note: model.approval_note,
            is_visible: model.is_visible,
            is_available,
            starts_at: model.starts_at.map(|t| t.with_timezone(&Utc)),
            ends_at: model.ends_at.map(|t| t.with_timezone(&Utc)),
            quantity: model.quantity,
            redemption_count: model.redemption_count,
            view_count: model.view_count,
            click_count: model.click_count,
            lead_count: model.lead_count,
            conversion_rate: model.conversion_rate,
            main_image: model.main_image,
            vendor_logo: model.vendor_logo,
            gallery,
            seo_title: model.seo_title,
            seo_description: model.seo_description,
            seo_keywords,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// JSON `payload` part of a perk create or update request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct PerkPayload {
    /// Display title (required, non-empty)
    pub title: String,
    /// Explicit slug; normalized and de-duplicated when present
    pub slug: Option<String>,
    /// Full description, may contain HTML
    pub description: Option<String>,
    /// Short one-line summary
    pub summary: Option<String>,
    /// Vendor offering the perk
    pub vendor_name: Option<String>,
    /// Vendor or offer landing page, must be a valid URL when present
    pub website_url: Option<String>,
    /// Human-readable discount label
    pub discount_label: Option<String>,
    /// Category to file the perk under
    pub category_id: Option<Uuid>,
    /// Owning client account
    pub client_id: Option<Uuid>,
    /// Lifecycle status, defaults to `pending` on create
    pub status: Option<String>,
    /// Visibility toggle, defaults to true on create
    pub is_visible: Option<bool>,
    /// Offer window start
    pub starts_at: Option<DateTime<Utc>>,
    /// Offer window end, must be after `starts_at` when both are set
    pub ends_at: Option<DateTime<Utc>>,
    /// Total redemptions available, must be non-negative
    pub quantity: Option<i32>,
    /// Per-perk SEO title override
    pub seo_title: Option<String>,
    /// Per-perk SEO description override
    pub seo_description: Option<String>,
    /// Per-perk SEO keywords
    pub seo_keywords: Option<Vec<String>>,
}

/// Request body for a status change
#[derive(Debug, Deserialize, ToSchema)]
pub struct PerkStatusPayload {
    /// One of `active`, `inactive`, `pending`, `rejected`, `expired`
    pub status: String,
}

/// Request body for a moderation decision
#[derive(Debug, Deserialize, ToSchema)]
pub struct PerkApprovalPayload {
    /// One of `pending`, `approved`, `rejected`, `needs_revision`
    pub approval_status: String,
    /// Reviewer note stored with the decision
    pub approval_note: Option<String>,
}

/// Request body for an SEO override edit
#[derive(Debug, Deserialize, ToSchema)]
pub struct PerkSeoPayload {
    /// SEO title override
    pub seo_title: Option<String>,
    /// SEO description override
    pub seo_description: Option<String>,
    /// SEO keywords
    pub seo_keywords: Option<Vec<String>>,
}

/// Image paths stored while reading a multipart request
struct UploadedImages {
    main_image: Option<String>,
    vendor_logo: Option<String>,
    gallery: Vec<String>,
}

/// Reads a perk multipart request: the JSON `payload` part plus any image
/// parts, which are validated and written to the media store as they arrive.
async fn read_perk_multipart(
    media: &MediaStore,
    mut multipart: Multipart,
) -> Result<(PerkPayload, UploadedImages), ApiError> {
    let mut payload: Option<PerkPayload> = None;
    let mut images = UploadedImages {
        main_image: None,
        vendor_logo: None,
        gallery: Vec::new(),
    };

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "payload" => {
                let raw = field.bytes().await?;
                let parsed: PerkPayload = serde_json::from_slice(&raw).map_err(|err| {
                    validation_error(
                        "Invalid perk payload",
                        vec![FieldError::new("payload", format!("Invalid JSON: {}", err))],
                    )
                })?;
                payload = Some(parsed);
            }
            "main_image" | "vendor_logo" | "gallery" => {
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await?;
                let path = media.store("perks", &content_type, &bytes)?;
                match name.as_str() {
                    "main_image" => images.main_image = Some(path),
                    "vendor_logo" => images.vendor_logo = Some(path),
                    _ => {
                        if images.gallery.len() >= MAX_GALLERY_ITEMS {
                            return Err(validation_error(
                                "Too many gallery images",
                                vec![FieldError::new(
                                    "gallery",
                                    format!("At most {} gallery images are accepted", MAX_GALLERY_ITEMS),
                                )],
                            ));
                        }
                        images.gallery.push(path);
                    }
                }
            }
            // Unknown parts are ignored
            _ => {}
        }
    }

    let payload = payload.ok_or_else(|| {
        validation_error(
            "Missing perk payload",
            vec![FieldError::new("payload", "Required JSON part is missing")],
        )
    })?;

    Ok((payload, images))
}

/// Validates the JSON payload shared by create and update
fn validate_payload(payload: &PerkPayload) -> Result<(), ApiError> {
    let mut field_errors = Vec::new();

    if payload.title.trim().is_empty() {
        field_errors.push(FieldError::new("title", "Title is required"));
    }
    if let Some(status) = &payload.status
        && !perk::STATUSES.contains(&status.as_str())
    {
        field_errors.push(FieldError::new(
            "status",
            format!("Status must be one of: {}", perk::STATUSES.join(", ")),
        ));
    }
    if let Some(url) = &payload.website_url
        && url::Url::parse(url).is_err()
    {
        field_errors.push(FieldError::new("website_url", "Must be a valid URL"));
    }
    if let Some(quantity) = payload.quantity
        && quantity < 0
    {
        field_errors.push(FieldError::new("quantity", "Must be non-negative"));
    }
    if let (Some(starts_at), Some(ends_at)) = (payload.starts_at, payload.ends_at)
        && ends_at <= starts_at
    {
        field_errors.push(FieldError::new("ends_at", "Must be after starts_at"));
    }

    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(validation_error("Invalid perk payload", field_errors))
    }
}

/// Rejects payloads referencing a category that does not exist
async fn ensure_category_exists(state: &AppState, id: &Uuid) -> Result<(), ApiError> {
    CategoryRepository::new(state.db.clone())
        .find_by_id(id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| {
            validation_error(
                "Unknown category",
                vec![FieldError::new("category_id", "No category with this ID")],
            )
        })?;
    Ok(())
}

/// Resolves a `category` query value that may be a UUID or a slug
async fn resolve_category(state: &AppState, raw: Option<&str>) -> Result<Option<Uuid>, ApiError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    if let Ok(id) = Uuid::parse_str(raw) {
        return Ok(Some(id));
    }

    let category = CategoryRepository::new(state.db.clone())
        .find_by_slug(raw)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| {
            validation_error(
                "Unknown category",
                vec![FieldError::new("category", "No category with this ID or slug")],
            )
        })?;

    Ok(Some(category.id))
}

fn keywords_json(keywords: Option<Vec<String>>) -> Option<JsonValue> {
    keywords.map(|keywords| json!(keywords))
}

/// List live perks
///
/// Returns active, approved and visible perks for the public catalog,
/// paginated and optionally filtered by category or search term.
#[utoipa::path(
    get,
    path = "/api/perks",
    params(PerkQuery),
    responses(
        (status = 200, description = "Paginated list of live perks", body = ApiResponse<Vec<PerkInfo>>),
        (status = 400, description = "Invalid filter", body = ApiError)
    ),
    tag = "perks"
)]
pub async fn list_public(
    State(state): State<AppState>,
    Query(query): Query<PerkQuery>,
) -> Result<Json<ApiResponse<Vec<PerkInfo>>>, ApiError> {
    let filter = PerkFilter {
        status: Some("active".to_string()),
        approval_status: Some("approved".to_string()),
        category_id: resolve_category(&state, query.category.as_deref()).await?,
        client_id: None,
        search: query.search.clone(),
        visible_only: true,
        sort: PerkSort::parse(query.sort.as_deref()),
    };

    let page = clamp_page(query.page);
    let limit = clamp_limit(query.limit);
    let repo = PerkRepository::new(state.db.clone());
    let (perks, total) = repo
        .list(&filter, (page - 1) * limit, limit)
        .await
        .map_err(ApiError::from_repo)?;

    let pagination = Pagination::calculate(Some(page), Some(limit), total);
    let items = perks.into_iter().map(PerkInfo::from).collect();
    Ok(Json(ApiResponse::page(items, pagination)))
}

/// Get a live perk by slug
///
/// Returns 404 unless the perk is active, approved and visible. A view is
/// recorded in the tracking queue without blocking the response.
#[utoipa::path(
    get,
    path = "/api/perks/{slug}",
    params(
        ("slug" = String, Path, description = "Perk slug")
    ),
    responses(
        (status = 200, description = "Perk details", body = ApiResponse<PerkInfo>),
        (status = 404, description = "Perk not found or not live", body = ApiError)
    ),
    tag = "perks"
)]
pub async fn get_public(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<PerkInfo>>, ApiError> {
    let repo = PerkRepository::new(state.db.clone());
    let perk = repo
        .find_by_slug(&slug)
        .await
        .map_err(ApiError::from_repo)?
        .filter(|perk| {
            perk.status == "active" && perk.approval_status == "approved" && perk.is_visible
        })
        .ok_or_else(|| not_found("PERK_NOT_FOUND", "Perk not found"))?;

    state.tracking.record(TrackEvent::PerkView(perk.id));

    Ok(Json(ApiResponse::data(PerkInfo::from(perk))))
}

/// Record an outbound click
///
/// Fire-and-forget beacon for click-through tracking. Always answers 202
/// without touching the database; the tracking worker applies the count.
#[utoipa::path(
    post,
    path = "/api/perks/{id}/click",
    params(
        ("id" = String, Path, description = "Perk ID")
    ),
    responses(
        (status = 202, description = "Click queued")
    ),
    tag = "perks"
)]
pub async fn click(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    state.tracking.record(TrackEvent::PerkClick(id));
    (StatusCode::ACCEPTED, Json(ApiResponse::ack("Click recorded")))
}

/// List perks (admin)
///
/// Returns perks in every status and approval state, with the full filter
/// set: status, approval state, category, owning client and search.
#[utoipa::path(
    get,
    path = "/api/admin/perks",
    params(PerkQuery),
    responses(
        (status = 200, description = "Paginated list of perks", body = ApiResponse<Vec<PerkInfo>>),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "perks"
)]
pub async fn list_admin(
    State(state): State<AppState>,
    Query(query): Query<PerkQuery>,
) -> Result<Json<ApiResponse<Vec<PerkInfo>>>, ApiError> {
    let filter = PerkFilter {
        status: query.status.clone(),
        approval_status: query.approval_status.clone(),
        category_id: resolve_category(&state, query.category.as_deref()).await?,
        client_id: query.client_id,
        search: query.search.clone(),
        visible_only: false,
        sort: PerkSort::parse(query.sort.as_deref()),
    };

    let page = clamp_page(query.page);
    let limit = clamp_limit(query.limit);
    let repo = PerkRepository::new(state.db.clone());
    let (perks, total) = repo
        .list(&filter, (page - 1) * limit, limit)
        .await
        .map_err(ApiError::from_repo)?;

    let pagination = Pagination::calculate(Some(page), Some(limit), total);
    let items = perks.into_iter().map(PerkInfo::from).collect();
    Ok(Json(ApiResponse::page(items, pagination)))
}

/// Create a perk
///
/// Accepts `multipart/form-data` with a JSON `payload` part and optional
/// `main_image`, `vendor_logo` and `gallery` image parts. Slugs derived
/// from the title are suffixed until unique; an explicit `slug` that is
/// already taken is a 409. New perks start in the `pending` approval state.
#[utoipa::path(
    post,
    path = "/api/admin/perks",
    request_body(content = PerkPayload, content_type = "multipart/form-data",
        description = "JSON `payload` part plus optional image parts"),
    responses(
        (status = 201, description = "Perk created", body = ApiResponse<PerkInfo>),
        (status = 400, description = "Invalid payload or image", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 409, description = "Requested slug already in use", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "perks"
)]
pub async fn create(
    State(state): State<AppState>,
    client: ClientExtension,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<PerkInfo>>), ApiError> {
    let (payload, images) = read_perk_multipart(&state.media, multipart).await?;
    validate_payload(&payload)?;
    if let Some(category_id) = payload.category_id {
        ensure_category_exists(&state, &category_id).await?;
    }

    let repo = PerkRepository::new(state.db.clone());
    let unique_slug = match &payload.slug {
        Some(requested) => {
            let requested = slug::slugify_default(requested);
            if repo
                .slug_taken(&requested, None)
                .await
                .map_err(ApiError::from_repo)?
            {
                return Err(conflict("DUPLICATE_SLUG", "Slug is already in use"));
            }
            requested
        }
        None => {
            let base = slug::slugify_default(&payload.title);
            slug::ensure_unique(&base, |candidate| {
                let repo = repo.clone();
                async move { repo.slug_taken(&candidate, None).await }
            })
            .await
            .map_err(ApiError::from_repo)?
        }
    };

    let actor = client.0.map(|client_id| client_id.0);
    let now = Utc::now();
    let model = perk::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(payload.title.trim().to_string()),
        slug: Set(unique_slug),
        description: Set(payload.description),
        summary: Set(payload.summary),
        vendor_name: Set(payload.vendor_name),
        website_url: Set(payload.website_url),
        discount_label: Set(payload.discount_label),
        category_id: Set(payload.category_id),
        client_id: Set(payload.client_id.or(actor)),
        status: Set(payload.status.unwrap_or_else(|| "pending".to_string())),
        approval_status: Set("pending".to_string()),
        approval_note: Set(None),
        is_visible: Set(payload.is_visible.unwrap_or(true)),
        starts_at: Set(payload.starts_at.map(Into::into)),
        ends_at: Set(payload.ends_at.map(Into::into)),
        quantity: Set(payload.quantity),
        redemption_count: Set(0),
        view_count: Set(0),
        click_count: Set(0),
        lead_count: Set(0),
        conversion_rate: Set(0.0),
        main_image: Set(images.main_image),
        vendor_logo: Set(images.vendor_logo),
        gallery: Set(if images.gallery.is_empty() {
            None
        } else {
            Some(json!(images.gallery))
        }),
        seo_title: Set(payload.seo_title),
        seo_description: Set(payload.seo_description),
        seo_keywords: Set(keywords_json(payload.seo_keywords)),
        created_by: Set(actor),
        updated_by: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let created = repo.create(model).await.map_err(ApiError::from_repo)?;
    tracing::info!(perk_id = %created.id, slug = %created.slug, "Created perk");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(PerkInfo::from(created))),
    ))
}

/// Get a perk by ID (admin)
#[utoipa::path(
    get,
    path = "/api/admin/perks/{id}",
    params(
        ("id" = String, Path, description = "Perk ID")
    ),
    responses(
        (status = 200, description = "Perk details", body = ApiResponse<PerkInfo>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Perk not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "perks"
)]
pub async fn get_admin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<PerkInfo>>, ApiError> {
    let perk = PerkRepository::new(state.db.clone())
        .find_by_id(&id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| not_found("PERK_NOT_FOUND", "Perk not found"))?;

    Ok(Json(ApiResponse::data(PerkInfo::from(perk))))
}

/// Update a perk
///
/// Full replace of the editable fields from the JSON `payload` part. The
/// slug only changes when the payload carries an explicit `slug`, and a
/// slug another perk holds is a 409. Image parts replace the stored ones,
/// and replaced files are removed from disk after the row is saved.
#[utoipa::path(
    put,
    path = "/api/admin/perks/{id}",
    params(
        ("id" = String, Path, description = "Perk ID")
    ),
    request_body(content = PerkPayload, content_type = "multipart/form-data",
        description = "JSON `payload` part plus optional image parts"),
    responses(
        (status = 200, description = "Perk updated", body = ApiResponse<PerkInfo>),
        (status = 400, description = "Invalid payload or image", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Perk not found", body = ApiError),
        (status = 409, description = "Requested slug already in use", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "perks"
)]
pub async fn update(
    State(state): State<AppState>,
    client: ClientExtension,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<ApiResponse<PerkInfo>>, ApiError> {
    let repo = PerkRepository::new(state.db.clone());
    let existing = repo
        .find_by_id(&id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| not_found("PERK_NOT_FOUND", "Perk not found"))?;

    let (payload, images) = read_perk_multipart(&state.media, multipart).await?;
    validate_payload(&payload)?;
    if let Some(category_id) = payload.category_id {
        ensure_category_exists(&state, &category_id).await?;
    }

    let unique_slug = match &payload.slug {
        Some(requested) => {
            let requested = slug::slugify_default(requested);
            if requested != existing.slug
                && repo
                    .slug_taken(&requested, Some(&id))
                    .await
                    .map_err(ApiError::from_repo)?
            {
                return Err(conflict("DUPLICATE_SLUG", "Slug is already in use"));
            }
            requested
        }
        None => existing.slug.clone(),
    };

    let actor = client.0.map(|client_id| client_id.0);
    let mut model = perk::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        slug: Set(unique_slug),
        description: Set(payload.description),
        summary: Set(payload.summary),
        vendor_name: Set(payload.vendor_name),
        website_url: Set(payload.website_url),
        discount_label: Set(payload.discount_label),
        category_id: Set(payload.category_id),
        client_id: Set(payload.client_id.or(existing.client_id)),
        status: Set(payload
            .status
            .unwrap_or_else(|| existing.status.clone())),
        is_visible: Set(payload.is_visible.unwrap_or(existing.is_visible)),
        starts_at: Set(payload.starts_at.map(Into::into)),
        ends_at: Set(payload.ends_at.map(Into::into)),
        quantity: Set(payload.quantity),
        seo_title: Set(payload.seo_title),
        seo_description: Set(payload.seo_description),
        seo_keywords: Set(keywords_json(payload.seo_keywords)),
        ..Default::default()
    };
    if actor.is_some() {
        model.updated_by = Set(actor);
    }

    // Replaced files are deleted only after the row is saved
    let mut replaced: Vec<String> = Vec::new();
    if let Some(path) = images.main_image {
        if let Some(old) = existing.main_image.clone() {
            replaced.push(old);
        }
        model.main_image = Set(Some(path));
    }
    if let Some(path) = images.vendor_logo {
        if let Some(old) = existing.vendor_logo.clone() {
            replaced.push(old);
        }
        model.vendor_logo = Set(Some(path));
    }
    if !images.gallery.is_empty() {
        replaced.extend(existing.gallery_paths());
        model.gallery = Set(Some(json!(images.gallery)));
    }

    let updated = repo.update(&id, model).await.map_err(ApiError::from_repo)?;
    for path in replaced {
        state.media.remove_best_effort(&path);
    }
    tracing::info!(perk_id = %updated.id, "Updated perk");

    Ok(Json(ApiResponse::data(PerkInfo::from(updated))))
}

/// Delete a perk
///
/// Removes the row and then its stored images, best effort.
#[utoipa::path(
    delete,
    path = "/api/admin/perks/{id}",
    params(
        ("id" = String, Path, description = "Perk ID")
    ),
    responses(
        (status = 200, description = "Perk deleted"),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Perk not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "perks"
)]
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let removed = PerkRepository::new(state.db.clone())
        .delete(&id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| not_found("PERK_NOT_FOUND", "Perk not found"))?;

    if let Some(path) = &removed.main_image {
        state.media.remove_best_effort(path);
    }
    if let Some(path) = &removed.vendor_logo {
        state.media.remove_best_effort(path);
    }
    for path in removed.gallery_paths() {
        state.media.remove_best_effort(&path);
    }
    tracing::info!(perk_id = %id, "Deleted perk");

    Ok(Json(ApiResponse::ack("Perk deleted")))
}

/// Change a perk's lifecycle status
#[utoipa::path(
    patch,
    path = "/api/admin/perks/{id}/status",
    params(
        ("id" = String, Path, description = "Perk ID")
    ),
    request_body = PerkStatusPayload,
    responses(
        (status = 200, description = "Status updated", body = ApiResponse<PerkInfo>),
        (status = 400, description = "Unknown status", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Perk not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "perks"
)]
pub async fn set_status(
    State(state): State<AppState>,
    client: ClientExtension,
    Path(id): Path<Uuid>,
    Json(body): Json<PerkStatusPayload>,
) -> Result<Json<ApiResponse<PerkInfo>>, ApiError> {
    if !perk::STATUSES.contains(&body.status.as_str()) {
        return Err(validation_error(
            "Unknown status",
            vec![FieldError::new(
                "status",
                format!("Status must be one of: {}", perk::STATUSES.join(", ")),
            )],
        ));
    }

    let repo = PerkRepository::new(state.db.clone());
    repo.find_by_id(&id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| not_found("PERK_NOT_FOUND", "Perk not found"))?;

    let actor = client.0.map(|client_id| client_id.0);
    let updated = repo
        .set_status(&id, &body.status, actor)
        .await
        .map_err(ApiError::from_repo)?;
    tracing::info!(perk_id = %id, status = %body.status, "Changed perk status");

    Ok(Json(ApiResponse::data(PerkInfo::from(updated))))
}

/// Record a moderation decision
///
/// Sets the approval state and reviewer note, then emits a perk approval
/// notification without blocking the response.
#[utoipa::path(
    patch,
    path = "/api/admin/perks/{id}/approval",
    params(
        ("id" = String, Path, description = "Perk ID")
    ),
    request_body = PerkApprovalPayload,
    responses(
        (status = 200, description = "Approval state updated", body = ApiResponse<PerkInfo>),
        (status = 400, description = "Unknown approval state", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Perk not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "perks"
)]
pub async fn set_approval(
    State(state): State<AppState>,
    client: ClientExtension,
    Path(id): Path<Uuid>,
    Json(body): Json<PerkApprovalPayload>,
) -> Result<Json<ApiResponse<PerkInfo>>, ApiError> {
    if !perk::APPROVAL_STATUSES.contains(&body.approval_status.as_str()) {
        return Err(validation_error(
            "Unknown approval state",
            vec![FieldError::new(
                "approval_status",
                format!(
                    "Approval state must be one of: {}",
                    perk::APPROVAL_STATUSES.join(", ")
                ),
            )],
        ));
    }

    let repo = PerkRepository::new(state.db.clone());
    repo.find_by_id(&id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| not_found("PERK_NOT_FOUND", "Perk not found"))?;

    let actor = client.0.map(|client_id| client_id.0);
    let updated = repo
        .set_approval(&id, &body.approval_status, body.approval_note, actor)
        .await
        .map_err(ApiError::from_repo)?;
    tracing::info!(
        perk_id = %id,
        approval_status = %body.approval_status,
        "Recorded moderation decision"
    );

    notify_best_effort(&state.notifier, NotifyEvent::perk_approval(&updated)).await;

    Ok(Json(ApiResponse::data(PerkInfo::from(updated))))
}

/// Edit a perk's SEO overrides
///
/// A client identified by `X-Client-Id` may only edit perks it owns;
/// requests without a client header act with full admin rights.
#[utoipa::path(
    patch,
    path = "/api/admin/perks/{id}/seo",
    params(
        ("id" = String, Path, description = "Perk ID")
    ),
    request_body = PerkSeoPayload,
    responses(
        (status = 200, description = "SEO overrides updated", body = ApiResponse<PerkInfo>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 403, description = "Client does not own this perk", body = ApiError),
        (status = 404, description = "Perk not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "perks"
)]
pub async fn set_seo(
    State(state): State<AppState>,
    client: ClientExtension,
    Path(id): Path<Uuid>,
    Json(body): Json<PerkSeoPayload>,
) -> Result<Json<ApiResponse<PerkInfo>>, ApiError> {
    let repo = PerkRepository::new(state.db.clone());
    let existing = repo
        .find_by_id(&id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| not_found("PERK_NOT_FOUND", "Perk not found"))?;

    if !client.may_manage(existing.client_id) {
        return Err(forbidden(Some("Client does not own this perk")));
    }

    let actor = client.0.map(|client_id| client_id.0);
    let updated = repo
        .update_seo(
            &id,
            body.seo_title,
            body.seo_description,
            keywords_json(body.seo_keywords),
            actor,
        )
        .await
        .map_err(ApiError::from_repo)?;

    Ok(Json(ApiResponse::data(PerkInfo::from(updated))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{CLIENT_ID_HEADER, auth_middleware};
    use crate::config::AppConfig;
    use crate::server::AppState;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Method, Request, Response, header};
    use axum::middleware::from_fn_with_state;
    use axum::routing::{get, patch, post, put};
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, DatabaseConnection};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "perk-test-boundary";
    const TOKEN: &str = "test-admin-token";

    async fn setup() -> (Router, Arc<DatabaseConnection>, TempDir) {
        let db = Arc::new(Database::connect("sqlite::memory:").await.unwrap());
        Migrator::up(db.as_ref(), None).await.unwrap();

        let uploads = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.admin_tokens = vec![TOKEN.to_string()];
        config.media.upload_dir = uploads.path().display().to_string();
        let config = Arc::new(config);

        let (state, _worker) = AppState::build(config.clone(), db.clone());
        let admin = Router::new()
            .route("/api/admin/perks", get(list_admin).post(create))
            .route(
                "/api/admin/perks/{id}",
                get(get_admin).put(update).delete(remove),
            )
            .route("/api/admin/perks/{id}/status", patch(set_status))
            .route("/api/admin/perks/{id}/approval", patch(set_approval))
            .route("/api/admin/perks/{id}/seo", patch(set_seo))
            .layer(from_fn_with_state(config.clone(), auth_middleware));
        let app = Router::new()
            .route("/api/perks", get(list_public))
            .route("/api/perks/{slug}", get(get_public))
            .route("/api/perks/{id}/click", post(click))
            .merge(admin)
            .with_state(state);

        (app, db, uploads)
    }

    fn payload_body(payload: &serde_json::Value) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"payload\"\r\n\
             Content-Type: application/json\r\n\r\n{payload}\r\n--{BOUNDARY}--\r\n"
        )
    }

    fn multipart_request(method: Method, uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn json_request(method: Method, uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_json(response: Response<Body>) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn perk_row(title: &str, slug: &str, status: &str, approval: &str) -> perk::ActiveModel {
        let now = Utc::now();
        perk::ActiveModel {
            id: Set(Uuid::new_v4()),
            title: Set(title.to_string()),
            slug: Set(slug.to_string()),
            description: Set(None),
            summary: Set(None),
            vendor_name: Set(None),
            website_url: Set(None),
            discount_label: Set(None),
            category_id: Set(None),
            client_id: Set(None),
            status: Set(status.to_string()),
            approval_status: Set(approval.to_string()),
            approval_note: Set(None),
            is_visible: Set(true),
            starts_at: Set(None),
            ends_at: Set(None),
            quantity: Set(None),
            redemption_count: Set(0),
            view_count: Set(0),
            click_count: Set(0),
            lead_count: Set(0),
            conversion_rate: Set(0.0),
            main_image: Set(None),
            vendor_logo: Set(None),
            gallery: Set(None),
            seo_title: Set(None),
            seo_description: Set(None),
            seo_keywords: Set(None),
            created_by: Set(None),
            updated_by: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
    }

    #[tokio::test]
    async fn test_create_persists_perk_with_generated_slug() {
        let (app, db, _uploads) = setup().await;

        let payload = serde_json::json!({"title": "Cloud Credits", "vendor_name": "Acme"});
        let response = app
            .oneshot(multipart_request(
                Method::POST,
                "/api/admin/perks",
                payload_body(&payload),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = read_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["slug"], "cloud-credits");
        assert_eq!(body["data"]["status"], "pending");
        assert_eq!(body["data"]["approval_status"], "pending");

        let stored = PerkRepository::new(db)
            .find_by_slug("cloud-credits")
            .await
            .unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn test_duplicate_titles_get_suffixed_slugs() {
        let (app, _db, _uploads) = setup().await;
        let payload = serde_json::json!({"title": "Cloud Credits"});

        let first = app
            .clone()
            .oneshot(multipart_request(
                Method::POST,
                "/api/admin/perks",
                payload_body(&payload),
            ))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);

        let second = app
            .oneshot(multipart_request(
                Method::POST,
                "/api/admin/perks",
                payload_body(&payload),
            ))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CREATED);
        let body = read_json(second).await;
        assert_eq!(body["data"]["slug"], "cloud-credits-1");
    }

    #[tokio::test]
    async fn test_explicit_slug_conflicts_instead_of_suffixing() {
        let (app, db, _uploads) = setup().await;
        PerkRepository::new(db)
            .create(perk_row("Taken", "cloud-credits", "active", "approved"))
            .await
            .unwrap();

        let payload = serde_json::json!({"title": "Other", "slug": "cloud-credits"});
        let response = app
            .oneshot(multipart_request(
                Method::POST,
                "/api/admin/perks",
                payload_body(&payload),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "DUPLICATE_SLUG");
    }

    #[tokio::test]
    async fn test_create_rejects_missing_payload_part() {
        let (app, _db, _uploads) = setup().await;

        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"main_image\"; \
             filename=\"main.png\"\r\nContent-Type: image/png\r\n\r\nfake-png-bytes\r\n\
             --{BOUNDARY}--\r\n"
        );
        let response = app
            .oneshot(multipart_request(Method::POST, "/api/admin/perks", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_upload_rejects_unsupported_content_type() {
        let (app, _db, _uploads) = setup().await;

        let payload = serde_json::json!({"title": "Cloud Credits"});
        let body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"payload\"\r\n\
             Content-Type: application/json\r\n\r\n{payload}\r\n\
             --{BOUNDARY}\r\nContent-Disposition: form-data; name=\"main_image\"; \
             filename=\"main.txt\"\r\nContent-Type: text/plain\r\n\r\nnot an image\r\n\
             --{BOUNDARY}--\r\n"
        );
        let response = app
            .oneshot(multipart_request(Method::POST, "/api/admin/perks", body))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_public_list_hides_unapproved_perks() {
        let (app, db, _uploads) = setup().await;
        let repo = PerkRepository::new(db);
        repo.create(perk_row("Live", "live", "active", "approved"))
            .await
            .unwrap();
        repo.create(perk_row("Draft", "draft", "pending", "pending"))
            .await
            .unwrap();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/perks")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 1);
        assert_eq!(body["data"][0]["slug"], "live");
        assert_eq!(body["pagination"]["total_items"], 1);
    }

    #[tokio::test]
    async fn test_get_public_hides_perks_that_are_not_live() {
        let (app, db, _uploads) = setup().await;
        let repo = PerkRepository::new(db);
        repo.create(perk_row("Live", "live", "active", "approved"))
            .await
            .unwrap();
        repo.create(perk_row("Draft", "draft", "pending", "pending"))
            .await
            .unwrap();

        let live = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/perks/live")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(live.status(), StatusCode::OK);

        let draft = app
            .oneshot(
                Request::builder()
                    .uri("/api/perks/draft")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(draft.status(), StatusCode::NOT_FOUND);
        let body = read_json(draft).await;
        assert_eq!(body["error"]["code"], "PERK_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_update_keeps_slug_unless_requested() {
        let (app, _db, _uploads) = setup().await;

        let created = app
            .clone()
            .oneshot(multipart_request(
                Method::POST,
                "/api/admin/perks",
                payload_body(&serde_json::json!({"title": "Cloud Credits"})),
            ))
            .await
            .unwrap();
        let created = read_json(created).await;
        let id = created["data"]["id"].as_str().unwrap().to_string();

        let updated = app
            .oneshot(multipart_request(
                Method::PUT,
                &format!("/api/admin/perks/{id}"),
                payload_body(&serde_json::json!({
                    "title": "Renamed Credits",
                    "summary": "Now with a summary"
                })),
            ))
            .await
            .unwrap();

        assert_eq!(updated.status(), StatusCode::OK);
        let body = read_json(updated).await;
        assert_eq!(body["data"]["title"], "Renamed Credits");
        assert_eq!(body["data"]["slug"], "cloud-credits");
        assert_eq!(body["data"]["summary"], "Now with a summary");
    }

    #[tokio::test]
    async fn test_set_status_rejects_unknown_status() {
        let (app, db, _uploads) = setup().await;
        let repo = PerkRepository::new(db);
        let perk = repo
            .create(perk_row("Live", "live", "active", "approved"))
            .await
            .unwrap();

        let response = app
            .oneshot(json_request(
                Method::PATCH,
                &format!("/api/admin/perks/{}/status", perk.id),
                &serde_json::json!({"status": "archived"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_set_seo_enforces_client_ownership() {
        let (app, db, _uploads) = setup().await;
        let owner = Uuid::new_v4();
        let mut row = perk_row("Owned", "owned", "active", "approved");
        row.client_id = Set(Some(owner));
        let perk = PerkRepository::new(db).create(row).await.unwrap();

        let seo = serde_json::json!({"seo_title": "Better title"});
        let uri = format!("/api/admin/perks/{}/seo", perk.id);

        let stranger = Request::builder()
            .method(Method::PATCH)
            .uri(&uri)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .header(CLIENT_ID_HEADER, Uuid::new_v4().to_string())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(seo.to_string()))
            .unwrap();
        let response = app.clone().oneshot(stranger).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let owned = Request::builder()
            .method(Method::PATCH)
            .uri(&uri)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .header(CLIENT_ID_HEADER, owner.to_string())
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(seo.to_string()))
            .unwrap();
        let response = app.clone().oneshot(owned).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["seo_title"], "Better title");

        // No client header means full admin rights
        let admin = app
            .oneshot(json_request(Method::PATCH, &uri, &seo))
            .await
            .unwrap();
        assert_eq!(admin.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_click_is_accepted_without_lookup() {
        let (app, _db, _uploads) = setup().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri(format!("/api/perks/{}/click", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        let (app, _db, _uploads) = setup().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/admin/perks")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
