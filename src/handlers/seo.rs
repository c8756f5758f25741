//! # SEO Handlers
//!
//! Serves the generated `sitemap.xml` and `robots.txt` from disk, manages
//! the single-active SEO configuration and runs on-demand audits. The
//! public files are regenerated on first miss, on every settings update and
//! through the admin regenerate endpoint; the GET handlers themselves only
//! read files back.

use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, FieldError, not_found, validation_error};
use crate::handlers::{ApiResponse, string_list};
use crate::models::seo_setting;
use crate::repositories::{BlogPostRepository, PerkRepository, SeoSettingRepository};
use crate::seo::{AuditKind, AuditSubject, KeywordDensity, SeoAudit, audit, keyword_density};
use crate::server::AppState;

/// Active SEO configuration as returned by the admin endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SeoSettingsInfo {
    /// Unique configuration identifier
    pub id: Uuid,
    /// Site-wide default meta title
    pub meta_title: Option<String>,
    /// Site-wide default meta description
    pub meta_description: Option<String>,
    /// Site-wide default keywords
    pub meta_keywords: Vec<String>,
    /// Default Open Graph share image path
    pub og_image: Option<String>,
    /// Extra lines appended verbatim to robots.txt
    pub robots_extra: Option<String>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl From<seo_setting::Model> for SeoSettingsInfo {
    fn from(model: seo_setting::Model) -> Self {
        let meta_keywords = string_list(model.meta_keywords.as_ref());
        Self {
            id: model.id,
            meta_title: model.meta_title,
            meta_description: model.meta_description,
            meta_keywords,
            og_image: model.og_image,
            robots_extra: model.robots_extra,
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// Request body replacing the active SEO configuration
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SeoSettingsPayload {
    /// Site-wide default meta title
    pub meta_title: Option<String>,
    /// Site-wide default meta description
    pub meta_description: Option<String>,
    /// Site-wide default keywords
    pub meta_keywords: Option<Vec<String>>,
    /// Default Open Graph share image path
    pub og_image: Option<String>,
    /// Extra lines appended verbatim to robots.txt
    pub robots_extra: Option<String>,
}

/// Audit result together with keyword usage statistics
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditReport {
    /// Rule-based audit of the entity's SEO metadata
    pub audit: SeoAudit,
    /// Per-keyword density over the entity's content
    pub keyword_density: Vec<KeywordDensity>,
}

/// Reads a generated file, regenerating both files first when it is missing.
async fn serve_generated(state: &AppState, path: PathBuf) -> Result<String, ApiError> {
    if !path.exists() {
        state
            .sitemap
            .write_all(&state.db)
            .await
            .map_err(ApiError::from_repo)?;
    }
    tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {}", path.display()))
        .map_err(ApiError::from_repo)
}

/// Serve sitemap.xml
#[utoipa::path(
    get,
    path = "/api/seo/sitemap.xml",
    responses(
        (status = 200, description = "Sitemap XML", content_type = "application/xml"),
        (status = 500, description = "Generation failed", body = ApiError)
    ),
    tag = "seo"
)]
pub async fn sitemap_xml(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let contents = serve_generated(&state, state.sitemap.sitemap_path()).await?;
    Ok((
        [(header::CONTENT_TYPE, "application/xml; charset=utf-8")],
        contents,
    ))
}

/// Serve robots.txt
#[utoipa::path(
    get,
    path = "/api/seo/robots.txt",
    responses(
        (status = 200, description = "Robots directives", content_type = "text/plain"),
        (status = 500, description = "Generation failed", body = ApiError)
    ),
    tag = "seo"
)]
pub async fn robots_txt(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let contents = serve_generated(&state, state.sitemap.robots_path()).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        contents,
    ))
}

/// Get the active SEO configuration
///
/// An empty configuration row is created on first access.
#[utoipa::path(
    get,
    path = "/api/admin/seo",
    responses(
        (status = 200, description = "Active SEO configuration", body = ApiResponse<SeoSettingsInfo>),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "seo"
)]
pub async fn get_settings(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SeoSettingsInfo>>, ApiError> {
    let settings = SeoSettingRepository::new(state.db.clone())
        .get_or_create_active()
        .await
        .map_err(ApiError::from_repo)?;
    Ok(Json(ApiResponse::data(SeoSettingsInfo::from(settings))))
}

/// Replace the active SEO configuration
///
/// Full replace of all fields; absent fields clear. The sitemap and robots
/// files are rewritten before the response goes out, so crawlers pick up
/// new robots directives immediately.
#[utoipa::path(
    put,
    path = "/api/admin/seo",
    request_body = SeoSettingsPayload,
    responses(
        (status = 200, description = "SEO configuration replaced", body = ApiResponse<SeoSettingsInfo>),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "seo"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    Json(payload): Json<SeoSettingsPayload>,
) -> Result<Json<ApiResponse<SeoSettingsInfo>>, ApiError> {
    let update = seo_setting::ActiveModel {
        meta_title: Set(payload.meta_title),
        meta_description: Set(payload.meta_description),
        meta_keywords: Set(payload.meta_keywords.map(|keywords| json!(keywords))),
        og_image: Set(payload.og_image),
        robots_extra: Set(payload.robots_extra),
        ..Default::default()
    };

    let settings = SeoSettingRepository::new(state.db.clone())
        .replace_active(update)
        .await
        .map_err(ApiError::from_repo)?;

    // The row is already saved; a failed file write must not roll it back
    if let Err(error) = state.sitemap.write_all(&state.db).await {
        tracing::warn!(error = ?error, "sitemap regeneration after settings update failed");
    }
    tracing::info!(seo_setting_id = %settings.id, "Replaced SEO configuration");

    Ok(Json(ApiResponse::data(SeoSettingsInfo::from(settings))))
}

/// Regenerate sitemap.xml and robots.txt
#[utoipa::path(
    post,
    path = "/api/admin/seo/regenerate",
    responses(
        (status = 200, description = "Files regenerated"),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 500, description = "Generation failed", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "seo"
)]
pub async fn regenerate(State(state): State<AppState>) -> Result<Json<ApiResponse<()>>, ApiError> {
    state
        .sitemap
        .write_all(&state.db)
        .await
        .map_err(ApiError::from_repo)?;
    Ok(Json(ApiResponse::ack("Sitemap and robots.txt regenerated")))
}

/// Audit an entity's SEO metadata
///
/// `kind` selects the rule set: posts carry extra image and content-length
/// checks. Keyword density is computed over the perk description or the
/// post body; posts use their tags as the keyword set.
#[utoipa::path(
    get,
    path = "/api/admin/seo/audit/{kind}/{id}",
    params(
        ("kind" = String, Path, description = "Entity kind: `perk` or `post`"),
        ("id" = String, Path, description = "Entity ID")
    ),
    responses(
        (status = 200, description = "Audit report", body = ApiResponse<AuditReport>),
        (status = 400, description = "Unknown audit kind", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Entity not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "seo"
)]
pub async fn audit_entity(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, Uuid)>,
) -> Result<Json<ApiResponse<AuditReport>>, ApiError> {
    let kind = AuditKind::parse(&kind).ok_or_else(|| {
        validation_error(
            "Unknown audit kind",
            vec![FieldError::new("kind", "Must be `perk` or `post`")],
        )
    })?;

    let report = match kind {
        AuditKind::Perk => {
            let perk = PerkRepository::new(state.db.clone())
                .find_by_id(&id)
                .await
                .map_err(ApiError::from_repo)?
                .ok_or_else(|| not_found("PERK_NOT_FOUND", "Perk not found"))?;

            let keywords = string_list(perk.seo_keywords.as_ref());
            let subject = AuditSubject {
                title: perk.seo_title.as_deref(),
                description: perk.seo_description.as_deref(),
                keywords: &keywords,
                slug: &perk.slug,
                ..AuditSubject::default()
            };
            AuditReport {
                audit: audit(&subject, kind),
                keyword_density: keyword_density(
                    perk.description.as_deref().unwrap_or_default(),
                    &keywords,
                ),
            }
        }
        AuditKind::Post => {
            let post = BlogPostRepository::new(state.db.clone())
                .find_by_id(&id)
                .await
                .map_err(ApiError::from_repo)?
                .ok_or_else(|| not_found("POST_NOT_FOUND", "Post not found"))?;

            let keywords = post.tag_list();
            let subject = AuditSubject {
                title: post.seo_title.as_deref(),
                description: post.seo_description.as_deref(),
                keywords: &keywords,
                slug: &post.slug,
                og_image: post.og_image.as_deref(),
                featured_image: post.featured_image.as_deref(),
                content: Some(&post.content),
            };
            AuditReport {
                audit: audit(&subject, kind),
                keyword_density: keyword_density(&post.content, &keywords),
            }
        }
    };

    Ok(Json(ApiResponse::data(report)))
}
