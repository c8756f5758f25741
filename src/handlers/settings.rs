//! # Site Settings Handlers
//!
//! Admin endpoints for the site settings singleton. Updates merge field by
//! field: absent fields keep their value, an explicit `null` clears a
//! nullable one. Flipping `maintenance_mode` on locks the public lead
//! intake with a 423 until it is turned off again.

use axum::{
    Json,
    extract::State,
};
use chrono::{DateTime, Utc};
use regex::Regex;
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{ApiError, FieldError, validation_error};
use crate::handlers::ApiResponse;
use crate::models::site_settings;
use crate::repositories::SiteSettingsRepository;
use crate::server::AppState;

/// Site settings as returned by the admin endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SiteSettingsInfo {
    /// Unique settings row identifier
    pub id: Uuid,
    /// Site display name
    pub site_name: String,
    /// Short tagline shown under the name
    pub tagline: Option<String>,
    /// Public contact email
    pub contact_email: Option<String>,
    /// Social profile links, platform to URL
    pub social_links: Option<JsonValue>,
    /// While on, public lead submission returns 423
    pub maintenance_mode: bool,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl From<site_settings::Model> for SiteSettingsInfo {
    fn from(model: site_settings::Model) -> Self {
        Self {
            id: model.id,
            site_name: model.site_name,
            tagline: model.tagline,
            contact_email: model.contact_email,
            social_links: model.social_links,
            maintenance_mode: model.maintenance_mode,
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// Request body updating the site settings singleton
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SiteSettingsPayload {
    /// Site display name; must not be empty when present
    pub site_name: Option<String>,
    /// Short tagline; an explicit `null` clears it
    #[serde(default, deserialize_with = "crate::handlers::double_option")]
    pub tagline: Option<Option<String>>,
    /// Public contact email; an explicit `null` clears it
    #[serde(default, deserialize_with = "crate::handlers::double_option")]
    pub contact_email: Option<Option<String>>,
    /// Social profile links, platform to URL; an explicit `null` clears them
    #[serde(default, deserialize_with = "crate::handlers::double_option")]
    pub social_links: Option<Option<BTreeMap<String, String>>>,
    /// Lead intake lock
    pub maintenance_mode: Option<bool>,
}

fn email_is_valid(email: &str) -> bool {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    let re = EMAIL.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());
    re.is_match(email)
}

fn validate_payload(payload: &SiteSettingsPayload) -> Result<(), ApiError> {
    let mut field_errors = Vec::new();

    if let Some(site_name) = &payload.site_name
        && site_name.trim().is_empty()
    {
        field_errors.push(FieldError::new("site_name", "Must not be empty"));
    }
    if let Some(Some(contact_email)) = &payload.contact_email
        && !email_is_valid(contact_email.trim())
    {
        field_errors.push(FieldError::new(
            "contact_email",
            "Must be a valid email address",
        ));
    }

    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(validation_error("Invalid settings payload", field_errors))
    }
}

/// Get the site settings
///
/// The singleton row is created with defaults on first access.
#[utoipa::path(
    get,
    path = "/api/admin/settings",
    responses(
        (status = 200, description = "Current site settings", body = ApiResponse<SiteSettingsInfo>),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "settings"
)]
pub async fn get_settings(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<SiteSettingsInfo>>, ApiError> {
    let settings = SiteSettingsRepository::new(state.db.clone())
        .get_or_create()
        .await
        .map_err(ApiError::from_repo)?;
    Ok(Json(ApiResponse::data(SiteSettingsInfo::from(settings))))
}

/// Update the site settings
#[utoipa::path(
    put,
    path = "/api/admin/settings",
    request_body = SiteSettingsPayload,
    responses(
        (status = 200, description = "Settings updated", body = ApiResponse<SiteSettingsInfo>),
        (status = 400, description = "Invalid payload", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "settings"
)]
pub async fn update_settings(
    State(state): State<AppState>,
    Json(payload): Json<SiteSettingsPayload>,
) -> Result<Json<ApiResponse<SiteSettingsInfo>>, ApiError> {
    validate_payload(&payload)?;

    let mut update = site_settings::ActiveModel::default();
    if let Some(site_name) = payload.site_name {
        update.site_name = Set(site_name.trim().to_string());
    }
    if let Some(tagline) = payload.tagline {
        update.tagline = Set(tagline);
    }
    if let Some(contact_email) = payload.contact_email {
        update.contact_email = Set(contact_email.map(|email| email.trim().to_lowercase()));
    }
    if let Some(social_links) = payload.social_links {
        update.social_links = Set(social_links.map(|links| json!(links)));
    }
    if let Some(maintenance_mode) = payload.maintenance_mode {
        update.maintenance_mode = Set(maintenance_mode);
    }

    let settings = SiteSettingsRepository::new(state.db.clone())
        .update(update)
        .await
        .map_err(ApiError::from_repo)?;
    tracing::info!(
        maintenance_mode = settings.maintenance_mode,
        "Updated site settings"
    );

    Ok(Json(ApiResponse::data(SiteSettingsInfo::from(settings))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::auth_middleware;
    use crate::config::AppConfig;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Method, Request, Response, StatusCode, header};
    use axum::middleware::from_fn_with_state;
    use axum::routing::get;
    use migration::{Migrator, MigratorTrait};
    use sea_orm::Database;
    use std::sync::Arc;
    use tower::ServiceExt;

    const TOKEN: &str = "test-admin-token";

    async fn setup() -> Router {
        let db = Arc::new(Database::connect("sqlite::memory:").await.unwrap());
        Migrator::up(db.as_ref(), None).await.unwrap();

        let mut config = AppConfig::default();
        config.admin_tokens = vec![TOKEN.to_string()];
        let config = Arc::new(config);

        let (state, _worker) = AppState::build(config.clone(), db);
        Router::new()
            .route(
                "/api/admin/settings",
                get(get_settings).put(update_settings),
            )
            .layer(from_fn_with_state(config, auth_middleware))
            .with_state(state)
    }

    fn admin_get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
            .body(Body::empty())
            .unwrap()
    }

    fn put_settings(body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(Method::PUT)
            .uri("/api/admin/settings")
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

    #[tokio::test]
    async fn test_get_creates_defaults_on_first_access() {
        let app = setup().await;

        let response = app.oneshot(admin_get("/api/admin/settings")).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["site_name"], "Perks Marketplace");
        assert_eq!(body["data"]["maintenance_mode"], false);
        assert!(body["data"]["tagline"].is_null());
    }

    #[tokio::test]
    async fn test_update_merges_and_null_clears() {
        let app = setup().await;

        let first = app
            .clone()
            .oneshot(put_settings(&serde_json::json!({
                "site_name": "Deals Hub",
                "tagline": "Perks for members",
                "contact_email": "Hello@Example.com",
                "social_links": {"x": "https://x.com/dealshub"}
            })))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let body = read_json(first).await;
        assert_eq!(body["data"]["site_name"], "Deals Hub");
        assert_eq!(body["data"]["contact_email"], "hello@example.com");
        assert_eq!(body["data"]["social_links"]["x"], "https://x.com/dealshub");

        // Absent fields keep their value, explicit null clears
        let second = app
            .clone()
            .oneshot(put_settings(&serde_json::json!({"tagline": null})))
            .await
            .unwrap();
        let body = read_json(second).await;
        assert_eq!(body["data"]["site_name"], "Deals Hub");
        assert!(body["data"]["tagline"].is_null());
        assert_eq!(body["data"]["contact_email"], "hello@example.com");
    }

    #[tokio::test]
    async fn test_maintenance_mode_round_trips() {
        let app = setup().await;

        let on = app
            .clone()
            .oneshot(put_settings(&serde_json::json!({"maintenance_mode": true})))
            .await
            .unwrap();
        assert_eq!(read_json(on).await["data"]["maintenance_mode"], true);

        let fetched = app
            .clone()
            .oneshot(admin_get("/api/admin/settings"))
            .await
            .unwrap();
        assert_eq!(read_json(fetched).await["data"]["maintenance_mode"], true);

        let off = app
            .oneshot(put_settings(&serde_json::json!({"maintenance_mode": false})))
            .await
            .unwrap();
        assert_eq!(read_json(off).await["data"]["maintenance_mode"], false);
    }

    #[tokio::test]
    async fn test_rejects_blank_name_and_bad_email() {
        let app = setup().await;

        let blank = app
            .clone()
            .oneshot(put_settings(&serde_json::json!({"site_name": "  "})))
            .await
            .unwrap();
        assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

        let bad_email = app
            .oneshot(put_settings(
                &serde_json::json!({"contact_email": "not-an-email"}),
            ))
            .await
            .unwrap();
        assert_eq!(bad_email.status(), StatusCode::BAD_REQUEST);
        let body = read_json(bad_email).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"][0]["field"], "contact_email");
    }

    #[tokio::test]
    async fn test_settings_require_token() {
        let app = setup().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/admin/settings")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
