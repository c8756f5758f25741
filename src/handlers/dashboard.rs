//! # Dashboard Handlers
//!
//! Admin reporting endpoints backed by [`crate::dashboard::DashboardService`].
//! The overview and traffic endpoints accept a reporting window; the stat
//! branches aggregate the whole catalog.

use axum::{
    Json,
    extract::{Query, State},
};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Deserialize;
use serde_json::json;
use utoipa::IntoParams;

use crate::analytics::TrafficMetrics;
use crate::dashboard::{CategoryStats, DashboardOverview, DateRange, LeadStats, PerkStats};
use crate::error::{ApiError, FieldError, validation_error};
use crate::handlers::ApiResponse;
use crate::server::AppState;

/// Reporting window query parameters
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DashboardQuery {
    /// Named period: `7d`, `30d`, `90d` or `365d`
    pub period: Option<String>,
    /// Explicit window start, RFC 3339 or `YYYY-MM-DD`
    pub start_date: Option<String>,
    /// Explicit window end, RFC 3339 or `YYYY-MM-DD`
    pub end_date: Option<String>,
}

/// Parses an RFC 3339 timestamp or a bare date taken as midnight UTC.
fn parse_date(field: &'static str, raw: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(validation_error(
        "Invalid date",
        vec![FieldError::new(
            field,
            "Use an RFC 3339 timestamp or YYYY-MM-DD",
        )],
    ))
}

fn resolve_range(query: &DashboardQuery) -> Result<DateRange, ApiError> {
    let start = query
        .start_date
        .as_deref()
        .map(|raw| parse_date("start_date", raw))
        .transpose()?;
    let end = query
        .end_date
        .as_deref()
        .map(|raw| parse_date("end_date", raw))
        .transpose()?;
    Ok(DateRange::resolve(query.period.as_deref(), start, end))
}

/// Full dashboard overview
///
/// Every aggregation branch degrades independently, so the endpoint never
/// fails because one statistic could not be computed.
#[utoipa::path(
    get,
    path = "/api/admin/dashboard/overview",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Aggregated dashboard overview", body = ApiResponse<DashboardOverview>),
        (status = 400, description = "Invalid date", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "dashboard"
)]
pub async fn overview(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<ApiResponse<DashboardOverview>>, ApiError> {
    let range = resolve_range(&query)?;
    let overview = state.dashboard.overview(range).await;
    Ok(Json(ApiResponse::data(overview)))
}

/// Perk catalog statistics
#[utoipa::path(
    get,
    path = "/api/admin/dashboard/perks",
    responses(
        (status = 200, description = "Perk catalog statistics", body = ApiResponse<PerkStats>),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "dashboard"
)]
pub async fn perks(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<PerkStats>>, ApiError> {
    let stats = state
        .dashboard
        .perk_stats()
        .await
        .map_err(ApiError::from_repo)?;
    Ok(Json(ApiResponse::data(stats)))
}

/// Category tree statistics
#[utoipa::path(
    get,
    path = "/api/admin/dashboard/categories",
    responses(
        (status = 200, description = "Category tree statistics", body = ApiResponse<CategoryStats>),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "dashboard"
)]
pub async fn categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CategoryStats>>, ApiError> {
    let stats = state
        .dashboard
        .category_stats()
        .await
        .map_err(ApiError::from_repo)?;
    Ok(Json(ApiResponse::data(stats)))
}

/// Lead pipeline statistics
#[utoipa::path(
    get,
    path = "/api/admin/dashboard/leads",
    responses(
        (status = 200, description = "Lead pipeline statistics", body = ApiResponse<LeadStats>),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "dashboard"
)]
pub async fn leads(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<LeadStats>>, ApiError> {
    let stats = state
        .dashboard
        .lead_stats()
        .await
        .map_err(ApiError::from_repo)?;
    Ok(Json(ApiResponse::data(stats)))
}

/// Traffic metrics for the reporting window
///
/// Serves zeros when no analytics provider is configured or the provider
/// fails. The resolved window rides along in `meta.date_range`.
#[utoipa::path(
    get,
    path = "/api/admin/dashboard/traffic",
    params(DashboardQuery),
    responses(
        (status = 200, description = "Traffic metrics", body = ApiResponse<TrafficMetrics>),
        (status = 400, description = "Invalid date", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "dashboard"
)]
pub async fn traffic(
    State(state): State<AppState>,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<ApiResponse<TrafficMetrics>>, ApiError> {
    let range = resolve_range(&query)?;
    let metrics = state.dashboard.traffic(&range).await;
    Ok(Json(
        ApiResponse::data(metrics).with_meta(json!({ "date_range": range })),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::auth_middleware;
    use crate::config::AppConfig;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode, header};
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
            .route("/api/admin/dashboard/overview", get(overview))
            .route("/api/admin/dashboard/perks", get(perks))
            .route("/api/admin/dashboard/categories", get(categories))
            .route("/api/admin/dashboard/leads", get(leads))
            .route("/api/admin/dashboard/traffic", get(traffic))
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

    async fn read_json(response: Response<Body>) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_overview_on_empty_database() {
        let app = setup().await;

        let response = app
            .oneshot(admin_get("/api/admin/dashboard/overview"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["summary"]["total_perks"], 0);
        assert_eq!(body["data"]["summary"]["total_leads"], 0);
        assert_eq!(body["data"]["recent_activity"], serde_json::json!([]));
        assert_eq!(body["data"]["date_range"]["period"], "30d");
    }

    #[tokio::test]
    async fn test_overview_honors_explicit_window() {
        let app = setup().await;

        let response = app
            .oneshot(admin_get(
                "/api/admin/dashboard/overview?start_date=2026-01-01&end_date=2026-02-01",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["date_range"]["period"], "custom");
        assert_eq!(
            body["data"]["date_range"]["start"]
                .as_str()
                .unwrap()
                .starts_with("2026-01-01"),
            true
        );
    }

    #[tokio::test]
    async fn test_unparseable_date_is_rejected() {
        let app = setup().await;

        let response = app
            .oneshot(admin_get(
                "/api/admin/dashboard/overview?start_date=january&end_date=2026-02-01",
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["details"][0]["field"], "start_date");
    }

    #[tokio::test]
    async fn test_stat_branches_serve_zeroed_shapes() {
        let app = setup().await;

        let response = app
            .clone()
            .oneshot(admin_get("/api/admin/dashboard/perks"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["total"], 0);
        assert_eq!(body["data"]["by_status"]["active"], 0);

        let response = app
            .clone()
            .oneshot(admin_get("/api/admin/dashboard/categories"))
            .await
            .unwrap();
        let body = read_json(response).await;
        assert_eq!(body["data"]["top_categories"], serde_json::json!([]));

        let response = app
            .oneshot(admin_get("/api/admin/dashboard/leads"))
            .await
            .unwrap();
        let body = read_json(response).await;
        assert_eq!(body["data"]["conversion_rate"], 0.0);
        assert_eq!(body["data"]["needing_follow_up"], 0);
    }

    #[tokio::test]
    async fn test_traffic_serves_zeros_with_range_meta() {
        let app = setup().await;

        let response = app
            .oneshot(admin_get("/api/admin/dashboard/traffic?period=7d"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["sessions"], 0);
        assert_eq!(body["data"]["page_views"], 0);
        assert_eq!(body["meta"]["date_range"]["period"], "7d");
    }

    #[tokio::test]
    async fn test_dashboard_requires_token() {
        let app = setup().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/admin/dashboard/overview")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
