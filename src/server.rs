//! # Server Configuration
//!
//! Application state, router assembly and startup for the Perks API.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    Router, middleware,
    routing::{get, patch, post, put},
};
use sea_orm::DatabaseConnection;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::analytics;
use crate::auth::auth_middleware;
use crate::config::AppConfig;
use crate::dashboard::DashboardService;
use crate::handlers;
use crate::media::MediaStore;
use crate::notify::{self, Notifier};
use crate::seo::SitemapWriter;
use crate::telemetry;
use crate::tracking::{self, TrackingHandle, TrackingWorker};

/// Application state containing shared resources
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub tracking: TrackingHandle,
    pub media: Arc<MediaStore>,
    pub notifier: Arc<dyn Notifier>,
    pub dashboard: Arc<DashboardService>,
    pub sitemap: Arc<SitemapWriter>,
}

impl AppState {
    /// Wire the full state from config and an open connection pool. The
    /// returned tracking worker still has to be spawned by the caller.
    pub fn build(config: Arc<AppConfig>, db: Arc<DatabaseConnection>) -> (Self, TrackingWorker) {
        let (tracking, worker) = tracking::channel(db.clone(), &config.tracking);
        let media = Arc::new(MediaStore::new(&config.media));
        let notifier = notify::from_config(&config.notify);
        let traffic = analytics::provider_from_config(&config.traffic);
        let dashboard = Arc::new(DashboardService::new(
            db.clone(),
            traffic,
            config.dashboard.recent_limit,
        ));
        let sitemap = Arc::new(SitemapWriter::new(
            config.public_base_url.clone(),
            config.seo_output_dir.clone(),
        ));

        let state = Self {
            config,
            db,
            tracking,
            media,
            notifier,
            dashboard,
            sitemap,
        };
        (state, worker)
    }
}

/// Creates and configures the Axum application router
pub fn create_app(state: AppState) -> Router {
    let admin = Router::new()
        .route(
            "/perks",
            get(handlers::perks::list_admin).post(handlers::perks::create),
        )
        .route(
            "/perks/{id}",
            get(handlers::perks::get_admin)
                .put(handlers::perks::update)
                .delete(handlers::perks::remove),
        )
        .route("/perks/{id}/status", patch(handlers::perks::set_status))
        .route("/perks/{id}/approval", patch(handlers::perks::set_approval))
        .route("/perks/{id}/seo", patch(handlers::perks::set_seo))
        .route("/leads", get(handlers::leads::list))
        .route(
            "/leads/{id}",
            get(handlers::leads::get).delete(handlers::leads::remove),
        )
        .route("/leads/{id}/status", patch(handlers::leads::set_status))
        .route("/leads/{id}/assign", patch(handlers::leads::assign))
        .route("/leads/{id}/notes", post(handlers::leads::add_note))
        .route(
            "/leads/{id}/follow-up",
            patch(handlers::leads::schedule_follow_up),
        )
        .route(
            "/leads/{id}/contact-attempt",
            post(handlers::leads::record_contact_attempt),
        )
        .route("/leads/{id}/convert", post(handlers::leads::convert))
        .route(
            "/categories",
            get(handlers::categories::list_admin).post(handlers::categories::create),
        )
        .route(
            "/categories/{id}",
            put(handlers::categories::update).delete(handlers::categories::remove),
        )
        .route("/categories/recount", post(handlers::categories::recount))
        .route(
            "/blog/posts",
            get(handlers::blog::list_admin).post(handlers::blog::create_post),
        )
        .route(
            "/blog/posts/{id}",
            get(handlers::blog::get_admin)
                .put(handlers::blog::update_post)
                .delete(handlers::blog::remove_post),
        )
        .route(
            "/blog/posts/{id}/status",
            patch(handlers::blog::set_status),
        )
        .route(
            "/blog/categories",
            get(handlers::blog::list_categories).post(handlers::blog::create_category),
        )
        .route(
            "/blog/categories/{id}",
            put(handlers::blog::update_category).delete(handlers::blog::remove_category),
        )
        .route(
            "/blog/categories/recount",
            post(handlers::blog::recount_categories),
        )
        .route("/dashboard/overview", get(handlers::dashboard::overview))
        .route("/dashboard/perks", get(handlers::dashboard::perks))
        .route("/dashboard/categories", get(handlers::dashboard::categories))
        .route("/dashboard/leads", get(handlers::dashboard::leads))
        .route("/dashboard/traffic", get(handlers::dashboard::traffic))
        .route(
            "/settings",
            get(handlers::settings::get_settings).put(handlers::settings::update_settings),
        )
        .route(
            "/seo",
            get(handlers::seo::get_settings).put(handlers::seo::update_settings),
        )
        .route("/seo/regenerate", post(handlers::seo::regenerate))
        .route("/seo/audit/{kind}/{id}", get(handlers::seo::audit_entity))
        // Multipart perk bodies carry the JSON payload plus several images
        .layer(DefaultBodyLimit::max(
            (state.config.media.max_upload_bytes as usize).saturating_mul(8),
        ))
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state.config),
            auth_middleware,
        ));

    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(handlers::root))
        .route("/healthz", get(handlers::healthz))
        .route("/api/perks", get(handlers::perks::list_public))
        .route("/api/perks/{slug}", get(handlers::perks::get_public))
        .route("/api/perks/{id}/click", post(handlers::perks::click))
        .route("/api/leads", post(handlers::leads::submit))
        .route("/api/categories", get(handlers::categories::list_public))
        .route("/api/blog", get(handlers::blog::list_public))
        .route("/api/blog/{slug}", get(handlers::blog::get_public))
        .route("/api/seo/sitemap.xml", get(handlers::seo::sitemap_xml))
        .route("/api/seo/robots.txt", get(handlers::seo::robots_txt))
        .nest("/api/admin", admin)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(telemetry::trace_context_middleware))
        .layer(cors)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/openapi.json", ApiDoc::openapi()))
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    if config.cors_allowed_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Starts the server with the given configuration, spawning the tracking
/// worker and draining it again on shutdown.
pub async fn run_server(
    config: Arc<AppConfig>,
    db: Arc<DatabaseConnection>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (state, tracking_worker) = AppState::build(Arc::clone(&config), db);
    let app = create_app(state);

    // Resolve the configured bind address
    let addr = config
        .bind_addr()
        .map_err(|e| format!("Invalid server address: {}", e))?;

    let shutdown = CancellationToken::new();
    let worker_handle = tokio::spawn(tracking_worker.run(shutdown.clone()));

    let listener = tokio::net::TcpListener::bind(addr).await?;
    println!("Server listening on: {}", addr);
    println!("Running in profile: {}", config.profile);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    // Let the tracking worker flush buffered counters before exiting
    shutdown.cancel();
    let _ = worker_handle.await;

    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = ?err, "Failed to listen for shutdown signal");
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = shutdown.cancelled() => {}
    }
    shutdown.cancel();
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz,
        crate::handlers::perks::list_public,
        crate::handlers::perks::get_public,
        crate::handlers::perks::click,
        crate::handlers::perks::list_admin,
        crate::handlers::perks::create,
        crate::handlers::perks::get_admin,
        crate::handlers::perks::update,
        crate::handlers::perks::remove,
        crate::handlers::perks::set_status,
        crate::handlers::perks::set_approval,
        crate::handlers::perks::set_seo,
        crate::handlers::leads::submit,
        crate::handlers::leads::list,
        crate::handlers::leads::get,
        crate::handlers::leads::remove,
        crate::handlers::leads::set_status,
        crate::handlers::leads::assign,
        crate::handlers::leads::add_note,
        crate::handlers::leads::schedule_follow_up,
        crate::handlers::leads::record_contact_attempt,
        crate::handlers::leads::convert,
        crate::handlers::categories::list_public,
        crate::handlers::categories::list_admin,
        crate::handlers::categories::create,
        crate::handlers::categories::update,
        crate::handlers::categories::remove,
        crate::handlers::categories::recount,
        crate::handlers::blog::list_public,
        crate::handlers::blog::get_public,
        crate::handlers::blog::list_admin,
        crate::handlers::blog::create_post,
        crate::handlers::blog::get_admin,
        crate::handlers::blog::update_post,
        crate::handlers::blog::set_status,
        crate::handlers::blog::remove_post,
        crate::handlers::blog::list_categories,
        crate::handlers::blog::create_category,
        crate::handlers::blog::update_category,
        crate::handlers::blog::remove_category,
        crate::handlers::blog::recount_categories,
        crate::handlers::dashboard::overview,
        crate::handlers::dashboard::perks,
        crate::handlers::dashboard::categories,
        crate::handlers::dashboard::leads,
        crate::handlers::dashboard::traffic,
        crate::handlers::seo::sitemap_xml,
        crate::handlers::seo::robots_txt,
        crate::handlers::seo::get_settings,
        crate::handlers::seo::update_settings,
        crate::handlers::seo::regenerate,
        crate::handlers::seo::audit_entity,
        crate::handlers::settings::get_settings,
        crate::handlers::settings::update_settings,
    ),
    components(
        schemas(
            crate::models::ServiceInfo,
            crate::error::ApiError,
            crate::pagination::Pagination,
            crate::dashboard::DashboardOverview,
            crate::dashboard::DashboardSummary,
            crate::dashboard::PerkStats,
            crate::dashboard::CategoryStats,
            crate::dashboard::LeadStats,
            crate::dashboard::ActivityEntry,
            crate::dashboard::DateRange,
            crate::analytics::TrafficMetrics,
            crate::seo::SeoAudit,
            crate::seo::KeywordDensity,
        )
    ),
    info(
        title = "Perks API",
        description = "Content and lead management API for the perks marketplace",
        version = env!("CARGO_PKG_VERSION"),
    )
)]
pub struct ApiDoc;
