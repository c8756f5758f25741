//! Integration tests for the Perks API HTTP surface.
//!
//! Each test boots the full router on a loopback port with an in-memory
//! SQLite database and drives it with a real HTTP client, so middleware,
//! routing and the tracking worker are all exercised.

use std::sync::Arc;
use std::time::{Duration, Instant};

use migration::{Migrator, MigratorTrait};
use perks_api::config::AppConfig;
use perks_api::server::{AppState, create_app};
use reqwest::Client;
use sea_orm::{Database, DatabaseConnection};
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

const TOKEN: &str = "test-admin-token";

struct TestServer {
    base_url: String,
    /// Keeps the upload and sitemap directories alive for the test duration
    _dirs: TempDir,
}

async fn start_test_server() -> TestServer {
    start_test_server_with(|_| {}).await
}

/// Boots the application on a random loopback port, with the tracking
/// worker running so counter flushes behave as in production.
async fn start_test_server_with(mutate: impl FnOnce(&mut AppConfig)) -> TestServer {
    let db = Arc::new(
        Database::connect("sqlite::memory:")
            .await
            .expect("Failed to open in-memory database"),
    );
    Migrator::up(db.as_ref(), None)
        .await
        .expect("Failed to apply migrations");

    let dirs = TempDir::new().expect("Failed to create temp directories");
    let mut config = AppConfig::default();
    config.admin_tokens = vec![TOKEN.to_string()];
    config.media.upload_dir = dirs.path().join("uploads").to_string_lossy().into_owned();
    config.seo_output_dir = dirs.path().join("public").to_string_lossy().into_owned();
    config.tracking.flush_interval_ms = 50;
    mutate(&mut config);

    let (state, worker) = AppState::build(Arc::new(config), db);
    let app = create_app(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(worker.run(CancellationToken::new()));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestServer {
        base_url: format!("http://{}", addr),
        _dirs: dirs,
    }
}

/// Creates a category and an active, approved perk through the admin API
/// and returns the perk's `(id, slug)`.
async fn create_live_perk(client: &Client, base_url: &str) -> (String, String) {
    let category = client
        .post(format!("{}/api/admin/categories", base_url))
        .bearer_auth(TOKEN)
        .json(&json!({"name": "Developer Tools"}))
        .send()
        .await
        .expect("Failed to create category");
    assert_eq!(category.status(), 201);
    let category: Value = category.json().await.unwrap();
    let category_id = category["data"]["id"].as_str().unwrap().to_string();

    let perk = client
        .post(format!("{}/api/admin/perks", base_url))
        .bearer_auth(TOKEN)
        .json(&json!({
            "title": "Cloud Credits",
            "description": "Monthly credits for new workspaces",
            "category_id": category_id,
            "status": "active"
        }))
        .send()
        .await
        .expect("Failed to create perk");
    assert_eq!(perk.status(), 201);
    let perk: Value = perk.json().await.unwrap();
    let id = perk["data"]["id"].as_str().unwrap().to_string();
    let slug = perk["data"]["slug"].as_str().unwrap().to_string();

    let approved = client
        .patch(format!("{}/api/admin/perks/{}/approval", base_url, id))
        .bearer_auth(TOKEN)
        .json(&json!({"approval_status": "approved"}))
        .send()
        .await
        .expect("Failed to approve perk");
    assert_eq!(approved.status(), 200);

    (id, slug)
}

#[tokio::test]
async fn test_root_endpoint() {
    let server = start_test_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/", server.base_url))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );

    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["service"], "perks-api");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_healthz_reports_ok() {
    let server = start_test_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/healthz", server.base_url))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_openapi_document_lists_routes() {
    let server = start_test_server().await;
    let client = Client::new();

    let response = client
        .get(format!("{}/openapi.json", server.base_url))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.expect("Failed to parse JSON");
    assert_eq!(body["info"]["title"], "Perks API");

    let paths = body["paths"].as_object().unwrap();
    assert!(paths.contains_key("/api/perks"));
    assert!(paths.contains_key("/api/leads"));
    assert!(paths.contains_key("/api/admin/dashboard/overview"));
    assert!(paths.contains_key("/api/admin/blog/posts/{id}/status"));
}

#[tokio::test]
async fn test_admin_surface_requires_bearer_token() {
    let server = start_test_server().await;
    let client = Client::new();

    let missing = client
        .get(format!("{}/api/admin/perks", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), 401);
    let body: Value = missing.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let wrong = client
        .get(format!("{}/api/admin/perks", server.base_url))
        .bearer_auth("not-the-token")
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), 401);

    let authed = client
        .get(format!("{}/api/admin/perks", server.base_url))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(authed.status(), 200);
    let body: Value = authed.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    assert_eq!(body["pagination"]["total"], 0);
}

#[tokio::test]
async fn test_perk_publish_lifecycle() {
    let server = start_test_server().await;
    let client = Client::new();

    // Freshly created perks await approval and stay out of the public
    // catalog even when their status is already active
    let category = client
        .post(format!("{}/api/admin/categories", server.base_url))
        .bearer_auth(TOKEN)
        .json(&json!({"name": "Hosting"}))
        .send()
        .await
        .unwrap();
    assert_eq!(category.status(), 201);
    let category: Value = category.json().await.unwrap();
    let category_id = category["data"]["id"].as_str().unwrap();

    let created = client
        .post(format!("{}/api/admin/perks", server.base_url))
        .bearer_auth(TOKEN)
        .json(&json!({
            "title": "Free Tier Boost",
            "category_id": category_id,
            "status": "active"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let created: Value = created.json().await.unwrap();
    let perk_id = created["data"]["id"].as_str().unwrap().to_string();
    let slug = created["data"]["slug"].as_str().unwrap().to_string();
    assert_eq!(slug, "free-tier-boost");
    assert_eq!(created["data"]["approval_status"], "pending");

    let public = client
        .get(format!("{}/api/perks", server.base_url))
        .send()
        .await
        .unwrap();
    let body: Value = public.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let approved = client
        .patch(format!("{}/api/admin/perks/{}/approval", server.base_url, perk_id))
        .bearer_auth(TOKEN)
        .json(&json!({"approval_status": "approved"}))
        .send()
        .await
        .unwrap();
    assert_eq!(approved.status(), 200);

    let public = client
        .get(format!("{}/api/perks", server.base_url))
        .send()
        .await
        .unwrap();
    let body: Value = public.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["slug"], "free-tier-boost");

    let detail = client
        .get(format!("{}/api/perks/{}", server.base_url, slug))
        .send()
        .await
        .unwrap();
    assert_eq!(detail.status(), 200);

    // Deactivating pulls the perk from the public surface again
    let deactivated = client
        .patch(format!("{}/api/admin/perks/{}/status", server.base_url, perk_id))
        .bearer_auth(TOKEN)
        .json(&json!({"status": "inactive"}))
        .send()
        .await
        .unwrap();
    assert_eq!(deactivated.status(), 200);

    let hidden = client
        .get(format!("{}/api/perks/{}", server.base_url, slug))
        .send()
        .await
        .unwrap();
    assert_eq!(hidden.status(), 404);
    let body: Value = hidden.json().await.unwrap();
    assert_eq!(body["error"]["code"], "PERK_NOT_FOUND");
}

#[tokio::test]
async fn test_view_and_click_counters_flush_to_the_database() {
    let server = start_test_server().await;
    let client = Client::new();
    let (perk_id, slug) = create_live_perk(&client, &server.base_url).await;

    for _ in 0..2 {
        let view = client
            .get(format!("{}/api/perks/{}", server.base_url, slug))
            .send()
            .await
            .unwrap();
        assert_eq!(view.status(), 200);
    }

    let click = client
        .post(format!("{}/api/perks/{}/click", server.base_url, perk_id))
        .send()
        .await
        .unwrap();
    assert_eq!(click.status(), 202);

    // The worker flushes every 50ms in this configuration; poll the admin
    // view until the counters land
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        let stored = client
            .get(format!("{}/api/admin/perks/{}", server.base_url, perk_id))
            .bearer_auth(TOKEN)
            .send()
            .await
            .unwrap();
        let body: Value = stored.json().await.unwrap();
        if body["data"]["view_count"] == 2 && body["data"]["click_count"] == 1 {
            break;
        }
        if Instant::now() > deadline {
            panic!("counters never flushed, last response: {}", body);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

#[tokio::test]
async fn test_lead_intake_duplicate_and_maintenance_gate() {
    let server = start_test_server().await;
    let client = Client::new();
    let (perk_id, _slug) = create_live_perk(&client, &server.base_url).await;

    let submission = json!({
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "perk_id": perk_id
    });
    let first = client
        .post(format!("{}/api/leads", server.base_url))
        .json(&submission)
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 201);
    let body: Value = first.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Thank you for your interest");
    assert_eq!(body["data"]["status"], "new");

    let duplicate = client
        .post(format!("{}/api/leads", server.base_url))
        .json(&submission)
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), 409);
    let body: Value = duplicate.json().await.unwrap();
    assert_eq!(body["error"]["code"], "DUPLICATE_SUBMISSION");

    let locked = client
        .put(format!("{}/api/admin/settings", server.base_url))
        .bearer_auth(TOKEN)
        .json(&json!({"maintenance_mode": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(locked.status(), 200);

    let rejected = client
        .post(format!("{}/api/leads", server.base_url))
        .json(&json!({"name": "Grace", "email": "grace@example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(rejected.status(), 423);
    let body: Value = rejected.json().await.unwrap();
    assert_eq!(body["error"]["code"], "LOCKED");
}

#[tokio::test]
async fn test_lead_rate_limit_answers_with_retry_after() {
    let server = start_test_server_with(|config| {
        config.lead_rate_limit_per_minute = 1;
        config.lead_rate_limit_burst_size = 0;
    })
    .await;
    let client = Client::new();

    // The limiter is keyed by forwarded address; use one no other test
    // shares since the window map is process wide
    let mut limited = None;
    for attempt in 0..4 {
        let response = client
            .post(format!("{}/api/leads", server.base_url))
            .header("x-forwarded-for", "198.51.100.99")
            .json(&json!({
                "name": "Ada",
                "email": format!("ada{}@example.com", attempt)
            }))
            .send()
            .await
            .unwrap();
        if response.status() == 429 {
            limited = Some(response);
            break;
        }
        assert_eq!(response.status(), 201);
    }

    let limited = limited.expect("rate limit never tripped");
    assert!(limited.headers().contains_key("retry-after"));
    let body: Value = limited.json().await.unwrap();
    assert_eq!(body["error"]["code"], "RATE_LIMITED");
}

#[tokio::test]
async fn test_category_tree_drops_inactive_branches() {
    let server = start_test_server().await;
    let client = Client::new();

    let parent = client
        .post(format!("{}/api/admin/categories", server.base_url))
        .bearer_auth(TOKEN)
        .json(&json!({"name": "Infrastructure"}))
        .send()
        .await
        .unwrap();
    let parent: Value = parent.json().await.unwrap();
    let parent_id = parent["data"]["id"].as_str().unwrap();

    let child = client
        .post(format!("{}/api/admin/categories", server.base_url))
        .bearer_auth(TOKEN)
        .json(&json!({"name": "Databases", "parent_id": parent_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(child.status(), 201);

    let hidden = client
        .post(format!("{}/api/admin/categories", server.base_url))
        .bearer_auth(TOKEN)
        .json(&json!({"name": "Retired", "is_active": false}))
        .send()
        .await
        .unwrap();
    assert_eq!(hidden.status(), 201);

    let public = client
        .get(format!("{}/api/categories", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(public.status(), 200);
    let body: Value = public.json().await.unwrap();
    let roots = body["data"].as_array().unwrap();
    assert_eq!(roots.len(), 1);
    assert_eq!(roots[0]["name"], "Infrastructure");
    assert_eq!(roots[0]["children"][0]["name"], "Databases");
}

#[tokio::test]
async fn test_blog_publish_flow() {
    let server = start_test_server().await;
    let client = Client::new();

    let created = client
        .post(format!("{}/api/admin/blog/posts", server.base_url))
        .bearer_auth(TOKEN)
        .json(&json!({
            "title": "Launch Notes",
            "content": "We shipped the perks catalog this week."
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), 201);
    let created: Value = created.json().await.unwrap();
    let post_id = created["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(created["data"]["status"], "draft");
    assert_eq!(created["data"]["slug"], "launch-notes");

    let public = client
        .get(format!("{}/api/blog", server.base_url))
        .send()
        .await
        .unwrap();
    let body: Value = public.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 0);

    let published = client
        .patch(format!("{}/api/admin/blog/posts/{}/status", server.base_url, post_id))
        .bearer_auth(TOKEN)
        .json(&json!({"status": "published"}))
        .send()
        .await
        .unwrap();
    assert_eq!(published.status(), 200);
    let published: Value = published.json().await.unwrap();
    assert!(published["data"]["published_at"].is_string());

    let public = client
        .get(format!("{}/api/blog/launch-notes", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(public.status(), 200);
    let body: Value = public.json().await.unwrap();
    assert_eq!(body["data"]["title"], "Launch Notes");
}

#[tokio::test]
async fn test_sitemap_and_robots_regenerate_on_demand() {
    let server = start_test_server().await;
    let client = Client::new();
    let (_perk_id, slug) = create_live_perk(&client, &server.base_url).await;

    let sitemap = client
        .get(format!("{}/api/seo/sitemap.xml", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(sitemap.status(), 200);
    let content_type = sitemap
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.starts_with("application/xml"));
    let body = sitemap.text().await.unwrap();
    assert!(body.contains("<urlset"));
    assert!(body.contains(&format!("/perks/{}", slug)));

    let robots = client
        .get(format!("{}/api/seo/robots.txt", server.base_url))
        .send()
        .await
        .unwrap();
    assert_eq!(robots.status(), 200);
    let body = robots.text().await.unwrap();
    assert!(body.starts_with("User-agent: *"));
    assert!(body.contains("Disallow: /api/admin/"));
    assert!(body.contains("Sitemap:"));
}

#[tokio::test]
async fn test_dashboard_overview_reflects_catalog() {
    let server = start_test_server().await;
    let client = Client::new();
    let (_perk_id, _slug) = create_live_perk(&client, &server.base_url).await;

    let submitted = client
        .post(format!("{}/api/leads", server.base_url))
        .json(&json!({"name": "Ada", "email": "ada@dashboards.example.com"}))
        .send()
        .await
        .unwrap();
    assert_eq!(submitted.status(), 201);

    let overview = client
        .get(format!("{}/api/admin/dashboard/overview", server.base_url))
        .bearer_auth(TOKEN)
        .send()
        .await
        .unwrap();
    assert_eq!(overview.status(), 200);
    let body: Value = overview.json().await.unwrap();
    assert_eq!(body["data"]["summary"]["total_perks"], 1);
    assert_eq!(body["data"]["summary"]["total_leads"], 1);
    assert_eq!(body["data"]["date_range"]["period"], "30d");
    assert!(body["data"]["recent_activity"].as_array().is_some());
}
