//! # Category Handlers
//!
//! Category tree CRUD plus the batch perk-counter recount. Categories nest
//! at most four levels deep (levels 0 through 3); reparenting walks the
//! full ancestor chain to reject cycles and re-levels the moved subtree.

use std::collections::HashMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{
    ApiError, FieldError, conflict, not_found, validation_error, validation_error_with_code,
};
use crate::handlers::{ApiResponse, RecountResult};
use crate::models::category::{self, MAX_DEPTH};
use crate::repositories::CategoryRepository;
use crate::server::AppState;
use crate::slug;

/// Category node returned by the tree endpoints
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CategoryInfo {
    /// Unique category identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// URL-safe unique slug
    pub slug: String,
    /// Description shown on category pages
    pub description: Option<String>,
    /// Parent category, absent for roots
    pub parent_id: Option<Uuid>,
    /// Depth in the tree, 0 for roots
    pub level: i32,
    /// Manual ordering among siblings
    pub display_order: i32,
    /// Whether the category shows up in public listings
    pub is_active: bool,
    /// Perks filed under this category
    pub perk_count: i32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
    /// Child categories in display order
    #[schema(no_recursion)]
    pub children: Vec<CategoryInfo>,
}

impl From<category::Model> for CategoryInfo {
    fn from(model: category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            parent_id: model.parent_id,
            level: model.level,
            display_order: model.display_order,
            is_active: model.is_active,
            perk_count: model.perk_count,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
            children: Vec::new(),
        }
    }
}

/// Create and update payload for categories
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CategoryPayload {
    /// Display name, required on create
    pub name: Option<String>,
    /// Explicit slug; omitted means derived from the name
    pub slug: Option<String>,
    /// Description shown on category pages
    pub description: Option<String>,
    /// Parent category. On update an absent field keeps the current parent
    /// while an explicit `null` moves the category to the root.
    #[serde(default, deserialize_with = "crate::handlers::double_option")]
    pub parent_id: Option<Option<Uuid>>,
    /// Manual ordering among siblings
    pub display_order: Option<i32>,
    /// Whether the category shows up in public listings
    pub is_active: Option<bool>,
}

/// Nest a flat, level-ordered category list into a tree.
///
/// Children inherit the query order, so siblings stay sorted by display
/// order and name. A node whose parent is missing from `nodes` (an active
/// child under an inactive parent) is dropped along with its subtree.
fn build_tree(nodes: Vec<category::Model>) -> Vec<CategoryInfo> {
    let mut by_parent: HashMap<Option<Uuid>, Vec<category::Model>> = HashMap::new();
    for node in nodes {
        by_parent.entry(node.parent_id).or_default().push(node);
    }
    attach_children(&mut by_parent, None)
}

fn attach_children(
    by_parent: &mut HashMap<Option<Uuid>, Vec<category::Model>>,
    parent: Option<Uuid>,
) -> Vec<CategoryInfo> {
    let Some(models) = by_parent.remove(&parent) else {
        return Vec::new();
    };
    models
        .into_iter()
        .map(|model| {
            let id = model.id;
            let mut info = CategoryInfo::from(model);
            info.children = attach_children(by_parent, Some(id));
            info
        })
        .collect()
}

fn require_name(name: Option<&str>) -> Result<String, ApiError> {
    let name = name.map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(validation_error(
            "Name is required",
            vec![FieldError::new("name", "Must not be empty")],
        ));
    }
    Ok(name.to_string())
}

async fn resolve_parent(
    repo: &CategoryRepository,
    parent_id: Option<Uuid>,
) -> Result<Option<category::Model>, ApiError> {
    let Some(id) = parent_id else {
        return Ok(None);
    };
    let parent = repo
        .find_by_id(&id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| {
            validation_error(
                "Unknown parent category",
                vec![FieldError::new("parent_id", "No category with this ID")],
            )
        })?;
    Ok(Some(parent))
}

/// List active categories as a tree
#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "Active category tree", body = ApiResponse<Vec<CategoryInfo>>)
    ),
    tag = "categories"
)]
pub async fn list_public(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CategoryInfo>>>, ApiError> {
    let categories = CategoryRepository::new(state.db.clone())
        .find_all(false)
        .await
        .map_err(ApiError::from_repo)?;

    Ok(Json(ApiResponse::data(build_tree(categories))))
}

/// List all categories as a tree (admin)
///
/// Includes inactive nodes, so the tree here always shows every branch.
#[utoipa::path(
    get,
    path = "/api/admin/categories",
    responses(
        (status = 200, description = "Full category tree", body = ApiResponse<Vec<CategoryInfo>>),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn list_admin(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<CategoryInfo>>>, ApiError> {
    let categories = CategoryRepository::new(state.db.clone())
        .find_all(true)
        .await
        .map_err(ApiError::from_repo)?;

    Ok(Json(ApiResponse::data(build_tree(categories))))
}

/// Create a category
///
/// The level is the parent's level plus one, capped at four levels total.
/// Slugs derived from the name are suffixed until unique; an explicit
/// `slug` that is already taken is a 409.
#[utoipa::path(
    post,
    path = "/api/admin/categories",
    request_body = CategoryPayload,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<CategoryInfo>),
        (status = 400, description = "Invalid payload or nesting too deep", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 409, description = "Requested slug already in use", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn create(
    State(state): State<AppState>,
    Json(payload): Json<CategoryPayload>,
) -> Result<(StatusCode, Json<ApiResponse<CategoryInfo>>), ApiError> {
    let name = require_name(payload.name.as_deref())?;

    let repo = CategoryRepository::new(state.db.clone());
    let parent = resolve_parent(&repo, payload.parent_id.flatten()).await?;
    let level = parent.as_ref().map(|parent| parent.level + 1).unwrap_or(0);
    if level > MAX_DEPTH {
        return Err(validation_error_with_code(
            "MAX_DEPTH_EXCEEDED",
            "Parent is already at the maximum nesting depth",
        ));
    }

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
            let base = slug::slugify_default(&name);
            slug::ensure_unique(&base, |candidate| {
                let repo = repo.clone();
                async move { repo.slug_taken(&candidate, None).await }
            })
            .await
            .map_err(ApiError::from_repo)?
        }
    };

    let now = Utc::now();
    let model = category::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        slug: Set(unique_slug),
        description: Set(payload.description),
        parent_id: Set(parent.as_ref().map(|parent| parent.id)),
        level: Set(level),
        display_order: Set(payload.display_order.unwrap_or(0)),
        is_active: Set(payload.is_active.unwrap_or(true)),
        perk_count: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let created = repo.create(model).await.map_err(ApiError::from_repo)?;
    tracing::info!(
        category_id = %created.id,
        slug = %created.slug,
        level = created.level,
        "Created category"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(CategoryInfo::from(created))),
    ))
}

/// Update a category
///
/// Merges the provided fields. A `parent_id` change reparents the node:
/// the new parent's ancestor chain must not contain the node itself, and
/// the node's subtree must still fit within the depth cap after the move.
#[utoipa::path(
    put,
    path = "/api/admin/categories/{id}",
    params(
        ("id" = String, Path, description = "Category ID")
    ),
    request_body = CategoryPayload,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<CategoryInfo>),
        (status = 400, description = "Invalid payload, cycle or nesting too deep", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Category not found", body = ApiError),
        (status = 409, description = "Requested slug already in use", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CategoryPayload>,
) -> Result<Json<ApiResponse<CategoryInfo>>, ApiError> {
    let repo = CategoryRepository::new(state.db.clone());
    let existing = repo
        .find_by_id(&id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| not_found("CATEGORY_NOT_FOUND", "Category not found"))?;

    let name = match payload.name.as_deref() {
        Some(name) => Some(require_name(Some(name))?),
        None => None,
    };

    let requested_slug = match &payload.slug {
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
            Some(requested)
        }
        None => None,
    };

    if let Some(new_parent_id) = payload.parent_id
        && new_parent_id != existing.parent_id
    {
        let parent = resolve_parent(&repo, new_parent_id).await?;
        if let Some(parent) = &parent {
            // Walking the whole chain catches multi-hop cycles, not just a
            // direct self-parent
            let ancestors = repo
                .ancestor_chain(Some(parent.id))
                .await
                .map_err(ApiError::from_repo)?;
            if ancestors.contains(&id) {
                return Err(validation_error(
                    "Reparenting would create a cycle",
                    vec![FieldError::new(
                        "parent_id",
                        "New parent sits inside this category's subtree",
                    )],
                ));
            }
        }

        let new_level = parent.as_ref().map(|parent| parent.level + 1).unwrap_or(0);
        let height = repo
            .subtree_height(&existing)
            .await
            .map_err(ApiError::from_repo)?;
        if new_level + height > MAX_DEPTH {
            return Err(validation_error_with_code(
                "MAX_DEPTH_EXCEEDED",
                "Moving this category would push its subtree past the maximum nesting depth",
            ));
        }

        repo.move_to(&id, new_parent_id, new_level)
            .await
            .map_err(ApiError::from_repo)?;
    }

    let mut model = category::ActiveModel::default();
    if let Some(name) = name {
        model.name = Set(name);
    }
    if let Some(slug_value) = requested_slug {
        model.slug = Set(slug_value);
    }
    if payload.description.is_some() {
        model.description = Set(payload.description);
    }
    if let Some(display_order) = payload.display_order {
        model.display_order = Set(display_order);
    }
    if let Some(is_active) = payload.is_active {
        model.is_active = Set(is_active);
    }

    let updated = repo.update(&id, model).await.map_err(ApiError::from_repo)?;
    tracing::info!(category_id = %updated.id, "Updated category");

    Ok(Json(ApiResponse::data(CategoryInfo::from(updated))))
}

/// Delete a category
///
/// Direct children become new roots and their subtrees are re-leveled;
/// perks filed under the category are detached, not deleted.
#[utoipa::path(
    delete,
    path = "/api/admin/categories/{id}",
    params(
        ("id" = String, Path, description = "Category ID")
    ),
    responses(
        (status = 200, description = "Category deleted"),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Category not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let repo = CategoryRepository::new(state.db.clone());
    repo.find_by_id(&id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| not_found("CATEGORY_NOT_FOUND", "Category not found"))?;

    repo.delete(&id).await.map_err(ApiError::from_repo)?;
    tracing::info!(category_id = %id, "Deleted category");

    Ok(Json(ApiResponse::ack("Category deleted")))
}

/// Recompute the per-category perk counters
///
/// Counter bumps elsewhere are best-effort, so this is the repair path for
/// any drift. Returns how many rows actually changed.
#[utoipa::path(
    post,
    path = "/api/admin/categories/recount",
    responses(
        (status = 200, description = "Counters recomputed", body = ApiResponse<RecountResult>),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "categories"
)]
pub async fn recount(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RecountResult>>, ApiError> {
    let corrected = CategoryRepository::new(state.db.clone())
        .recount_perks()
        .await
        .map_err(ApiError::from_repo)?;
    tracing::info!(corrected, "Recounted category perk counters");

    Ok(Json(ApiResponse::with_message(
        RecountResult { corrected },
        "Perk counters recomputed",
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::auth_middleware;
    use crate::config::AppConfig;
    use crate::server::AppState;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Method, Request, Response, header};
    use axum::middleware::from_fn_with_state;
    use axum::routing::{get, post, put};
    use migration::{Migrator, MigratorTrait};
    use sea_orm::{Database, DatabaseConnection};
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

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
            .route("/api/admin/categories", get(list_admin).post(create))
            .route("/api/admin/categories/{id}", put(update).delete(remove))
            .route("/api/admin/categories/recount", post(recount))
            .layer(from_fn_with_state(config.clone(), auth_middleware));
        let app = Router::new()
            .route("/api/categories", get(list_public))
            .merge(admin)
            .with_state(state);

        (app, db, uploads)
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

    async fn create_category(app: &Router, payload: serde_json::Value) -> serde_json::Value {
        let response = app
            .clone()
            .oneshot(json_request(Method::POST, "/api/admin/categories", &payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        read_json(response).await
    }

    fn id_of(body: &serde_json::Value) -> Uuid {
        body["data"]["id"].as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn test_tree_nests_children_in_display_order() {
        let (app, _db, _uploads) = setup().await;

        let later = create_category(
            &app,
            serde_json::json!({"name": "Hosting", "display_order": 2}),
        )
        .await;
        create_category(
            &app,
            serde_json::json!({"name": "Analytics", "display_order": 1}),
        )
        .await;
        create_category(
            &app,
            serde_json::json!({"name": "Managed Hosting", "parent_id": id_of(&later)}),
        )
        .await;

        let response = app.oneshot(admin_get("/api/admin/categories")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;

        let roots = body["data"].as_array().unwrap();
        assert_eq!(roots.len(), 2);
        assert_eq!(roots[0]["name"], "Analytics");
        assert_eq!(roots[1]["name"], "Hosting");
        assert_eq!(roots[1]["children"][0]["name"], "Managed Hosting");
        assert_eq!(roots[1]["children"][0]["level"], 1);
    }

    #[tokio::test]
    async fn test_create_rejects_fifth_nesting_level() {
        let (app, _db, _uploads) = setup().await;

        let mut parent: Option<Uuid> = None;
        for name in ["Alpha", "Beta", "Gamma", "Delta"] {
            let mut payload = serde_json::json!({"name": name});
            if let Some(pid) = parent {
                payload["parent_id"] = serde_json::json!(pid);
            }
            let body = create_category(&app, payload).await;
            parent = Some(id_of(&body));
        }

        // Delta sits at level 3, the deepest allowed
        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/admin/categories",
                &serde_json::json!({"name": "Epsilon", "parent_id": parent}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "MAX_DEPTH_EXCEEDED");
    }

    #[tokio::test]
    async fn test_create_rejects_unknown_parent() {
        let (app, _db, _uploads) = setup().await;

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/admin/categories",
                &serde_json::json!({"name": "Orphan", "parent_id": Uuid::new_v4()}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_reparent_rejects_multi_hop_cycle() {
        let (app, _db, _uploads) = setup().await;

        let a = create_category(&app, serde_json::json!({"name": "A"})).await;
        let b = create_category(&app, serde_json::json!({"name": "B", "parent_id": id_of(&a)}))
            .await;
        let c = create_category(&app, serde_json::json!({"name": "C", "parent_id": id_of(&b)}))
            .await;

        let response = app
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/admin/categories/{}", id_of(&a)),
                &serde_json::json!({"parent_id": id_of(&c)}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["message"], "Reparenting would create a cycle");
    }

    #[tokio::test]
    async fn test_reparent_to_root_relevels_subtree() {
        let (app, db, _uploads) = setup().await;

        let a = create_category(&app, serde_json::json!({"name": "A"})).await;
        let b = create_category(&app, serde_json::json!({"name": "B", "parent_id": id_of(&a)}))
            .await;
        let c = create_category(&app, serde_json::json!({"name": "C", "parent_id": id_of(&b)}))
            .await;

        let response = app
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/admin/categories/{}", id_of(&b)),
                &serde_json::json!({"parent_id": null}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["level"], 0);
        assert!(body["data"]["parent_id"].is_null());

        let repo = CategoryRepository::new(db);
        let moved_child = repo.find_by_id(&id_of(&c)).await.unwrap().unwrap();
        assert_eq!(moved_child.level, 1);
        assert_eq!(moved_child.parent_id, Some(id_of(&b)));
    }

    #[tokio::test]
    async fn test_reparent_depth_check_counts_subtree() {
        let (app, _db, _uploads) = setup().await;

        let a = create_category(&app, serde_json::json!({"name": "A"})).await;
        create_category(&app, serde_json::json!({"name": "B", "parent_id": id_of(&a)})).await;

        let mut deep: Option<Uuid> = None;
        for name in ["D0", "D1", "D2"] {
            let mut payload = serde_json::json!({"name": name});
            if let Some(pid) = deep {
                payload["parent_id"] = serde_json::json!(pid);
            }
            let body = create_category(&app, payload).await;
            deep = Some(id_of(&body));
        }

        // A would land at level 3 and drag B to level 4
        let response = app
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/admin/categories/{}", id_of(&a)),
                &serde_json::json!({"parent_id": deep}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "MAX_DEPTH_EXCEEDED");
    }

    #[tokio::test]
    async fn test_public_list_hides_inactive_branches() {
        let (app, _db, _uploads) = setup().await;

        let visible = create_category(&app, serde_json::json!({"name": "Visible"})).await;
        create_category(
            &app,
            serde_json::json!({"name": "Visible Child", "parent_id": id_of(&visible)}),
        )
        .await;
        let hidden =
            create_category(&app, serde_json::json!({"name": "Hidden", "is_active": false}))
                .await;
        create_category(
            &app,
            serde_json::json!({"name": "Hidden Child", "parent_id": id_of(&hidden)}),
        )
        .await;

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/categories")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        let roots = body["data"].as_array().unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0]["name"], "Visible");
        assert_eq!(roots[0]["children"].as_array().unwrap().len(), 1);

        let admin = app.oneshot(admin_get("/api/admin/categories")).await.unwrap();
        let body = read_json(admin).await;
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_update_merges_fields_without_touching_slug() {
        let (app, _db, _uploads) = setup().await;
        let created = create_category(&app, serde_json::json!({"name": "Hosting"})).await;

        let response = app
            .oneshot(json_request(
                Method::PUT,
                &format!("/api/admin/categories/{}", id_of(&created)),
                &serde_json::json!({
                    "name": "Cloud Hosting",
                    "description": "Infrastructure perks",
                    "is_active": false
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["name"], "Cloud Hosting");
        assert_eq!(body["data"]["slug"], "hosting");
        assert_eq!(body["data"]["description"], "Infrastructure perks");
        assert_eq!(body["data"]["is_active"], false);
        assert_eq!(body["data"]["level"], 0);
    }

    #[tokio::test]
    async fn test_delete_promotes_children_to_roots() {
        let (app, db, _uploads) = setup().await;

        let a = create_category(&app, serde_json::json!({"name": "A"})).await;
        let b = create_category(&app, serde_json::json!({"name": "B", "parent_id": id_of(&a)}))
            .await;
        let c = create_category(&app, serde_json::json!({"name": "C", "parent_id": id_of(&b)}))
            .await;

        let response = app
            .clone()
            .oneshot(json_request(
                Method::DELETE,
                &format!("/api/admin/categories/{}", id_of(&a)),
                &serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let repo = CategoryRepository::new(db);
        assert!(repo.find_by_id(&id_of(&a)).await.unwrap().is_none());
        let orphan = repo.find_by_id(&id_of(&b)).await.unwrap().unwrap();
        assert_eq!(orphan.parent_id, None);
        assert_eq!(orphan.level, 0);
        let grandchild = repo.find_by_id(&id_of(&c)).await.unwrap().unwrap();
        assert_eq!(grandchild.level, 1);

        let missing = app
            .oneshot(json_request(
                Method::DELETE,
                &format!("/api/admin/categories/{}", Uuid::new_v4()),
                &serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        let body = read_json(missing).await;
        assert_eq!(body["error"]["code"], "CATEGORY_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_recount_corrects_counter_drift() {
        let (app, db, _uploads) = setup().await;
        let created = create_category(&app, serde_json::json!({"name": "Hosting"})).await;

        let repo = CategoryRepository::new(db);
        repo.set_perk_count(&id_of(&created), 5).await.unwrap();

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/admin/categories/recount",
                &serde_json::json!({}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = read_json(response).await;
        assert_eq!(body["data"]["corrected"], 1);

        let fixed = repo.find_by_id(&id_of(&created)).await.unwrap().unwrap();
        assert_eq!(fixed.perk_count, 0);
    }

    #[tokio::test]
    async fn test_slug_dedup_and_explicit_conflict() {
        let (app, _db, _uploads) = setup().await;

        let first = create_category(&app, serde_json::json!({"name": "Hosting"})).await;
        assert_eq!(first["data"]["slug"], "hosting");
        let second = create_category(&app, serde_json::json!({"name": "Hosting"})).await;
        assert_eq!(second["data"]["slug"], "hosting-1");

        let response = app
            .oneshot(json_request(
                Method::POST,
                "/api/admin/categories",
                &serde_json::json!({"name": "Other", "slug": "hosting"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = read_json(response).await;
        assert_eq!(body["error"]["code"], "DUPLICATE_SLUG");
    }

    #[tokio::test]
    async fn test_admin_routes_require_token() {
        let (app, _db, _uploads) = setup().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/admin/categories")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
