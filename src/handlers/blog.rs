//! # Blog Handlers
//!
//! Public article endpoints plus the admin CRUD for posts and their flat
//! categories. `published_at` is a latch owned by the repository; handlers
//! only pass a validated status through and never write the timestamp.

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use sea_orm::Set;
use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::error::{ApiError, FieldError, conflict, not_found, validation_error};
use crate::handlers::{ApiResponse, RecountResult};
use crate::models::{blog_category, blog_post};
use crate::pagination::{Pagination, clamp_limit, clamp_page};
use crate::repositories::{
    BlogCategoryRepository, BlogPostFilter, BlogPostRepository, blog_post::BlogSort,
};
use crate::server::AppState;
use crate::slug;
use crate::tracking::TrackEvent;

/// Query parameters for post listings
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct BlogQuery {
    /// Page number (1-based)
    pub page: Option<u64>,
    /// Items per page (max 100)
    pub limit: Option<u64>,
    /// Filter by publication status (admin listing only)
    pub status: Option<String>,
    /// Filter by blog category ID or slug
    pub category: Option<String>,
    /// Case-insensitive search over title and excerpt
    pub search: Option<String>,
    /// Sort order: `newest` or `published`
    pub sort: Option<String>,
}

/// Post details returned by every blog endpoint
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BlogPostInfo {
    /// Unique post identifier
    pub id: Uuid,
    /// Display title
    pub title: String,
    /// URL-safe unique slug
    pub slug: String,
    /// Short teaser shown in listings
    pub excerpt: Option<String>,
    /// Full post body, may contain HTML
    pub content: String,
    /// Author display name
    pub author_name: Option<String>,
    /// Blog category the post is filed under
    pub blog_category_id: Option<Uuid>,
    /// Free-form tags
    pub tags: Vec<String>,
    /// Publication status
    pub status: String,
    /// First publication time, never reset once set
    pub published_at: Option<DateTime<Utc>>,
    /// Featured image path
    pub featured_image: Option<String>,
    /// SEO title override
    pub seo_title: Option<String>,
    /// SEO description override
    pub seo_description: Option<String>,
    /// Open Graph share image path
    pub og_image: Option<String>,
    /// Page views
    pub view_count: i64,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl From<blog_post::Model> for BlogPostInfo {
    fn from(model: blog_post::Model) -> Self {
        let tags = model.tag_list();
        Self {
            id: model.id,
            title: model.title,
            slug: model.slug,
            excerpt: model.excerpt,
            content: model.content,
            author_name: model.author_name,
            blog_category_id: model.blog_category_id,
            tags,
            status: model.status,
            published_at: model.published_at.map(|at| at.with_timezone(&Utc)),
            featured_image: model.featured_image,
            seo_title: model.seo_title,
            seo_description: model.seo_description,
            og_image: model.og_image,
            view_count: model.view_count,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// Request body for post create and update
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BlogPostPayload {
    /// Display title (required, non-empty)
    pub title: String,
    /// Explicit slug; omitted means derived from the title
    pub slug: Option<String>,
    /// Short teaser shown in listings
    pub excerpt: Option<String>,
    /// Full post body (required, non-empty)
    pub content: String,
    /// Author display name
    pub author_name: Option<String>,
    /// Blog category to file the post under
    pub blog_category_id: Option<Uuid>,
    /// Free-form tags
    pub tags: Option<Vec<String>>,
    /// Publication status, defaults to `draft` on create
    pub status: Option<String>,
    /// Featured image path under the media store
    pub featured_image: Option<String>,
    /// SEO title override
    pub seo_title: Option<String>,
    /// SEO description override
    pub seo_description: Option<String>,
    /// Open Graph share image path
    pub og_image: Option<String>,
}

/// Request body for a publication status change
#[derive(Debug, Deserialize, ToSchema)]
pub struct BlogStatusPayload {
    /// One of `draft`, `published`, `archived`
    pub status: String,
}

/// Blog category details
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BlogCategoryInfo {
    /// Unique blog category identifier
    pub id: Uuid,
    /// Display name
    pub name: String,
    /// URL-safe unique slug
    pub slug: String,
    /// Description
    pub description: Option<String>,
    /// Whether the category shows up in public listings
    pub is_active: bool,
    /// Posts filed under this category
    pub post_count: i32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last update timestamp
    pub updated_at: DateTime<Utc>,
}

impl From<blog_category::Model> for BlogCategoryInfo {
    fn from(model: blog_category::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            slug: model.slug,
            description: model.description,
            is_active: model.is_active,
            post_count: model.post_count,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// Request body for blog category create and update
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct BlogCategoryPayload {
    /// Display name, required on create
    pub name: Option<String>,
    /// Explicit slug; omitted means derived from the name
    pub slug: Option<String>,
    /// Description
    pub description: Option<String>,
    /// Whether the category shows up in public listings
    pub is_active: Option<bool>,
}

fn validate_post_payload(payload: &BlogPostPayload) -> Result<(), ApiError> {
    let mut field_errors = Vec::new();

    if payload.title.trim().is_empty() {
        field_errors.push(FieldError::new("title", "Title is required"));
    }
    if payload.content.trim().is_empty() {
        field_errors.push(FieldError::new("content", "Content is required"));
    }
    if let Some(status) = &payload.status
        && !blog_post::STATUSES.contains(&status.as_str())
    {
        field_errors.push(FieldError::new(
            "status",
            format!("Status must be one of: {}", blog_post::STATUSES.join(", ")),
        ));
    }

    if field_errors.is_empty() {
        Ok(())
    } else {
        Err(validation_error("Invalid post payload", field_errors))
    }
}

/// Rejects payloads referencing a blog category that does not exist
async fn ensure_blog_category_exists(state: &AppState, id: &Uuid) -> Result<(), ApiError> {
    BlogCategoryRepository::new(state.db.clone())
        .find_by_id(id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| {
            validation_error(
                "Unknown blog category",
                vec![FieldError::new(
                    "blog_category_id",
                    "No blog category with this ID",
                )],
            )
        })?;
    Ok(())
}

/// Resolves a `category` query value that may be a UUID or a slug
async fn resolve_blog_category(
    state: &AppState,
    raw: Option<&str>,
) -> Result<Option<Uuid>, ApiError> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    if let Ok(id) = Uuid::parse_str(raw) {
        return Ok(Some(id));
    }

    let category = BlogCategoryRepository::new(state.db.clone())
        .find_by_slug(raw)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| {
            validation_error(
                "Unknown blog category",
                vec![FieldError::new(
                    "category",
                    "No blog category with this ID or slug",
                )],
            )
        })?;

    Ok(Some(category.id))
}

fn tags_json(tags: Option<Vec<String>>) -> Option<JsonValue> {
    tags.map(|tags| json!(tags))
}

async fn resolve_post_slug(
    repo: &BlogPostRepository,
    payload: &BlogPostPayload,
    existing: Option<&blog_post::Model>,
) -> Result<String, ApiError> {
    match &payload.slug {
        Some(requested) => {
            let requested = slug::slugify_default(requested);
            if existing.map(|post| post.slug.as_str()) != Some(requested.as_str())
                && repo
                    .slug_taken(&requested, existing.map(|post| &post.id))
                    .await
                    .map_err(ApiError::from_repo)?
            {
                return Err(conflict("DUPLICATE_SLUG", "Slug is already in use"));
            }
            Ok(requested)
        }
        None => match existing {
            Some(post) => Ok(post.slug.clone()),
            None => {
                let base = slug::slugify_default(&payload.title);
                slug::ensure_unique(&base, |candidate| {
                    let repo = repo.clone();
                    async move { repo.slug_taken(&candidate, None).await }
                })
                .await
                .map_err(ApiError::from_repo)
            }
        },
    }
}

/// List published posts
///
/// Public article listing, most recently published first unless the caller
/// asks for creation order.
#[utoipa::path(
    get,
    path = "/api/blog",
    params(BlogQuery),
    responses(
        (status = 200, description = "Paginated list of published posts", body = ApiResponse<Vec<BlogPostInfo>>),
        (status = 400, description = "Invalid filter", body = ApiError)
    ),
    tag = "blog"
)]
pub async fn list_public(
    State(state): State<AppState>,
    Query(query): Query<BlogQuery>,
) -> Result<Json<ApiResponse<Vec<BlogPostInfo>>>, ApiError> {
    let filter = BlogPostFilter {
        status: Some("published".to_string()),
        blog_category_id: resolve_blog_category(&state, query.category.as_deref()).await?,
        search: query.search.clone(),
        sort: match query.sort.as_deref() {
            Some("newest") => BlogSort::Newest,
            _ => BlogSort::RecentlyPublished,
        },
    };

    let page = clamp_page(query.page);
    let limit = clamp_limit(query.limit);
    let repo = BlogPostRepository::new(state.db.clone());
    let (posts, total) = repo
        .list(&filter, (page - 1) * limit, limit)
        .await
        .map_err(ApiError::from_repo)?;

    let pagination = Pagination::calculate(Some(page), Some(limit), total);
    let items = posts.into_iter().map(BlogPostInfo::from).collect();
    Ok(Json(ApiResponse::page(items, pagination)))
}

/// Get a published post by slug
///
/// Drafts and archived posts are invisible here. A hit queues a view count
/// for the tracking worker without blocking the response.
#[utoipa::path(
    get,
    path = "/api/blog/{slug}",
    params(
        ("slug" = String, Path, description = "Post slug")
    ),
    responses(
        (status = 200, description = "Post details", body = ApiResponse<BlogPostInfo>),
        (status = 404, description = "No published post under this slug", body = ApiError)
    ),
    tag = "blog"
)]
pub async fn get_public(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<ApiResponse<BlogPostInfo>>, ApiError> {
    let post = BlogPostRepository::new(state.db.clone())
        .find_by_slug(&slug)
        .await
        .map_err(ApiError::from_repo)?
        .filter(|post| post.status == "published")
        .ok_or_else(|| not_found("POST_NOT_FOUND", "Post not found"))?;

    state.tracking.record(TrackEvent::PostView(post.id));

    Ok(Json(ApiResponse::data(BlogPostInfo::from(post))))
}

/// List posts (admin)
#[utoipa::path(
    get,
    path = "/api/admin/blog/posts",
    params(BlogQuery),
    responses(
        (status = 200, description = "Paginated list of posts", body = ApiResponse<Vec<BlogPostInfo>>),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "blog"
)]
pub async fn list_admin(
    State(state): State<AppState>,
    Query(query): Query<BlogQuery>,
) -> Result<Json<ApiResponse<Vec<BlogPostInfo>>>, ApiError> {
    let filter = BlogPostFilter {
        status: query.status.clone(),
        blog_category_id: resolve_blog_category(&state, query.category.as_deref()).await?,
        search: query.search.clone(),
        sort: BlogSort::parse(query.sort.as_deref()),
    };

    let page = clamp_page(query.page);
    let limit = clamp_limit(query.limit);
    let repo = BlogPostRepository::new(state.db.clone());
    let (posts, total) = repo
        .list(&filter, (page - 1) * limit, limit)
        .await
        .map_err(ApiError::from_repo)?;

    let pagination = Pagination::calculate(Some(page), Some(limit), total);
    let items = posts.into_iter().map(BlogPostInfo::from).collect();
    Ok(Json(ApiResponse::page(items, pagination)))
}

/// Create a post
///
/// New posts default to `draft`; creating one directly as `published`
/// stamps `published_at`. Slugs derived from the title are suffixed until
/// unique; an explicit `slug` that is already taken is a 409.
#[utoipa::path(
    post,
    path = "/api/admin/blog/posts",
    request_body = BlogPostPayload,
    responses(
        (status = 201, description = "Post created", body = ApiResponse<BlogPostInfo>),
        (status = 400, description = "Invalid payload", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 409, description = "Requested slug already in use", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "blog"
)]
pub async fn create_post(
    State(state): State<AppState>,
    Json(payload): Json<BlogPostPayload>,
) -> Result<(StatusCode, Json<ApiResponse<BlogPostInfo>>), ApiError> {
    validate_post_payload(&payload)?;
    if let Some(blog_category_id) = payload.blog_category_id {
        ensure_blog_category_exists(&state, &blog_category_id).await?;
    }

    let repo = BlogPostRepository::new(state.db.clone());
    let unique_slug = resolve_post_slug(&repo, &payload, None).await?;

    let now = Utc::now();
    let model = blog_post::ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(payload.title.trim().to_string()),
        slug: Set(unique_slug),
        excerpt: Set(payload.excerpt),
        content: Set(payload.content),
        author_name: Set(payload.author_name),
        blog_category_id: Set(payload.blog_category_id),
        tags: Set(tags_json(payload.tags)),
        status: Set(payload.status.unwrap_or_else(|| "draft".to_string())),
        published_at: Set(None),
        featured_image: Set(payload.featured_image),
        seo_title: Set(payload.seo_title),
        seo_description: Set(payload.seo_description),
        og_image: Set(payload.og_image),
        view_count: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let created = repo.create(model).await.map_err(ApiError::from_repo)?;
    tracing::info!(post_id = %created.id, slug = %created.slug, "Created blog post");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(BlogPostInfo::from(created))),
    ))
}

/// Get a post by ID (admin)
#[utoipa::path(
    get,
    path = "/api/admin/blog/posts/{id}",
    params(
        ("id" = String, Path, description = "Post ID")
    ),
    responses(
        (status = 200, description = "Post details", body = ApiResponse<BlogPostInfo>),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Post not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "blog"
)]
pub async fn get_admin(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<BlogPostInfo>>, ApiError> {
    let post = BlogPostRepository::new(state.db.clone())
        .find_by_id(&id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| not_found("POST_NOT_FOUND", "Post not found"))?;

    Ok(Json(ApiResponse::data(BlogPostInfo::from(post))))
}

/// Update a post
///
/// Full replace of the editable fields. The slug only changes when the
/// payload carries an explicit `slug`, and a slug another post holds is a
/// 409. Replaced image paths are removed from disk after the row is saved.
#[utoipa::path(
    put,
    path = "/api/admin/blog/posts/{id}",
    params(
        ("id" = String, Path, description = "Post ID")
    ),
    request_body = BlogPostPayload,
    responses(
        (status = 200, description = "Post updated", body = ApiResponse<BlogPostInfo>),
        (status = 400, description = "Invalid payload", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Post not found", body = ApiError),
        (status = 409, description = "Requested slug already in use", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "blog"
)]
pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BlogPostPayload>,
) -> Result<Json<ApiResponse<BlogPostInfo>>, ApiError> {
    let repo = BlogPostRepository::new(state.db.clone());
    let existing = repo
        .find_by_id(&id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| not_found("POST_NOT_FOUND", "Post not found"))?;

    validate_post_payload(&payload)?;
    if let Some(blog_category_id) = payload.blog_category_id {
        ensure_blog_category_exists(&state, &blog_category_id).await?;
    }

    let unique_slug = resolve_post_slug(&repo, &payload, Some(&existing)).await?;

    // Replaced files are deleted only after the row is saved
    let mut replaced: Vec<String> = Vec::new();
    if existing.featured_image != payload.featured_image
        && let Some(old) = existing.featured_image.clone()
    {
        replaced.push(old);
    }
    if existing.og_image != payload.og_image
        && let Some(old) = existing.og_image.clone()
    {
        replaced.push(old);
    }

    let model = blog_post::ActiveModel {
        title: Set(payload.title.trim().to_string()),
        slug: Set(unique_slug),
        excerpt: Set(payload.excerpt),
        content: Set(payload.content),
        author_name: Set(payload.author_name),
        blog_category_id: Set(payload.blog_category_id),
        tags: Set(tags_json(payload.tags)),
        status: Set(payload.status.unwrap_or_else(|| existing.status.clone())),
        featured_image: Set(payload.featured_image),
        seo_title: Set(payload.seo_title),
        seo_description: Set(payload.seo_description),
        og_image: Set(payload.og_image),
        ..Default::default()
    };

    let updated = repo.update(&id, model).await.map_err(ApiError::from_repo)?;
    for path in replaced {
        state.media.remove_best_effort(&path);
    }
    tracing::info!(post_id = %updated.id, "Updated blog post");

    Ok(Json(ApiResponse::data(BlogPostInfo::from(updated))))
}

/// Change a post's publication status
///
/// `published_at` is stamped on the first transition to `published` and
/// survives archive and republish cycles.
#[utoipa::path(
    patch,
    path = "/api/admin/blog/posts/{id}/status",
    params(
        ("id" = String, Path, description = "Post ID")
    ),
    request_body = BlogStatusPayload,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<BlogPostInfo>),
        (status = 400, description = "Unknown status", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Post not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "blog"
)]
pub async fn set_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BlogStatusPayload>,
) -> Result<Json<ApiResponse<BlogPostInfo>>, ApiError> {
    if !blog_post::STATUSES.contains(&payload.status.as_str()) {
        return Err(validation_error(
            "Unknown status",
            vec![FieldError::new(
                "status",
                format!("Status must be one of: {}", blog_post::STATUSES.join(", ")),
            )],
        ));
    }

    let repo = BlogPostRepository::new(state.db.clone());
    repo.find_by_id(&id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| not_found("POST_NOT_FOUND", "Post not found"))?;

    let updated = repo
        .set_status(&id, &payload.status)
        .await
        .map_err(ApiError::from_repo)?;
    tracing::info!(post_id = %updated.id, status = %updated.status, "Changed post status");

    Ok(Json(ApiResponse::data(BlogPostInfo::from(updated))))
}

/// Delete a post
///
/// Removes the row and then its stored images, best effort.
#[utoipa::path(
    delete,
    path = "/api/admin/blog/posts/{id}",
    params(
        ("id" = String, Path, description = "Post ID")
    ),
    responses(
        (status = 200, description = "Post deleted"),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Post not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "blog"
)]
pub async fn remove_post(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let removed = BlogPostRepository::new(state.db.clone())
        .delete(&id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| not_found("POST_NOT_FOUND", "Post not found"))?;

    if let Some(path) = &removed.featured_image {
        state.media.remove_best_effort(path);
    }
    if let Some(path) = &removed.og_image {
        state.media.remove_best_effort(path);
    }
    tracing::info!(post_id = %id, "Deleted blog post");

    Ok(Json(ApiResponse::ack("Post deleted")))
}

/// List blog categories (admin)
#[utoipa::path(
    get,
    path = "/api/admin/blog/categories",
    responses(
        (status = 200, description = "All blog categories", body = ApiResponse<Vec<BlogCategoryInfo>>),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "blog"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<BlogCategoryInfo>>>, ApiError> {
    let categories = BlogCategoryRepository::new(state.db.clone())
        .find_all(true)
        .await
        .map_err(ApiError::from_repo)?;

    let items = categories.into_iter().map(BlogCategoryInfo::from).collect();
    Ok(Json(ApiResponse::data(items)))
}

/// Create a blog category
#[utoipa::path(
    post,
    path = "/api/admin/blog/categories",
    request_body = BlogCategoryPayload,
    responses(
        (status = 201, description = "Blog category created", body = ApiResponse<BlogCategoryInfo>),
        (status = 400, description = "Invalid payload", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 409, description = "Requested slug already in use", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "blog"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<BlogCategoryPayload>,
) -> Result<(StatusCode, Json<ApiResponse<BlogCategoryInfo>>), ApiError> {
    let name = payload.name.as_deref().map(str::trim).unwrap_or_default();
    if name.is_empty() {
        return Err(validation_error(
            "Name is required",
            vec![FieldError::new("name", "Must not be empty")],
        ));
    }

    let repo = BlogCategoryRepository::new(state.db.clone());
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
            let base = slug::slugify_default(name);
            slug::ensure_unique(&base, |candidate| {
                let repo = repo.clone();
                async move { repo.slug_taken(&candidate, None).await }
            })
            .await
            .map_err(ApiError::from_repo)?
        }
    };

    let now = Utc::now();
    let model = blog_category::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        slug: Set(unique_slug),
        description: Set(payload.description),
        is_active: Set(payload.is_active.unwrap_or(true)),
        post_count: Set(0),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };

    let created = repo.create(model).await.map_err(ApiError::from_repo)?;
    tracing::info!(blog_category_id = %created.id, slug = %created.slug, "Created blog category");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::data(BlogCategoryInfo::from(created))),
    ))
}

/// Update a blog category
#[utoipa::path(
    put,
    path = "/api/admin/blog/categories/{id}",
    params(
        ("id" = String, Path, description = "Blog category ID")
    ),
    request_body = BlogCategoryPayload,
    responses(
        (status = 200, description = "Blog category updated", body = ApiResponse<BlogCategoryInfo>),
        (status = 400, description = "Invalid payload", body = ApiError),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Blog category not found", body = ApiError),
        (status = 409, description = "Requested slug already in use", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "blog"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<BlogCategoryPayload>,
) -> Result<Json<ApiResponse<BlogCategoryInfo>>, ApiError> {
    let repo = BlogCategoryRepository::new(state.db.clone());
    let existing = repo
        .find_by_id(&id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| not_found("CATEGORY_NOT_FOUND", "Blog category not found"))?;

    let mut model = blog_category::ActiveModel::default();
    if let Some(name) = payload.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(validation_error(
                "Name is required",
                vec![FieldError::new("name", "Must not be empty")],
            ));
        }
        model.name = Set(name);
    }
    if let Some(requested) = &payload.slug {
        let requested = slug::slugify_default(requested);
        if requested != existing.slug
            && repo
                .slug_taken(&requested, Some(&id))
                .await
                .map_err(ApiError::from_repo)?
        {
            return Err(conflict("DUPLICATE_SLUG", "Slug is already in use"));
        }
        model.slug = Set(requested);
    }
    if payload.description.is_some() {
        model.description = Set(payload.description);
    }
    if let Some(is_active) = payload.is_active {
        model.is_active = Set(is_active);
    }

    let updated = repo.update(&id, model).await.map_err(ApiError::from_repo)?;
    tracing::info!(blog_category_id = %updated.id, "Updated blog category");

    Ok(Json(ApiResponse::data(BlogCategoryInfo::from(updated))))
}

/// Delete a blog category
///
/// Posts filed under the category keep existing with the reference cleared.
#[utoipa::path(
    delete,
    path = "/api/admin/blog/categories/{id}",
    params(
        ("id" = String, Path, description = "Blog category ID")
    ),
    responses(
        (status = 200, description = "Blog category deleted"),
        (status = 401, description = "Missing or invalid token", body = ApiError),
        (status = 404, description = "Blog category not found", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "blog"
)]
pub async fn remove_category(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    let repo = BlogCategoryRepository::new(state.db.clone());
    repo.find_by_id(&id)
        .await
        .map_err(ApiError::from_repo)?
        .ok_or_else(|| not_found("CATEGORY_NOT_FOUND", "Blog category not found"))?;

    repo.delete(&id).await.map_err(ApiError::from_repo)?;
    tracing::info!(blog_category_id = %id, "Deleted blog category");

    Ok(Json(ApiResponse::ack("Blog category deleted")))
}

/// Recompute the per-category post counters
#[utoipa::path(
    post,
    path = "/api/admin/blog/categories/recount",
    responses(
        (status = 200, description = "Counters recomputed", body = ApiResponse<RecountResult>),
        (status = 401, description = "Missing or invalid token", body = ApiError)
    ),
    security(("bearer_auth" = [])),
    tag = "blog"
)]
pub async fn recount_categories(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<RecountResult>>, ApiError> {
    let corrected = BlogCategoryRepository::new(state.db.clone())
        .recount_posts()
        .await
        .map_err(ApiError::from_repo)?;
    tracing::info!(corrected, "Recounted blog category post counters");

    Ok(Json(ApiResponse::with_message(
        RecountResult { corrected },
        "Post counters recomputed",
    )))
}
