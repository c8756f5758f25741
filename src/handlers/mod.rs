//! # API Handlers
//!
//! HTTP endpoint handlers for the Perks API. Success responses share the
//! `{ "success": true, ... }` envelope built here; failures render through
//! [`crate::error::ApiError`].

use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::db;
use crate::error::ApiError;
use crate::models::ServiceInfo;
use crate::pagination::Pagination;
use crate::server::AppState;

pub mod blog;
pub mod categories;
pub mod dashboard;
pub mod leads;
pub mod perks;
pub mod seo;
pub mod settings;

/// Uniform success envelope for API responses
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Always true; failures use the error envelope instead
    pub success: bool,
    /// Response payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Optional human-readable message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Pagination block for list endpoints
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    /// Endpoint-specific metadata, e.g. the resolved date range
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
}

impl<T> ApiResponse<T> {
    /// Envelope carrying just a payload.
    pub fn data(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            pagination: None,
            meta: None,
        }
    }

    /// Envelope carrying a payload and its pagination block.
    pub fn page(data: T, pagination: Pagination) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            pagination: Some(pagination),
            meta: None,
        }
    }

    /// Envelope carrying a payload and a message.
    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
            pagination: None,
            meta: None,
        }
    }

    /// Attach endpoint-specific metadata.
    pub fn with_meta(mut self, meta: serde_json::Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl ApiResponse<()> {
    /// Payload-less acknowledgement, used by delete and recount endpoints.
    pub fn ack(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            pagination: None,
            meta: None,
        }
    }
}

/// Result of a batch counter recomputation
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RecountResult {
    /// Rows whose stored counter disagreed with the source of truth
    pub corrected: u64,
}

/// Deserializer distinguishing an absent field from an explicit `null`:
/// a present `null` becomes `Some(None)` and a value `Some(Some(v))`.
/// Pair with `#[serde(default)]` so an absent field stays `None`.
pub(crate) fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Deserialize::deserialize(de).map(Some)
}

/// String entries of a JSON array column, tolerating a missing or
/// malformed value.
pub(crate) fn string_list(value: Option<&serde_json::Value>) -> Vec<String> {
    value
        .and_then(|value| value.as_array())
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Liveness probe that also pings the database
#[utoipa::path(
    get,
    path = "/healthz",
    responses(
        (status = 200, description = "Service healthy"),
        (status = 503, description = "Database unreachable", body = ApiError)
    ),
    tag = "root"
)]
pub async fn healthz(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    db::health_check(&state.db)
        .await
        .map_err(ApiError::from_repo)?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}
