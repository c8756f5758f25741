//! # Authentication and Authorization
//!
//! Admin bearer authentication for the `/api/admin` surface, plus extraction
//! of the optional vendor client identity used for perk ownership checks.

use std::sync::Arc;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::error::{
    ApiError, FieldError, unauthorized, unauthorized_with_trace_id, validation_error,
};
use crate::server::AppState;
use crate::telemetry::TraceContext;

/// Header identifying a vendor client on admin requests.
pub const CLIENT_ID_HEADER: &str = "X-Client-Id";

/// Vendor client ID wrapper for type safety
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientId(pub Uuid);

/// Marker type for authenticated admin requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminAuth;

/// Vendor client identity carried in request extensions. `None` means the
/// request authenticated without a client header, i.e. a full admin.
#[derive(Debug, Clone)]
pub struct ClientExtension(pub Option<ClientId>);

impl ClientExtension {
    /// Whether this request may manage a record owned by `owner`. Full
    /// admins may manage anything; a client only its own records, and an
    /// unowned record belongs to no client.
    pub fn may_manage(&self, owner: Option<Uuid>) -> bool {
        match (&self.0, owner) {
            (None, _) => true,
            (Some(client), Some(owner)) => client.0 == owner,
            (Some(_), None) => false,
        }
    }
}

impl FromRef<AppState> for Arc<AppConfig> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.config)
    }
}

/// Authentication middleware for the admin router. Validates the bearer
/// token against the configured admin tokens and captures the optional
/// client header for ownership checks downstream.
pub async fn auth_middleware(
    State(config): State<Arc<AppConfig>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let headers = request.headers().clone();

    // Extract trace_id from request context for consistent error responses
    let trace_id = request
        .extensions()
        .get::<TraceContext>()
        .map(|ctx| ctx.trace_id.clone());

    let token = extract_bearer_token(&headers, trace_id.as_deref())?;
    validate_token(&config, token)?;

    let client = extract_client_id(&headers)?;
    if let Some(client) = &client {
        tracing::debug!(client_id = %client.0, "Authenticated admin request for client");
    }

    let mut request = request;
    request.extensions_mut().insert(ClientExtension(client));
    request.extensions_mut().insert(AdminAuth);

    Ok(next.run(request).await)
}

fn extract_bearer_token<'h>(
    headers: &'h HeaderMap,
    trace_id: Option<&str>,
) -> Result<&'h str, ApiError> {
    let reject = |message: &'static str| match trace_id {
        Some(trace_id) => unauthorized_with_trace_id(Some(message), trace_id.to_string()),
        None => unauthorized(Some(message)),
    };

    let header = headers
        .get(AUTHORIZATION)
        .ok_or_else(|| reject("Missing Authorization header"))?
        .to_str()
        .map_err(|_| reject("Invalid Authorization header"))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| reject("Authorization header must use Bearer scheme"))
}

fn validate_token(config: &AppConfig, token: &str) -> Result<(), ApiError> {
    let is_valid = config
        .admin_tokens
        .iter()
        .any(|configured| ConstantTimeEq::ct_eq(token.as_bytes(), configured.as_bytes()).into());

    if is_valid {
        Ok(())
    } else {
        Err(unauthorized(Some("Invalid bearer token")))
    }
}

fn extract_client_id(headers: &HeaderMap) -> Result<Option<ClientId>, ApiError> {
    let Some(value) = headers.get(CLIENT_ID_HEADER) else {
        return Ok(None);
    };

    let value = value.to_str().map_err(|_| {
        validation_error(
            "Invalid client header",
            vec![FieldError::new(
                CLIENT_ID_HEADER,
                "Header must be valid UTF-8",
            )],
        )
    })?;

    value
        .parse::<Uuid>()
        .map(|id| Some(ClientId(id)))
        .map_err(|_| {
            validation_error(
                "Invalid client ID",
                vec![FieldError::new(CLIENT_ID_HEADER, "Must be a valid UUID")],
            )
        })
}

/// OpenAPI header parameter for X-Client-Id
#[derive(Debug, Serialize, Deserialize, IntoParams, utoipa::ToSchema)]
#[into_params(parameter_in = Header)]
pub struct ClientHeader {
    /// Vendor client identifier (UUID) scoping the request to that client's records
    #[serde(rename = "X-Client-Id")]
    #[param(rename = "X-Client-Id", value_type = String)]
    pub client_id: String,
}

impl<S> FromRequestParts<S> for ClientExtension
where
    Arc<AppConfig>: FromRef<S>,
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<ClientExtension>()
            .cloned()
            .ok_or_else(|| unauthorized(Some("Admin authentication required")))
    }
}

impl<S> FromRequestParts<S> for AdminAuth
where
    Arc<AppConfig>: FromRef<S>,
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AdminAuth>()
            .copied()
            .ok_or_else(|| unauthorized(Some("Admin authentication required")))
    }
}
