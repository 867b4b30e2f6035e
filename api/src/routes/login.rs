//! QR login endpoints.
//!
//! `start-login` is registered manually: it creates the session rather
//! than resolving one, and answers with a `Set-Cookie` header.

use async_trait::async_trait;
use axum::{
    extract::State,
    http::{header, HeaderMap, Method},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::envelope::Envelope;
use crate::error::{ApiError, ApiResult};
use crate::route_trait::{RouteContext, RouteHandler, RouteMetadata, SessionRequirement};
use crate::state::AppState;

/// Start login response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StartLoginResponse {
    /// Target to render as a QR code
    pub url: String,
}

/// `POST /api/start-login`
///
/// Replaces the caller's session with a fresh client and starts its QR
/// login. A cookie naming a live session keeps that id; anything else gets
/// a newly minted one.
pub async fn start_login(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Response> {
    let request_id = uuid::Uuid::new_v4();
    let existing = state
        .session_id(&headers)
        .filter(|id| state.registry.get(id).is_some());

    let (session_id, client) = state.registry.create_or_replace(existing).await.map_err(|e| {
        tracing::error!(request_id = %request_id, error = %e, "Failed to create session");
        ApiError::from(e)
    })?;
    tracing::info!(request_id = %request_id, session_id = %session_id, "Starting QR login");

    let logged_in_id = session_id.clone();
    let url = client
        .start_login(Some(Box::new(move || {
            tracing::info!(session_id = %logged_in_id, "Session logged in");
        })))
        .await
        .map_err(|e| {
            tracing::warn!(request_id = %request_id, session_id = %session_id, error = %e, "QR login failed to start");
            ApiError::from(e)
        })?;

    tracing::info!(request_id = %request_id, session_id = %session_id, "QR code issued");
    let cookie = state.session_cookie(&session_id);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(Envelope::ok(StartLoginResponse { url })),
    )
        .into_response())
}

/// Login status request (empty for GET endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginStatusRequest;

/// Login status response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginStatusResponse {
    /// Whether the scan was confirmed and the session is bound
    pub logged_in: bool,
}

/// `GET /api/login-status`
pub struct LoginStatusRoute;

#[async_trait]
impl RouteHandler for LoginStatusRoute {
    type Request = LoginStatusRequest;
    type Response = LoginStatusResponse;

    fn metadata() -> RouteMetadata {
        RouteMetadata {
            path: "/api/login-status",
            method: Method::GET,
            tags: &["Login"],
            description: "Whether the session's QR login has completed",
            session: SessionRequirement::Live,
        }
    }

    async fn validate_request(_req: &Self::Request) -> ApiResult<()> {
        Ok(())
    }

    async fn handle(_req: Self::Request, ctx: &RouteContext) -> ApiResult<Self::Response> {
        Ok(LoginStatusResponse {
            logged_in: ctx.client()?.is_logged_in(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_status_field_name() {
        let json = serde_json::to_value(LoginStatusResponse { logged_in: true }).unwrap();
        assert_eq!(json, serde_json::json!({"loggedIn": true}));
    }
}
