//! Health check endpoint.

use async_trait::async_trait;
use axum::http::Method;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiResult;
use crate::route_trait::{RouteContext, RouteHandler, RouteMetadata, SessionRequirement};

/// Health check request (empty for GET endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthRequest;

/// Health check response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service name
    pub service: String,
    /// Version
    pub version: String,
    /// Live sessions
    pub sessions: usize,
}

/// Health check route handler.
///
/// Used by container probes and load balancers; needs no session.
pub struct HealthRoute;

#[async_trait]
impl RouteHandler for HealthRoute {
    type Request = HealthRequest;
    type Response = HealthResponse;

    fn metadata() -> RouteMetadata {
        RouteMetadata {
            path: "/health",
            method: Method::GET,
            tags: &["System"],
            description: "Health check endpoint for service monitoring",
            session: SessionRequirement::None,
        }
    }

    async fn validate_request(_req: &Self::Request) -> ApiResult<()> {
        Ok(())
    }

    async fn handle(_req: Self::Request, ctx: &RouteContext) -> ApiResult<Self::Response> {
        Ok(HealthResponse {
            status: "ok".to_string(),
            service: "atom-server".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            sessions: ctx.state.registry.len(),
        })
    }
}
