//! API route handlers.

pub mod communities;
pub mod health;
pub mod like;
pub mod login;

use utoipa::OpenApi;

/// OpenAPI documentation for all routes.
///
/// Paths come from route metadata at registration; the document carries the
/// request and response schemas.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Atom Liker API",
        version = "0.1.0",
        description = "QR login, community selection and bulk liking for the Atom community portal",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    paths(),
    components(schemas(
        health::HealthResponse,
        login::StartLoginResponse,
        login::LoginStatusResponse,
        communities::CommunityView,
        communities::CommunitiesResponse,
        communities::SelectionChange,
        communities::SelectCommunitiesRequest,
        communities::SelectCommunitiesResponse,
        communities::SetCurrentCommunityRequest,
        communities::SetCurrentCommunityResponse,
        like::LikeRequest,
        like::LikeResponse,
    ))
)]
pub struct ApiDoc;
