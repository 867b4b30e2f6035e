//! Route handler trait.
//!
//! Every trait-based route declares its metadata, validates its request and
//! handles it against a `RouteContext`. Registration takes care of session
//! resolution, the login precondition, request ids, logging and the
//! response envelope, so handlers only hold the route's own logic.

use async_trait::async_trait;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{HeaderMap, Method},
    routing::{get, post},
    Json, Router,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use uuid::Uuid;

use atom_client::{ClientError, ContentClient};

use crate::envelope::Envelope;
use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, Session};

/// What a route needs from the caller's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionRequirement {
    /// No session needed
    None,
    /// A live session; 401 otherwise
    Live,
    /// A live session whose client is logged in; 400 otherwise
    LoggedIn,
}

/// Route metadata.
#[derive(Debug, Clone)]
pub struct RouteMetadata {
    /// HTTP path (e.g., "/api/like-notices")
    pub path: &'static str,
    /// HTTP method
    pub method: Method,
    /// OpenAPI tags for grouping
    pub tags: &'static [&'static str],
    /// Description for documentation
    pub description: &'static str,
    /// Session precondition checked before validation
    pub session: SessionRequirement,
}

/// Per-request context handed to `RouteHandler::handle`.
pub struct RouteContext {
    /// Id correlating this request's log lines
    pub request_id: Uuid,
    /// Shared state
    pub state: AppState,
    /// Caller's session, when the route requires one
    pub session: Option<Session>,
}

impl RouteContext {
    /// The caller's session
    pub fn session(&self) -> ApiResult<&Session> {
        self.session
            .as_ref()
            .ok_or_else(|| ApiError::Unauthorized("no session".to_string()))
    }

    /// The caller's content client
    pub fn client(&self) -> ApiResult<&Arc<ContentClient>> {
        self.session().map(|session| &session.client)
    }
}

/// Route handler trait - trait-based routes implement this.
///
/// # Example
/// ```ignore
/// struct LoginStatusRoute;
///
/// #[async_trait]
/// impl RouteHandler for LoginStatusRoute {
///     type Request = LoginStatusRequest;
///     type Response = LoginStatusResponse;
///
///     fn metadata() -> RouteMetadata { ... }
///
///     async fn validate_request(_req: &Self::Request) -> ApiResult<()> {
///         Ok(())
///     }
///
///     async fn handle(_req: Self::Request, ctx: &RouteContext) -> ApiResult<Self::Response> {
///         Ok(LoginStatusResponse { logged_in: ctx.client()?.is_logged_in() })
///     }
/// }
/// ```
#[async_trait]
pub trait RouteHandler: Send + Sync + 'static {
    /// Request type. GET routes deserialize it from JSON `null`.
    type Request: DeserializeOwned + Debug + Send + Sync;

    /// Response type, wrapped in the envelope's `data`
    type Response: Serialize + Debug + Send + Sync;

    /// Provide route metadata
    fn metadata() -> RouteMetadata;

    /// Validate the request. Return `ApiError::ValidationError` or
    /// `ApiError::BadRequest` for failures.
    async fn validate_request(req: &Self::Request) -> ApiResult<()>;

    /// Handle a validated request
    async fn handle(req: Self::Request, ctx: &RouteContext) -> ApiResult<Self::Response>;
}

/// Route registration - auto-implemented for all `RouteHandler`s.
pub trait RegisterableRoute: RouteHandler {
    /// Register this route with the Axum router.
    fn register(router: Router<AppState>) -> Router<AppState>
    where
        Self: Sized,
    {
        let metadata = Self::metadata();

        match metadata.method {
            Method::GET => router.route(
                metadata.path,
                get(|State(state): State<AppState>, headers: HeaderMap| async move {
                    let req = serde_json::from_value::<Self::Request>(serde_json::Value::Null)
                        .map_err(|e| ApiError::BadRequest(e.to_string()));
                    dispatch::<Self>(state, headers, req).await
                }),
            ),
            Method::POST => router.route(
                metadata.path,
                post(
                    |State(state): State<AppState>,
                     headers: HeaderMap,
                     body: Result<Json<Self::Request>, JsonRejection>| async move {
                        let req = body
                            .map(|Json(req)| req)
                            .map_err(|e| ApiError::BadRequest(e.body_text()));
                        dispatch::<Self>(state, headers, req).await
                    },
                ),
            ),
            other => {
                tracing::error!(path = metadata.path, method = %other, "Unsupported route method, not registered");
                router
            }
        }
    }
}

impl<T: RouteHandler> RegisterableRoute for T {}

async fn dispatch<R: RouteHandler>(
    state: AppState,
    headers: HeaderMap,
    req: ApiResult<R::Request>,
) -> ApiResult<Json<Envelope<R::Response>>> {
    let metadata = R::metadata();
    let request_id = Uuid::new_v4();

    let session = match metadata.session {
        SessionRequirement::None => None,
        SessionRequirement::Live | SessionRequirement::LoggedIn => {
            let session = state.session(&headers).inspect_err(|e| {
                tracing::info!(request_id = %request_id, path = metadata.path, error = %e, "Rejected request");
            })?;
            if metadata.session == SessionRequirement::LoggedIn && !session.client.is_logged_in() {
                tracing::info!(request_id = %request_id, session_id = %session.id, path = metadata.path, "Not logged in");
                return Err(ClientError::NotLoggedIn.into());
            }
            Some(session)
        }
    };

    let req = req?;
    R::validate_request(&req).await?;

    tracing::info!(
        request_id = %request_id,
        path = metadata.path,
        session_id = session.as_ref().map(|s| s.id.as_str()).unwrap_or("-"),
        "Request received"
    );

    let ctx = RouteContext {
        request_id,
        state,
        session,
    };
    match R::handle(req, &ctx).await {
        Ok(response) => {
            tracing::debug!(request_id = %request_id, path = metadata.path, "Request succeeded");
            Ok(Json(Envelope::ok(response)))
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, path = metadata.path, error = %e, "Request failed");
            Err(e)
        }
    }
}

/// Common validation helpers.
pub mod validators {
    use crate::error::{ApiError, ApiResult};

    /// `value` must be a non-empty string
    pub fn not_empty(field: &str, value: &str) -> ApiResult<()> {
        if value.trim().is_empty() {
            return Err(ApiError::ValidationError {
                field: field.to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        Ok(())
    }

    /// `value` must be strictly positive
    pub fn positive(field: &str, value: i64) -> ApiResult<()> {
        if value <= 0 {
            return Err(ApiError::ValidationError {
                field: field.to_string(),
                message: format!("must be greater than 0, got {}", value),
            });
        }
        Ok(())
    }
}
