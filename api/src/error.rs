//! Error types for the API.

use atom_client::ClientError;
use atom_common::StoreError;
use atom_registry::RegistryError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::envelope::Envelope;

/// Result type for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// API errors, rendered as a failed envelope.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// Unauthorized (401) - missing or unknown session
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request (400) - malformed request or unmet precondition
    #[error("{0}")]
    BadRequest(String),

    /// Validation error (400) - specific field validation failed
    #[error("{field}: {message}")]
    ValidationError {
        /// The field that failed validation
        field: String,
        /// The validation error message
        message: String,
    },

    /// Bad gateway (502) - the portal failed or answered unexpectedly
    #[error("upstream failure: {0}")]
    BadGateway(String),

    /// Internal server error (500)
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status this error is rendered with
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) | Self::ValidationError { .. } => StatusCode::BAD_REQUEST,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        (status, Json(Envelope::<()>::err(self.to_string()))).into_response()
    }
}

impl From<ClientError> for ApiError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::AlreadyInProgress
            | ClientError::NotLoggedIn
            | ClientError::InvalidCommunityId(_)
            | ClientError::Closed => ApiError::BadRequest(err.to_string()),
            ClientError::LoginAborted => ApiError::BadGateway(err.to_string()),
            other if other.is_transport() => ApiError::BadGateway(other.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
