//! Error types for the content client.

use thiserror::Error;

/// Result type for content client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the content client.
///
/// The first group are precondition failures, returned synchronously and
/// never retried. The second group are transport failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// A QR login is already waiting for a scan
    #[error("QR login already started")]
    AlreadyInProgress,

    /// The operation requires a bound identity
    #[error("not logged in")]
    NotLoggedIn,

    /// No accepted membership has this member id
    #[error("invalid community id: {0}")]
    InvalidCommunityId(String),

    /// The handshake ended before a QR code was issued
    #[error("login aborted before a QR code was issued")]
    LoginAborted,

    /// The client was torn down and cannot start a new login
    #[error("client has been closed")]
    Closed,

    /// The request never produced a response
    #[error("request to {path} failed: {message}")]
    Request {
        /// Portal-relative path
        path: String,
        /// Underlying failure
        message: String,
    },

    /// The portal answered with a non-success status
    #[error("{path}: HTTP {status}")]
    Status {
        /// Portal-relative path
        path: String,
        /// HTTP status code
        status: u16,
    },

    /// The response body could not be decoded
    #[error("invalid response from {path}: {message}")]
    Decode {
        /// Portal-relative path
        path: String,
        /// Decoder message
        message: String,
    },

    /// The duplex connection failed or was closed
    #[error("connection error: {0}")]
    Connection(String),

    /// Expected markup was missing from a page
    #[error("markup error: {0}")]
    Markup(String),

    /// The operation exceeded the outbound request timeout
    #[error("timed out waiting for {0}")]
    Timeout(String),
}

impl ClientError {
    /// Whether the failure came from talking to the portal rather than
    /// from a precondition.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Request { .. }
                | Self::Status { .. }
                | Self::Decode { .. }
                | Self::Connection(_)
                | Self::Markup(_)
                | Self::Timeout(_)
        )
    }
}
