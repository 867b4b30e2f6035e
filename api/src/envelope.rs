//! Response envelope shared by every endpoint.

use serde::{Deserialize, Serialize};

/// `{success, data?, err?}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// Whether the request succeeded
    pub success: bool,
    /// Payload of a successful request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Failure message
    #[serde(skip_serializing_if = "Option::is_none")]
    pub err: Option<String>,
}

impl<T> Envelope<T> {
    /// Successful envelope around `data`
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            err: None,
        }
    }

    /// Failed envelope carrying `message`
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            err: Some(message.into()),
        }
    }
}
