//! Request/response transport to the portal.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;

use crate::error::{ClientError, ClientResult};

/// Plain GET requests against portal-relative paths.
///
/// Implementations own the outbound identity (cookie jar) and enforce the
/// request timeout. A non-success status must surface as
/// `ClientError::Status`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `path` with `query` appended and return the body as text
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> ClientResult<String>;
}

/// GET `path` and decode the body as JSON.
pub async fn get_json<T: DeserializeOwned>(
    transport: &dyn Transport,
    path: &str,
    query: &[(&str, &str)],
) -> ClientResult<T> {
    let body = transport.get(path, query).await?;
    serde_json::from_str(&body).map_err(|e| ClientError::Decode {
        path: path.to_string(),
        message: e.to_string(),
    })
}

/// `Transport` over reqwest with a private cookie store.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport with its own cookie jar
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Request {
                path: String::new(),
                message: format!("Failed to build HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> ClientResult<String> {
        let url = format!("{}{}", self.base_url, path);
        tracing::trace!(path, "GET");

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ClientError::Timeout(path.to_string())
                } else {
                    ClientError::Request {
                        path: path.to_string(),
                        message: e.to_string(),
                    }
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| ClientError::Request {
            path: path.to_string(),
            message: format!("Failed to read body: {}", e),
        })
    }
}
