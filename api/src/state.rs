//! Shared state handed to every route.

use atom_client::ContentClient;
use atom_common::SelectionStore;
use atom_registry::SessionRegistry;
use axum::http::{header, HeaderMap};
use std::sync::Arc;

use crate::error::{ApiError, ApiResult};

/// Registry, selection store and the session cookie name.
#[derive(Clone)]
pub struct AppState {
    /// Live sessions
    pub registry: SessionRegistry,
    /// Persisted community selections
    pub selections: Arc<dyn SelectionStore>,
    cookie_name: Arc<str>,
}

/// A resolved inbound session.
#[derive(Clone)]
pub struct Session {
    /// Session id from the cookie
    pub id: String,
    /// The session's content client
    pub client: Arc<ContentClient>,
}

impl AppState {
    /// Create state reading the session id from `cookie_name`
    pub fn new(
        registry: SessionRegistry,
        selections: Arc<dyn SelectionStore>,
        cookie_name: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            registry,
            selections,
            cookie_name: cookie_name.into(),
        }
    }

    /// Name of the session cookie
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Session id carried by the request, if any
    pub fn session_id(&self, headers: &HeaderMap) -> Option<String> {
        cookie_value(headers, &self.cookie_name)
    }

    /// The live session the request belongs to
    pub fn session(&self, headers: &HeaderMap) -> ApiResult<Session> {
        let id = self
            .session_id(headers)
            .ok_or_else(|| ApiError::Unauthorized("no session".to_string()))?;
        let client = self
            .registry
            .get(&id)
            .ok_or_else(|| ApiError::Unauthorized("unknown session".to_string()))?;
        Ok(Session { id, client })
    }

    /// `Set-Cookie` value binding the caller to `session_id`
    pub fn session_cookie(&self, session_id: &str) -> String {
        format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            self.cookie_name, session_id
        )
    }
}

/// Value of cookie `name` across every `Cookie` header.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .filter(|value| !value.is_empty())
}
