//! Community listing, selection and switching.

use async_trait::async_trait;
use axum::http::Method;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::ApiResult;
use crate::route_trait::{
    validators, RouteContext, RouteHandler, RouteMetadata, SessionRequirement,
};

/// Key selections are stored under: the remote identity when the portal
/// reported one, else the session id.
fn selection_owner(ctx: &RouteContext) -> ApiResult<String> {
    let session = ctx.session()?;
    Ok(session
        .client
        .identity()
        .unwrap_or_else(|| session.id.clone()))
}

/// One community as shown to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommunityView {
    /// Member id of the caller inside the community
    pub id: String,
    /// Display name
    pub name: String,
    /// Whether the caller selected it for bulk runs
    pub selected: bool,
}

/// Communities request (empty for GET endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommunitiesRequest;

/// Communities response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommunitiesResponse {
    /// Accepted memberships, in portal order
    pub communities: Vec<CommunityView>,
    /// Member id of the active community
    pub current: Option<String>,
}

/// `GET /api/communities`
pub struct CommunitiesRoute;

#[async_trait]
impl RouteHandler for CommunitiesRoute {
    type Request = CommunitiesRequest;
    type Response = CommunitiesResponse;

    fn metadata() -> RouteMetadata {
        RouteMetadata {
            path: "/api/communities",
            method: Method::GET,
            tags: &["Communities"],
            description: "List the caller's communities with their selection flags",
            session: SessionRequirement::LoggedIn,
        }
    }

    async fn validate_request(_req: &Self::Request) -> ApiResult<()> {
        Ok(())
    }

    async fn handle(_req: Self::Request, ctx: &RouteContext) -> ApiResult<Self::Response> {
        let client = ctx.client()?;
        let owner = selection_owner(ctx)?;

        let selected = match ctx.state.selections.find_selected(&owner).await {
            Ok(selected) => selected,
            Err(e) => {
                tracing::warn!(request_id = %ctx.request_id, error = %e, "Selection lookup failed, showing none selected");
                Default::default()
            }
        };

        let profile = client.profile();
        let communities = profile
            .communities
            .iter()
            .map(|c| CommunityView {
                id: c.member_id.clone(),
                name: c.name.clone(),
                selected: selected.contains(&c.member_id),
            })
            .collect();

        Ok(CommunitiesResponse {
            communities,
            current: profile.current_community().map(|c| c.member_id.clone()),
        })
    }
}

/// One selection change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SelectionChange {
    /// Member id
    pub id: String,
    /// New flag
    pub selected: bool,
}

/// Select communities request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SelectCommunitiesRequest {
    /// Changes to apply
    pub communities: Vec<SelectionChange>,
}

/// Select communities response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SelectCommunitiesResponse {
    /// Number of changes applied
    pub updated: usize,
}

/// `POST /api/select-communities`
///
/// Ids the caller is not a member of are skipped.
pub struct SelectCommunitiesRoute;

#[async_trait]
impl RouteHandler for SelectCommunitiesRoute {
    type Request = SelectCommunitiesRequest;
    type Response = SelectCommunitiesResponse;

    fn metadata() -> RouteMetadata {
        RouteMetadata {
            path: "/api/select-communities",
            method: Method::POST,
            tags: &["Communities"],
            description: "Persist which communities take part in bulk runs",
            session: SessionRequirement::LoggedIn,
        }
    }

    async fn validate_request(req: &Self::Request) -> ApiResult<()> {
        for change in &req.communities {
            validators::not_empty("communities.id", &change.id)?;
        }
        Ok(())
    }

    async fn handle(req: Self::Request, ctx: &RouteContext) -> ApiResult<Self::Response> {
        let profile = ctx.client()?.profile();
        let owner = selection_owner(ctx)?;
        let store = &ctx.state.selections;

        let mut updated = 0;
        for change in req.communities {
            if profile.position(&change.id).is_none() {
                tracing::warn!(request_id = %ctx.request_id, member_id = %change.id, "Skipping unknown community");
                continue;
            }
            if change.selected {
                store.add_selected(&owner, &change.id).await?;
            } else {
                store.remove_selected(&owner, &change.id).await?;
            }
            updated += 1;
        }

        tracing::info!(request_id = %ctx.request_id, updated, "Community selection saved");
        Ok(SelectCommunitiesResponse { updated })
    }
}

/// Set current community request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetCurrentCommunityRequest {
    /// Member id to switch to
    pub member_id: String,
}

/// Set current community response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SetCurrentCommunityResponse {
    /// Member id now active
    pub member_id: String,
    /// Its display name
    pub name: String,
}

/// `POST /api/set-current-community`
pub struct SetCurrentCommunityRoute;

#[async_trait]
impl RouteHandler for SetCurrentCommunityRoute {
    type Request = SetCurrentCommunityRequest;
    type Response = SetCurrentCommunityResponse;

    fn metadata() -> RouteMetadata {
        RouteMetadata {
            path: "/api/set-current-community",
            method: Method::POST,
            tags: &["Communities"],
            description: "Switch the remote session to another community",
            session: SessionRequirement::LoggedIn,
        }
    }

    async fn validate_request(req: &Self::Request) -> ApiResult<()> {
        validators::not_empty("memberId", &req.member_id)
    }

    async fn handle(req: Self::Request, ctx: &RouteContext) -> ApiResult<Self::Response> {
        let community = ctx.client()?.select_community(&req.member_id).await?;
        Ok(SetCurrentCommunityResponse {
            member_id: community.member_id,
            name: community.name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_current_request_uses_camel_case() {
        let req: SetCurrentCommunityRequest =
            serde_json::from_value(serde_json::json!({"memberId": "m1"})).unwrap();
        assert_eq!(req.member_id, "m1");
    }

    #[tokio::test]
    async fn test_empty_ids_rejected() {
        let req = SelectCommunitiesRequest {
            communities: vec![SelectionChange {
                id: " ".to_string(),
                selected: true,
            }],
        };
        assert!(SelectCommunitiesRoute::validate_request(&req).await.is_err());

        let req = SetCurrentCommunityRequest {
            member_id: String::new(),
        };
        assert!(SetCurrentCommunityRoute::validate_request(&req).await.is_err());
    }
}
