//! Bulk like endpoints, one per content category.

use async_trait::async_trait;
use atom_common::Category;
use axum::http::Method;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;
use utoipa::ToSchema;

use crate::error::ApiResult;
use crate::route_trait::{
    validators, RouteContext, RouteHandler, RouteMetadata, SessionRequirement,
};

/// Binds a like route to its category and path.
pub trait LikeTarget: Send + Sync + 'static {
    /// Category liked by the route
    const CATEGORY: Category;
    /// HTTP path
    const PATH: &'static str;
    /// Documentation line
    const DESCRIPTION: &'static str;
}

/// Notices
pub struct Notices;
/// Moments
pub struct Moments;
/// Party posts
pub struct CcpPosts;
/// Proposals
pub struct Proposals;

impl LikeTarget for Notices {
    const CATEGORY: Category = Category::Notices;
    const PATH: &'static str = "/api/like-notices";
    const DESCRIPTION: &'static str = "Like the newest notices of the current community";
}

impl LikeTarget for Moments {
    const CATEGORY: Category = Category::Moments;
    const PATH: &'static str = "/api/like-moments";
    const DESCRIPTION: &'static str = "Like the newest moments of the current community";
}

impl LikeTarget for CcpPosts {
    const CATEGORY: Category = Category::CcpPosts;
    const PATH: &'static str = "/api/like-ccp-posts";
    const DESCRIPTION: &'static str = "Like the newest party posts of the current community";
}

impl LikeTarget for Proposals {
    const CATEGORY: Category = Category::Proposals;
    const PATH: &'static str = "/api/like-proposals";
    const DESCRIPTION: &'static str = "Like the newest proposals of the current community";
}

/// Like request.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LikeRequest {
    /// How many of the newest items to consider
    pub count: i64,
}

/// Like response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LikeResponse {
    /// Items newly liked
    pub count: usize,
}

/// `POST /api/like-*`
pub struct LikeRoute<T>(PhantomData<T>);

#[async_trait]
impl<T: LikeTarget> RouteHandler for LikeRoute<T> {
    type Request = LikeRequest;
    type Response = LikeResponse;

    fn metadata() -> RouteMetadata {
        RouteMetadata {
            path: T::PATH,
            method: Method::POST,
            tags: &["Like"],
            description: T::DESCRIPTION,
            session: SessionRequirement::LoggedIn,
        }
    }

    async fn validate_request(req: &Self::Request) -> ApiResult<()> {
        validators::positive("count", req.count)
    }

    async fn handle(req: Self::Request, ctx: &RouteContext) -> ApiResult<Self::Response> {
        let count = usize::try_from(req.count).unwrap_or(usize::MAX);
        let liked = ctx.client()?.like(T::CATEGORY, count).await?;
        tracing::info!(
            request_id = %ctx.request_id,
            category = T::CATEGORY.as_str(),
            requested = req.count,
            liked,
            "Bulk like finished"
        );
        Ok(LikeResponse { count: liked })
    }
}
