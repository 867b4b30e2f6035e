//! Router configuration and setup.

use axum::{routing::post, Router};
use tower_http::{
    compression::CompressionLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    config::ApiConfig,
    middleware,
    route_trait::RegisterableRoute,
    routes::{self, like},
    state::AppState,
};

/// Build the application router.
///
/// Layers go on before `.with_state()` so the state type is inferred once.
pub fn build_router(state: AppState, config: &ApiConfig) -> Router {
    let mut router = Router::new();

    router = routes::health::HealthRoute::register(router);
    router = routes::login::LoginStatusRoute::register(router);
    router = routes::communities::CommunitiesRoute::register(router);
    router = routes::communities::SelectCommunitiesRoute::register(router);
    router = routes::communities::SetCurrentCommunityRoute::register(router);
    router = like::LikeRoute::<like::Notices>::register(router);
    router = like::LikeRoute::<like::Moments>::register(router);
    router = like::LikeRoute::<like::CcpPosts>::register(router);
    router = like::LikeRoute::<like::Proposals>::register(router);

    // Creates the session itself, so it bypasses the trait's session lookup.
    router = router.route("/api/start-login", post(routes::login::start_login));

    if config.enable_swagger {
        router = router.merge(
            SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", routes::ApiDoc::openapi()),
        );
    }

    if let Some(dir) = &config.static_dir {
        tracing::info!(dir = %dir.display(), "Serving static assets");
        router = router.fallback_service(ServeDir::new(dir));
    }

    router
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().include_headers(false))
                .on_response(DefaultOnResponse::new()),
        )
        .layer(middleware::cors_layer(config))
        .with_state(state)
}
