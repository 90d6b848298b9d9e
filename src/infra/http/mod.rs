pub mod api;
mod middleware;

pub use api::rate_limit::{
    METRIC_RATE_LIMIT_REJECTED, RateDecision, RateLimitPolicy, SlidingWindowRateLimiter,
};
pub use api::{ApiState, RouteGuards, build_api_router};
pub use middleware::RequestContext;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::application::error::ErrorReport;
use crate::application::repos::RepoError;

use middleware::{log_responses, set_request_context};

/// Full application router: health probe, versioned API and request logging.
pub fn build_router(state: ApiState, guards: RouteGuards) -> Router {
    Router::new()
        .route("/health", get(health))
        .merge(build_api_router(guards))
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context))
}

async fn health(State(state): State<ApiState>) -> Response {
    db_health_response(state.health.ping().await)
}

fn db_health_response(result: Result<(), RepoError>) -> Response {
    match result {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => {
            let mut response = StatusCode::SERVICE_UNAVAILABLE.into_response();
            ErrorReport::from_error(
                "infra::http::db_health",
                StatusCode::SERVICE_UNAVAILABLE,
                &err,
            )
            .attach(&mut response);
            response
        }
    }
}
