use std::net::SocketAddr;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics::counter;
use tracing::warn;

use super::error::ApiError;
use super::rate_limit::{METRIC_RATE_LIMIT_REJECTED, SlidingWindowRateLimiter};

const UNKNOWN_CLIENT: &str = "unknown";

/// Turn away clients that exceed the route's request ceiling.
///
/// Rejected requests never reach the inner layers, so a banned client cannot
/// warm or read the query cache.
pub async fn rate_limit_layer(
    State(limiter): State<SlidingWindowRateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let client = client_address(&request);
    let decision = limiter.check(&client);

    if let Some(message) = decision.rejection_message() {
        let path = request.uri().path().to_string();
        warn!(
            target = "blogwire::http::rate_limit",
            client = %client,
            path = %path,
            reason = decision.reason(),
            "request rejected"
        );
        counter!(
            METRIC_RATE_LIMIT_REJECTED,
            "route" => path,
            "reason" => decision.reason()
        )
        .increment(1);
        let mut response = ApiError::rejected(message);
        response.extensions_mut().insert(decision);
        return response;
    }

    let mut response = next.run(request).await;
    response.extensions_mut().insert(decision);
    response
}

fn client_address(request: &Request<Body>) -> String {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| UNKNOWN_CLIENT.to_string())
}
