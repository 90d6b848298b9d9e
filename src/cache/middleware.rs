//! Adaptive query cache middleware.

use std::sync::Arc;

use axum::{
    body::{Body, HttpBody},
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::counter;
use tracing::{debug, info, instrument, warn};

use super::{
    METRIC_QUERY_CACHE_BYPASS, METRIC_QUERY_CACHE_HIT, METRIC_QUERY_CACHE_STORE,
    signature::QuerySignature,
    store::{CachedResponse, Observation, QueryCache},
};

/// Cache bound to one route.
#[derive(Clone)]
pub struct QueryCacheState {
    pub cache: Arc<QueryCache>,
    pub enabled: bool,
    pub body_limit: usize,
}

impl QueryCacheState {
    pub fn new(cache: Arc<QueryCache>, enabled: bool, body_limit: usize) -> Self {
        Self {
            cache,
            enabled,
            body_limit,
        }
    }
}

/// How the query cache handled one request, recorded in the response extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    Bypass,
    Hit,
    Live,
    Stored,
    /// The threshold was reached but the response was not storable.
    Skipped,
}

impl CacheOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bypass => "bypass",
            Self::Hit => "hit",
            Self::Live => "live",
            Self::Stored => "stored",
            Self::Skipped => "skipped",
        }
    }
}

/// Serve repeated query signatures from memory once they have been seen often enough.
///
/// Requests without query parameters always reach the handler. Server errors
/// and bodies over the limit are never stored, so the next sighting retries.
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn query_cache_layer(
    State(state): State<QueryCacheState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if !state.enabled {
        return next.run(request).await;
    }

    let route = request.uri().path().to_string();
    let signature = QuerySignature::from_query(request.uri().query());
    if signature.is_empty() {
        counter!(METRIC_QUERY_CACHE_BYPASS, "route" => route).increment(1);
        return with_outcome(next.run(request).await, CacheOutcome::Bypass);
    }

    if let Some(cached) = state.cache.lookup(&signature) {
        debug!(
            target = "blogwire::cache",
            signature = %signature,
            outcome = "hit",
            "serving cached response"
        );
        counter!(METRIC_QUERY_CACHE_HIT, "route" => route).increment(1);
        return with_outcome(cached.into_response(), CacheOutcome::Hit);
    }

    let observation = state.cache.observe(&signature);
    let response = next.run(request).await;

    let Observation::Store { seen } = observation else {
        return with_outcome(response, CacheOutcome::Live);
    };

    if response.status().is_server_error() {
        debug!(
            target = "blogwire::cache",
            signature = %signature,
            status = response.status().as_u16(),
            "not storing server error"
        );
        return with_outcome(response, CacheOutcome::Skipped);
    }
    if exceeds_limit(&response, state.body_limit) {
        debug!(
            target = "blogwire::cache",
            signature = %signature,
            limit = state.body_limit,
            "response body over cache limit"
        );
        return with_outcome(response, CacheOutcome::Skipped);
    }

    let (parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!(
                target = "blogwire::cache",
                signature = %signature,
                error = %err,
                "response body failed while buffering"
            );
            return with_outcome(
                StatusCode::BAD_GATEWAY.into_response(),
                CacheOutcome::Skipped,
            );
        }
    };

    // Bodies without a usable size hint are only measured once buffered.
    if bytes.len() > state.body_limit {
        debug!(
            target = "blogwire::cache",
            signature = %signature,
            size = bytes.len(),
            limit = state.body_limit,
            "response body over cache limit"
        );
        let response = Response::from_parts(parts, Body::from(bytes));
        return with_outcome(response, CacheOutcome::Skipped);
    }

    state.cache.store(
        signature.clone(),
        CachedResponse::new(parts.status, &parts.headers, bytes.clone()),
    );
    info!(
        target = "blogwire::cache",
        signature = %signature,
        seen,
        entries = state.cache.len(),
        "stored response"
    );
    counter!(METRIC_QUERY_CACHE_STORE, "route" => route).increment(1);

    with_outcome(
        Response::from_parts(parts, Body::from(bytes)),
        CacheOutcome::Stored,
    )
}

fn with_outcome(mut response: Response, outcome: CacheOutcome) -> Response {
    response.extensions_mut().insert(outcome);
    response
}

/// True when the declared length or the body's size hint already rules out storing.
fn exceeds_limit(response: &Response, limit: usize) -> bool {
    let declared = response
        .headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<u64>().ok());

    let hint = response.body().size_hint();
    let smallest_possible = declared.unwrap_or(0).max(hint.lower());

    smallest_possible > limit as u64
}
