//! Request ids and one log line per answered request.

use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderValue, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;
use crate::cache::CacheOutcome;

use super::api::rate_limit::RateDecision;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 64;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
}

impl RequestContext {
    /// Reuse the caller's id when it is a short token, otherwise mint one.
    fn for_request(request: &Request<Body>) -> Self {
        let inbound = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|id| is_request_id_token(id));

        Self {
            request_id: inbound
                .map(str::to_string)
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
        }
    }
}

fn is_request_id_token(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_')
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let ctx = RequestContext::for_request(&request);
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(&ctx.request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response.extensions_mut().insert(ctx);
    response
}

/// What the route guards and the error report say about a finished request.
#[derive(Debug)]
struct ResponseSummary {
    status: StatusCode,
    cache: &'static str,
    guard: &'static str,
    source: &'static str,
    detail: String,
    chain: Vec<String>,
}

impl ResponseSummary {
    fn from_response(response: &mut Response) -> Self {
        let status = response.status();
        let extensions = response.extensions_mut();

        let cache = extensions
            .get::<CacheOutcome>()
            .map_or("none", |outcome| outcome.as_str());
        let guard = extensions
            .get::<RateDecision>()
            .map_or("none", |decision| decision.reason());
        let (source, chain) = match extensions.remove::<ErrorReport>() {
            Some(report) => (report.source, report.messages),
            None => ("none", Vec::new()),
        };
        let detail = chain.first().cloned().unwrap_or_default();

        Self {
            status,
            cache,
            guard,
            source,
            detail,
            chain,
        }
    }
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let summary = ResponseSummary::from_response(&mut response);
    let elapsed_ms = started.elapsed().as_millis();

    if summary.status.is_server_error() {
        error!(
            target = "blogwire::http::response",
            status = summary.status.as_u16(),
            %method,
            %path,
            elapsed_ms,
            cache = summary.cache,
            source = summary.source,
            detail = %summary.detail,
            chain = ?summary.chain,
            %request_id,
            "request failed"
        );
    } else if summary.status.is_client_error() {
        warn!(
            target = "blogwire::http::response",
            status = summary.status.as_u16(),
            %method,
            %path,
            elapsed_ms,
            guard = summary.guard,
            source = summary.source,
            detail = %summary.detail,
            %request_id,
            "request refused"
        );
    } else {
        debug!(
            target = "blogwire::http::response",
            status = summary.status.as_u16(),
            %method,
            %path,
            elapsed_ms,
            cache = summary.cache,
            guard = summary.guard,
            %request_id,
            "request served"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::response::IntoResponse;

    #[test]
    fn accepts_short_token_ids_only() {
        assert!(is_request_id_token("edge-7f3a_01"));
        assert!(!is_request_id_token(""));
        assert!(!is_request_id_token("has space"));
        assert!(!is_request_id_token(&"x".repeat(MAX_REQUEST_ID_LEN + 1)));
    }

    #[test]
    fn inbound_id_is_reused() {
        let request = Request::builder()
            .header(REQUEST_ID_HEADER, "edge-42")
            .body(Body::empty())
            .expect("request");
        assert_eq!(RequestContext::for_request(&request).request_id, "edge-42");

        let request = Request::builder()
            .header(REQUEST_ID_HEADER, "not/a/token")
            .body(Body::empty())
            .expect("request");
        assert_ne!(
            RequestContext::for_request(&request).request_id,
            "not/a/token"
        );
    }

    #[test]
    fn summary_reads_guard_and_cache_outcomes() {
        let mut response = StatusCode::OK.into_response();
        response.extensions_mut().insert(CacheOutcome::Hit);
        response
            .extensions_mut()
            .insert(RateDecision::Allowed { count: 2 });

        let summary = ResponseSummary::from_response(&mut response);
        assert_eq!(summary.cache, "hit");
        assert_eq!(summary.guard, "allowed");
        assert_eq!(summary.source, "none");
        assert!(summary.chain.is_empty());
    }

    #[test]
    fn summary_takes_the_error_report() {
        let mut response = StatusCode::FORBIDDEN.into_response();
        ErrorReport::from_message("test", StatusCode::FORBIDDEN, "banned").attach(&mut response);

        let summary = ResponseSummary::from_response(&mut response);
        assert_eq!(summary.source, "test");
        assert_eq!(summary.detail, "banned");
        assert!(response.extensions().get::<ErrorReport>().is_none());
    }
}
