//! Per-route response store with observation counters.

use std::num::NonZeroU32;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;
use dashmap::DashMap;

use super::signature::QuerySignature;

/// A response captured for replay.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    status: StatusCode,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Bytes,
}

impl CachedResponse {
    pub fn new(status: StatusCode, headers: &HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers: headers
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
            body,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;

        let headers = response.headers_mut();
        headers.clear();
        for (name, value) in self.headers {
            headers.append(name, value);
        }

        response
    }
}

/// What to do with a request whose signature has no stored response yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Observation {
    /// Below the threshold; serve the live response only.
    Live { seen: u32 },
    /// Threshold reached; serve the live response and keep it.
    Store { seen: u32 },
}

/// Adaptive cache for one route.
///
/// A signature's response is stored once the signature has been observed
/// `threshold` times and replayed from then on. Entries never expire and the
/// table is unbounded.
#[derive(Debug)]
pub struct QueryCache {
    threshold: NonZeroU32,
    entries: DashMap<QuerySignature, CachedResponse>,
    observations: DashMap<QuerySignature, u32>,
}

impl QueryCache {
    pub fn new(threshold: NonZeroU32) -> Self {
        Self {
            threshold,
            entries: DashMap::new(),
            observations: DashMap::new(),
        }
    }

    pub fn threshold(&self) -> NonZeroU32 {
        self.threshold
    }

    pub fn lookup(&self, signature: &QuerySignature) -> Option<CachedResponse> {
        self.entries
            .get(signature)
            .map(|entry| entry.value().clone())
    }

    /// Count one more sighting of `signature`.
    pub fn observe(&self, signature: &QuerySignature) -> Observation {
        let seen = {
            let mut count = self.observations.entry(signature.clone()).or_insert(0);
            *count = count.saturating_add(1);
            *count
        };

        if seen >= self.threshold.get() {
            Observation::Store { seen }
        } else {
            Observation::Live { seen }
        }
    }

    pub fn store(&self, signature: QuerySignature, response: CachedResponse) {
        self.entries.entry(signature).or_insert(response);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signature(query: &str) -> QuerySignature {
        QuerySignature::from_query(Some(query))
    }

    fn cache() -> QueryCache {
        QueryCache::new(NonZeroU32::new(3).expect("non-zero"))
    }

    #[test]
    fn third_observation_triggers_store() {
        let cache = cache();
        let sig = signature("q=rust");

        assert_eq!(cache.observe(&sig), Observation::Live { seen: 1 });
        assert_eq!(cache.observe(&sig), Observation::Live { seen: 2 });
        assert_eq!(cache.observe(&sig), Observation::Store { seen: 3 });
    }

    #[test]
    fn signatures_are_counted_separately() {
        let cache = cache();
        cache.observe(&signature("q=rust"));
        cache.observe(&signature("q=rust"));

        assert_eq!(
            cache.observe(&signature("t=lang")),
            Observation::Live { seen: 1 }
        );
    }

    #[test]
    fn first_stored_response_is_kept() {
        let cache = cache();
        let sig = signature("q=rust");
        let headers = HeaderMap::new();

        cache.store(
            sig.clone(),
            CachedResponse::new(StatusCode::OK, &headers, Bytes::from_static(b"first")),
        );
        cache.store(
            sig.clone(),
            CachedResponse::new(StatusCode::OK, &headers, Bytes::from_static(b"second")),
        );

        let stored = cache.lookup(&sig).expect("stored");
        assert_eq!(stored.body(), &Bytes::from_static(b"first"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn replay_restores_status_and_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        let cached = CachedResponse::new(StatusCode::OK, &headers, Bytes::from_static(b"{}"));

        let response = cached.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[axum::http::header::CONTENT_TYPE],
            "application/json"
        );
    }
}
