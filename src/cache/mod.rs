//! Adaptive per-route query cache.
//!
//! Each decorated route owns a [`QueryCache`]. A request's query parameters are
//! reduced to a [`QuerySignature`]; once a signature has been observed
//! `threshold` times its response is stored and replayed for every later
//! request with the same signature. Stored responses are never refreshed.

mod middleware;
mod signature;
mod store;

pub use middleware::{CacheOutcome, QueryCacheState, query_cache_layer};
pub use signature::QuerySignature;
pub use store::{CachedResponse, Observation, QueryCache};

pub const METRIC_QUERY_CACHE_HIT: &str = "blogwire_query_cache_hit_total";
pub const METRIC_QUERY_CACHE_STORE: &str = "blogwire_query_cache_store_total";
pub const METRIC_QUERY_CACHE_BYPASS: &str = "blogwire_query_cache_bypass_total";
