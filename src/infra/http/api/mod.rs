//! Versioned read API.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod rate_limit;
pub mod state;

pub use state::ApiState;

use std::sync::Arc;

use axum::{Router, middleware as axum_middleware, routing::get};

use crate::cache::{QueryCache, QueryCacheState, query_cache_layer};
use crate::config::Settings;

use rate_limit::{RateLimitPolicy, SlidingWindowRateLimiter};

/// Per-route guards. Every guarded route owns its own limiter, so traffic on
/// one route never counts against another.
#[derive(Clone)]
pub struct RouteGuards {
    pub search_limiter: SlidingWindowRateLimiter,
    pub search_cache: QueryCacheState,
    pub users_limiter: SlidingWindowRateLimiter,
    pub comments_limiter: SlidingWindowRateLimiter,
    pub reply_listing_limiter: SlidingWindowRateLimiter,
    pub reply_threads_limiter: SlidingWindowRateLimiter,
}

impl RouteGuards {
    pub fn new(
        search: RateLimitPolicy,
        listings: RateLimitPolicy,
        search_cache: QueryCacheState,
    ) -> Self {
        Self {
            search_limiter: SlidingWindowRateLimiter::new(search),
            search_cache,
            users_limiter: SlidingWindowRateLimiter::new(listings),
            comments_limiter: SlidingWindowRateLimiter::new(listings),
            reply_listing_limiter: SlidingWindowRateLimiter::new(listings),
            reply_threads_limiter: SlidingWindowRateLimiter::new(listings),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let cache = &settings.query_cache;
        Self::new(
            settings.rate_limit.search.into(),
            settings.rate_limit.listings.into(),
            QueryCacheState::new(
                Arc::new(QueryCache::new(cache.threshold)),
                cache.enabled,
                cache.body_limit_bytes.get(),
            ),
        )
    }
}

pub fn build_api_router(guards: RouteGuards) -> Router<ApiState> {
    Router::new()
        .route("/v1", get(handlers::home))
        .route("/v1/", get(handlers::home))
        .route("/v1/blogs", get(handlers::list_blogs))
        .route(
            "/v1/search",
            get(handlers::search_blogs)
                .layer(axum_middleware::from_fn_with_state(
                    guards.search_cache,
                    query_cache_layer,
                ))
                .layer(axum_middleware::from_fn_with_state(
                    guards.search_limiter,
                    middleware::rate_limit_layer,
                )),
        )
        .route(
            "/v1/view-users",
            get(handlers::view_users).layer(axum_middleware::from_fn_with_state(
                guards.users_limiter,
                middleware::rate_limit_layer,
            )),
        )
        .route(
            "/v1/view-comment",
            get(handlers::view_comments).layer(axum_middleware::from_fn_with_state(
                guards.comments_limiter,
                middleware::rate_limit_layer,
            )),
        )
        .route(
            "/v1/view-reply",
            get(handlers::view_reply_listing).layer(axum_middleware::from_fn_with_state(
                guards.reply_listing_limiter,
                middleware::rate_limit_layer,
            )),
        )
        .route(
            "/v1/view-replies",
            get(handlers::view_reply_threads).layer(axum_middleware::from_fn_with_state(
                guards.reply_threads_limiter,
                middleware::rate_limit_layer,
            )),
        )
        .route("/v1/comments/{id}/replies", get(handlers::comment_replies))
}
