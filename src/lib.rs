//! Read API for a blogging service: blogs with nested comment and reply
//! threads, like tallies, an adaptive query cache and per-route rate limits.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
