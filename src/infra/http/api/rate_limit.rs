//! Per-route sliding window rate limiting with temporary bans.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::{DashMap, mapref::entry::Entry};

use crate::config::RoutePolicySettings;

pub const METRIC_RATE_LIMIT_REJECTED: &str = "blogwire_rate_limit_rejected_total";

/// Longest window or ban a policy can hold.
pub const MAX_POLICY_SPAN: Duration = Duration::from_secs(365 * 24 * 60 * 60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window: Duration,
    pub ban: Duration,
}

impl RateLimitPolicy {
    /// A policy whose counting window is as long as its ban.
    pub fn per_minutes(max_requests: u32, banned_minutes: u64) -> Self {
        let span = Duration::from_secs(banned_minutes.saturating_mul(60)).min(MAX_POLICY_SPAN);
        Self {
            max_requests,
            window: span,
            ban: span,
        }
    }
}

impl From<RoutePolicySettings> for RateLimitPolicy {
    fn from(settings: RoutePolicySettings) -> Self {
        Self {
            max_requests: settings.max_requests.get(),
            window: settings.window.min(MAX_POLICY_SPAN),
            ban: settings.ban.min(MAX_POLICY_SPAN),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { count: u32 },
    /// This request crossed the ceiling and started a ban.
    Limited { ban: Duration },
    /// A ban from an earlier request is still running.
    Banned { remaining: Duration },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed { .. })
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::Allowed { .. } => "allowed",
            Self::Limited { .. } => "limited",
            Self::Banned { .. } => "banned",
        }
    }

    /// Client-facing text for a rejection, `None` when the request may proceed.
    pub fn rejection_message(&self) -> Option<String> {
        match self {
            Self::Allowed { .. } => None,
            Self::Limited { .. } => {
                Some("You have exceeded the request limit on this route.".to_string())
            }
            Self::Banned { remaining } => Some(format!(
                "You have been temporarily banned. Try again after {} minute(s).",
                whole_minutes(*remaining)
            )),
        }
    }
}

fn ban_deadline(now: Instant, ban: Duration) -> Instant {
    now.checked_add(ban)
        .or_else(|| now.checked_add(MAX_POLICY_SPAN))
        .unwrap_or(now)
}

fn whole_minutes(duration: Duration) -> u64 {
    duration.as_secs().div_ceil(60).max(1)
}

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    request_count: u32,
    window_start: Instant,
    banned_until: Option<Instant>,
}

impl RateLimitEntry {
    fn fresh(now: Instant) -> Self {
        Self {
            request_count: 1,
            window_start: now,
            banned_until: None,
        }
    }
}

/// Request book for one route, keyed by client address.
#[derive(Debug, Clone)]
pub struct SlidingWindowRateLimiter {
    policy: RateLimitPolicy,
    book: Arc<DashMap<String, RateLimitEntry>>,
}

impl SlidingWindowRateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            book: Arc::new(DashMap::new()),
        }
    }

    pub fn policy(&self) -> RateLimitPolicy {
        self.policy
    }

    pub fn check(&self, addr: &str) -> RateDecision {
        self.check_at(addr, Instant::now())
    }

    /// Record a request from `addr` at `now` and decide whether it may proceed.
    pub fn check_at(&self, addr: &str, now: Instant) -> RateDecision {
        let mut entry = match self.book.entry(addr.to_string()) {
            Entry::Occupied(entry) => entry.into_ref(),
            Entry::Vacant(entry) => {
                entry.insert(RateLimitEntry::fresh(now));
                return RateDecision::Allowed { count: 1 };
            }
        };

        if let Some(until) = entry.banned_until {
            if now < until {
                return RateDecision::Banned {
                    remaining: until - now,
                };
            }
            *entry = RateLimitEntry::fresh(now);
            return RateDecision::Allowed { count: 1 };
        }

        if now.duration_since(entry.window_start) > self.policy.window {
            *entry = RateLimitEntry::fresh(now);
            return RateDecision::Allowed { count: 1 };
        }

        entry.request_count = entry.request_count.saturating_add(1);
        if entry.request_count > self.policy.max_requests {
            entry.banned_until = Some(ban_deadline(now, self.policy.ban));
            return RateDecision::Limited {
                ban: self.policy.ban,
            };
        }

        RateDecision::Allowed {
            count: entry.request_count,
        }
    }

    pub fn tracked_addresses(&self) -> usize {
        self.book.len()
    }
}
