use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::cache::{METRIC_QUERY_CACHE_BYPASS, METRIC_QUERY_CACHE_HIT, METRIC_QUERY_CACHE_STORE};
use crate::config::{LogFormat, LoggingSettings};
use crate::infra::http::METRIC_RATE_LIMIT_REJECTED;

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

pub fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_QUERY_CACHE_HIT,
            Unit::Count,
            "Requests answered from a stored query response."
        );
        describe_counter!(
            METRIC_QUERY_CACHE_STORE,
            Unit::Count,
            "Query responses stored after reaching the observation threshold."
        );
        describe_counter!(
            METRIC_QUERY_CACHE_BYPASS,
            Unit::Count,
            "Requests without query parameters that skipped the query cache."
        );
        describe_counter!(
            METRIC_RATE_LIMIT_REJECTED,
            Unit::Count,
            "Requests rejected by a route rate limiter, labelled by reason."
        );
    });
}
