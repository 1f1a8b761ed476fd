use std::sync::Once;

use metrics::{Unit, describe_counter};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
///
/// Logs go to stderr; stdout carries command output.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .with_writer(std::io::stderr)
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer()
            .with_writer(std::io::stderr)
            .compact()
            .with_target(true)
            .boxed(),
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

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "roster_query_cache_hit_total",
            Unit::Count,
            "Total number of reads served from fresh cached data."
        );
        describe_counter!(
            "roster_query_cache_miss_total",
            Unit::Count,
            "Total number of reads that found no fresh cached data."
        );
        describe_counter!(
            "roster_query_fetch_total",
            Unit::Count,
            "Total number of loads started by the query cache."
        );
        describe_counter!(
            "roster_query_fetch_error_total",
            Unit::Count,
            "Total number of query cache loads that failed."
        );
        describe_counter!(
            "roster_query_invalidate_total",
            Unit::Count,
            "Total number of cache entries marked stale by invalidation."
        );
        describe_counter!(
            "roster_action_total",
            Unit::Count,
            "Total number of form actions handled, labelled by action and outcome."
        );
    });
}
