//! Logging and metrics setup

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use voice_orchestrator_config::Settings;

/// Install the global subscriber, writing to stderr
///
/// `RUST_LOG` wins over the configured level when set.
pub fn init_tracing(config: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("voice_orchestrator={}", level).into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .boxed()
    };
    subscriber.with(fmt_layer).init();
}

/// Start the Prometheus exporter when enabled
pub fn init_metrics(config: &Settings) -> anyhow::Result<Option<SocketAddr>> {
    if !config.observability.metrics_enabled {
        return Ok(None);
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], config.observability.prometheus_port));
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    Ok(Some(addr))
}
