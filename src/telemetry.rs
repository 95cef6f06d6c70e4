use std::{path::Path, time::Duration};

use anyhow::Context;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{SpanExporter, WithExportConfig};
use opentelemetry_sdk::{Resource, trace::SdkTracerProvider};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Registry, filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

const SERVICE_NAME: &str = "stop_editor";

/// Flushes the log file and the span exporter when dropped
pub struct TelemetryGuard {
    _appender: WorkerGuard,
    provider: Option<SdkTracerProvider>,
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Some(provider) = self.provider.take() {
            _ = provider.shutdown();
        }
    }
}

/// Logs go to a daily rolling file in `log_dir`, spans to OTLP_ENDPOINT when it is set
pub fn init_tracing(log_dir: &Path) -> Result<TelemetryGuard, anyhow::Error> {
    let provider = match dotenvy::var("OTLP_ENDPOINT") {
        Ok(endpoint) => Some(tracer_provider(endpoint)?),
        Err(_) => None,
    };

    let telemetry_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(SERVICE_NAME)));

    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    let appender = tracing_appender::rolling::daily(log_dir, "stop_editor.log");
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(appender);

    // stdout belongs to the shell, so events only go to the file
    let file_log = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_appender)
        .with_ansi(false)
        .pretty();

    Registry::default()
        .with(telemetry_layer)
        .with(file_log)
        .with(env_filter)
        .try_init()
        .context("Couldn't install the tracing subscriber")?;

    Ok(TelemetryGuard {
        _appender: guard,
        provider,
    })
}

fn tracer_provider(endpoint: String) -> Result<SdkTracerProvider, anyhow::Error> {
    let exporter = SpanExporter::builder()
        .with_tonic()
        .with_timeout(Duration::from_millis(1000))
        .with_endpoint(endpoint)
        .build()
        .context("Couldn't build the OTLP span exporter")?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(Resource::builder().with_service_name(SERVICE_NAME).build())
        .build())
}
