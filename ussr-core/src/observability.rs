/*!
Observability infrastructure for USSR.

Structured logging is provided through `tracing`; `init_observability`
installs a subscriber for binaries and tests that want output. With the
`metrics` feature, transformer and handler activity is also counted in a
Prometheus registry.
*/

#[cfg(feature = "metrics")]
use prometheus::{Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry, TextEncoder};
#[cfg(feature = "metrics")]
use std::sync::OnceLock;
#[cfg(feature = "metrics")]
use std::time::Instant;
use tracing::subscriber::set_global_default;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry as TracingRegistry};

use crate::{Result, UssrError};

/// Filter applied when `RUST_LOG` is not set
pub const DEFAULT_LOG_FILTER: &str = "ussr_core=info";

/// Global metrics instance
#[cfg(feature = "metrics")]
static METRICS: OnceLock<UssrMetrics> = OnceLock::new();

/// Metrics collected for transformations and handler I/O
#[cfg(feature = "metrics")]
#[derive(Debug)]
pub struct UssrMetrics {
    pub transforms_total: IntCounterVec,
    pub transform_errors_total: IntCounterVec,
    pub handler_latency_seconds: HistogramVec,
    pub payload_size_bytes: Histogram,

    registry: Registry,
}

#[cfg(feature = "metrics")]
fn metric_error(name: &str, e: prometheus::Error) -> UssrError {
    UssrError::validation(format!("Failed to set up metric {name}: {e}"))
}

#[cfg(feature = "metrics")]
impl UssrMetrics {
    fn new() -> Result<Self> {
        let registry = Registry::new();

        let transforms_total = IntCounterVec::new(
            Opts::new("ussr_transforms_total", "Transformations applied to resources"),
            &["key", "direction"],
        )
        .map_err(|e| metric_error("ussr_transforms_total", e))?;

        let transform_errors_total = IntCounterVec::new(
            Opts::new(
                "ussr_transform_errors_total",
                "Transformations that failed to apply",
            ),
            &["key", "direction"],
        )
        .map_err(|e| metric_error("ussr_transform_errors_total", e))?;

        let handler_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "ussr_handler_latency_seconds",
                "Duration of handler save and load operations in seconds",
            ),
            &["kind", "operation"],
        )
        .map_err(|e| metric_error("ussr_handler_latency_seconds", e))?;

        let payload_size_bytes = Histogram::with_opts(HistogramOpts::new(
            "ussr_payload_size_bytes",
            "Size of payloads saved or loaded in bytes",
        ))
        .map_err(|e| metric_error("ussr_payload_size_bytes", e))?;

        registry
            .register(Box::new(transforms_total.clone()))
            .map_err(|e| metric_error("ussr_transforms_total", e))?;
        registry
            .register(Box::new(transform_errors_total.clone()))
            .map_err(|e| metric_error("ussr_transform_errors_total", e))?;
        registry
            .register(Box::new(handler_latency_seconds.clone()))
            .map_err(|e| metric_error("ussr_handler_latency_seconds", e))?;
        registry
            .register(Box::new(payload_size_bytes.clone()))
            .map_err(|e| metric_error("ussr_payload_size_bytes", e))?;

        Ok(Self {
            transforms_total,
            transform_errors_total,
            handler_latency_seconds,
            payload_size_bytes,
            registry,
        })
    }

    /// Get or initialize global metrics instance
    pub fn global() -> &'static UssrMetrics {
        METRICS.get_or_init(|| Self::new().expect("Failed to initialize USSR metrics"))
    }

    pub fn record_transform(&self, key: &str, direction: &str) {
        self.transforms_total
            .with_label_values(&[key, direction])
            .inc();
    }

    pub fn record_transform_error(&self, key: &str, direction: &str) {
        self.transform_errors_total
            .with_label_values(&[key, direction])
            .inc();
    }

    pub fn record_payload_size(&self, size_bytes: usize) {
        self.payload_size_bytes.observe(size_bytes as f64);
    }

    /// Gather metrics in Prometheus text format
    pub fn gather_metrics(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| metric_error("registry", e))?;

        String::from_utf8(buffer)
            .map_err(|e| UssrError::validation(format!("Metrics output is not UTF-8: {e}")))
    }
}

/// Measures the duration of one handler operation
#[cfg(feature = "metrics")]
pub struct MetricsTimer {
    start: Instant,
    kind: &'static str,
    operation: &'static str,
}

#[cfg(feature = "metrics")]
impl MetricsTimer {
    pub fn start(kind: &'static str, operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            kind,
            operation,
        }
    }

    pub fn finish(self) {
        UssrMetrics::global()
            .handler_latency_seconds
            .with_label_values(&[self.kind, self.operation])
            .observe(self.start.elapsed().as_secs_f64());
    }
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` overrides the default filter of [`DEFAULT_LOG_FILTER`]. With
/// `json` set, events are written as one JSON object per line.
pub fn init_observability(json: bool) -> Result<()> {
    #[cfg(feature = "metrics")]
    UssrMetrics::global();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let result = if json {
        let subscriber = TracingRegistry::default().with(filter).with(
            fmt::layer()
                .json()
                .with_target(false)
                .with_current_span(false),
        );
        set_global_default(subscriber)
    } else {
        let subscriber = TracingRegistry::default()
            .with(filter)
            .with(fmt::layer().with_target(false));
        set_global_default(subscriber)
    };

    result.map_err(|e| {
        UssrError::validation(format!("Failed to set global tracing subscriber: {e}"))
    })?;

    tracing::info!("USSR observability initialized");
    Ok(())
}

/// Initialize observability with plain text output
pub fn init_default_observability() -> Result<()> {
    init_observability(false)
}

#[cfg(all(test, feature = "metrics"))]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = UssrMetrics::global();

        metrics.record_transform("yaml", "forward");
        metrics.record_transform_error("yaml", "inverse");
        metrics.record_payload_size(1024);

        let timer = MetricsTimer::start("filesystem", "save");
        timer.finish();
    }

    #[test]
    fn test_metrics_gathering() {
        let metrics = UssrMetrics::global();
        metrics.record_transform("json", "forward");

        let text = metrics.gather_metrics().unwrap();
        assert!(text.contains("ussr_transforms_total"));
    }
}
