use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gie_core::Mode;
use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

/// Per-mode outcome counters for the classification pipeline.
#[derive(Debug, Default)]
pub struct AppMetrics {
    invalid_total: AtomicU64,
    primary_total: AtomicU64,
    fallback_total: AtomicU64,
    model_timeouts_total: AtomicU64,
    total_latency_millis: AtomicU64,
    max_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub invalid_total: u64,
    pub primary_total: u64,
    pub fallback_total: u64,
    pub model_timeouts_total: u64,
    pub avg_latency_millis: f64,
    pub max_latency_millis: u64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Counts one finished classification under the mode it ended in.
    pub fn record(&self, mode: Mode, elapsed: Duration) {
        let counter = match mode {
            Mode::Invalid => &self.invalid_total,
            Mode::Primary => &self.primary_total,
            Mode::Fallback => &self.fallback_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);

        let millis = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.total_latency_millis
            .fetch_add(millis, Ordering::Relaxed);
        self.max_latency_millis.fetch_max(millis, Ordering::Relaxed);
    }

    pub fn record_model_timeout(&self) {
        self.model_timeouts_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let invalid = self.invalid_total.load(Ordering::Relaxed);
        let primary = self.primary_total.load(Ordering::Relaxed);
        let fallback = self.fallback_total.load(Ordering::Relaxed);
        let requests = invalid + primary + fallback;
        let latency = self.total_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            requests_total: requests,
            invalid_total: invalid,
            primary_total: primary,
            fallback_total: fallback,
            model_timeouts_total: self.model_timeouts_total.load(Ordering::Relaxed),
            avg_latency_millis: if requests == 0 {
                0.0
            } else {
                latency as f64 / requests as f64
            },
            max_latency_millis: self.max_latency_millis.load(Ordering::Relaxed),
        }
    }
}

/// JSON logs on stderr, once per process. `RUST_LOG` wins; otherwise the
/// gie crates log at `default_level`.
pub fn init_tracing(service_name: &str, default_level: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(default_directives(service_name, default_level))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .with_current_span(true)
            .with_span_list(true)
            .init();
    });
}

fn default_directives(service_name: &str, default_level: &str) -> String {
    ["gie_api", "gie_pipeline", "gie_ml", "gie_core"]
        .into_iter()
        .filter(|name| *name != service_name)
        .chain([service_name])
        .map(|name| format!("{name}={default_level}"))
        .collect::<Vec<_>>()
        .join(",")
}
