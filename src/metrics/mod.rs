//! Process-wide exported state, constructed once at startup and passed to
//! every writer. Each value is an atomic Prometheus collector, so a scrape
//! never observes a torn value.

use std::string::FromUtf8Error;
use std::sync::Arc;

use prometheus::{
    Encoder, Gauge, IntCounter, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder,
};
use thiserror::Error;

use crate::drift::DriftScore;
use crate::resources::ResourceSnapshot;
use crate::scoring::{Label, MetricSnapshot, Outcome};

pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4";

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error(transparent)]
    Prometheus(#[from] prometheus::Error),
    #[error("metrics exposition is not valid UTF-8: {0}")]
    Utf8(#[from] FromUtf8Error),
}

#[derive(Clone)]
pub struct MetricsRegistry {
    inner: Arc<Collectors>,
}

struct Collectors {
    registry: Registry,
    drift_score: Gauge,
    precision: Gauge,
    recall: Gauge,
    f1: Gauge,
    confusion: IntGaugeVec,
    predictions_total: IntCounter,
    labelled_total: IntCounter,
    prediction_value: IntGauge,
    rejected_total: IntCounter,
    cpu_percent: Gauge,
    memory_bytes: Gauge,
    memory_percent: Gauge,
    disk_percent: Gauge,
    sampler_errors_total: IntCounter,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let drift_score = Gauge::new("model_drift_score", "Data drift score using KS Test")?;
        let precision = Gauge::new("model_precision_score", "Real-time Precision")?;
        let recall = Gauge::new("model_recall_score", "Real-time Recall")?;
        let f1 = Gauge::new("model_f1_score", "Real-time model F1-Score")?;
        let confusion = IntGaugeVec::new(
            Opts::new(
                "model_confusion_matrix",
                "Running confusion matrix counts by cell",
            ),
            &["cell"],
        )?;
        let predictions_total = IntCounter::new("predictions_total", "Total predictions tracked")?;
        let labelled_total = IntCounter::new(
            "predictions_labelled_total",
            "Tracked predictions that carried ground truth",
        )?;
        let prediction_value =
            IntGauge::new("model_prediction_value", "Last prediction result")?;
        let rejected_total = IntCounter::new(
            "telemetry_rejected_total",
            "Track payloads rejected as malformed",
        )?;
        let cpu_percent = Gauge::new("system_cpu_usage_percent", "CPU usage percentage")?;
        let memory_bytes = Gauge::new("system_memory_usage_bytes", "Memory usage in bytes")?;
        let memory_percent =
            Gauge::new("system_memory_usage_percent", "Memory usage percentage")?;
        let disk_percent = Gauge::new("system_disk_usage_percent", "Disk usage percentage")?;
        let sampler_errors_total = IntCounter::new(
            "sampler_errors_total",
            "Resource sampler ticks skipped after a failed read",
        )?;

        registry.register(Box::new(drift_score.clone()))?;
        registry.register(Box::new(precision.clone()))?;
        registry.register(Box::new(recall.clone()))?;
        registry.register(Box::new(f1.clone()))?;
        registry.register(Box::new(confusion.clone()))?;
        registry.register(Box::new(predictions_total.clone()))?;
        registry.register(Box::new(labelled_total.clone()))?;
        registry.register(Box::new(prediction_value.clone()))?;
        registry.register(Box::new(rejected_total.clone()))?;
        registry.register(Box::new(cpu_percent.clone()))?;
        registry.register(Box::new(memory_bytes.clone()))?;
        registry.register(Box::new(memory_percent.clone()))?;
        registry.register(Box::new(disk_percent.clone()))?;
        registry.register(Box::new(sampler_errors_total.clone()))?;

        // Materialise every cell so dashboards see zeros before the first label.
        for outcome in Outcome::ALL {
            confusion.with_label_values(&[outcome.as_slug()]).set(0);
        }

        Ok(Self {
            inner: Arc::new(Collectors {
                registry,
                drift_score,
                precision,
                recall,
                f1,
                confusion,
                predictions_total,
                labelled_total,
                prediction_value,
                rejected_total,
                cpu_percent,
                memory_bytes,
                memory_percent,
                disk_percent,
                sampler_errors_total,
            }),
        })
    }

    pub fn set_drift_score(&self, score: DriftScore) {
        self.inner.drift_score.set(score.value());
    }

    pub fn set_prediction(&self, predicted: Label) {
        self.inner.prediction_value.set(i64::from(predicted.as_u8()));
    }

    /// Publishes one scorer update: bumps the volume counter and, when ground
    /// truth was present, the labelled counter and the derived gauges.
    pub fn publish_scores(&self, outcome: Option<Outcome>, snapshot: &MetricSnapshot) {
        self.inner.predictions_total.inc();
        let Some(outcome) = outcome else {
            return;
        };
        self.inner.labelled_total.inc();
        self.inner
            .confusion
            .with_label_values(&[outcome.as_slug()])
            .set(to_i64(snapshot.confusion.count(outcome)));
        self.inner.precision.set(snapshot.precision);
        self.inner.recall.set(snapshot.recall);
        self.inner.f1.set(snapshot.f1);
    }

    pub fn record_rejected(&self) {
        self.inner.rejected_total.inc();
    }

    pub fn record_resources(&self, snapshot: &ResourceSnapshot) {
        self.inner.cpu_percent.set(snapshot.cpu_percent);
        self.inner.memory_bytes.set(snapshot.memory_used_bytes as f64);
        self.inner.memory_percent.set(snapshot.memory_percent);
        self.inner.disk_percent.set(snapshot.disk_percent);
    }

    pub fn record_sampler_error(&self) {
        self.inner.sampler_errors_total.inc();
    }

    pub fn drift_score(&self) -> f64 {
        self.inner.drift_score.get()
    }

    pub fn predictions_total(&self) -> u64 {
        self.inner.predictions_total.get()
    }

    pub fn labelled_total(&self) -> u64 {
        self.inner.labelled_total.get()
    }

    pub fn rejected_total(&self) -> u64 {
        self.inner.rejected_total.get()
    }

    pub fn sampler_errors_total(&self) -> u64 {
        self.inner.sampler_errors_total.get()
    }

    pub fn cpu_percent(&self) -> f64 {
        self.inner.cpu_percent.get()
    }

    /// Renders every registered collector in the Prometheus text format.
    pub fn render(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
