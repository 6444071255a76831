use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::drift::detector::DriftDetector;
use crate::drift::DriftScore;
use crate::metrics::MetricsRegistry;
use crate::scoring::scorer::ClassificationScorer;
use crate::scoring::MetricSnapshot;
use crate::telemetry::payload::parse_observation;
use crate::telemetry::{InvalidPayloadError, Observation};

#[derive(Debug, Clone, Serialize)]
pub struct TrackAck {
    pub drift_score: DriftScore,
    pub metrics: MetricSnapshot,
}

/// The single mutation entry point for drift and classification state.
pub struct TelemetryReceiver {
    detector: DriftDetector,
    scorer: ClassificationScorer,
    registry: MetricsRegistry,
}

impl TelemetryReceiver {
    pub fn new(detector: DriftDetector, registry: MetricsRegistry) -> Self {
        Self {
            detector,
            scorer: ClassificationScorer::new(),
            registry,
        }
    }

    /// Validates a raw body and tracks it. Rejections leave every counter
    /// except `telemetry_rejected_total` untouched.
    pub fn track_value(&self, payload: &Value) -> Result<TrackAck, InvalidPayloadError> {
        let observation = parse_observation(payload).map_err(|err| self.reject(err))?;
        self.track(observation)
    }

    pub fn track(&self, observation: Observation) -> Result<TrackAck, InvalidPayloadError> {
        let Some(value) = self.detector.tracked_value(&observation.features) else {
            return Err(self.reject(InvalidPayloadError::MissingTrackedFeature {
                index: self.detector.feature_index(),
                len: observation.features.len(),
            }));
        };

        let drift_score = self.detector.score(&[value]);
        self.registry.set_drift_score(drift_score);
        self.registry.set_prediction(observation.prediction);

        let metrics = self.scorer.record_with(
            observation.prediction,
            observation.actual,
            |outcome, snapshot| self.registry.publish_scores(outcome, snapshot),
        );
        debug!(
            drift = drift_score.value(),
            f1 = metrics.f1,
            predictions = metrics.predictions,
            "tracked observation"
        );

        Ok(TrackAck {
            drift_score,
            metrics,
        })
    }

    pub fn record_invalid_body(&self, message: impl Into<String>) -> InvalidPayloadError {
        self.reject(InvalidPayloadError::Body(message.into()))
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        self.scorer.snapshot()
    }

    pub fn drift_score(&self) -> DriftScore {
        DriftScore::new(self.registry.drift_score())
    }

    pub fn detector(&self) -> &DriftDetector {
        &self.detector
    }

    pub fn registry(&self) -> &MetricsRegistry {
        &self.registry
    }

    fn reject(&self, err: InvalidPayloadError) -> InvalidPayloadError {
        self.registry.record_rejected();
        warn!("rejected track payload: {err}");
        err
    }
}
