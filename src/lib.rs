//! Observability sidecar for a deployed binary classifier.
//!
//! Inference services push one [`telemetry::Observation`] per prediction to
//! `POST /track`; the sidecar scores input drift against a stored baseline,
//! folds ground truth into a running confusion matrix, samples host
//! resources in the background, and exposes everything on `GET /metrics`.

pub mod baseline;
pub mod client;
pub mod config;
pub mod drift;
pub mod metrics;
pub mod output;
pub mod resources;
pub mod scoring;
pub mod server;
pub mod telemetry;
