use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::baseline::store::BaselineStore;
use crate::config::Config;
use crate::drift::detector::DriftDetector;
use crate::drift::DriftScore;
use crate::metrics::{MetricsRegistry, CONTENT_TYPE};
use crate::resources::probe::SystemProbe;
use crate::resources::sampler::spawn_sampler;
use crate::resources::ResourceSnapshot;
use crate::scoring::MetricSnapshot;
use crate::telemetry::receiver::TelemetryReceiver;

#[derive(Clone)]
pub struct ApiState {
    config: Arc<Config>,
    receiver: Arc<TelemetryReceiver>,
    resources: watch::Receiver<Option<ResourceSnapshot>>,
}

impl ApiState {
    pub fn new(
        config: Config,
        receiver: Arc<TelemetryReceiver>,
        resources: watch::Receiver<Option<ResourceSnapshot>>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            receiver,
            resources,
        }
    }
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    fn internal(error: impl std::fmt::Display) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

#[derive(Debug, Serialize)]
struct TrackResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct SnapshotResponse {
    drift_score: DriftScore,
    classification: MetricSnapshot,
    resources: Option<ResourceSnapshot>,
    rejected_payloads: u64,
}

/// Loads the baseline and wires the receiver. A baseline that cannot be
/// loaded or lacks the tracked column aborts startup.
pub fn build_receiver(config: &Config, registry: MetricsRegistry) -> Result<TelemetryReceiver> {
    let baseline_path = config.resolved_baseline_path();
    let store = BaselineStore::load(&baseline_path)
        .with_context(|| format!("cannot start without a baseline ({})", baseline_path.display()))?;
    let column = config.drift_column();
    let detector = DriftDetector::new(&store, column.clone(), config.drift.column_index)
        .with_context(|| format!("baseline has no usable drift column {column}"))?;
    info!(
        "tracking drift on baseline column {column} / feature index {}",
        detector.feature_index()
    );
    Ok(TelemetryReceiver::new(detector, registry))
}

pub fn router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET]);

    Router::new()
        .route("/track", post(track))
        .route("/metrics", get(scrape_metrics))
        .route("/health", get(health))
        .route("/v1/snapshot", get(snapshot))
        .route("/v1/config", get(show_config))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let registry = MetricsRegistry::new().context("failed building metrics registry")?;
    let receiver = Arc::new(build_receiver(&config, registry.clone())?);
    let sampler = spawn_sampler(
        SystemProbe::new(&config.sampler.disk_mount),
        registry,
        config.sampler_interval(),
    );
    let state = ApiState::new(config, receiver, sampler.latest());

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {bind}"))?;
    info!("telemetry sidecar listening on http://{bind}");
    let served = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sampler.shutdown().await;
    served.context("HTTP server failed")
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("failed listening for shutdown signal: {err}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

async fn track(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<Value>, JsonRejection>,
) -> std::result::Result<Json<TrackResponse>, ApiError> {
    let Json(payload) = payload
        .map_err(|rejection| state.receiver.record_invalid_body(rejection.body_text()))
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    state
        .receiver
        .track_value(&payload)
        .map_err(|err| ApiError::bad_request(err.to_string()))?;
    Ok(Json(TrackResponse { status: "tracked" }))
}

async fn scrape_metrics(State(state): State<ApiState>) -> Response {
    match state.receiver.registry().render() {
        Ok(body) => (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response(),
        Err(err) => ApiError::internal(format!("error rendering metrics: {err}")).into_response(),
    }
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse { status: "ok" })
}

async fn snapshot(State(state): State<ApiState>) -> Json<ApiResponse<SnapshotResponse>> {
    let resources = state.resources.borrow().clone();
    ok(SnapshotResponse {
        drift_score: state.receiver.drift_score(),
        classification: state.receiver.snapshot(),
        resources,
        rejected_payloads: state.receiver.registry().rejected_total(),
    })
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config.as_ref().clone())
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}
