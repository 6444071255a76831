//! Caller side of the telemetry push: a bounded-timeout POST whose failures
//! are typed and logged but never reach the serving path.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::telemetry::Observation;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("telemetry client could not be built: {0}")]
    Build(String),
    #[error("telemetry push to {endpoint} timed out after {timeout:?}")]
    Timeout { endpoint: String, timeout: Duration },
    #[error("telemetry endpoint {endpoint} unreachable: {message}")]
    Connect { endpoint: String, message: String },
    #[error("telemetry endpoint {endpoint} answered {status}")]
    Status { endpoint: String, status: StatusCode },
    #[error("telemetry push to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },
}

#[derive(Debug, Clone)]
pub struct TelemetryClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl TelemetryClient {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .user_agent(concat!("sidecar-monitor/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(|err| TransportError::Build(err.to_string()))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// One awaited push. Any non-2xx answer is an error.
    pub async fn push(&self, observation: &Observation) -> Result<(), TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(observation)
            .send()
            .await
            .map_err(|err| self.classify(err))?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                endpoint: self.endpoint.clone(),
                status,
            });
        }
        debug!("telemetry pushed to {}", self.endpoint);
        Ok(())
    }

    /// Spawns the push and returns at once. Failures are logged, never returned.
    pub fn push_detached(&self, observation: Observation) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            if let Err(err) = client.push(&observation).await {
                warn!("dropped telemetry event: {err}");
            }
        })
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        let endpoint = self.endpoint.clone();
        if err.is_timeout() {
            TransportError::Timeout {
                endpoint,
                timeout: self.timeout,
            }
        } else if err.is_connect() {
            TransportError::Connect {
                endpoint,
                message: err.to_string(),
            }
        } else {
            TransportError::Request {
                endpoint,
                message: err.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;

    use crate::client::{TelemetryClient, TransportError};
    use crate::scoring::Label;
    use crate::telemetry::Observation;

    fn observation() -> Observation {
        Observation {
            features: vec![5000.0, 20000.0, 1.0],
            prediction: Label::Positive,
            actual: None,
        }
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("addr");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve");
        });
        format!("http://{addr}/track")
    }

    #[tokio::test]
    async fn refused_connection_is_a_typed_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);

        let client = TelemetryClient::new(format!("http://{addr}/track"), Duration::from_millis(500))
            .expect("client");
        let err = client.push(&observation()).await.unwrap_err();
        assert!(
            matches!(err, TransportError::Connect { .. } | TransportError::Request { .. }),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn slow_endpoint_times_out() {
        let app = Router::new().route(
            "/track",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::OK
            }),
        );
        let endpoint = serve(app).await;
        let client = TelemetryClient::new(endpoint, Duration::from_millis(100)).expect("client");
        let err = client.push(&observation()).await.unwrap_err();
        assert!(matches!(err, TransportError::Timeout { .. }), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn rejected_push_reports_status() {
        let app = Router::new().route("/track", post(|| async { StatusCode::BAD_REQUEST }));
        let endpoint = serve(app).await;
        let client = TelemetryClient::new(endpoint, Duration::from_millis(500)).expect("client");
        match client.push(&observation()).await {
            Err(TransportError::Status { status, .. }) => {
                assert_eq!(status.as_u16(), 400)
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn detached_push_swallows_failures() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let client = TelemetryClient::new(format!("http://{addr}/track"), Duration::from_millis(200))
            .expect("client");
        tokio_test::assert_ok!(client.push_detached(observation()).await);
    }
}
