//! HTTP server for Prometheus metrics endpoint.

use std::net::SocketAddr;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

use crate::collector::{CollectorState, SharedCollector};
use crate::exposition::CONTENT_TYPE;

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Failed to bind to {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Application state shared across handlers.
#[derive(Clone)]
struct AppState {
    collector: SharedCollector,
}

/// Create the HTTP router.
pub fn create_router(collector: SharedCollector, metrics_path: &str) -> Router {
    let state = AppState { collector };

    Router::new()
        .route(metrics_path, get(metrics_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handler for the metrics endpoint.
async fn metrics_handler(State(state): State<AppState>) -> Response {
    // The source does blocking file I/O
    let collector = state.collector.clone();
    let rendered = tokio::task::spawn_blocking(move || collector.render()).await;

    match rendered {
        Ok(Ok(body)) => (StatusCode::OK, [("content-type", CONTENT_TYPE)], body).into_response(),
        Ok(Err(e)) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("scrape failed: {}\n", e),
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "Scrape task failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "scrape failed: internal error\n",
            )
                .into_response()
        }
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> Response {
    (StatusCode::OK, "healthy\n").into_response()
}

/// Handler for the /ready endpoint.
async fn ready_handler(State(state): State<AppState>) -> Response {
    match state.collector.state() {
        CollectorState::Ready => (StatusCode::OK, "ready\n").into_response(),
        other => (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("not ready - hardware source {}\n", other),
        )
            .into_response(),
    }
}

/// HTTP server with a bound listener.
pub struct HttpServer {
    collector: SharedCollector,
    listener: TcpListener,
    metrics_path: String,
}

impl HttpServer {
    /// Bind the listen address. Failing to bind is reported before any
    /// request is served.
    pub async fn bind(
        collector: SharedCollector,
        listen_addr: SocketAddr,
        metrics_path: String,
    ) -> Result<Self, HttpError> {
        let listener = TcpListener::bind(listen_addr)
            .await
            .map_err(|source| HttpError::Bind {
                addr: listen_addr,
                source,
            })?;

        Ok(Self {
            collector,
            listener,
            metrics_path,
        })
    }

    /// The address actually bound (useful with port 0).
    pub fn local_addr(&self) -> Result<SocketAddr, HttpError> {
        self.listener.local_addr().map_err(HttpError::Serve)
    }

    /// Run the HTTP server until the shutdown signal is received.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) -> Result<(), HttpError> {
        let router = create_router(self.collector, &self.metrics_path);

        if let Ok(addr) = self.listener.local_addr() {
            info!(
                addr = %addr,
                path = %self.metrics_path,
                "HTTP server listening"
            );
        }

        // Run server with graceful shutdown
        axum::serve(self.listener, router)
            .with_graceful_shutdown(async move {
                loop {
                    if shutdown.changed().await.is_err() {
                        break;
                    }
                    if *shutdown.borrow() {
                        break;
                    }
                }
                info!("HTTP server shutting down");
            })
            .await
            .map_err(HttpError::Serve)?;

        info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Collector;
    use crate::identity::HostIdentity;
    use axum::body::Body;
    use axum::http::Request;
    use jetson_stats::MockSource;
    use jetson_stats::mock::orin_snapshot;
    use std::sync::Arc;
    use std::time::Duration;
    use tower::ServiceExt;

    fn make_collector(handle: &MockSource) -> SharedCollector {
        Arc::new(Collector::new(
            handle.clone(),
            HostIdentity::new("nvidia", "orin-01"),
            Duration::from_millis(100),
        ))
    }

    fn connected_collector() -> (MockSource, SharedCollector) {
        let handle = MockSource::new(orin_snapshot());
        let collector = make_collector(&handle);
        collector.connect().unwrap();
        (handle, collector)
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let (_handle, collector) = connected_collector();
        let router = create_router(collector, "/metrics");

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let content_type = response.headers().get("content-type").unwrap();
        assert!(content_type.to_str().unwrap().contains("text/plain"));

        let body = body_string(response).await;
        assert!(body.contains("# TYPE jetson_usage_fan gauge"));
        assert!(body.contains("jetson_usage_fan{fan=\"speed\"} 40"));
    }

    #[tokio::test]
    async fn test_metrics_not_ready_is_empty() {
        let (handle, collector) = connected_collector();
        handle.set_ready(false);
        let router = create_router(collector, "/metrics");

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "");
    }

    #[tokio::test]
    async fn test_metrics_malformed_snapshot() {
        let (handle, collector) = connected_collector();
        let mut snapshot = orin_snapshot();
        snapshot.fan_speed.clear();
        handle.set_snapshot(snapshot);
        let router = create_router(collector, "/metrics");

        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_string(response).await.contains("fan speed"));
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let handle = MockSource::new(orin_snapshot());
        let router = create_router(make_collector(&handle), "/metrics");

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_endpoint_not_ready() {
        let handle = MockSource::new(orin_snapshot());
        let router = create_router(make_collector(&handle), "/metrics");

        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        // Not ready because the source was never connected
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_ready_endpoint_ready() {
        let (_handle, collector) = connected_collector();
        let router = create_router(collector, "/metrics");

        let response = router
            .oneshot(Request::get("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_custom_metrics_path() {
        let (_handle, collector) = connected_collector();
        let router = create_router(collector, "/jetson/metrics");

        // Custom path should work
        let response = router
            .clone()
            .oneshot(Request::get("/jetson/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // Default path should 404
        let response = router
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bind_conflict() {
        let (_handle, collector) = connected_collector();
        let first = HttpServer::bind(
            collector.clone(),
            "127.0.0.1:0".parse().unwrap(),
            "/metrics".to_string(),
        )
        .await
        .unwrap();
        let addr = first.local_addr().unwrap();

        let second = HttpServer::bind(collector, addr, "/metrics".to_string()).await;

        assert!(matches!(second, Err(HttpError::Bind { .. })));
    }
}
