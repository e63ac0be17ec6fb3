//! HTTP server for health and metrics endpoints.

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use s2k_core::health::{ComponentStatus, HealthCheck, HealthStatus};
use s2k_core::metrics::IngestionMetrics;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};

/// Shared state for HTTP endpoints.
pub struct ServerState {
    pub health: Arc<HealthCheck>,
    pub metrics: Arc<IngestionMetrics>,
}

/// Health response structure.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub running: bool,
    pub components: std::collections::HashMap<String, ComponentStatusResponse>,
}

/// Component status response.
#[derive(Debug, Serialize)]
pub struct ComponentStatusResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl From<&ComponentStatus> for ComponentStatusResponse {
    fn from(status: &ComponentStatus) -> Self {
        match status {
            ComponentStatus::Healthy => ComponentStatusResponse {
                status: "healthy".to_string(),
                message: None,
            },
            ComponentStatus::Degraded(msg) => ComponentStatusResponse {
                status: "degraded".to_string(),
                message: Some(msg.clone()),
            },
            ComponentStatus::Unhealthy(msg) => ComponentStatusResponse {
                status: "unhealthy".to_string(),
                message: Some(msg.clone()),
            },
            ComponentStatus::Unknown => ComponentStatusResponse {
                status: "unknown".to_string(),
                message: None,
            },
        }
    }
}

/// Start the HTTP servers for health and metrics.
pub async fn start_server(
    state: Arc<ServerState>,
    health_port: u16,
    metrics_port: u16,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let health_state = Arc::clone(&state);
    let health_addr = SocketAddr::from(([0, 0, 0, 0], health_port));
    let health_router = Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .with_state(health_state);

    let health_listener = match tokio::net::TcpListener::bind(health_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, port = health_port, "Failed to bind health server");
            return;
        }
    };

    info!(port = health_port, "Health server started");

    let metrics_state = Arc::clone(&state);
    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], metrics_port));
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_state);

    let metrics_listener = match tokio::net::TcpListener::bind(metrics_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, port = metrics_port, "Failed to bind metrics server");
            return;
        }
    };

    info!(port = metrics_port, "Metrics server started");

    let health_server = async {
        axum::serve(health_listener, health_router)
            .await
            .map_err(|e| error!(error = %e, "Health server error"))
    };

    let metrics_server = async {
        axum::serve(metrics_listener, metrics_router)
            .await
            .map_err(|e| error!(error = %e, "Metrics server error"))
    };

    tokio::select! {
        _ = health_server => {}
        _ = metrics_server => {}
        _ = shutdown_rx.wait_for(|stop| *stop) => {
            info!("HTTP servers shutting down");
        }
    }
}

/// Health endpoint handler.
async fn health_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let overall = state.health.overall_status();
    let statuses = state.health.all_statuses();

    let components: std::collections::HashMap<String, ComponentStatusResponse> = statuses
        .iter()
        .map(|(k, v)| (k.clone(), ComponentStatusResponse::from(v)))
        .collect();

    let status_str = match overall {
        HealthStatus::Healthy => "healthy",
        HealthStatus::Degraded => "degraded",
        HealthStatus::Unhealthy => "unhealthy",
    };

    let response = HealthResponse {
        status: status_str.to_string(),
        running: state.health.is_job_running(),
        components,
    };

    let status_code = match overall {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status_code, Json(response))
}

/// Kubernetes liveness probe handler.
async fn healthz_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    if state.health.overall_status() != HealthStatus::Unhealthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Kubernetes readiness probe handler.
async fn readyz_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    if state.health.is_operational() && state.health.is_job_running() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// Prometheus metrics endpoint handler.
async fn metrics_handler(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    let metrics = &state.metrics;
    let mut output = String::with_capacity(1024);

    output.push_str("# HELP s2k_events_received_total Total events received from the stream\n");
    output.push_str("# TYPE s2k_events_received_total counter\n");
    output.push_str(&format!(
        "s2k_events_received_total {}\n\n",
        metrics.events_total()
    ));

    output.push_str("# HELP s2k_publishes_total Total records handed to the producer\n");
    output.push_str("# TYPE s2k_publishes_total counter\n");
    output.push_str(&format!(
        "s2k_publishes_total {}\n\n",
        metrics.publishes_total()
    ));

    output.push_str("# HELP s2k_deliveries_total Total deliveries acknowledged by Kafka\n");
    output.push_str("# TYPE s2k_deliveries_total counter\n");
    output.push_str(&format!(
        "s2k_deliveries_total {}\n\n",
        metrics.deliveries_total()
    ));

    output.push_str("# HELP s2k_delivery_failures_total Total deliveries that failed\n");
    output.push_str("# TYPE s2k_delivery_failures_total counter\n");
    output.push_str(&format!(
        "s2k_delivery_failures_total {}\n\n",
        metrics.delivery_failures_total()
    ));

    output.push_str("# HELP s2k_publish_errors_total Records dropped before submission\n");
    output.push_str("# TYPE s2k_publish_errors_total counter\n");
    output.push_str(&format!(
        "s2k_publish_errors_total {}\n",
        metrics.publish_errors_total()
    ));

    (
        StatusCode::OK,
        [(
            axum::http::header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        output,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_component_status_conversion() {
        let healthy = ComponentStatus::Healthy;
        let response: ComponentStatusResponse = (&healthy).into();
        assert_eq!(response.status, "healthy");
        assert!(response.message.is_none());

        let degraded = ComponentStatus::Degraded("slow".to_string());
        let response: ComponentStatusResponse = (&degraded).into();
        assert_eq!(response.status, "degraded");
        assert_eq!(response.message, Some("slow".to_string()));

        let unhealthy = ComponentStatus::Unhealthy("down".to_string());
        let response: ComponentStatusResponse = (&unhealthy).into();
        assert_eq!(response.status, "unhealthy");
        assert_eq!(response.message, Some("down".to_string()));

        let unknown = ComponentStatus::Unknown;
        let response: ComponentStatusResponse = (&unknown).into();
        assert_eq!(response.status, "unknown");
        assert!(response.message.is_none());
    }
}
