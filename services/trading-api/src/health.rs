//! Health check endpoints for load balancers and monitoring

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::AppState;

/// Basic health check - fast, no external dependencies
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// Readiness check - verifies store connectivity
pub async fn readyz(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReadinessResponse>, StatusCode> {
    match state.store.ping().await {
        Ok(()) => Ok(Json(ReadinessResponse {
            status: "ready".to_string(),
            checks: vec![HealthCheck {
                name: "store".to_string(),
                status: "ok".to_string(),
            }],
        })),
        Err(e) => {
            tracing::error!("Readiness check failed: {}", e);
            Err(StatusCode::SERVICE_UNAVAILABLE)
        }
    }
}

/// Detailed health check with all components.
///
/// The event bus is reported but never degrades health: publishing is
/// best-effort.
pub async fn health_detail(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DetailedHealthResponse>, StatusCode> {
    let mut checks = vec![];

    let store_ok = state.store.ping().await.is_ok();
    checks.push(HealthCheck {
        name: format!("store:{}", state.store.backend()),
        status: if store_ok { "ok" } else { "error" }.to_string(),
    });

    checks.push(HealthCheck {
        name: format!("event_bus:{}", state.notifier.bus_name()),
        status: "configured".to_string(),
    });

    let metrics = state.metrics.snapshot().await;

    let response = DetailedHealthResponse {
        status: if store_ok { "healthy" } else { "degraded" }.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checks,
        metrics: HealthMetrics {
            uptime_secs: metrics.uptime_secs,
            counters: metrics.counters,
        },
    };

    if store_ok {
        Ok(Json(response))
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: Vec<HealthCheck>,
}

#[derive(Serialize)]
pub struct DetailedHealthResponse {
    pub status: String,
    pub version: String,
    pub checks: Vec<HealthCheck>,
    pub metrics: HealthMetrics,
}

#[derive(Serialize)]
pub struct HealthCheck {
    pub name: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct HealthMetrics {
    pub uptime_secs: u64,
    pub counters: std::collections::HashMap<String, u64>,
}
