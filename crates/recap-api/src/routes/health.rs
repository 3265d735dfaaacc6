use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub services: ServiceHealth,
}

#[derive(Debug, Serialize)]
pub struct ServiceHealth {
    pub storage: &'static str,
}

/// Reports storage as `connected` when a lookup of a sentinel thread succeeds
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let storage_ok = match state.persist.get_thread("_health_check").await {
        Ok(_) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Storage health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: if storage_ok { "healthy" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        services: ServiceHealth {
            storage: if storage_ok { "connected" } else { "disconnected" },
        },
    })
}
