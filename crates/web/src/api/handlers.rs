//! HTTP API request handlers

use crate::app::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

/// Liveness probe backed by a database round trip
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<Value>) {
    let db_healthy = match state.database.health_check().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Health check failed: {:#}", e);
            false
        }
    };

    let status = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(json!({
            "status": if db_healthy { "healthy" } else { "unhealthy" },
            "version": env!("CARGO_PKG_VERSION"),
            "timestamp": Utc::now().to_rfc3339(),
            "components": {
                "database": if db_healthy { "healthy" } else { "unhealthy" }
            }
        })),
    )
}

/// Service identity and listener configuration
pub async fn system_status(State(state): State<Arc<AppState>>) -> Json<Value> {
    let config = &state.config;
    let uptime = Utc::now().signed_duration_since(state.started_at);

    Json(json!({
        "service": "web-starter",
        "version": env!("CARGO_PKG_VERSION"),
        "hostname": config.web_hostname(),
        "startedAt": state.started_at.to_rfc3339(),
        "uptimeSeconds": uptime.num_seconds().max(0),
        "web": {
            "listenAddresses": config.web_listen_addresses(),
            "httpPort": config.web_http_port()
        }
    }))
}
