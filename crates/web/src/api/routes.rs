//! API route definitions

use crate::api::handlers;
use crate::app::AppState;
use axum::{routing::get, Router};
use std::sync::Arc;

/// Create the main API router
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/healthz", get(handlers::health_check))
        .route("/status", get(handlers::system_status))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use chrono::Utc;
    use config::{AppEnvConfig, EnvConfig, EnvStore};
    use serde_json::Value;
    use tower::util::ServiceExt;

    fn create_test_state() -> Arc<AppState> {
        let env: EnvStore = [
            ("WEB_HOSTNAME", "starter.local"),
            ("WEB_LISTEN_ADDRESSES", "127.0.0.1,::1"),
            ("WEB_HTTP_PORT", "8080"),
            ("DATABASE_HOSTNAME", "127.0.0.1"),
            ("DATABASE_PORT", "1"),
            ("DATABASE_DBNAME", "app"),
            ("DATABASE_USERNAME", "starter"),
            ("DATABASE_PASSWORD", "secret"),
        ]
        .into_iter()
        .collect();
        let config = AppEnvConfig::bind(&env).unwrap();
        let database = Database::new_lazy(&config).unwrap();

        Arc::new(AppState {
            config,
            database,
            started_at: Utc::now(),
        })
    }

    async fn get_json(path: &str) -> (StatusCode, Value) {
        let app = create_routes().with_state(create_test_state());

        let request = Request::builder().uri(path).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();

        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_status_endpoint() {
        let (status, body) = get_json("/status").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["service"], "web-starter");
        assert_eq!(body["hostname"], "starter.local");
        assert_eq!(body["web"]["httpPort"], 8080);
        assert_eq!(
            body["web"]["listenAddresses"],
            serde_json::json!(["127.0.0.1", "::1"])
        );
    }

    #[tokio::test]
    async fn test_health_endpoint_reports_unreachable_database() {
        let (status, body) = get_json("/healthz").await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["components"]["database"], "unhealthy");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = create_routes().with_state(create_test_state());

        let request = Request::builder()
            .uri("/missing")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
