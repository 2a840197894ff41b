use axum::{extract::State, http::StatusCode, response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{instrument, warn};

use crate::observability::Metrics;
use crate::repositories::Database;

#[derive(Clone)]
pub struct HealthState {
    pub database: Database,
    pub metrics: Arc<Metrics>,
    pub service_name: String,
    pub service_version: String,
}

pub fn create_health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health/status", get(health_check))
        .route("/health/status/", get(health_check))
        .with_state(state)
}

/// Health check endpoint handler; 503 when the database does not answer
#[instrument(name = "health_check", skip(state))]
pub async fn health_check(State(state): State<HealthState>) -> (StatusCode, Json<Value>) {
    state
        .metrics
        .set_active_connections(f64::from(state.database.connections()));

    let (status, database) = match state.database.ping().await {
        Ok(()) => (StatusCode::OK, "connected"),
        Err(e) => {
            warn!(error = %e, "Database health probe failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };

    (
        status,
        Json(json!({
            "status": if status.is_success() { "healthy" } else { "unhealthy" },
            "service": state.service_name,
            "version": state.service_version,
            "database": database,
            "timestamp": chrono::Utc::now().to_rfc3339()
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request};
    use tower::ServiceExt;

    async fn create_test_state() -> HealthState {
        HealthState {
            database: Database::in_memory().await.unwrap(),
            metrics: Arc::new(Metrics::new().unwrap()),
            service_name: "restaurant-rs".to_string(),
            service_version: "2.3.1".to_string(),
        }
    }

    async fn get_status(app: Router) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri("/health/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_healthy_database() {
        let state = create_test_state().await;
        let metrics = state.metrics.clone();

        let (status, body) = get_status(create_health_router(state)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["database"], "connected");
        assert_eq!(body["service"], "restaurant-rs");
        assert_eq!(body["version"], "2.3.1");
        assert!(metrics
            .encode()
            .unwrap()
            .contains("database_connections_active 1"));
    }

    #[tokio::test]
    async fn test_closed_database_is_unavailable() {
        let state = create_test_state().await;
        state.database.close().await;

        let (status, body) = get_status(create_health_router(state)).await;

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["database"], "unavailable");
    }
}
