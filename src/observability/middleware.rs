use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use opentelemetry::trace::TraceContextExt;
use std::{future::Future, sync::Arc, time::Instant};
use tracing::{error, info, warn, Instrument};
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::Metrics;

/// Middleware for automatic request tracing and metrics collection
pub async fn observability_middleware(
    metrics: Arc<Metrics>,
    request: Request,
    next: Next,
) -> Response {
    let start_time = Instant::now();
    let method = request.method().to_string();
    let uri = request.uri().to_string();

    let user_agent = request
        .headers()
        .get("user-agent")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    // First hop of X-Forwarded-For, then X-Real-IP
    let client_ip = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .or_else(|| {
            request
                .headers()
                .get("x-real-ip")
                .and_then(|value| value.to_str().ok())
        })
        .unwrap_or("unknown")
        .trim()
        .to_string();

    // Route template keeps label cardinality bounded
    let endpoint = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched_path| matched_path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());

    let span_name = format!("{} {}", method, endpoint);

    let span = tracing::info_span!(
        target: "restaurant_rs::http",
        "{}", span_name,
        otel.name = %span_name,
        otel.kind = "server",
        http.method = %method,
        http.route = %endpoint,
        http.url = %uri,
        http.user_agent = %user_agent,
        client.address = %client_ip,
        http.response.status_code = tracing::field::Empty,
        http.response_time_ms = tracing::field::Empty,
    );

    async {
        metrics.increment_in_flight(&method, &endpoint);

        let trace_id = tracing::Span::current()
            .context()
            .span()
            .span_context()
            .trace_id()
            .to_string();

        info!(trace_id = %trace_id, method = %method, path = %uri, client_ip = %client_ip, "Processing request");

        let response = next.run(request).await;

        let duration = start_time.elapsed();
        let duration_ms = duration.as_millis();
        let status_code = response.status().as_u16();

        let current_span = tracing::Span::current();
        current_span.record("http.response.status_code", status_code);
        current_span.record("http.response_time_ms", duration_ms);

        let otel_context = current_span.context();
        let otel_span = otel_context.span();
        if status_code >= 500 {
            otel_span.set_status(opentelemetry::trace::Status::error("HTTP server error"));
        } else {
            otel_span.set_status(opentelemetry::trace::Status::Ok);
        }

        metrics.record_http_request(&method, &endpoint, status_code, duration.as_secs_f64());
        metrics.decrement_in_flight(&method, &endpoint);

        if status_code >= 500 {
            error!(
                trace_id = %trace_id,
                method = %method,
                path = %uri,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request failed"
            );
        } else if status_code >= 400 {
            warn!(
                trace_id = %trace_id,
                method = %method,
                path = %uri,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request rejected"
            );
        } else {
            info!(
                trace_id = %trace_id,
                method = %method,
                path = %uri,
                status_code = status_code,
                duration_ms = duration_ms,
                "Request completed successfully"
            );
        }

        response
    }
    .instrument(span)
    .await
}

/// Records duration and outcome of repository statements
#[derive(Clone)]
pub struct DatabaseTracingMiddleware {
    metrics: Arc<Metrics>,
}

impl DatabaseTracingMiddleware {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self { metrics }
    }

    /// Run a database operation, recording its outcome against `table`
    pub async fn trace_operation<F, T, E>(
        &self,
        operation: &str,
        table: &str,
        future: F,
    ) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let start_time = Instant::now();

        let result = future.await;
        let duration_seconds = start_time.elapsed().as_secs_f64();

        match &result {
            Ok(_) => {
                self.metrics
                    .record_database_operation(operation, table, true, duration_seconds);
            }
            Err(error) => {
                self.metrics
                    .record_database_operation(operation, table, false, duration_seconds);

                error!(
                    error = %error,
                    operation = %operation,
                    table = %table,
                    duration_ms = start_time.elapsed().as_millis(),
                    "Database operation failed"
                );
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, routing::get, Router};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_database_tracing_records_outcome() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let tracer = DatabaseTracingMiddleware::new(metrics.clone());

        let ok: Result<u32, String> = tracer
            .trace_operation("select", "menu_items", async { Ok(1) })
            .await;
        assert_eq!(ok, Ok(1));

        let failed: Result<u32, String> = tracer
            .trace_operation("insert", "menu_items", async { Err("locked".to_string()) })
            .await;
        assert!(failed.is_err());

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("operation=\"select\",status=\"success\",table=\"menu_items\""));
        assert!(encoded.contains("operation=\"insert\",status=\"error\",table=\"menu_items\""));
    }

    #[tokio::test]
    async fn test_observability_middleware_records_route_template() {
        let metrics = Arc::new(Metrics::new().unwrap());
        let metrics_for_layer = metrics.clone();

        let app = Router::new()
            .route("/menu/items/:id", get(|| async { StatusCode::NOT_FOUND }))
            .layer(axum::middleware::from_fn(move |req, next| {
                observability_middleware(metrics_for_layer.clone(), req, next)
            }));

        let response = app
            .oneshot(
                axum::http::Request::builder()
                    .uri("/menu/items/1000")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let encoded = metrics.encode().unwrap();
        assert!(encoded.contains("endpoint=\"/menu/items/:id\""));
        assert!(encoded.contains("status_code=\"404\""));
    }
}
