use axum::{extract::State, response::Json, routing::post, Router};
use std::sync::Arc;
use tracing::instrument;

use super::errors::{ApiJson, ApiResult};
use crate::models::{TokenRequest, TokenResponse};
use crate::services::AuthService;

pub fn create_auth_router(auth_service: Arc<AuthService>) -> Router {
    Router::new()
        .route("/api-token-auth", post(obtain_auth_token))
        .route("/api-token-auth/", post(obtain_auth_token))
        .with_state(auth_service)
}

/// Exchange username and password for the user's API token
#[instrument(skip(service, request), fields(username = %request.username))]
pub async fn obtain_auth_token(
    State(service): State<Arc<AuthService>>,
    ApiJson(request): ApiJson<TokenRequest>,
) -> ApiResult<Json<TokenResponse>> {
    Ok(Json(service.obtain_token(request).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateUserRequest;
    use crate::repositories::{Database, SqliteUserRepository};
    use axum::{body::Body, http::Request, http::StatusCode};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn create_test_router() -> Router {
        let database = Database::in_memory().await.unwrap();
        let service = AuthService::new(Arc::new(SqliteUserRepository::new(
            database.pool().clone(),
        )));
        service
            .register_user(CreateUserRequest {
                username: "testuser".to_string(),
                password: "testpass".to_string(),
                is_staff: false,
            })
            .await
            .unwrap();
        create_auth_router(Arc::new(service))
    }

    fn token_request(body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api-token-auth/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_same_token_on_repeat() {
        let app = create_test_router().await;
        let credentials = json!({"username": "testuser", "password": "testpass"});

        let first = app.clone().oneshot(token_request(credentials.clone())).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);
        let first = body_json(first).await;

        let second = body_json(app.oneshot(token_request(credentials)).await.unwrap()).await;

        assert_eq!(first["token"].as_str().unwrap().len(), 40);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let app = create_test_router().await;

        let response = app
            .oneshot(token_request(json!({"username": "testuser", "password": "nope"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"non_field_errors": ["Unable to log in with provided credentials."]})
        );
    }

    #[tokio::test]
    async fn test_missing_password_field() {
        let app = create_test_router().await;

        let response = app
            .oneshot(token_request(json!({"username": "testuser"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
