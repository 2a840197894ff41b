use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::errors::{ApiJson, ApiResult, RecordId};
use crate::models::{AuthenticatedUser, Booking, BookingPayload};
use crate::services::{AuthService, BookingService};

/// State for booking handlers; the auth service backs the token extractor
#[derive(Clone)]
pub struct BookingState {
    pub booking_service: Arc<BookingService>,
    pub auth_service: Arc<AuthService>,
}

impl FromRef<BookingState> for Arc<AuthService> {
    fn from_ref(state: &BookingState) -> Self {
        state.auth_service.clone()
    }
}

/// Booking routes. Every handler takes an `AuthenticatedUser`, so a request
/// without a valid token never reaches the service.
pub fn create_booking_router(
    booking_service: Arc<BookingService>,
    auth_service: Arc<AuthService>,
) -> Router {
    let state = BookingState {
        booking_service,
        auth_service,
    };

    Router::new()
        .route("/bookings", get(list_bookings).post(create_booking))
        .route("/bookings/", get(list_bookings).post(create_booking))
        .route(
            "/bookings/:id",
            get(get_booking).put(update_booking).delete(delete_booking),
        )
        .route(
            "/bookings/:id/",
            get(get_booking).put(update_booking).delete(delete_booking),
        )
        .with_state(state)
}

#[instrument(skip(state, user), fields(user = %user.username))]
pub async fn list_bookings(
    State(state): State<BookingState>,
    user: AuthenticatedUser,
) -> ApiResult<Json<Vec<Booking>>> {
    Ok(Json(state.booking_service.list_bookings().await?))
}

#[instrument(skip(state, user, payload), fields(user = %user.username))]
pub async fn create_booking(
    State(state): State<BookingState>,
    user: AuthenticatedUser,
    ApiJson(payload): ApiJson<BookingPayload>,
) -> ApiResult<(StatusCode, Json<Booking>)> {
    let booking = state.booking_service.create_booking(payload).await?;
    info!(id = booking.id, "Created booking for {}", booking);
    Ok((StatusCode::CREATED, Json(booking)))
}

#[instrument(skip(state, user), fields(user = %user.username))]
pub async fn get_booking(
    State(state): State<BookingState>,
    user: AuthenticatedUser,
    RecordId(id): RecordId,
) -> ApiResult<Json<Booking>> {
    Ok(Json(state.booking_service.get_booking(id).await?))
}

#[instrument(skip(state, user, payload), fields(user = %user.username))]
pub async fn update_booking(
    State(state): State<BookingState>,
    user: AuthenticatedUser,
    RecordId(id): RecordId,
    ApiJson(payload): ApiJson<BookingPayload>,
) -> ApiResult<Json<Booking>> {
    Ok(Json(state.booking_service.update_booking(id, payload).await?))
}

#[instrument(skip(state, user), fields(user = %user.username))]
pub async fn delete_booking(
    State(state): State<BookingState>,
    user: AuthenticatedUser,
    RecordId(id): RecordId,
) -> ApiResult<StatusCode> {
    state.booking_service.delete_booking(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CreateUserRequest;
    use crate::models::TokenRequest;
    use crate::repositories::{Database, SqliteBookingRepository, SqliteUserRepository};
    use axum::{
        body::Body,
        http::{header, Request},
    };
    use serde_json::json;
    use tower::ServiceExt;

    async fn create_test_router() -> (Router, String) {
        let database = Database::in_memory().await.unwrap();
        let auth_service = Arc::new(AuthService::new(Arc::new(SqliteUserRepository::new(
            database.pool().clone(),
        ))));
        let booking_service = Arc::new(BookingService::new(Arc::new(
            SqliteBookingRepository::new(database.pool().clone()),
        )));

        auth_service
            .register_user(CreateUserRequest {
                username: "testuser".to_string(),
                password: "testpass".to_string(),
                is_staff: false,
            })
            .await
            .unwrap();
        let token = auth_service
            .obtain_token(TokenRequest {
                username: "testuser".to_string(),
                password: "testpass".to_string(),
            })
            .await
            .unwrap()
            .token;

        (create_booking_router(booking_service, auth_service), token)
    }

    #[tokio::test]
    async fn test_list_requires_token() {
        let (app, _) = create_test_router().await;

        let response = app
            .oneshot(Request::builder().uri("/bookings/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Token");
    }

    #[tokio::test]
    async fn test_invalid_token_rejected() {
        let (app, _) = create_test_router().await;

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/bookings")
                    .header(header::AUTHORIZATION, "Token not-a-real-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_booking_with_token() {
        let (app, token) = create_test_router().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/bookings/")
                    .header(header::AUTHORIZATION, format!("Token {}", token))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({
                            "name": "New booking",
                            "number_of_guest": 4,
                            "booking_date": "2022-06-15",
                        })
                        .to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
    }

    #[tokio::test]
    async fn test_token_checked_before_body_format() {
        let (app, token) = create_test_router().await;

        let cases = [
            ("POST", "/bookings/", Some("text/plain")),
            ("POST", "/bookings/", None),
            ("PUT", "/bookings/1", Some("application/x-www-form-urlencoded")),
        ];

        for (method, uri, content_type) in cases {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(content_type) = content_type {
                builder = builder.header(header::CONTENT_TYPE, content_type);
            }
            let response = app
                .clone()
                .oneshot(builder.body(Body::from("name=x")).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        }

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/bookings/")
                    .header(header::AUTHORIZATION, format!("Token {}", token))
                    .header(header::CONTENT_TYPE, "text/plain")
                    .body(Body::from("name=x"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_missing_booking_is_not_found_only_with_token() {
        let (app, token) = create_test_router().await;

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/bookings/1000").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/bookings/1000")
                    .header(header::AUTHORIZATION, format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
