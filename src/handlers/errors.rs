use axum::{
    async_trait,
    extract::{
        rejection::JsonRejection, FromRef, FromRequest, FromRequestParts, Path, Request,
    },
    http::{header, request::Parts, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::models::{AuthenticatedUser, RepositoryError, ServiceError};
use crate::services::AuthService;

/// Error response: status, JSON body and, for 401s, a `WWW-Authenticate` challenge
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: Value,
    challenge: bool,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({
                "error": message.into(),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }),
            challenge: false,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            challenge: true,
            ..Self::new(StatusCode::UNAUTHORIZED, message)
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &Value {
        &self.body
    }
}

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::MenuItemNotFound { .. } | ServiceError::BookingNotFound { .. } => {
                ApiError::not_found(err.to_string())
            }
            ServiceError::ValidationError { .. } => ApiError::bad_request(err.to_string()),
            ServiceError::InvalidCredentials => ApiError {
                status: StatusCode::BAD_REQUEST,
                body: json!({ "non_field_errors": [err.to_string()] }),
                challenge: false,
            },
            ServiceError::Unauthorized { message } => ApiError::unauthorized(message),
            ServiceError::UserAlreadyExists { .. } => {
                ApiError::new(StatusCode::CONFLICT, err.to_string())
            }
            ServiceError::Repository { source } => match source {
                RepositoryError::NotFound => ApiError::not_found("Resource not found"),
                RepositoryError::ConnectionFailed { message } => {
                    crate::error_with_trace!(error = %message, "Database unavailable");
                    ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "Database connection failed")
                }
                other => {
                    crate::error_with_trace!(error = %other, "Repository failure");
                    ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                }
            },
            ServiceError::Internal { message } => {
                crate::error_with_trace!(error = %message, "Internal failure");
                ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body)).into_response();
        if self.challenge {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Token"));
        }
        response
    }
}

/// `Json` extractor whose rejections use the service's error body.
///
/// Malformed or incomplete JSON is a 400 rather than axum's 422. A missing
/// Content-Type is a 400 and a non-JSON one a 415. Handlers list it after the
/// auth extractor, so unauthenticated requests are refused before the body is
/// looked at.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        if !request.headers().contains_key(header::CONTENT_TYPE) {
            warn!("Missing content type header");
            return Err(ApiError::bad_request(
                "Content-Type header is required for requests with a body",
            ));
        }

        match Json::<T>::from_request(request, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => {
                let status = match &rejection {
                    JsonRejection::JsonDataError(_) | JsonRejection::JsonSyntaxError(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    other => other.status(),
                };
                warn!(status = status.as_u16(), error = %rejection.body_text(), "Rejected request body");
                Err(ApiError::new(status, rejection.body_text()))
            }
        }
    }
}

/// Record id taken from the path.
///
/// Anything other than plain digits cannot name a record, so it is a 404
/// rather than a parse error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for RecordId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::not_found("Not found."))?;

        parse_record_id(&raw)
            .map(RecordId)
            .ok_or_else(|| ApiError::not_found("Not found."))
    }
}

pub(crate) fn parse_record_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Pull the key out of `Authorization: Token <key>` (or `Bearer <key>`)
pub(crate) fn parse_authorization(value: &str) -> Result<&str, &'static str> {
    let mut parts = value.split_whitespace();
    let scheme = parts.next().unwrap_or_default();
    if !scheme.eq_ignore_ascii_case("token") && !scheme.eq_ignore_ascii_case("bearer") {
        return Err("Authentication credentials were not provided.");
    }

    match (parts.next(), parts.next()) {
        (Some(key), None) => Ok(key),
        (None, _) => Err("Invalid token header. No credentials provided."),
        (Some(_), Some(_)) => Err("Invalid token header. Token string should not contain spaces."),
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    Arc<AuthService>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| ApiError::unauthorized("Authentication credentials were not provided."))?
            .to_str()
            .map_err(|_| {
                ApiError::unauthorized(
                    "Invalid token header. Token string should not contain invalid characters.",
                )
            })?;

        let key = parse_authorization(header_value).map_err(ApiError::unauthorized)?;

        let auth_service = Arc::<AuthService>::from_ref(state);
        Ok(auth_service.authenticate_token(key).await?)
    }
}
