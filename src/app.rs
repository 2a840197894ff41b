use axum::{extract::DefaultBodyLimit, middleware, Router};
use std::sync::Arc;
use tower_http::timeout::TimeoutLayer;

use crate::config::Config;
use crate::handlers::{
    create_auth_router, create_booking_router, create_health_router, create_menu_router,
    create_metrics_router, cors_middleware, request_validation_middleware,
    security_headers_middleware, HealthState,
};
use crate::observability::{observability_middleware, Metrics};
use crate::repositories::{
    Database, SqliteBookingRepository, SqliteMenuRepository, SqliteUserRepository,
};
use crate::services::{AuthService, BookingService, MenuService};

/// Everything the router needs, wired once at startup
#[derive(Clone)]
pub struct AppContext {
    pub database: Database,
    pub metrics: Arc<Metrics>,
    pub menu_service: Arc<MenuService>,
    pub booking_service: Arc<BookingService>,
    pub auth_service: Arc<AuthService>,
}

impl AppContext {
    /// Build repositories and services over `database`, all reporting to `metrics`
    pub fn new(database: Database, metrics: Arc<Metrics>) -> Self {
        let pool = database.pool().clone();

        let menu_repository =
            Arc::new(SqliteMenuRepository::new(pool.clone()).with_metrics(metrics.clone()));
        let booking_repository =
            Arc::new(SqliteBookingRepository::new(pool.clone()).with_metrics(metrics.clone()));
        let user_repository =
            Arc::new(SqliteUserRepository::new(pool).with_metrics(metrics.clone()));

        Self {
            menu_service: Arc::new(MenuService::new(menu_repository).with_metrics(metrics.clone())),
            booking_service: Arc::new(
                BookingService::new(booking_repository).with_metrics(metrics.clone()),
            ),
            auth_service: Arc::new(AuthService::new(user_repository).with_metrics(metrics.clone())),
            database,
            metrics,
        }
    }
}

/// Assemble every route and the middleware stack
pub fn create_app(context: &AppContext, config: &Config) -> Router {
    let metrics_for_middleware = context.metrics.clone();
    let max_request_size = config.server.max_request_size;

    let health_state = HealthState {
        database: context.database.clone(),
        metrics: context.metrics.clone(),
        service_name: config.observability.service_name.clone(),
        service_version: config.observability.service_version.clone(),
    };

    Router::new()
        .merge(create_menu_router(context.menu_service.clone()))
        .merge(create_booking_router(
            context.booking_service.clone(),
            context.auth_service.clone(),
        ))
        .merge(create_auth_router(context.auth_service.clone()))
        .merge(create_health_router(health_state))
        .merge(create_metrics_router(context.metrics.clone()))
        // Layers wrap outward: the last one added sees the request first
        .layer(DefaultBodyLimit::max(max_request_size))
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(middleware::from_fn(security_headers_middleware))
        .layer(middleware::from_fn(cors_middleware))
        .layer(middleware::from_fn_with_state(
            max_request_size,
            request_validation_middleware,
        ))
        .layer(middleware::from_fn(move |req, next| {
            observability_middleware(metrics_for_middleware.clone(), req, next)
        }))
}
