use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use std::sync::Arc;
use tracing::{info, instrument};

use super::errors::{ApiJson, ApiResult, RecordId};
use crate::models::{MenuItem, MenuItemPayload};
use crate::services::MenuService;

/// Menu item routes; each path answers with and without the trailing slash
pub fn create_menu_router(menu_service: Arc<MenuService>) -> Router {
    Router::new()
        .route("/menu/items", get(list_menu_items).post(create_menu_item))
        .route("/menu/items/", get(list_menu_items).post(create_menu_item))
        .route(
            "/menu/items/:id",
            get(get_menu_item).put(update_menu_item).delete(delete_menu_item),
        )
        .route(
            "/menu/items/:id/",
            get(get_menu_item).put(update_menu_item).delete(delete_menu_item),
        )
        .with_state(menu_service)
}

#[instrument(skip(service))]
pub async fn list_menu_items(State(service): State<Arc<MenuService>>) -> ApiResult<Json<Vec<MenuItem>>> {
    Ok(Json(service.list_items().await?))
}

#[instrument(skip(service, payload))]
pub async fn create_menu_item(
    State(service): State<Arc<MenuService>>,
    ApiJson(payload): ApiJson<MenuItemPayload>,
) -> ApiResult<(StatusCode, Json<MenuItem>)> {
    let item = service.create_item(payload).await?;
    info!(id = item.id, "Created menu item {}", item);
    Ok((StatusCode::CREATED, Json(item)))
}

#[instrument(skip(service))]
pub async fn get_menu_item(
    State(service): State<Arc<MenuService>>,
    RecordId(id): RecordId,
) -> ApiResult<Json<MenuItem>> {
    Ok(Json(service.get_item(id).await?))
}

#[instrument(skip(service, payload))]
pub async fn update_menu_item(
    State(service): State<Arc<MenuService>>,
    RecordId(id): RecordId,
    ApiJson(payload): ApiJson<MenuItemPayload>,
) -> ApiResult<Json<MenuItem>> {
    Ok(Json(service.update_item(id, payload).await?))
}

#[instrument(skip(service))]
pub async fn delete_menu_item(
    State(service): State<Arc<MenuService>>,
    RecordId(id): RecordId,
) -> ApiResult<StatusCode> {
    service.delete_item(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::{Database, SqliteMenuRepository};
    use axum::{body::Body, http::Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn create_test_router() -> Router {
        let database = Database::in_memory().await.unwrap();
        let repository = Arc::new(SqliteMenuRepository::new(database.pool().clone()));
        create_menu_router(Arc::new(MenuService::new(repository)))
    }

    fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
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
    async fn test_create_then_get_menu_item() {
        let app = create_test_router().await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/menu/items/",
                json!({"title": "Penne Arrabbiata", "price": 10.99, "inventory": 3}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created = body_json(response).await;
        assert_eq!(created["price"], "10.99");

        let uri = format!("/menu/items/{}", created["id"]);
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, created);
    }

    #[tokio::test]
    async fn test_non_numeric_id_is_not_found() {
        let app = create_test_router().await;

        let response = app
            .oneshot(Request::builder().uri("/menu/items/abc").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request() {
        let app = create_test_router().await;

        let response = app
            .clone()
            .oneshot(json_request("POST", "/menu/items", json!({"title": "Fries"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/menu/items")
                    .header("content-type", "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_missing_item() {
        let app = create_test_router().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/menu/items/1000/")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
