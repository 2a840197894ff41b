use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    MenuItem, MenuItemPayload, RepositoryError, ServiceError, ServiceResult, Validate,
};
use crate::observability::Metrics;
use crate::repositories::MenuRepository;

/// Service for managing the restaurant menu
pub struct MenuService {
    repository: Arc<dyn MenuRepository>,
    metrics: Option<Arc<Metrics>>,
}

impl MenuService {
    pub fn new(repository: Arc<dyn MenuRepository>) -> Self {
        Self {
            repository,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// List every menu item in id order
    #[instrument(skip(self))]
    pub async fn list_items(&self) -> ServiceResult<Vec<MenuItem>> {
        let result = self.repository.find_all().await.map_err(ServiceError::from);
        self.record("list", &result);

        let items = result?;
        crate::info_with_trace!("Found {} menu items", items.len());
        Ok(items)
    }

    #[instrument(skip(self))]
    pub async fn get_item(&self, id: i64) -> ServiceResult<MenuItem> {
        let result = match self.repository.find_by_id(id).await {
            Ok(Some(item)) => Ok(item),
            Ok(None) => Err(ServiceError::MenuItemNotFound { id }),
            Err(e) => Err(e.into()),
        };
        self.record("get", &result);
        result
    }

    #[instrument(skip(self, payload), fields(title = %payload.title))]
    pub async fn create_item(&self, payload: MenuItemPayload) -> ServiceResult<MenuItem> {
        let result = self.create_validated(payload).await;
        self.record("create", &result);

        let item = result?;
        crate::info_with_trace!(id = item.id, "Menu item created successfully");
        Ok(item)
    }

    /// Replace every field of an existing item
    #[instrument(skip(self, payload))]
    pub async fn update_item(&self, id: i64, payload: MenuItemPayload) -> ServiceResult<MenuItem> {
        let result = self.update_validated(id, payload).await;
        self.record("update", &result);

        let item = result?;
        crate::info_with_trace!(id = item.id, "Menu item updated successfully");
        Ok(item)
    }

    #[instrument(skip(self))]
    pub async fn delete_item(&self, id: i64) -> ServiceResult<()> {
        let result = self
            .repository
            .delete(id)
            .await
            .map_err(|e| not_found_as(e, id));
        self.record("delete", &result);

        result?;
        crate::info_with_trace!("Menu item deleted successfully");
        Ok(())
    }

    async fn create_validated(&self, payload: MenuItemPayload) -> ServiceResult<MenuItem> {
        payload.validate()?;
        Ok(self.repository.create(payload).await?)
    }

    async fn update_validated(&self, id: i64, payload: MenuItemPayload) -> ServiceResult<MenuItem> {
        payload.validate()?;
        self.repository
            .update(id, payload)
            .await
            .map_err(|e| not_found_as(e, id))
    }

    fn record<T>(&self, operation: &str, result: &ServiceResult<T>) {
        if let Some(metrics) = &self.metrics {
            metrics.record_menu_operation(operation, result.is_ok());
        }
    }
}

fn not_found_as(error: RepositoryError, id: i64) -> ServiceError {
    match error {
        RepositoryError::NotFound => ServiceError::MenuItemNotFound { id },
        other => other.into(),
    }
}
