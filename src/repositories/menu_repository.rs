use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};

use super::database::run_traced;
use crate::models::{format_price, MenuItem, MenuItemPayload, RepositoryError, RepositoryResult};
use crate::observability::{DatabaseTracingMiddleware, Metrics};

const TABLE: &str = "menu_items";

/// Data access for menu items
#[async_trait]
pub trait MenuRepository: Send + Sync {
    /// All items in ascending id order
    async fn find_all(&self) -> RepositoryResult<Vec<MenuItem>>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<MenuItem>>;

    /// Insert a new item and return it with its assigned id
    async fn create(&self, payload: MenuItemPayload) -> RepositoryResult<MenuItem>;

    /// Replace every field of an existing item; `NotFound` when the id is absent
    async fn update(&self, id: i64, payload: MenuItemPayload) -> RepositoryResult<MenuItem>;

    /// `NotFound` when the id is absent
    async fn delete(&self, id: i64) -> RepositoryResult<()>;
}

/// Prices are stored as text so no precision is lost to floating point
#[derive(sqlx::FromRow)]
struct MenuItemRow {
    id: i64,
    title: String,
    price: String,
    inventory: i32,
}

impl TryFrom<MenuItemRow> for MenuItem {
    type Error = RepositoryError;

    fn try_from(row: MenuItemRow) -> Result<Self, Self::Error> {
        let price = Decimal::from_str(&row.price).map_err(|e| RepositoryError::InvalidData {
            message: format!("menu item {} has invalid price {:?}: {}", row.id, row.price, e),
        })?;

        Ok(MenuItem {
            id: row.id,
            title: row.title,
            price,
            inventory: row.inventory,
        })
    }
}

pub struct SqliteMenuRepository {
    pool: SqlitePool,
    tracer: Option<DatabaseTracingMiddleware>,
}

impl SqliteMenuRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, tracer: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.tracer = Some(DatabaseTracingMiddleware::new(metrics));
        self
    }
}

#[async_trait]
impl MenuRepository for SqliteMenuRepository {
    #[instrument(skip(self))]
    async fn find_all(&self) -> RepositoryResult<Vec<MenuItem>> {
        let rows = run_traced(
            self.tracer.as_ref(),
            "select",
            TABLE,
            sqlx::query_as::<_, MenuItemRow>(
                "SELECT id, title, price, inventory FROM menu_items ORDER BY id",
            )
            .fetch_all(&self.pool),
        )
        .await?;

        rows.into_iter().map(MenuItem::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<MenuItem>> {
        let row = run_traced(
            self.tracer.as_ref(),
            "select",
            TABLE,
            sqlx::query_as::<_, MenuItemRow>(
                "SELECT id, title, price, inventory FROM menu_items WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.map(MenuItem::try_from).transpose()
    }

    #[instrument(skip(self, payload), fields(title = %payload.title))]
    async fn create(&self, payload: MenuItemPayload) -> RepositoryResult<MenuItem> {
        let row = run_traced(
            self.tracer.as_ref(),
            "insert",
            TABLE,
            sqlx::query_as::<_, MenuItemRow>(
                "INSERT INTO menu_items (title, price, inventory) VALUES (?, ?, ?) \
                 RETURNING id, title, price, inventory",
            )
            .bind(&payload.title)
            .bind(format_price(&payload.price))
            .bind(payload.inventory)
            .fetch_one(&self.pool),
        )
        .await?;

        let item = MenuItem::try_from(row)?;
        info!(id = item.id, "Menu item created");
        Ok(item)
    }

    #[instrument(skip(self, payload))]
    async fn update(&self, id: i64, payload: MenuItemPayload) -> RepositoryResult<MenuItem> {
        let row = run_traced(
            self.tracer.as_ref(),
            "update",
            TABLE,
            sqlx::query_as::<_, MenuItemRow>(
                "UPDATE menu_items SET title = ?, price = ?, inventory = ? WHERE id = ? \
                 RETURNING id, title, price, inventory",
            )
            .bind(&payload.title)
            .bind(format_price(&payload.price))
            .bind(payload.inventory)
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await?;

        row.ok_or(RepositoryError::NotFound)
            .and_then(MenuItem::try_from)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        let result = run_traced(
            self.tracer.as_ref(),
            "delete",
            TABLE,
            sqlx::query("DELETE FROM menu_items WHERE id = ?")
                .bind(id)
                .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        info!("Menu item deleted");
        Ok(())
    }
}
