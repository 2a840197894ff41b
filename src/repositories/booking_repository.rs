use async_trait::async_trait;
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, instrument};

use super::database::run_traced;
use crate::models::{Booking, BookingPayload, RepositoryError, RepositoryResult};
use crate::observability::{DatabaseTracingMiddleware, Metrics};

const TABLE: &str = "bookings";

/// Data access for table bookings
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// All bookings in ascending id order
    async fn find_all(&self) -> RepositoryResult<Vec<Booking>>;

    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Booking>>;

    async fn create(&self, payload: BookingPayload) -> RepositoryResult<Booking>;

    /// Replace every field of an existing booking; `NotFound` when the id is absent
    async fn update(&self, id: i64, payload: BookingPayload) -> RepositoryResult<Booking>;

    async fn delete(&self, id: i64) -> RepositoryResult<()>;
}

pub struct SqliteBookingRepository {
    pool: SqlitePool,
    tracer: Option<DatabaseTracingMiddleware>,
}

impl SqliteBookingRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, tracer: None }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.tracer = Some(DatabaseTracingMiddleware::new(metrics));
        self
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepository {
    #[instrument(skip(self))]
    async fn find_all(&self) -> RepositoryResult<Vec<Booking>> {
        run_traced(
            self.tracer.as_ref(),
            "select",
            TABLE,
            sqlx::query_as::<_, Booking>(
                "SELECT id, name, number_of_guest, booking_date FROM bookings ORDER BY id",
            )
            .fetch_all(&self.pool),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Booking>> {
        run_traced(
            self.tracer.as_ref(),
            "select",
            TABLE,
            sqlx::query_as::<_, Booking>(
                "SELECT id, name, number_of_guest, booking_date FROM bookings WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&self.pool),
        )
        .await
    }

    #[instrument(skip(self, payload), fields(booking_date = %payload.booking_date))]
    async fn create(&self, payload: BookingPayload) -> RepositoryResult<Booking> {
        let result = run_traced(
            self.tracer.as_ref(),
            "insert",
            TABLE,
            sqlx::query(
                "INSERT INTO bookings (name, number_of_guest, booking_date) VALUES (?, ?, ?)",
            )
            .bind(&payload.name)
            .bind(payload.number_of_guest)
            .bind(payload.booking_date)
            .execute(&self.pool),
        )
        .await?;

        let booking = Booking::from_payload(result.last_insert_rowid(), payload);
        info!(id = booking.id, "Booking created");
        Ok(booking)
    }

    #[instrument(skip(self, payload))]
    async fn update(&self, id: i64, payload: BookingPayload) -> RepositoryResult<Booking> {
        let result = run_traced(
            self.tracer.as_ref(),
            "update",
            TABLE,
            sqlx::query(
                "UPDATE bookings SET name = ?, number_of_guest = ?, booking_date = ? WHERE id = ?",
            )
            .bind(&payload.name)
            .bind(payload.number_of_guest)
            .bind(payload.booking_date)
            .bind(id)
            .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(Booking::from_payload(id, payload))
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        let result = run_traced(
            self.tracer.as_ref(),
            "delete",
            TABLE,
            sqlx::query("DELETE FROM bookings WHERE id = ?")
                .bind(id)
                .execute(&self.pool),
        )
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        info!("Booking deleted");
        Ok(())
    }
}
