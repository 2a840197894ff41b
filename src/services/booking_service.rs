use std::sync::Arc;
use tracing::instrument;

use crate::models::{
    Booking, BookingPayload, RepositoryError, ServiceError, ServiceResult, Validate,
};
use crate::observability::Metrics;
use crate::repositories::BookingRepository;

/// Service for managing table bookings
pub struct BookingService {
    repository: Arc<dyn BookingRepository>,
    metrics: Option<Arc<Metrics>>,
}

impl BookingService {
    pub fn new(repository: Arc<dyn BookingRepository>) -> Self {
        Self {
            repository,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[instrument(skip(self))]
    pub async fn list_bookings(&self) -> ServiceResult<Vec<Booking>> {
        let result = self.repository.find_all().await.map_err(ServiceError::from);
        self.record("list", &result);

        let bookings = result?;
        crate::info_with_trace!("Found {} bookings", bookings.len());
        Ok(bookings)
    }

    #[instrument(skip(self))]
    pub async fn get_booking(&self, id: i64) -> ServiceResult<Booking> {
        let result = match self.repository.find_by_id(id).await {
            Ok(Some(booking)) => Ok(booking),
            Ok(None) => Err(ServiceError::BookingNotFound { id }),
            Err(e) => Err(e.into()),
        };
        self.record("get", &result);
        result
    }

    #[instrument(skip(self, payload), fields(booking_date = %payload.booking_date))]
    pub async fn create_booking(&self, payload: BookingPayload) -> ServiceResult<Booking> {
        let result = match payload.validate() {
            Ok(()) => self.repository.create(payload).await.map_err(ServiceError::from),
            Err(e) => Err(e.into()),
        };
        self.record("create", &result);

        let booking = result?;
        crate::info_with_trace!(id = booking.id, "Booking created successfully");
        Ok(booking)
    }

    #[instrument(skip(self, payload))]
    pub async fn update_booking(&self, id: i64, payload: BookingPayload) -> ServiceResult<Booking> {
        let result = match payload.validate() {
            Ok(()) => self
                .repository
                .update(id, payload)
                .await
                .map_err(|e| not_found_as(e, id)),
            Err(e) => Err(e.into()),
        };
        self.record("update", &result);
        result
    }

    #[instrument(skip(self))]
    pub async fn delete_booking(&self, id: i64) -> ServiceResult<()> {
        let result = self
            .repository
            .delete(id)
            .await
            .map_err(|e| not_found_as(e, id));
        self.record("delete", &result);

        result?;
        crate::info_with_trace!("Booking deleted successfully");
        Ok(())
    }

    fn record<T>(&self, operation: &str, result: &ServiceResult<T>) {
        if let Some(metrics) = &self.metrics {
            metrics.record_booking_operation(operation, result.is_ok());
        }
    }
}

fn not_found_as(error: RepositoryError, id: i64) -> ServiceError {
    match error {
        RepositoryError::NotFound => ServiceError::BookingNotFound { id },
        other => other.into(),
    }
}
