use crate::entities::{booking_entity, service_entity, BookingStatus, PaymentStatus};
use crate::error::{AppError, AppResult};
use crate::external::{NotificationEvent, NotificationService};
use crate::models::{
    parse_booking_time, BookingListQuery, BookingResponse, CreateBookingRequest,
    PostponeBookingRequest,
};
use crate::services::availability_service::{is_bookable_time, AvailabilityService};
use chrono::{NaiveDate, NaiveTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, SqlErr,
};

#[derive(Clone)]
pub struct BookingService {
    pool: DatabaseConnection,
    availability: AvailabilityService,
    notifier: NotificationService,
}

impl BookingService {
    pub fn new(
        pool: DatabaseConnection,
        availability: AvailabilityService,
        notifier: NotificationService,
    ) -> Self {
        Self {
            pool,
            availability,
            notifier,
        }
    }

    /// Creates a pending booking. The availability read is advisory; the
    /// authoritative conflict check is the partial unique index on active
    /// (date, time) rows, surfaced here as the distinct slot-conflict error.
    pub async fn create_booking(&self, req: CreateBookingRequest) -> AppResult<BookingResponse> {
        let time = parse_booking_time(&req.time)?;
        self.validate_slot_target(req.date, time)?;

        service_entity::Entity::find_by_id(req.service_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Service {} not found", req.service_id)))?;

        if req.customer_name.trim().is_empty() || req.customer_phone.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Customer name and phone are required".to_string(),
            ));
        }

        let now = Utc::now();
        let insert = booking_entity::ActiveModel {
            service_id: Set(req.service_id),
            date: Set(req.date),
            time: Set(time),
            customer_id: Set(req.customer_id),
            customer_name: Set(req.customer_name),
            customer_phone: Set(req.customer_phone),
            customer_email: Set(req.customer_email),
            status: Set(BookingStatus::Pending),
            payment_status: Set(PaymentStatus::Pending),
            notes: Set(req.notes),
            created_at: Set(Some(now)),
            updated_at: Set(Some(now)),
            ..Default::default()
        }
        .insert(&self.pool)
        .await
        .map_err(map_slot_unique_violation)?;

        self.availability.invalidate_date(insert.date).await;
        self.notifier.notify(NotificationEvent::BookingCreated {
            booking_id: insert.id,
            customer_phone: insert.customer_phone.clone(),
            date: insert.date.to_string(),
            time: insert.time.format("%H:%M").to_string(),
        });

        log::info!(
            "Created booking {} for {} {}",
            insert.id,
            insert.date,
            insert.time.format("%H:%M")
        );
        Ok(BookingResponse::from(insert))
    }

    pub async fn get_booking(&self, id: i64) -> AppResult<BookingResponse> {
        let booking = self.find_booking(id).await?;
        Ok(BookingResponse::from(booking))
    }

    pub async fn list_bookings(&self, query: &BookingListQuery) -> AppResult<Vec<BookingResponse>> {
        let mut find = booking_entity::Entity::find()
            .order_by_asc(booking_entity::Column::Date)
            .order_by_asc(booking_entity::Column::Time);
        if let Some(date) = query.date {
            find = find.filter(booking_entity::Column::Date.eq(date));
        }
        let bookings = find.all(&self.pool).await?;
        Ok(bookings.into_iter().map(BookingResponse::from).collect())
    }

    /// Cancellation is terminal for slot occupancy; the record is retained.
    pub async fn cancel_booking(&self, id: i64) -> AppResult<BookingResponse> {
        let booking = self.find_booking(id).await?;
        if !booking.status.can_transition_to(BookingStatus::Cancelled) {
            return Err(AppError::ValidationError(format!(
                "Cannot cancel a {} booking",
                booking.status
            )));
        }

        let updated = self
            .transition(id, booking.status, BookingStatus::Cancelled)
            .await?;

        self.availability.invalidate_date(updated.date).await;
        self.notifier
            .notify(NotificationEvent::BookingCancelled { booking_id: id });
        Ok(BookingResponse::from(updated))
    }

    /// Admin override path: confirms without a reconciled payment.
    pub async fn confirm_booking(&self, id: i64) -> AppResult<BookingResponse> {
        let booking = self.find_booking(id).await?;
        if !booking.status.can_transition_to(BookingStatus::Confirmed) {
            return Err(AppError::ValidationError(format!(
                "Cannot confirm a {} booking",
                booking.status
            )));
        }

        let updated = self
            .transition(id, booking.status, BookingStatus::Confirmed)
            .await?;
        self.notifier
            .notify(NotificationEvent::BookingConfirmed { booking_id: id });
        Ok(BookingResponse::from(updated))
    }

    /// Moves a booking to a new slot. The booking passes through `postponed`
    /// and lands back in `pending`, awaiting re-confirmation.
    pub async fn postpone_booking(
        &self,
        id: i64,
        req: PostponeBookingRequest,
    ) -> AppResult<BookingResponse> {
        let time = parse_booking_time(&req.time)?;
        self.validate_slot_target(req.date, time)?;

        let booking = self.find_booking(id).await?;
        if !booking.status.can_transition_to(BookingStatus::Postponed) {
            return Err(AppError::ValidationError(format!(
                "Cannot postpone a {} booking",
                booking.status
            )));
        }
        let old_date = booking.date;

        let result = booking_entity::Entity::update_many()
            .col_expr(booking_entity::Column::Date, Expr::value(req.date))
            .col_expr(booking_entity::Column::Time, Expr::value(time))
            .col_expr(
                booking_entity::Column::Status,
                BookingStatus::Pending.as_enum(),
            )
            .col_expr(
                booking_entity::Column::UpdatedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(booking_entity::Column::Id.eq(id))
            .filter(booking_entity::Column::Status.eq(booking.status))
            .exec(&self.pool)
            .await
            .map_err(map_slot_unique_violation)?;

        if result.rows_affected == 0 {
            // Status changed between read and write; report as a conflict so
            // the caller re-reads.
            return Err(AppError::Conflict(
                "Booking changed concurrently, please retry".to_string(),
            ));
        }

        self.availability.invalidate_date(old_date).await;
        self.availability.invalidate_date(req.date).await;

        let updated = self.find_booking(id).await?;
        Ok(BookingResponse::from(updated))
    }

    fn validate_slot_target(&self, date: NaiveDate, time: NaiveTime) -> AppResult<()> {
        if date < Utc::now().date_naive() {
            return Err(AppError::ValidationError(
                "Booking date is in the past".to_string(),
            ));
        }
        if !is_bookable_time(self.availability.business_hours(), date, time) {
            return Err(AppError::ValidationError(
                "Time is outside business hours or off the 15-minute grid".to_string(),
            ));
        }
        Ok(())
    }

    async fn find_booking(&self, id: i64) -> AppResult<booking_entity::Model> {
        booking_entity::Entity::find_by_id(id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Booking {id} not found")))
    }

    /// Guarded status flip: only applies while the row is still in the status
    /// the decision was made against.
    async fn transition(
        &self,
        id: i64,
        from: BookingStatus,
        to: BookingStatus,
    ) -> AppResult<booking_entity::Model> {
        let result = booking_entity::Entity::update_many()
            .col_expr(booking_entity::Column::Status, to.as_enum())
            .col_expr(
                booking_entity::Column::UpdatedAt,
                Expr::value(Some(Utc::now())),
            )
            .filter(booking_entity::Column::Id.eq(id))
            .filter(booking_entity::Column::Status.eq(from))
            .exec(&self.pool)
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::Conflict(
                "Booking changed concurrently, please retry".to_string(),
            ));
        }
        self.find_booking(id).await
    }
}

/// Unique violations on the active-slot index are the distinct "slot already
/// booked" condition, not a generic database failure.
fn map_slot_unique_violation(e: DbErr) -> AppError {
    classify_slot_write_error(e.sql_err(), e)
}

/// `sql_err()` only classifies errors raised by a real backend driver, so the
/// mapping takes the extracted classification alongside the raw error.
fn classify_slot_write_error(sql_err: Option<SqlErr>, e: DbErr) -> AppError {
    match sql_err {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::slot_conflict(),
        _ => AppError::DatabaseError(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BusinessHoursConfig, NotificationConfig};
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn service(pool: DatabaseConnection) -> BookingService {
        let availability =
            AvailabilityService::new(pool.clone(), BusinessHoursConfig::default());
        BookingService::new(
            pool,
            availability,
            NotificationService::new(NotificationConfig::default()),
        )
    }

    fn booking_row(status: BookingStatus) -> booking_entity::Model {
        booking_entity::Model {
            id: 5,
            service_id: 1,
            date: NaiveDate::from_ymd_opt(2030, 6, 17).unwrap(),
            time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
            customer_id: Some(42),
            customer_name: "Alice".to_string(),
            customer_phone: "+15550001111".to_string(),
            customer_email: None,
            status,
            payment_status: PaymentStatus::Pending,
            notes: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn past_dates_are_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let svc = service(db);
        let err = svc
            .create_booking(CreateBookingRequest {
                service_id: 1,
                date: NaiveDate::from_ymd_opt(2020, 1, 6).unwrap(),
                time: "10:00".to_string(),
                customer_id: None,
                customer_name: "Alice".to_string(),
                customer_phone: "+15550001111".to_string(),
                customer_email: None,
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn off_grid_times_are_rejected() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        let svc = service(db);
        let err = svc
            .create_booking(CreateBookingRequest {
                service_id: 1,
                // A Monday far in the future.
                date: NaiveDate::from_ymd_opt(2030, 6, 17).unwrap(),
                time: "10:07".to_string(),
                customer_id: None,
                customer_name: "Alice".to_string(),
                customer_phone: "+15550001111".to_string(),
                customer_email: None,
                notes: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[tokio::test]
    async fn cancelling_a_cancelled_booking_fails() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![booking_row(BookingStatus::Cancelled)]])
            .into_connection();
        let svc = service(db);
        let err = svc.cancel_booking(5).await.unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn unique_violation_on_the_slot_index_is_the_slot_conflict() {
        // Two concurrent creates for the same slot: the loser's insert comes
        // back as a unique violation on ux_bookings_slot and must surface as
        // the distinct conflict, not a generic database error.
        let err = classify_slot_write_error(
            Some(SqlErr::UniqueConstraintViolation(
                "duplicate key value violates unique constraint \"ux_bookings_slot\"".to_string(),
            )),
            DbErr::Custom("duplicate key".to_string()),
        );
        match err {
            AppError::Conflict(msg) => assert_eq!(msg, "Slot already booked"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn other_write_errors_pass_through_unmapped() {
        let err = classify_slot_write_error(None, DbErr::Custom("connection reset".to_string()));
        assert!(matches!(err, AppError::DatabaseError(_)));
    }

    #[tokio::test]
    async fn concurrent_status_change_reports_conflict() {
        // The guarded update affects zero rows when the status moved under us.
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![booking_row(BookingStatus::Pending)]])
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .into_connection();
        let svc = service(db);
        let err = svc.cancel_booking(5).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }
}
