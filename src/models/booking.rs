use crate::entities::{booking_entity, BookingStatus, PaymentStatus};
use crate::error::{AppError, AppResult};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Parses a time-of-day field, accepting "HH:MM" or "HH:MM:SS".
pub fn parse_booking_time(s: &str) -> AppResult<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| AppError::ValidationError(format!("Invalid time: {s}")))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateBookingRequest {
    pub service_id: i64,
    pub date: NaiveDate,
    /// "HH:MM", must fall on the 15-minute grid within business hours.
    pub time: String,
    pub customer_id: Option<i64>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PostponeBookingRequest {
    pub date: NaiveDate,
    pub time: String,
}

#[derive(Debug, Deserialize)]
pub struct BookingListQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingResponse {
    pub id: i64,
    pub service_id: i64,
    pub date: NaiveDate,
    pub time: String,
    pub customer_id: Option<i64>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub notes: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<booking_entity::Model> for BookingResponse {
    fn from(m: booking_entity::Model) -> Self {
        Self {
            id: m.id,
            service_id: m.service_id,
            date: m.date,
            time: m.time.format("%H:%M").to_string(),
            customer_id: m.customer_id,
            customer_name: m.customer_name,
            customer_phone: m.customer_phone,
            customer_email: m.customer_email,
            status: m.status,
            payment_status: m.payment_status,
            notes: m.notes,
            created_at: m.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_short_and_long_times() {
        assert_eq!(
            parse_booking_time("09:15").unwrap(),
            NaiveTime::from_hms_opt(9, 15, 0).unwrap()
        );
        assert_eq!(
            parse_booking_time("14:30:00").unwrap(),
            NaiveTime::from_hms_opt(14, 30, 0).unwrap()
        );
    }

    #[test]
    fn rejects_garbage_times() {
        assert!(parse_booking_time("25:00").is_err());
        assert!(parse_booking_time("noonish").is_err());
    }
}
